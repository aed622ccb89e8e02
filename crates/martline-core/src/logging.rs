//! Logging setup: `env_logger` filtering, routed through indicatif on a TTY

use std::fmt;

use indicatif::MultiProgress;

/// Fixed-width label and optional ANSI color for a level.
fn level_label(level: log::Level) -> (&'static str, &'static str) {
    match level {
        log::Level::Error => ("ERROR", "\x1b[31m"),
        log::Level::Warn => ("WARN ", "\x1b[33m"),
        log::Level::Info => ("INFO ", "\x1b[32m"),
        log::Level::Debug => ("DEBUG", "\x1b[36m"),
        log::Level::Trace => ("TRACE", "\x1b[35m"),
    }
}

/// Render one log line. Debug and trace lines carry the module target so
/// store and source chatter can be told apart from stage messages.
fn format_line(level: log::Level, target: &str, args: &fmt::Arguments<'_>, color: bool) -> String {
    let (label, ansi) = level_label(level);
    let label = if color {
        format!("{ansi}{label}\x1b[0m")
    } else {
        label.to_string()
    };
    if level >= log::Level::Debug {
        format!("[{label}] {target}: {args}")
    } else {
        format!("[{label}] {args}")
    }
}

/// Logger that prints above indicatif progress lines instead of through them.
pub struct IndicatifLogger {
    inner: env_logger::Logger,
    multi: MultiProgress,
}

impl IndicatifLogger {
    pub fn new(inner: env_logger::Logger, multi: MultiProgress) -> Self {
        Self { inner, multi }
    }
}

impl log::Log for IndicatifLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        if self.inner.enabled(record.metadata()) {
            let line = format_line(record.level(), record.target(), record.args(), true);
            self.multi.suspend(|| eprintln!("{line}"));
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

fn default_filter(quiet: bool, debug: bool) -> &'static str {
    if debug {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    }
}

/// Install the global logger. `RUST_LOG` overrides the level picked from
/// `quiet`/`debug`. With `multi`, lines are printed through the progress
/// display; without it, plain uncolored lines go to stderr.
///
/// Calling this twice is harmless: the second logger is ignored.
pub fn init_logging(quiet: bool, debug: bool, multi: Option<&MultiProgress>) {
    use std::io::Write;

    let env = env_logger::Env::default().default_filter_or(default_filter(quiet, debug));

    if let Some(multi) = multi {
        let logger = env_logger::Builder::from_env(env).build();
        let max_level = logger.filter();
        if log::set_boxed_logger(Box::new(IndicatifLogger::new(logger, multi.clone()))).is_ok() {
            log::set_max_level(max_level);
        }
    } else {
        let _ = env_logger::Builder::from_env(env)
            .format(|buf, record| {
                let line = format_line(record.level(), record.target(), record.args(), false);
                writeln!(buf, "{line}")
            })
            .try_init();
    }
}
