//! Progress reporting for TTY and non-TTY environments.
//!
//! TTY: one spinner line per dataset showing the current stage.
//! Non-TTY: nothing here; the log lines from [`LogObserver`] are the progress.
//!
//! [`LogObserver`]: crate::observer::LogObserver

use std::io::IsTerminal;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use rustc_hash::FxHashMap;

use crate::error::EtlError;
use crate::observer::StageObserver;
use crate::runner::RunState;

/// Width of the dataset name column
const PREFIX_WIDTH: usize = 20;

fn dataset_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {prefix:<20.cyan.bold} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// First `PREFIX_WIDTH` characters of a dataset name.
fn truncate_name(name: &str) -> &str {
    name.char_indices()
        .nth(PREFIX_WIDTH)
        .map_or(name, |(i, _)| &name[..i])
}

/// Owns the multi-line progress display.
pub struct ProgressContext {
    multi: MultiProgress,
    is_tty: bool,
}

impl ProgressContext {
    /// Create a context, detecting whether stderr is a terminal.
    pub fn new() -> Self {
        Self::with_tty(std::io::stderr().is_terminal())
    }

    pub fn with_tty(is_tty: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            is_tty,
        }
    }

    /// Spinner line for one dataset. Hidden when not on a TTY.
    pub fn dataset_line(&self, name: &str) -> ProgressBar {
        if !self.is_tty {
            return ProgressBar::hidden();
        }
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(dataset_style());
        pb.set_prefix(truncate_name(name).to_string());
        pb.set_message("waiting");
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }

    /// Print a line above managed progress lines.
    pub fn println(&self, msg: impl AsRef<str>) {
        if self.is_tty {
            let _ = self.multi.println(msg);
        } else {
            eprintln!("{}", msg.as_ref());
        }
    }

    pub fn is_tty(&self) -> bool {
        self.is_tty
    }

    /// `MultiProgress` for the log bridge.
    pub fn multi(&self) -> &MultiProgress {
        &self.multi
    }
}

impl Default for ProgressContext {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedProgress = Arc<ProgressContext>;

/// Stage observer that drives one spinner line per dataset.
pub struct ProgressObserver {
    progress: SharedProgress,
    lines: Mutex<FxHashMap<String, ProgressBar>>,
}

impl ProgressObserver {
    pub fn new(progress: SharedProgress) -> Self {
        Self {
            progress,
            lines: Mutex::new(FxHashMap::default()),
        }
    }

    /// Create the line for `dataset` up front so queued datasets show as waiting.
    pub fn register(&self, dataset: &str) {
        self.with_line(dataset, |_| {});
    }

    fn with_line(&self, dataset: &str, f: impl FnOnce(&ProgressBar)) {
        let Ok(mut lines) = self.lines.lock() else {
            return;
        };
        let pb = lines
            .entry(dataset.to_string())
            .or_insert_with(|| self.progress.dataset_line(dataset));
        f(pb);
    }

    /// Stop the spinner for `dataset` with a final message.
    pub fn finish(&self, dataset: &str, message: impl Into<String>) {
        let message = message.into();
        self.with_line(dataset, |pb| pb.finish_with_message(message));
    }
}

impl StageObserver for ProgressObserver {
    fn on_enter(&self, dataset: &str, stage: RunState) {
        self.with_line(dataset, |pb| pb.set_message(format!("{stage}...")));
    }

    fn on_failure(&self, dataset: &str, stage: RunState, _elapsed: Duration, error: &EtlError) {
        let message = format!("{stage} failed: {}", error.kind());
        self.with_line(dataset, |pb| pb.abandon_with_message(message));
    }
}

/// Format number with thousand separators.
pub fn fmt_num(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}
