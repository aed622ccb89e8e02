//! Graceful shutdown via a process-wide atomic flag.
//!
//! The first SIGINT/SIGTERM sets the flag; runners check it between stages
//! and stop with `EtlError::Cancelled`. A second signal exits immediately.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

use signal_hook::consts::{SIGINT, SIGTERM};

/// Global shutdown flag
pub fn shutdown_flag() -> &'static AtomicBool {
    static FLAG: AtomicBool = AtomicBool::new(false);
    &FLAG
}

pub fn is_shutdown_requested() -> bool {
    shutdown_flag().load(Ordering::Relaxed)
}

pub fn request_shutdown() {
    shutdown_flag().store(true, Ordering::Relaxed);
}

/// Register SIGINT and SIGTERM handlers that set [`shutdown_flag`].
pub fn install_signal_handlers() -> io::Result<()> {
    for signal in [SIGINT, SIGTERM] {
        // SAFETY: AtomicBool::swap and low_level::exit (_exit) are async-signal-safe
        unsafe {
            signal_hook::low_level::register(signal, || {
                if shutdown_flag().swap(true, Ordering::Relaxed) {
                    signal_hook::low_level::exit(130);
                }
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_signal_only_sets_flag() {
        install_signal_handlers().unwrap();
        assert!(!is_shutdown_requested());
        // Delivered to this thread before raise returns
        signal_hook::low_level::raise(SIGTERM).unwrap();
        assert!(is_shutdown_requested());
        shutdown_flag().store(false, Ordering::Relaxed);
    }
}
