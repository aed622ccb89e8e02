//! Stage hooks: the runner reports entry, exit and failure of every stage

use std::time::Duration;

use crate::error::EtlError;
use crate::runner::RunState;

/// Observes stage boundaries of pipeline runs.
///
/// Called from whichever thread runs the pipeline, so implementations must
/// be `Sync` when datasets run in parallel.
pub trait StageObserver: Send + Sync {
    fn on_enter(&self, _dataset: &str, _stage: RunState) {}

    fn on_exit(&self, _dataset: &str, _stage: RunState, _elapsed: Duration) {}

    fn on_failure(&self, _dataset: &str, _stage: RunState, _elapsed: Duration, _error: &EtlError) {}
}

/// Default observer: logs through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl StageObserver for LogObserver {
    fn on_enter(&self, dataset: &str, stage: RunState) {
        log::info!("{dataset}: {stage}...");
    }

    fn on_exit(&self, dataset: &str, stage: RunState, elapsed: Duration) {
        log::info!(
            "{dataset}: {stage} done in {:.2}s",
            elapsed.as_secs_f64()
        );
    }

    fn on_failure(&self, dataset: &str, stage: RunState, elapsed: Duration, error: &EtlError) {
        log::error!(
            "{dataset}: {stage} failed after {:.2}s: {error}",
            elapsed.as_secs_f64()
        );
    }
}

/// Fans every hook out to several observers, in order.
pub struct FanOut<'a>(pub Vec<&'a dyn StageObserver>);

impl StageObserver for FanOut<'_> {
    fn on_enter(&self, dataset: &str, stage: RunState) {
        for o in &self.0 {
            o.on_enter(dataset, stage);
        }
    }

    fn on_exit(&self, dataset: &str, stage: RunState, elapsed: Duration) {
        for o in &self.0 {
            o.on_exit(dataset, stage, elapsed);
        }
    }

    fn on_failure(&self, dataset: &str, stage: RunState, elapsed: Duration, error: &EtlError) {
        for o in &self.0 {
            o.on_failure(dataset, stage, elapsed, error);
        }
    }
}
