//! Pipeline runner: one linear batch pass over one dataset.
//!
//! `Idle → Extracting → Cleaning → Persisting → LoadingRaw → LoadingClean
//! → Verifying → Done`, or `Failed` on the first error. There is no retry or
//! resume; calling [`PipelineRunner::run`] again starts over from `Idle`.
//! Re-running is safe because the mirror and both tables are full replaces.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::clean::clean;
use crate::definition::{DatasetDefinition, TableIdentity};
use crate::error::EtlError;
use crate::extract::extract;
use crate::load::{load, verify_table_exists};
use crate::observer::{LogObserver, StageObserver};
use crate::persist::persist;
use crate::store::{ConnectionFactory, RelationalStore};
use crate::table::WriteOptions;

/// Where a run is (or stopped).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    Idle,
    Extracting,
    Cleaning,
    Persisting,
    LoadingRaw,
    LoadingClean,
    Verifying,
    Done,
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Extracting => "extracting",
            Self::Cleaning => "cleaning",
            Self::Persisting => "persisting",
            Self::LoadingRaw => "loading raw",
            Self::LoadingClean => "loading clean",
            Self::Verifying => "verifying",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed run: which dataset, which stage, and why.
#[derive(Debug, Error)]
#[error("{dataset}: {stage} failed: {source}")]
pub struct RunError {
    pub dataset: String,
    pub stage: RunState,
    #[source]
    pub source: EtlError,
}

/// Settings shared by every dataset run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Root of the file mirror
    pub clean_dir: PathBuf,
    pub write: WriteOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            clean_dir: PathBuf::from("data/clean"),
            write: WriteOptions::default(),
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub dataset: String,
    pub raw_rows: usize,
    pub clean_rows: usize,
    pub mirror_path: PathBuf,
    pub raw_table_exists: bool,
    pub clean_table_exists: bool,
    pub elapsed: Duration,
}

impl RunReport {
    /// Both tables were found in the catalog after loading.
    pub fn verified(&self) -> bool {
        self.raw_table_exists && self.clean_table_exists
    }
}

/// Store connection held for the duration of one run.
///
/// Released exactly once: explicitly at the end of a successful run, or
/// on drop when a stage fails.
struct Lease<'d> {
    store: Option<Box<dyn RelationalStore>>,
    dataset: &'d str,
}

impl<'d> Lease<'d> {
    fn acquire(factory: &dyn ConnectionFactory, dataset: &'d str) -> Result<Self, EtlError> {
        let store = factory.connect()?;
        log::debug!("{dataset}: store connection opened");
        Ok(Self {
            store: Some(store),
            dataset,
        })
    }

    fn store(&mut self) -> Result<&mut dyn RelationalStore, EtlError> {
        match self.store.as_mut() {
            Some(store) => Ok(store.as_mut()),
            None => Err(EtlError::store("using connection", "connection already released")),
        }
    }

    fn release(&mut self) {
        if let Some(store) = self.store.take() {
            match store.close() {
                Ok(()) => log::debug!("{}: store connection released", self.dataset),
                Err(e) => log::warn!("{}: failed to release store connection: {e}", self.dataset),
            }
        }
    }
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Runs one dataset definition end to end.
pub struct PipelineRunner<'a> {
    definition: &'a DatasetDefinition,
    options: &'a PipelineOptions,
    observer: &'a dyn StageObserver,
    cancel: Option<&'a AtomicBool>,
    state: RunState,
}

impl<'a> PipelineRunner<'a> {
    pub fn new(definition: &'a DatasetDefinition, options: &'a PipelineOptions) -> Self {
        Self {
            definition,
            options,
            observer: &LogObserver,
            cancel: None,
            state: RunState::Idle,
        }
    }

    /// Replace the default logging observer.
    pub fn with_observer(mut self, observer: &'a dyn StageObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Abort between stages once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn definition(&self) -> &'a DatasetDefinition {
        self.definition
    }

    /// Execute the full pipeline with a fresh connection from `factory`.
    pub fn run(&mut self, factory: &dyn ConnectionFactory) -> Result<RunReport, RunError> {
        let start = Instant::now();
        self.state = RunState::Idle;

        let mut report = self.run_stages(factory)?;

        report.elapsed = start.elapsed();
        self.state = RunState::Done;
        log::info!(
            "{}: done ({} raw rows, {} clean rows) in {:.1}s",
            report.dataset,
            report.raw_rows,
            report.clean_rows,
            report.elapsed.as_secs_f64()
        );
        Ok(report)
    }

    fn run_stages(&mut self, factory: &dyn ConnectionFactory) -> Result<RunReport, RunError> {
        let def = self.definition;
        let options = self.options;
        let tables = def.tables();
        let mirror_path = def.mirror_path(&options.clean_dir);

        // Connection is opened right before extraction and lives until the
        // end of this function on every path
        let (mut lease, raw) = self.stage(RunState::Extracting, || {
            let lease = Lease::acquire(factory, def.name())?;
            let raw = extract(def)?;
            Ok((lease, raw))
        })?;

        let cleaned = self.stage(RunState::Cleaning, || clean(raw.clone(), def.steps()))?;

        self.stage(RunState::Persisting, || {
            persist(&cleaned, &mirror_path, options.write)
        })?;

        self.stage(RunState::LoadingRaw, || {
            load(&raw, &tables.raw, lease.store()?, options.write)
        })?;

        self.stage(RunState::LoadingClean, || {
            load(&cleaned, &tables.clean, lease.store()?, options.write)
        })?;

        let (raw_table_exists, clean_table_exists) = self.stage(RunState::Verifying, || {
            Ok(verify_tables(&tables, lease.store()?))
        })?;

        lease.release();

        Ok(RunReport {
            dataset: def.name().to_string(),
            raw_rows: raw.num_rows(),
            clean_rows: cleaned.num_rows(),
            mirror_path,
            raw_table_exists,
            clean_table_exists,
            elapsed: Duration::ZERO,
        })
    }

    /// Run one stage with cancellation check and observer hooks.
    fn stage<T>(
        &mut self,
        stage: RunState,
        work: impl FnOnce() -> Result<T, EtlError>,
    ) -> Result<T, RunError> {
        let def = self.definition;
        if self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            log::warn!("{}: shutdown requested, not starting {stage}", def.name());
            let e = EtlError::Cancelled;
            self.observer.on_failure(def.name(), stage, Duration::ZERO, &e);
            return Err(self.fail(stage, e));
        }

        self.state = stage;
        self.observer.on_enter(def.name(), stage);
        let started = Instant::now();
        match work() {
            Ok(value) => {
                self.observer.on_exit(def.name(), stage, started.elapsed());
                Ok(value)
            }
            Err(e) => {
                self.observer
                    .on_failure(def.name(), stage, started.elapsed(), &e);
                Err(self.fail(stage, e))
            }
        }
    }

    fn fail(&mut self, stage: RunState, source: EtlError) -> RunError {
        self.state = RunState::Failed;
        RunError {
            dataset: self.definition.name().to_string(),
            stage,
            source,
        }
    }
}

/// Catalog check for both tables of a dataset.
fn verify_tables(tables: &TableIdentity, store: &dyn RelationalStore) -> (bool, bool) {
    let raw = verify_table_exists(&tables.raw, store);
    let clean = verify_table_exists(&tables.clean, store);
    if !(raw && clean) {
        log::warn!(
            "Tables missing after load: {}={raw}, {}={clean}",
            tables.raw,
            tables.clean
        );
    }
    (raw, clean)
}
