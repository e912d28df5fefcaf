// Polling driver
//
// One cycle is fetch -> flatten -> append. Cycle failures are logged and the
// loop carries on after the configured interval; only the shutdown future
// ends the loop. Loop state lives in PollState and is returned to the caller.

use crate::source::{CommandSource, SourceError, StatusSource};
use anyhow::Context;
use std::future::Future;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info};
use ts_status_stats_config::Config;
use ts_status_stats_core::Flattener;
use ts_status_stats_writer::{PartitionedStore, StoreError};

/// Errors from a single collection cycle
#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CycleError {
    /// Short failure category for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            CycleError::Source(e) if e.is_unavailable() => "source_unavailable",
            CycleError::Source(_) => "source_malformed",
            CycleError::Store(_) => "storage",
        }
    }
}

/// Source, flattener and store wired together.
#[derive(Debug)]
pub struct Collector<S> {
    source: S,
    flattener: Flattener,
    store: PartitionedStore,
}

impl Collector<CommandSource> {
    /// Build the production collector from validated configuration.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let source = CommandSource::from_argv(&config.source.command)
            .context("source.command must name a program to run")?;
        Ok(Self::new(
            source,
            Flattener::new(config.separator),
            PartitionedStore::new(&config.base_location, config.file_name_format.clone()),
        ))
    }
}

impl<S: StatusSource> Collector<S> {
    pub fn new(source: S, flattener: Flattener, store: PartitionedStore) -> Self {
        Self {
            source,
            flattener,
            store,
        }
    }

    pub fn store(&self) -> &PartitionedStore {
        &self.store
    }

    /// Run one fetch/flatten/append cycle and return the file written.
    pub fn run_once(&self) -> Result<PathBuf, CycleError> {
        debug!("Collecting status...");
        let document = self.source.fetch()?;

        let record = self.flattener.flatten(&document);
        debug!(fields = record.len(), "Flattened status document");

        Ok(self.store.append(&record)?)
    }
}

/// Driver state carried between cycles.
#[derive(Debug, Default)]
pub struct PollState {
    pub cycles: u64,
    pub successes: u64,
    pub consecutive_failures: u64,
    pub last_error: Option<String>,
    pub last_path: Option<PathBuf>,
    pub next_wake: Option<Instant>,
}

impl PollState {
    /// Fold the outcome of one cycle into the state.
    pub fn record(&mut self, outcome: &Result<PathBuf, CycleError>) {
        self.cycles += 1;
        match outcome {
            Ok(path) => {
                self.successes += 1;
                self.consecutive_failures = 0;
                self.last_path = Some(path.clone());
            }
            Err(err) => {
                self.consecutive_failures += 1;
                self.last_error = Some(err.to_string());
            }
        }
    }
}

/// Poll until `shutdown` resolves, sleeping `interval` after every cycle.
pub async fn run<S, F>(collector: &Collector<S>, interval: Duration, shutdown: F) -> PollState
where
    S: StatusSource,
    F: Future<Output = ()>,
{
    let mut shutdown = std::pin::pin!(shutdown);
    let mut state = PollState::default();

    info!(
        interval_secs = interval.as_secs(),
        base_location = %collector.store().base_dir().display(),
        "Starting status collection"
    );

    loop {
        let outcome = collector.run_once();
        match &outcome {
            Ok(path) => info!("Status saved to {}", path.display()),
            Err(err) => error!(
                error = %err,
                kind = err.kind(),
                consecutive_failures = state.consecutive_failures + 1,
                "Error during collection"
            ),
        }
        state.record(&outcome);

        let wake = tokio::time::Instant::now() + interval;
        state.next_wake = Some(wake.into_std());

        tokio::select! {
            _ = tokio::time::sleep_until(wake) => {}
            _ = &mut shutdown => {
                info!(cycles = state.cycles, "Shutting down...");
                break;
            }
        }
    }

    state
}
