//! Multi-event runner: wires configuration, search and histograms together.
//!
//! Entry points:
//! - `run_events()`: searches pre-loaded events on the global rayon pool.
//! - `run_events_with_threads()`: same loop on a dedicated pool of N threads.
//! - `run_from_files()`: loads config and events from disk, then runs. Used by the CLI.
//!
//! Each rayon worker folds its share of events into its own search and
//! histogram registry; worker results are merged at the end. Histogram
//! contents are integer counts, so the merged result does not depend on
//! the thread count or on scheduling.

use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, Utc};
use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use decaylab_core::domain::Event;
use decaylab_core::engine::{CandidateSearch, SearchStats};
use decaylab_core::sink::{HistogramError, HistogramRegistry};

use crate::config::{ConfigError, RunConfig, RunId};
use crate::data_loader::{load_events, LoadError};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("histogram merge failed: {0}")]
    Histogram(#[from] HistogramError),
    #[error("cannot build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Complete result of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub config: RunConfig,
    pub stats: SearchStats,
    pub histograms: HistogramRegistry,
}

/// One worker's running state.
struct Worker {
    search: CandidateSearch,
    histograms: HistogramRegistry,
    stats: SearchStats,
}

impl Worker {
    fn new(config: &RunConfig) -> Self {
        Self {
            search: config.build_search(),
            histograms: HistogramRegistry::new(),
            stats: SearchStats::default(),
        }
    }

    fn process(mut self, event: &Event) -> Self {
        self.stats += self.search.process_event(event, &mut self.histograms);
        self
    }
}

/// Search every event and merge the histograms.
pub fn run_events(events: &[Event], config: &RunConfig) -> Result<RunResult, RunError> {
    config.validate()?;
    let run_id = config.run_id()?;
    let started_at = Utc::now();
    let clock = Instant::now();
    info!(
        "run {}: searching {} events ({} threads)",
        &run_id[..12],
        events.len(),
        rayon::current_num_threads()
    );

    let (histograms, stats) = events
        .par_iter()
        .fold(|| Worker::new(config), Worker::process)
        .map(|w| Ok::<_, HistogramError>((w.histograms, w.stats)))
        .try_reduce(
            || (HistogramRegistry::new(), SearchStats::default()),
            |(mut hists, mut stats), (other_hists, other_stats)| {
                hists.merge(&other_hists)?;
                stats += other_stats;
                Ok((hists, stats))
            },
        )?;

    let elapsed_ms = u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX);
    info!(
        "run {}: {} events ({} rejected), {} triplets, {} candidates, {} signal, {} passing in {} ms",
        &run_id[..12],
        stats.events,
        stats.events_rejected,
        stats.triplets,
        stats.candidates,
        stats.signal,
        stats.passing,
        elapsed_ms
    );

    Ok(RunResult {
        schema_version: SCHEMA_VERSION,
        run_id,
        started_at,
        elapsed_ms,
        config: config.clone(),
        stats,
        histograms,
    })
}

/// [`run_events`] on a dedicated pool of `threads` workers.
pub fn run_events_with_threads(
    events: &[Event],
    config: &RunConfig,
    threads: usize,
) -> Result<RunResult, RunError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()?;
    pool.install(|| run_events(events, config))
}

/// Load a TOML config and a JSON-lines event file, then run.
pub fn run_from_files(
    config_path: &Path,
    events_path: &Path,
    threads: Option<usize>,
) -> Result<RunResult, RunError> {
    let config = RunConfig::load(config_path)?;
    let events = load_events(events_path)?;
    match threads {
        Some(n) => run_events_with_threads(&events, &config, n),
        None => run_events(&events, &config),
    }
}
