//! DecayLab Runner: configuration, event I/O, toy generation, orchestration.
//!
//! This crate builds on `decaylab-core` to provide:
//! - TOML run configuration with validation and a content hash
//! - JSON-lines event loading and writing
//! - Deterministic toy event generation
//! - Parallel multi-event runs with histogram merging
//! - JSON and CSV export of run results

pub mod config;
pub mod data_loader;
pub mod export;
pub mod rng;
pub mod runner;
pub mod synthetic;

pub use config::{ConfigError, FieldConfig, PropagationConfig, RunConfig, RunId};
pub use data_loader::{load_events, read_events, save_events, write_events, LoadError};
pub use export::{
    cut_flow_csv, export_json, histograms_csv, import_json, write_run_dir, ExportError,
    RunSummary,
};
pub use rng::RngHierarchy;
pub use runner::{
    run_events, run_events_with_threads, run_from_files, RunError, RunResult, SCHEMA_VERSION,
};
pub use synthetic::{generate_event, generate_events, ToyConfig, TOY_MOTHER_PDG};
