//! Reporting and export - JSON summary and CSV histogram tables.
//!
//! A run directory holds:
//! - `summary.json`: run id, timing, config, search stats and cut flow
//! - `events.csv`: event-level histograms
//! - one CSV per candidate bucket (`signocut.csv`, `bkgcut.csv`, `sig.csv`, ...)
//! - `cut_flow.csv`: per-clause rejection counts by category
//!
//! The full [`RunResult`] (every histogram) round-trips through
//! [`export_json`] / [`import_json`]. Unknown schema versions are rejected on load.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use decaylab_core::components::CutVerdict;
use decaylab_core::engine::SearchStats;
use decaylab_core::sink::registry::CutFlow;
use decaylab_core::sink::{Category, Histogram1D, HistogramRegistry};

use crate::config::{RunConfig, RunId};
use crate::runner::{RunResult, SCHEMA_VERSION};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("cannot write {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV buffer flush failed: {0}")]
    CsvFlush(String),
    #[error("unsupported schema version {found} (max supported: {max})")]
    SchemaVersion { found: u32, max: u32 },
}

/// Everything of a run except the histogram contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub schema_version: u32,
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub config: RunConfig,
    pub stats: SearchStats,
    pub pass_rate: f64,
    pub cut_flow: CutFlow,
    /// Candidate count per bucket name.
    pub buckets: Vec<(String, u64)>,
}

impl RunSummary {
    pub fn from_result(result: &RunResult) -> Self {
        Self {
            schema_version: result.schema_version,
            run_id: result.run_id.clone(),
            started_at: result.started_at,
            elapsed_ms: result.elapsed_ms,
            config: result.config.clone(),
            stats: result.stats,
            pass_rate: result.stats.pass_rate(),
            cut_flow: result.histograms.cut_flow.clone(),
            buckets: result
                .histograms
                .buckets()
                .map(|(name, h)| (name, h.candidates()))
                .collect(),
        }
    }
}

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a full `RunResult` to pretty JSON.
pub fn export_json(result: &RunResult) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(result)?)
}

/// Deserialize a `RunResult`, rejecting unknown schema versions and
/// histograms whose shape does not match the registry layout.
pub fn import_json(json: &str) -> Result<RunResult, ExportError> {
    let result: RunResult = serde_json::from_str(json)?;
    if result.schema_version > SCHEMA_VERSION {
        return Err(ExportError::SchemaVersion {
            found: result.schema_version,
            max: SCHEMA_VERSION,
        });
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Long-format table of named histograms.
///
/// Columns: histogram, bin, low, high, content. Underflow and overflow
/// rows use `underflow` / `overflow` as the bin label and leave the open
/// edge empty.
pub fn histograms_csv<'a, S: AsRef<str>>(
    hists: impl IntoIterator<Item = (S, &'a Histogram1D)>,
) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["histogram", "bin", "low", "high", "content"])?;

    for (name, h) in hists {
        let name = name.as_ref();
        let axis = h.axis();
        wtr.write_record([
            name.to_string(),
            "underflow".to_string(),
            String::new(),
            axis.min.to_string(),
            h.underflow().to_string(),
        ])?;
        for (i, content) in h.counts().iter().enumerate() {
            let low = axis.min + i as f64 * axis.width();
            wtr.write_record([
                name.to_string(),
                i.to_string(),
                low.to_string(),
                (low + axis.width()).to_string(),
                content.to_string(),
            ])?;
        }
        wtr.write_record([
            name.to_string(),
            "overflow".to_string(),
            axis.max.to_string(),
            String::new(),
            h.overflow().to_string(),
        ])?;
    }

    into_string(wtr)
}

/// Clause-level cut flow, one row per category.
pub fn cut_flow_csv(flow: &CutFlow) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    let mut header = vec!["category", "total", "passing"];
    header.extend(CutVerdict::CLAUSES);
    wtr.write_record(&header)?;

    for category in Category::ALL {
        let c = category as usize;
        let mut row = vec![
            format!("{category:?}").to_lowercase(),
            flow.total[c].to_string(),
            flow.passing[c].to_string(),
        ];
        row.extend(flow.rejected[c].iter().map(u64::to_string));
        wtr.write_record(&row)?;
    }

    into_string(wtr)
}

fn into_string(wtr: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let bytes = wtr
        .into_inner()
        .map_err(|e| ExportError::CsvFlush(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::CsvFlush(e.to_string()))
}

// ─── Run directory ──────────────────────────────────────────────────

/// Write the summary and every CSV table into `dir`, creating it.
///
/// Returns the written paths in write order.
pub fn write_run_dir(result: &RunResult, dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
    fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.display().to_string(),
        source,
    })?;

    let registry: &HistogramRegistry = &result.histograms;
    let mut files = vec![
        (
            "summary.json".to_string(),
            serde_json::to_string_pretty(&RunSummary::from_result(result))?,
        ),
        ("events.csv".to_string(), histograms_csv(registry.event.named())?),
    ];
    for (name, bucket) in registry.buckets() {
        let table = histograms_csv(bucket.named())?;
        files.push((format!("{name}.csv"), table));
    }
    files.push(("cut_flow.csv".to_string(), cut_flow_csv(&registry.cut_flow)?));

    let mut written = Vec::with_capacity(files.len());
    for (name, content) in files {
        let path = dir.join(name);
        fs::write(&path, content).map_err(|source| ExportError::Io {
            path: path.display().to_string(),
            source,
        })?;
        written.push(path);
    }
    info!("wrote {} files to {}", written.len(), dir.display());
    Ok(written)
}
