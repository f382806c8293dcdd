//! Serializable run configuration.
//!
//! Loaded once from TOML and immutable afterwards. Every section has
//! defaults matching the reference analysis, so an empty file is valid.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use decaylab_core::components::{CutThresholds, FitterConfig};
use decaylab_core::engine::{CandidateSearch, DecayChannel, EventSelection, SearchConfig};

/// Unique identifier for a run (content-addressable hash of its configuration).
pub type RunId = String;

/// Errors from loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Magnetic field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// Solenoid field along z, in tesla.
    pub bz_tesla: f64,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self { bz_tesla: 0.5 }
    }
}

/// Track propagation to the reference vertex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationConfig {
    /// Maximum path length in cm.
    #[serde(with = "decaylab_core::float_serde")]
    pub max_step: f64,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self { max_step: 100.0 }
    }
}

/// Complete configuration of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub field: FieldConfig,
    pub propagation: PropagationConfig,
    pub fitter: FitterConfig,
    pub cuts: CutThresholds,
    pub channel: DecayChannel,
    pub event: EventSelection,
}

impl RunConfig {
    /// Load a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the search cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &'static str, reason: String| Err(ConfigError::Invalid { field, reason });

        if !self.field.bz_tesla.is_finite() {
            return invalid("field.bz_tesla", format!("{} is not finite", self.field.bz_tesla));
        }
        let step = self.propagation.max_step;
        if step.is_nan() || step <= 0.0 {
            return invalid("propagation.max_step", format!("{step} must be > 0"));
        }

        let f = &self.fitter;
        if f.max_r.is_nan() || f.max_r <= 0.0 {
            return invalid("fitter.max_r", format!("{} must be > 0", f.max_r));
        }
        if f.max_iterations == 0 {
            return invalid("fitter.max_iterations", "must be >= 1".into());
        }

        let c = &self.cuts;
        let all = [
            c.min_dca,
            c.max_dca,
            c.min_dca_second,
            c.min_second_pt,
            c.min_third_pt,
            c.min_mom_pt,
            c.min_radius,
            c.max_radius,
            c.min_cpa,
        ];
        if all.iter().any(|v| v.is_nan()) {
            return invalid("cuts", "thresholds must not be NaN".into());
        }
        if c.min_dca > c.max_dca {
            return invalid(
                "cuts.min_dca",
                format!("window [{}, {}] is inverted", c.min_dca, c.max_dca),
            );
        }
        if c.min_radius > c.max_radius {
            return invalid(
                "cuts.min_radius",
                format!("window [{}, {}] is inverted", c.min_radius, c.max_radius),
            );
        }

        if let Some(m) = self.channel.masses.iter().find(|m| !m.is_finite() || **m <= 0.0) {
            return invalid("channel.masses", format!("{m} must be finite and > 0"));
        }
        Ok(())
    }

    /// Deterministic hash of the configuration.
    ///
    /// Hashes the TOML form, which keeps the sign of infinite thresholds.
    /// Two runs with identical configs share a RunId.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let text = self.to_toml()?;
        Ok(blake3::hash(text.as_bytes()).to_hex().to_string())
    }

    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            bz_tesla: self.field.bz_tesla,
            max_step: self.propagation.max_step,
            channel: self.channel.clone(),
            selection: self.event.clone(),
        }
    }

    /// A fresh search wired from this configuration.
    pub fn build_search(&self) -> CandidateSearch {
        CandidateSearch::new(self.search_config(), self.fitter.clone(), self.cuts.clone())
    }
}
