//! Histogram sink: where per-event and per-candidate observables are booked.
//!
//! Candidates are bucketed along two axes:
//! - category: signal or background (from truth lineage)
//! - cut state: `NoCut` (every candidate), `Cut` (rejected) or `Passing` (selected)
//!
//! The engine books each surviving candidate twice: once under `NoCut`, once
//! under either `Cut` or `Passing`. The sink only sees the routing decision.

pub mod histogram;
pub mod registry;

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::engine::Candidate;

pub use histogram::{Axis, Bin, Histogram1D, HistogramError};
pub use registry::{CandidateHistograms, EventHistograms, HistogramRegistry, Observable};

/// Truth category of a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Signal,
    Background,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Signal, Category::Background];

    pub fn from_signal(is_signal: bool) -> Self {
        if is_signal {
            Category::Signal
        } else {
            Category::Background
        }
    }

    pub fn prefix(self) -> &'static str {
        match self {
            Category::Signal => "sig",
            Category::Background => "bkg",
        }
    }
}

/// Selection state a candidate is booked under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CutState {
    /// Every candidate, regardless of selection.
    NoCut,
    /// Rejected by at least one clause.
    Cut,
    /// Accepted by every clause.
    Passing,
}

impl CutState {
    pub const ALL: [CutState; 3] = [CutState::NoCut, CutState::Cut, CutState::Passing];

    /// The selection-dependent state for a verdict.
    pub fn from_cut(is_cut: bool) -> Self {
        if is_cut {
            CutState::Cut
        } else {
            CutState::Passing
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            CutState::NoCut => "nocut",
            CutState::Cut => "cut",
            CutState::Passing => "",
        }
    }
}

/// Bucket label, e.g. `signocut`, `bkgcut`, `sig`.
pub fn bucket_name(category: Category, state: CutState) -> String {
    format!("{}{}", category.prefix(), state.suffix())
}

/// Per-event quantities booked once per accepted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventObservables {
    /// Reconstructed primary vertex.
    pub vertex: Point3<f64>,
    /// Simulated primary vertex, when available.
    pub truth_vertex: Option<Point3<f64>>,
    /// Number of tracks of each channel species, in channel order.
    pub species_counts: [usize; 3],
    /// Total number of tracks in the event.
    pub multiplicity: usize,
}

/// Receiver of everything the candidate search books.
///
/// Implementations must be cheap to call per candidate; the search invokes
/// `fill_candidate` twice for each candidate it builds.
pub trait CandidateSink {
    fn fill_event(&mut self, event: &EventObservables);

    fn fill_candidate(&mut self, category: Category, state: CutState, candidate: &Candidate);

    /// Number of candidates built from one outer-loop track.
    fn fill_candidates_per_outer(&mut self, count: usize);
}

/// Sink that drops everything. Useful when only [`SearchStats`](crate::engine::SearchStats) matter.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl CandidateSink for NullSink {
    fn fill_event(&mut self, _event: &EventObservables) {}

    fn fill_candidate(&mut self, _category: Category, _state: CutState, _candidate: &Candidate) {}

    fn fill_candidates_per_outer(&mut self, _count: usize) {}
}
