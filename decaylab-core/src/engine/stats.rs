//! Search diagnostics: counts of what happened to tracks and triplets.

use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// Per-event (or summed) counters. Never booked into the sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    pub events: u64,
    /// Events below the vertex-contributor threshold.
    pub events_rejected: u64,
    /// Tracks of each channel species.
    pub species: [u64; 3],
    /// Triplets of pairwise distinct tracks that were considered.
    pub triplets: u64,
    /// Tracks whose propagation to the reference vertex failed.
    pub propagation_failures: u64,
    pub degenerate_covariance: u64,
    pub fit_failures: u64,
    pub candidates: u64,
    pub signal: u64,
    pub passing: u64,
}

impl SearchStats {
    /// Fraction of candidates that passed every cut.
    pub fn pass_rate(&self) -> f64 {
        if self.candidates == 0 {
            0.0
        } else {
            self.passing as f64 / self.candidates as f64
        }
    }
}

impl AddAssign for SearchStats {
    fn add_assign(&mut self, rhs: SearchStats) {
        self.events += rhs.events;
        self.events_rejected += rhs.events_rejected;
        for (a, b) in self.species.iter_mut().zip(rhs.species) {
            *a += b;
        }
        self.triplets += rhs.triplets;
        self.propagation_failures += rhs.propagation_failures;
        self.degenerate_covariance += rhs.degenerate_covariance;
        self.fit_failures += rhs.fit_failures;
        self.candidates += rhs.candidates;
        self.signal += rhs.signal;
        self.passing += rhs.passing;
    }
}

impl std::iter::Sum for SearchStats {
    fn sum<I: Iterator<Item = SearchStats>>(iter: I) -> Self {
        iter.fold(SearchStats::default(), |mut acc, s| {
            acc += s;
            acc
        })
    }
}
