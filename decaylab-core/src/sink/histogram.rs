//! Fixed-binning one-dimensional histogram with additive merge.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from histogram arithmetic and from loading stored histograms.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HistogramError {
    #[error("cannot merge histograms with different axes: {left} vs {right}")]
    AxisMismatch { left: String, right: String },
    #[error("invalid axis {0}")]
    InvalidAxis(String),
    #[error("{what} holds {found} entries, expected {expected}")]
    Shape {
        what: &'static str,
        expected: usize,
        found: usize,
    },
}

/// Uniform binning over `[min, max)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub bins: usize,
    pub min: f64,
    pub max: f64,
    pub title: String,
}

impl Axis {
    pub fn new(bins: usize, min: f64, max: f64, title: impl Into<String>) -> Self {
        assert!(bins >= 1, "bins must be >= 1");
        assert!(max > min, "max must be > min");
        Self {
            bins,
            min,
            max,
            title: title.into(),
        }
    }

    pub fn width(&self) -> f64 {
        (self.max - self.min) / self.bins as f64
    }

    /// Centre of bin `i`.
    pub fn centre(&self, i: usize) -> f64 {
        self.min + (i as f64 + 0.5) * self.width()
    }

    /// Bin holding `x`, or where it fell outside the range.
    pub fn locate(&self, x: f64) -> Bin {
        if x < self.min {
            Bin::Underflow
        } else if x >= self.max {
            Bin::Overflow
        } else {
            let i = ((x - self.min) / self.width()) as usize;
            Bin::In(i.min(self.bins - 1))
        }
    }

    /// At least one bin over a finite, non-empty range.
    pub fn is_valid(&self) -> bool {
        self.bins >= 1 && self.min.is_finite() && self.max.is_finite() && self.max > self.min
    }

    pub(crate) fn same_binning(&self, other: &Axis) -> bool {
        self.bins == other.bins && self.min == other.min && self.max == other.max
    }

    pub(crate) fn describe(&self) -> String {
        format!("{} [{}; {}, {})", self.title, self.bins, self.min, self.max)
    }
}

/// Where a value landed on an [`Axis`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bin {
    Underflow,
    In(usize),
    Overflow,
}

/// Weighted counts over an [`Axis`] with under/overflow.
///
/// NaN values are not booked. Deserialization checks that the axis is
/// valid and that there is one count per bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredHistogram")]
pub struct Histogram1D {
    axis: Axis,
    counts: Vec<f64>,
    underflow: f64,
    overflow: f64,
    entries: u64,
}

#[derive(Deserialize)]
struct StoredHistogram {
    axis: Axis,
    counts: Vec<f64>,
    underflow: f64,
    overflow: f64,
    entries: u64,
}

impl TryFrom<StoredHistogram> for Histogram1D {
    type Error = HistogramError;

    fn try_from(stored: StoredHistogram) -> Result<Self, Self::Error> {
        if !stored.axis.is_valid() {
            return Err(HistogramError::InvalidAxis(stored.axis.describe()));
        }
        if stored.counts.len() != stored.axis.bins {
            return Err(HistogramError::Shape {
                what: "histogram counts",
                expected: stored.axis.bins,
                found: stored.counts.len(),
            });
        }
        Ok(Self {
            axis: stored.axis,
            counts: stored.counts,
            underflow: stored.underflow,
            overflow: stored.overflow,
            entries: stored.entries,
        })
    }
}

impl Histogram1D {
    pub fn new(axis: Axis) -> Self {
        Self {
            counts: vec![0.0; axis.bins],
            axis,
            underflow: 0.0,
            overflow: 0.0,
            entries: 0,
        }
    }

    pub fn fill(&mut self, x: f64) {
        self.fill_weighted(x, 1.0);
    }

    pub fn fill_weighted(&mut self, x: f64, weight: f64) {
        if x.is_nan() {
            return;
        }
        match self.axis.locate(x) {
            Bin::Underflow => self.underflow += weight,
            Bin::Overflow => self.overflow += weight,
            Bin::In(i) => self.counts[i] += weight,
        }
        self.entries += 1;
    }

    /// Add another histogram's contents. Axes must have identical binning.
    pub fn merge(&mut self, other: &Histogram1D) -> Result<(), HistogramError> {
        if !self.axis.same_binning(&other.axis) {
            return Err(HistogramError::AxisMismatch {
                left: self.axis.describe(),
                right: other.axis.describe(),
            });
        }
        for (a, b) in self.counts.iter_mut().zip(&other.counts) {
            *a += b;
        }
        self.underflow += other.underflow;
        self.overflow += other.overflow;
        self.entries += other.entries;
        Ok(())
    }

    pub fn axis(&self) -> &Axis {
        &self.axis
    }

    pub fn counts(&self) -> &[f64] {
        &self.counts
    }

    pub fn bin_content(&self, i: usize) -> f64 {
        self.counts.get(i).copied().unwrap_or(0.0)
    }

    pub fn underflow(&self) -> f64 {
        self.underflow
    }

    pub fn overflow(&self) -> f64 {
        self.overflow
    }

    /// Number of fills, including under/overflow.
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Sum of in-range bin contents.
    pub fn integral(&self) -> f64 {
        self.counts.iter().sum()
    }

    /// Mean of the in-range contents at bin centres. `None` when empty.
    pub fn mean(&self) -> Option<f64> {
        let total = self.integral();
        if total == 0.0 {
            return None;
        }
        let weighted: f64 = self
            .counts
            .iter()
            .enumerate()
            .map(|(i, c)| c * self.axis.centre(i))
            .sum();
        Some(weighted / total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn hist() -> Histogram1D {
        Histogram1D::new(Axis::new(10, 0.0, 1.0, "x"))
    }

    #[test]
    fn fills_land_in_expected_bins() {
        let mut h = hist();
        h.fill(0.05);
        h.fill(0.95);
        h.fill(0.5);
        assert_eq!(h.bin_content(0), 1.0);
        assert_eq!(h.bin_content(5), 1.0);
        assert_eq!(h.bin_content(9), 1.0);
        assert_eq!(h.entries(), 3);
    }

    #[test]
    fn out_of_range_goes_to_flow_bins() {
        let mut h = hist();
        h.fill(-0.1);
        h.fill(1.0);
        h.fill(7.0);
        assert_eq!(h.underflow(), 1.0);
        assert_eq!(h.overflow(), 2.0);
        assert_eq!(h.integral(), 0.0);
        assert_eq!(h.entries(), 3);
    }

    #[test]
    fn nan_is_ignored() {
        let mut h = hist();
        h.fill(f64::NAN);
        assert_eq!(h.entries(), 0);
    }

    #[test]
    fn merge_adds_contents() {
        let mut a = hist();
        let mut b = hist();
        a.fill(0.1);
        b.fill(0.1);
        b.fill(2.0);
        a.merge(&b).unwrap();
        assert_eq!(a.bin_content(1), 2.0);
        assert_eq!(a.overflow(), 1.0);
        assert_eq!(a.entries(), 3);
    }

    #[test]
    fn merge_rejects_different_binning() {
        let mut a = hist();
        let b = Histogram1D::new(Axis::new(20, 0.0, 1.0, "x"));
        assert!(matches!(a.merge(&b), Err(HistogramError::AxisMismatch { .. })));
    }

    #[test]
    fn stored_histogram_is_shape_checked() {
        let mut h = hist();
        h.fill(0.3);
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(serde_json::from_str::<Histogram1D>(&json).unwrap(), h);

        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["counts"].as_array_mut().unwrap().truncate(4);
        let err = serde_json::from_value::<Histogram1D>(value).unwrap_err();
        assert!(err.to_string().contains("expected 10"), "{err}");

        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["axis"]["bins"] = 0.into();
        assert!(serde_json::from_value::<Histogram1D>(value).is_err());
    }

    #[test]
    fn mean_uses_bin_centres() {
        let mut h = hist();
        h.fill(0.12);
        h.fill(0.33);
        assert_relative_eq!(h.mean().unwrap(), 0.25, epsilon = 1e-12);
        assert_eq!(hist().mean(), None);
    }
}
