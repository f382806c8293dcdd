//! Vertex fit adapter: wraps a three-prong fitting engine.
//!
//! The adapter screens the inputs for degenerate uncertainties before the
//! engine sees them and turns the engine's status-code contract into a
//! `Result`. Selection on fit quality is left to the cut evaluator.

pub mod dca_fitter;

use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::TrackParCov;

pub use dca_fitter::{DcaFitter, FitterConfig};

/// Contract of a numerical three-prong vertex-fitting engine.
pub trait VertexFitEngine: Send {
    /// Attempt a fit. Returns the number of vertex candidates found (0 on failure).
    fn process(&mut self, tracks: &[TrackParCov; 3]) -> usize;

    /// Position of the best candidate of the last successful `process` call.
    fn pca_candidate(&self) -> Point3<f64>;

    /// Chi-square of track `track` at the best candidate.
    fn chi2_at_pca_candidate(&self, track: usize) -> f64;
}

/// Why a triplet produced no vertex.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error("track in slot {slot} has a degenerate position covariance")]
    DegenerateCovariance { slot: usize },
    #[error("vertex fit did not converge")]
    NoConvergence,
}

/// A fitted secondary vertex.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub vertex: Point3<f64>,
    /// Per-track chi-square at the vertex.
    pub chi2: [f64; 3],
}

impl FitResult {
    /// Square root of a track's chi-square, its distance to the vertex in abs-DCA mode.
    pub fn decay_dca(&self, track: usize) -> f64 {
        self.chi2[track].sqrt()
    }
}

/// Wraps a [`VertexFitEngine`] with input screening.
#[derive(Debug, Clone)]
pub struct VertexFitAdapter<E: VertexFitEngine = DcaFitter> {
    engine: E,
}

impl VertexFitAdapter<DcaFitter> {
    /// Adapter around the built-in [`DcaFitter`].
    pub fn new(config: FitterConfig, bz_kg: f64) -> Self {
        Self::with_engine(DcaFitter::new(config, bz_kg))
    }
}

impl<E: VertexFitEngine> VertexFitAdapter<E> {
    pub fn with_engine(engine: E) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Fit a common vertex to three tracks.
    ///
    /// Degenerate covariances are rejected before the engine is invoked.
    pub fn fit(&mut self, tracks: [&TrackParCov; 3]) -> Result<FitResult, FitError> {
        if let Some(slot) = tracks.iter().position(|t| t.cov.is_degenerate()) {
            return Err(FitError::DegenerateCovariance { slot });
        }

        let input = [*tracks[0], *tracks[1], *tracks[2]];
        if self.engine.process(&input) == 0 {
            return Err(FitError::NoConvergence);
        }

        Ok(FitResult {
            vertex: self.engine.pca_candidate(),
            chi2: [
                self.engine.chi2_at_pca_candidate(0),
                self.engine.chi2_at_pca_candidate(1),
                self.engine.chi2_at_pca_candidate(2),
            ],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TrackCovariance, TrackParam};
    use nalgebra::Vector3;

    /// Engine that records calls and returns a fixed answer.
    struct ScriptedEngine {
        calls: usize,
        status: usize,
    }

    impl VertexFitEngine for ScriptedEngine {
        fn process(&mut self, _tracks: &[TrackParCov; 3]) -> usize {
            self.calls += 1;
            self.status
        }

        fn pca_candidate(&self) -> Point3<f64> {
            Point3::new(0.01, 0.02, 0.03)
        }

        fn chi2_at_pca_candidate(&self, track: usize) -> f64 {
            (track as f64 + 1.0) * 4.0
        }
    }

    fn healthy(momentum: Vector3<f64>) -> TrackParCov {
        TrackParCov {
            param: TrackParam::from_momentum(Point3::origin(), momentum, 1),
            cov: TrackCovariance::from_diagonal([1e-6, 1e-6, 1e-4, 1e-4, 1e-4]),
        }
    }

    #[test]
    fn degenerate_input_never_reaches_engine() {
        let mut adapter = VertexFitAdapter::with_engine(ScriptedEngine { calls: 0, status: 1 });
        let a = healthy(Vector3::new(1.0, 0.0, 0.0));
        let mut b = healthy(Vector3::new(0.0, 1.0, 0.0));
        b.cov = TrackCovariance::from_diagonal([0.0, 1e-6, 1.0, 1.0, 1.0]);
        let c = healthy(Vector3::new(0.0, 0.0, 1.0));

        let err = adapter.fit([&a, &b, &c]).unwrap_err();
        assert_eq!(err, FitError::DegenerateCovariance { slot: 1 });
        assert_eq!(adapter.engine().calls, 0);
    }

    #[test]
    fn engine_failure_maps_to_no_convergence() {
        let mut adapter = VertexFitAdapter::with_engine(ScriptedEngine { calls: 0, status: 0 });
        let t = healthy(Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(adapter.fit([&t, &t, &t]).unwrap_err(), FitError::NoConvergence);
        assert_eq!(adapter.engine().calls, 1);
    }

    #[test]
    fn success_exposes_vertex_and_chi2() {
        let mut adapter = VertexFitAdapter::with_engine(ScriptedEngine { calls: 0, status: 1 });
        let t = healthy(Vector3::new(1.0, 0.0, 0.0));
        let fit = adapter.fit([&t, &t, &t]).unwrap();
        assert_eq!(fit.vertex, Point3::new(0.01, 0.02, 0.03));
        assert_eq!(fit.chi2, [4.0, 8.0, 12.0]);
        assert_eq!(fit.decay_dca(0), 2.0);
        assert_eq!(fit.decay_dca(2), 12.0_f64.sqrt());
    }

    #[test]
    fn built_in_engine_fits_common_origin() {
        let mut adapter = VertexFitAdapter::new(FitterConfig::default(), 5.0);
        let a = healthy(Vector3::new(1.0, 0.2, 0.1));
        let b = healthy(Vector3::new(-0.3, 1.0, 0.0));
        let c = healthy(Vector3::new(0.2, -0.7, 0.5));
        let fit = adapter.fit([&a, &b, &c]).unwrap();
        assert!(fit.vertex.coords.norm() < 1e-6);
    }
}
