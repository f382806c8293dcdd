//! Candidate-building components.
//!
//! The search engine calls these in a fixed order for every triplet:
//! - Track propagator: distance of closest approach to the event vertex
//! - Candidate classifier: signal or background from truth lineage
//! - Vertex fit adapter: common secondary vertex of the three tracks
//! - Kinematic combiner: mother four-momentum under mass hypotheses
//! - Cut evaluator: selection verdict on the derived observables

pub mod classifier;
pub mod cuts;
pub mod fitter;
pub mod kinematics;
pub mod propagator;

pub use classifier::{classify, Classification, TruthStatus};
pub use cuts::{CutEvaluator, CutInput, CutThresholds, CutVerdict};
pub use fitter::{DcaFitter, FitError, FitResult, FitterConfig, VertexFitAdapter, VertexFitEngine};
pub use kinematics::{combine, FourMomentum, Hypothesis, Kinematics};
pub use propagator::{Dca, Helix, HelixPropagator, PropagationError, TrackPropagator};
