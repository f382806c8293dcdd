//! Domain types for DecayLab

pub mod event;
pub mod ids;
pub mod track;
pub mod truth;

pub use event::{Event, EventVertex};
pub use ids::{ParticleId, TrackId};
pub use track::{Track, TrackCovariance, TrackParCov, TrackParam};
pub use truth::TruthParticle;
