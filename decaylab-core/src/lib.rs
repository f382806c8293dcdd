//! DecayLab Core: three-body decay-vertex candidate search.
//!
//! This crate contains the reconstruction core, with no I/O:
//! - Domain types (tracks with helix parameters and covariance, truth particles, events)
//! - Track propagation to the distance of closest approach
//! - Three-prong vertex fitting behind an engine trait
//! - Four-momentum combination, truth classification and selection cuts
//! - The combinatorial candidate search and its histogram sink

pub mod components;
pub mod constants;
pub mod domain;
pub mod engine;
pub mod float_serde;
pub mod sink;
