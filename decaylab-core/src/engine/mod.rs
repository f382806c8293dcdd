//! Candidate search engine: the per-event combinatorial loop and its outputs.
//!
//! - [`CandidateSearch`] walks outer × middle × inner tracks of one event
//! - [`Candidate`] is a fully scored triplet handed to the sink
//! - [`SearchStats`] counts what was pruned and why

pub mod candidate;
pub mod search;
pub mod stats;

pub use candidate::{Candidate, DcaProducts};
pub use search::{
    pointing_cosine, route, CandidateSearch, DecayChannel, EventSelection, SearchConfig,
};
pub use stats::SearchStats;
