use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a track within its event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackId(pub usize);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trk#{}", self.0)
    }
}

/// Index of a truth particle within its event's truth collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticleId(pub usize);

impl fmt::Display for ParticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mc#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display() {
        assert_eq!(TrackId(7).to_string(), "trk#7");
        assert_eq!(ParticleId(3).to_string(), "mc#3");
    }

    #[test]
    fn ids_compare_by_value() {
        assert_eq!(TrackId(1), TrackId(1));
        assert_ne!(ParticleId(1), ParticleId(2));
    }
}
