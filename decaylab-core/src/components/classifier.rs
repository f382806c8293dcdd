//! Candidate classifier: signal or combinatorial background from truth lineage.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::domain::{Event, ParticleId, Track};

/// How much truth information was available for a triplet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TruthStatus {
    /// All three tracks resolved to a mother particle.
    Resolved,
    /// At least one truth particle is a primary (no mother).
    Orphan,
    /// At least one track has no usable truth link.
    Missing,
}

/// Classification verdict for a triplet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub is_signal: bool,
    pub status: TruthStatus,
    /// Production vertex of the first track's mother, when known.
    pub parent_vertex: Option<Point3<f64>>,
}

/// Resolve a track to its mother's id, reporting what was missing.
fn mother_id(event: &Event, track: &Track) -> Result<ParticleId, TruthStatus> {
    let particle = event.truth_of(track).ok_or(TruthStatus::Missing)?;
    particle.mother.ok_or(TruthStatus::Orphan)
}

/// Signal iff all three tracks descend from the same truth particle.
pub fn classify(event: &Event, tracks: [&Track; 3]) -> Classification {
    let parent_vertex = event
        .truth_of(tracks[0])
        .and_then(|p| event.mother_of(p))
        .map(|m| m.production_vertex);

    let mothers = tracks.map(|t| mother_id(event, t));
    let status = if mothers.iter().any(|m| *m == Err(TruthStatus::Missing)) {
        TruthStatus::Missing
    } else if mothers.iter().any(|m| m.is_err()) {
        TruthStatus::Orphan
    } else {
        TruthStatus::Resolved
    };

    let is_signal = match mothers {
        [Ok(a), Ok(b), Ok(c)] => a == b && a == c,
        _ => false,
    };

    Classification {
        is_signal,
        status,
        parent_vertex,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventVertex, TrackCovariance, TrackId, TrackParam, TruthParticle};

    fn track(id: usize, truth: Option<usize>) -> Track {
        Track::from_helix(
            TrackId(id),
            TrackParam {
                x: 0.0,
                y: 0.0,
                z: 0.0,
                phi: 0.0,
                tgl: 0.0,
                q_over_pt: 1.0,
            },
            TrackCovariance::from_diagonal([1e-6; 5]),
            truth.map(ParticleId),
        )
    }

    /// Two mothers (0, 1); particles 2..=4 from mother 0, 5 from mother 1, 6 primary.
    fn event() -> Event {
        let m0 = Point3::new(0.01, 0.0, 0.0);
        let m1 = Point3::new(0.0, 0.02, 0.0);
        let o = Point3::origin();
        Event {
            index: 0,
            vertex: EventVertex {
                position: o,
                n_contributors: 5,
            },
            truth_vertex: Some(o),
            tracks: Vec::new(),
            particles: vec![
                TruthParticle::primary(ParticleId(0), 9_999, m0),
                TruthParticle::primary(ParticleId(1), 9_999, m1),
                TruthParticle::daughter_of(ParticleId(2), 1_000_010_020, m0, ParticleId(0)),
                TruthParticle::daughter_of(ParticleId(3), -321, m0, ParticleId(0)),
                TruthParticle::daughter_of(ParticleId(4), 211, m0, ParticleId(0)),
                TruthParticle::daughter_of(ParticleId(5), 211, m1, ParticleId(1)),
                TruthParticle::primary(ParticleId(6), 211, o),
            ],
        }
    }

    #[test]
    fn shared_mother_is_signal() {
        let ev = event();
        let (a, b, c) = (track(0, Some(2)), track(1, Some(3)), track(2, Some(4)));
        let cls = classify(&ev, [&a, &b, &c]);
        assert!(cls.is_signal);
        assert_eq!(cls.status, TruthStatus::Resolved);
        assert_eq!(cls.parent_vertex, Some(Point3::new(0.01, 0.0, 0.0)));
    }

    #[test]
    fn different_mother_is_background() {
        let ev = event();
        let (a, b, c) = (track(0, Some(2)), track(1, Some(3)), track(2, Some(5)));
        let cls = classify(&ev, [&a, &b, &c]);
        assert!(!cls.is_signal);
        assert_eq!(cls.status, TruthStatus::Resolved);
        // Parent vertex still follows the first track's lineage.
        assert_eq!(cls.parent_vertex, Some(Point3::new(0.01, 0.0, 0.0)));
    }

    #[test]
    fn primary_daughter_is_orphan_background() {
        let ev = event();
        let (a, b, c) = (track(0, Some(2)), track(1, Some(3)), track(2, Some(6)));
        let cls = classify(&ev, [&a, &b, &c]);
        assert!(!cls.is_signal);
        assert_eq!(cls.status, TruthStatus::Orphan);
    }

    #[test]
    fn missing_truth_degrades_to_background() {
        let ev = event();
        let (a, b, c) = (track(0, None), track(1, Some(3)), track(2, Some(4)));
        let cls = classify(&ev, [&a, &b, &c]);
        assert!(!cls.is_signal);
        assert_eq!(cls.status, TruthStatus::Missing);
        assert_eq!(cls.parent_vertex, None);
    }

    #[test]
    fn dangling_truth_link_is_missing() {
        let ev = event();
        let (a, b, c) = (track(0, Some(2)), track(1, Some(42)), track(2, Some(4)));
        assert_eq!(classify(&ev, [&a, &b, &c]).status, TruthStatus::Missing);
    }
}
