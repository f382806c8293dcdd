//! Event: one collision's tracks, vertex and truth record.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use super::ids::ParticleId;
use super::track::Track;
use super::truth::TruthParticle;

/// Reconstructed primary interaction point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventVertex {
    pub position: Point3<f64>,
    /// Number of tracks that contributed to the vertex fit.
    pub n_contributors: u32,
}

/// All inputs of a single event's candidate search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub index: u64,
    pub vertex: EventVertex,
    /// Generated collision position, when simulation truth is available.
    #[serde(default)]
    pub truth_vertex: Option<Point3<f64>>,
    pub tracks: Vec<Track>,
    #[serde(default)]
    pub particles: Vec<TruthParticle>,
}

impl Event {
    /// Look up a truth particle by id.
    ///
    /// Particles are normally stored at their own index; a linear scan covers
    /// collections that were filtered or reordered.
    pub fn particle(&self, id: ParticleId) -> Option<&TruthParticle> {
        match self.particles.get(id.0) {
            Some(p) if p.id == id => Some(p),
            _ => self.particles.iter().find(|p| p.id == id),
        }
    }

    /// Truth particle linked to a track.
    pub fn truth_of(&self, track: &Track) -> Option<&TruthParticle> {
        track.truth.and_then(|id| self.particle(id))
    }

    /// Immediate mother of a truth particle.
    pub fn mother_of(&self, particle: &TruthParticle) -> Option<&TruthParticle> {
        particle.mother.and_then(|id| self.particle(id))
    }

    /// PDG code of the truth particle behind a track.
    pub fn species_of(&self, track: &Track) -> Option<i32> {
        self.truth_of(track).map(|p| p.pdg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TrackCovariance, TrackId, TrackParam};

    fn event_with_particles(particles: Vec<TruthParticle>) -> Event {
        Event {
            index: 0,
            vertex: EventVertex {
                position: Point3::origin(),
                n_contributors: 10,
            },
            truth_vertex: Some(Point3::origin()),
            tracks: Vec::new(),
            particles,
        }
    }

    #[test]
    fn particle_lookup_by_position() {
        let ev = event_with_particles(vec![
            TruthParticle::primary(ParticleId(0), 211, Point3::origin()),
            TruthParticle::primary(ParticleId(1), -321, Point3::origin()),
        ]);
        assert_eq!(ev.particle(ParticleId(1)).map(|p| p.pdg), Some(-321));
    }

    #[test]
    fn particle_lookup_survives_reordering() {
        let ev = event_with_particles(vec![
            TruthParticle::primary(ParticleId(5), 211, Point3::origin()),
            TruthParticle::primary(ParticleId(0), -321, Point3::origin()),
        ]);
        assert_eq!(ev.particle(ParticleId(0)).map(|p| p.pdg), Some(-321));
        assert_eq!(ev.particle(ParticleId(5)).map(|p| p.pdg), Some(211));
        assert!(ev.particle(ParticleId(9)).is_none());
    }

    #[test]
    fn species_and_mother_lookup() {
        let ev = event_with_particles(vec![
            TruthParticle::primary(ParticleId(0), 42, Point3::origin()),
            TruthParticle::daughter_of(ParticleId(1), 211, Point3::new(0.01, 0.0, 0.0), ParticleId(0)),
        ]);
        let track = Track::from_helix(
            TrackId(0),
            TrackParam {
                x: 0.0,
                y: 0.0,
                z: 0.0,
                phi: 0.0,
                tgl: 0.0,
                q_over_pt: 1.0,
            },
            TrackCovariance::from_diagonal([1e-6; 5]),
            Some(ParticleId(1)),
        );
        assert_eq!(ev.species_of(&track), Some(211));
        let truth = ev.truth_of(&track).unwrap();
        assert_eq!(ev.mother_of(truth).map(|m| m.id), Some(ParticleId(0)));
    }

    #[test]
    fn truth_fields_are_optional_in_json() {
        let ev: Event = serde_json::from_str(
            r#"{"index": 3, "vertex": {"position": [0.0, 0.0, 1.5], "n_contributors": 7}, "tracks": []}"#,
        )
        .unwrap();
        assert_eq!(ev.index, 3);
        assert_eq!(ev.vertex.position.z, 1.5);
        assert!(ev.truth_vertex.is_none());
        assert!(ev.particles.is_empty());
    }

    #[test]
    fn unmatched_track_has_no_species() {
        let ev = event_with_particles(Vec::new());
        let track = Track::from_helix(
            TrackId(0),
            TrackParam {
                x: 0.0,
                y: 0.0,
                z: 0.0,
                phi: 0.0,
                tgl: 0.0,
                q_over_pt: 1.0,
            },
            TrackCovariance::from_diagonal([1e-6; 5]),
            None,
        );
        assert_eq!(ev.species_of(&track), None);
    }
}
