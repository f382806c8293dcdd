//! Truth particles: simulation-level identity and lineage.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use super::ids::ParticleId;

/// A generated particle. Consulted only for classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TruthParticle {
    pub id: ParticleId,
    pub pdg: i32,
    pub production_vertex: Point3<f64>,
    /// Immediate parent, absent for primaries.
    pub mother: Option<ParticleId>,
}

impl TruthParticle {
    pub fn primary(id: ParticleId, pdg: i32, production_vertex: Point3<f64>) -> Self {
        Self {
            id,
            pdg,
            production_vertex,
            mother: None,
        }
    }

    pub fn daughter_of(id: ParticleId, pdg: i32, production_vertex: Point3<f64>, mother: ParticleId) -> Self {
        Self {
            id,
            pdg,
            production_vertex,
            mother: Some(mother),
        }
    }
}
