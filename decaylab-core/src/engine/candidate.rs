//! A scored three-track decay candidate.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::components::{Classification, CutVerdict, Dca, FitResult, Kinematics};
use crate::domain::TrackId;
use crate::sink::{Category, CutState};

/// Everything derived for one triplet that survived propagation and fit.
///
/// Slot order follows the decay channel: the outer-loop track is slot 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub tracks: [TrackId; 3],
    /// Reconstructed transverse momentum of each track.
    pub pt: [f64; 3],
    pub dca: [Dca; 3],
    pub fit: FitResult,
    pub kinematics: Kinematics,
    /// Distance of the secondary vertex from the origin.
    pub decay_radius: f64,
    /// Cosine of the pointing angle w.r.t. the reference vertex.
    pub cpa: f64,
    pub classification: Classification,
    pub verdict: CutVerdict,
    /// Transverse distance of the third track's truth origin from the truth collision.
    pub radius3xy: Option<f64>,
}

/// Products of DCA components used to study track-pair correlations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DcaProducts {
    pub xy12: f64,
    pub z12: f64,
    pub xy32: f64,
    pub z32: f64,
}

impl Candidate {
    pub fn secondary_vertex(&self) -> Point3<f64> {
        self.fit.vertex
    }

    pub fn is_signal(&self) -> bool {
        self.classification.is_signal
    }

    pub fn is_cut(&self) -> bool {
        self.verdict.is_cut()
    }

    pub fn category(&self) -> Category {
        Category::from_signal(self.is_signal())
    }

    /// The selection-dependent bucket (`Cut` or `Passing`).
    pub fn cut_state(&self) -> CutState {
        CutState::from_cut(self.is_cut())
    }

    /// `sqrt(chi2)` of the first two tracks at the fitted vertex.
    pub fn decay_dca(&self) -> [f64; 2] {
        [self.fit.decay_dca(0), self.fit.decay_dca(1)]
    }

    /// Secondary vertex minus the first track's truth parent vertex.
    pub fn resolution(&self) -> Option<Vector3<f64>> {
        self.classification
            .parent_vertex
            .map(|pv| self.fit.vertex - pv)
    }

    pub fn dca_products(&self) -> DcaProducts {
        let [d1, d2, d3] = self.dca;
        DcaProducts {
            xy12: d1.xy * d2.xy,
            z12: d1.z * d2.z,
            xy32: d3.xy * d2.xy,
            z32: d3.z * d2.z,
        }
    }

    /// True when the three track identities are pairwise distinct.
    pub fn has_distinct_tracks(&self) -> bool {
        let [a, b, c] = self.tracks;
        a != b && b != c && a != c
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::candidate;
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn routing_helpers() {
        let mut c = candidate();
        assert_eq!(c.category(), Category::Signal);
        assert_eq!(c.cut_state(), CutState::Passing);
        c.verdict.cpa = true;
        c.classification.is_signal = false;
        assert_eq!(c.category(), Category::Background);
        assert_eq!(c.cut_state(), CutState::Cut);
    }

    #[test]
    fn resolution_needs_parent_vertex() {
        let mut c = candidate();
        let r = c.resolution().unwrap();
        assert_relative_eq!(r.x, 0.001, epsilon = 1e-12);
        assert_relative_eq!(r.y, -0.001, epsilon = 1e-12);
        c.classification.parent_vertex = None;
        assert!(c.resolution().is_none());
    }

    #[test]
    fn dca_products_pair_with_second_track() {
        let p = candidate().dca_products();
        assert_relative_eq!(p.xy12, 0.002 * 0.003, epsilon = 1e-15);
        assert_relative_eq!(p.z12, -0.001 * 0.004, epsilon = 1e-15);
        assert_relative_eq!(p.xy32, -0.005 * 0.003, epsilon = 1e-15);
        assert_relative_eq!(p.z32, 0.002 * 0.004, epsilon = 1e-15);
    }

    #[test]
    fn decay_dca_is_root_chi2() {
        let d = candidate().decay_dca();
        assert_relative_eq!(d[0], 2e-3, epsilon = 1e-12);
        assert_relative_eq!(d[1], 3e-3, epsilon = 1e-12);
    }

    #[test]
    fn distinct_tracks() {
        let mut c = candidate();
        assert!(c.has_distinct_tracks());
        c.tracks[2] = TrackId(0);
        assert!(!c.has_distinct_tracks());
    }
}
