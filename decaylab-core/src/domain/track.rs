//! Track: a reconstructed charged-particle trajectory.

use nalgebra::{Matrix2, Point3, Vector3};
use serde::{Deserialize, Serialize};

use super::ids::{ParticleId, TrackId};

/// Helix state of a track at its reference point.
///
/// Position is global (cm). `phi` is the azimuth of the momentum at the
/// reference point, `tgl = pz / pt`, and `q_over_pt` is the signed inverse
/// transverse momentum (c/GeV).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackParam {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub phi: f64,
    pub tgl: f64,
    pub q_over_pt: f64,
}

impl TrackParam {
    /// Build a helix state from a position and a momentum vector.
    pub fn from_momentum(position: Point3<f64>, momentum: Vector3<f64>, charge: i8) -> Self {
        let pt = momentum.x.hypot(momentum.y);
        Self {
            x: position.x,
            y: position.y,
            z: position.z,
            phi: momentum.y.atan2(momentum.x),
            tgl: momentum.z / pt,
            q_over_pt: f64::from(charge) / pt,
        }
    }

    pub fn position(&self) -> Point3<f64> {
        Point3::new(self.x, self.y, self.z)
    }

    /// Unit tangent at the reference point.
    pub fn direction(&self) -> Vector3<f64> {
        Vector3::new(self.phi.cos(), self.phi.sin(), self.tgl).normalize()
    }

    /// Sign of the charge: -1, 0 or +1.
    pub fn charge(&self) -> i8 {
        if self.q_over_pt > 0.0 {
            1
        } else if self.q_over_pt < 0.0 {
            -1
        } else {
            0
        }
    }

    /// Transverse momentum. Infinite for a neutral (straight) track.
    pub fn pt(&self) -> f64 {
        1.0 / self.q_over_pt.abs()
    }

    pub fn eta(&self) -> f64 {
        self.tgl.asinh()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.z.is_finite()
            && self.phi.is_finite()
            && self.tgl.is_finite()
            && self.q_over_pt.is_finite()
    }
}

/// Lower triangle of the symmetric 5×5 covariance over
/// `(y_local, z, phi, tgl, q/pt)`, stored row by row:
/// `YY, ZY, ZZ, PhiY, PhiZ, PhiPhi, TglY, TglZ, TglPhi, TglTgl, QptY, QptZ, QptPhi, QptTgl, QptQpt`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackCovariance(pub [f64; 15]);

impl TrackCovariance {
    /// Uncorrelated covariance from the five variances.
    pub fn from_diagonal(variances: [f64; 5]) -> Self {
        let mut c = [0.0; 15];
        c[0] = variances[0];
        c[2] = variances[1];
        c[5] = variances[2];
        c[9] = variances[3];
        c[14] = variances[4];
        Self(c)
    }

    pub fn sigma_y2(&self) -> f64 {
        self.0[0]
    }

    pub fn sigma_zy(&self) -> f64 {
        self.0[1]
    }

    pub fn sigma_z2(&self) -> f64 {
        self.0[2]
    }

    /// Determinant of the `(y_local, z)` position block.
    pub fn position_determinant(&self) -> f64 {
        self.sigma_y2() * self.sigma_z2() - self.sigma_zy() * self.sigma_zy()
    }

    /// The `(y_local, z)` position block as a matrix.
    pub fn position_block(&self) -> Matrix2<f64> {
        Matrix2::new(
            self.sigma_y2(),
            self.sigma_zy(),
            self.sigma_zy(),
            self.sigma_z2(),
        )
    }

    /// True when the position block cannot be used to weight a fit.
    pub fn is_degenerate(&self) -> bool {
        let det = self.position_determinant();
        !det.is_finite() || det <= 0.0 || self.0.iter().any(|v| !v.is_finite())
    }
}

/// Helix state plus its covariance, the input of the vertex fitter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackParCov {
    pub param: TrackParam,
    pub cov: TrackCovariance,
}

/// A reconstructed track, read-only for the duration of one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub par_cov: TrackParCov,
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
    /// Link into the event's truth collection, absent for unmatched tracks.
    pub truth: Option<ParticleId>,
}

impl Track {
    /// Build a track whose kinematics are read from its helix state.
    pub fn from_helix(
        id: TrackId,
        param: TrackParam,
        cov: TrackCovariance,
        truth: Option<ParticleId>,
    ) -> Self {
        Self {
            id,
            pt: param.pt(),
            eta: param.eta(),
            phi: param.phi,
            par_cov: TrackParCov { param, cov },
            truth,
        }
    }

    pub fn param(&self) -> &TrackParam {
        &self.par_cov.param
    }

    pub fn cov(&self) -> &TrackCovariance {
        &self.par_cov.cov
    }
}
