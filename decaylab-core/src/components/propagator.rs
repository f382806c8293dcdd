//! Track propagator: distance of closest approach of a track to a point.
//!
//! Tracks are helices along the z axis of a uniform solenoidal field. The
//! propagator finds the transverse point of closest approach analytically,
//! then reads the longitudinal offset at that same point.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use thiserror::Error;

use crate::constants::{KAPPA, MIN_CURVATURE};
use crate::domain::TrackParam;

/// Newton iterations used to refine a 3D closest approach.
const MAX_NEWTON_STEPS: usize = 8;

/// Signed transverse and longitudinal offsets of a track from a reference point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dca {
    pub xy: f64,
    pub z: f64,
}

impl Dca {
    pub fn as_array(&self) -> [f64; 2] {
        [self.xy, self.z]
    }
}

/// Why a track could not be brought to its closest approach.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PropagationError {
    #[error("track parameters or reference point are not finite")]
    NonFinite,
    #[error("reference point lies on the helix axis")]
    OnHelixAxis,
    #[error("path length {path:.3} cm exceeds the step budget of {max_step:.3} cm")]
    StepBudget { path: f64, max_step: f64 },
}

/// Trait for track propagators.
pub trait TrackPropagator: Send + Sync {
    /// Propagate `track` to its closest approach to `reference` in a field of
    /// `bz_kg` kilogauss, travelling at most `max_step` cm along the trajectory.
    fn propagate_to_dca(
        &self,
        track: &TrackParam,
        reference: &Point3<f64>,
        bz_kg: f64,
        max_step: f64,
    ) -> Result<Dca, PropagationError>;
}

/// A track's trajectory in a uniform field, parametrised by transverse path length `s`.
#[derive(Debug, Clone, Copy)]
pub struct Helix {
    origin: Point3<f64>,
    phi0: f64,
    tgl: f64,
    /// Signed curvature `dphi/ds` (1/cm); zero for a straight line.
    curvature: f64,
}

impl Helix {
    pub fn new(param: &TrackParam, bz_kg: f64) -> Self {
        let c = -KAPPA * bz_kg * param.q_over_pt;
        Self {
            origin: param.position(),
            phi0: param.phi,
            tgl: param.tgl,
            curvature: if c.abs() < MIN_CURVATURE { 0.0 } else { c },
        }
    }

    pub fn curvature(&self) -> f64 {
        self.curvature
    }

    pub fn is_straight(&self) -> bool {
        self.curvature == 0.0
    }

    /// Position after a transverse path length `s`.
    pub fn position_at(&self, s: f64) -> Point3<f64> {
        let (dx, dy) = if self.is_straight() {
            (s * self.phi0.cos(), s * self.phi0.sin())
        } else {
            let c = self.curvature;
            let phi = self.phi0 + c * s;
            (
                (phi.sin() - self.phi0.sin()) / c,
                -(phi.cos() - self.phi0.cos()) / c,
            )
        };
        Point3::new(
            self.origin.x + dx,
            self.origin.y + dy,
            self.origin.z + s * self.tgl,
        )
    }

    /// Tangent `d position / ds` after a transverse path length `s` (not normalised).
    pub fn tangent_at(&self, s: f64) -> Vector3<f64> {
        let phi = self.phi0 + self.curvature * s;
        Vector3::new(phi.cos(), phi.sin(), self.tgl)
    }

    /// Unit direction of flight after a transverse path length `s`.
    pub fn direction_at(&self, s: f64) -> Vector3<f64> {
        self.tangent_at(s).normalize()
    }

    /// Length travelled along the trajectory for a transverse path `s`.
    pub fn arc_length(&self, s: f64) -> f64 {
        s.abs() * (1.0 + self.tgl * self.tgl).sqrt()
    }

    /// Transverse path length to the point closest to `reference` in the
    /// bending plane, choosing the nearest branch within half a turn.
    pub fn transverse_closest_approach(
        &self,
        reference: &Point3<f64>,
    ) -> Result<f64, PropagationError> {
        if self.is_straight() {
            let dx = reference.x - self.origin.x;
            let dy = reference.y - self.origin.y;
            return Ok(dx * self.phi0.cos() + dy * self.phi0.sin());
        }

        let c = self.curvature;
        let xc = self.origin.x - self.phi0.sin() / c;
        let yc = self.origin.y + self.phi0.cos() / c;
        let ux = reference.x - xc;
        let uy = reference.y - yc;
        let d = ux.hypot(uy);
        if d <= f64::EPSILON * (1.0 / c.abs()) {
            return Err(PropagationError::OnHelixAxis);
        }

        let sign = c.signum();
        let phi_pca = (sign * ux / d).atan2(-sign * uy / d);
        Ok(wrap_angle(phi_pca - self.phi0) / c)
    }

    /// Transverse path length to the point closest to `point` in 3D.
    ///
    /// Starts from the transverse solution and refines with Newton steps on
    /// the squared distance.
    pub fn closest_approach(&self, point: &Point3<f64>) -> Result<f64, PropagationError> {
        let mut s = match self.transverse_closest_approach(point) {
            Ok(s) => s,
            // Every transverse point is equidistant; z alone decides.
            Err(PropagationError::OnHelixAxis) => 0.0,
            Err(e) => return Err(e),
        };

        for _ in 0..MAX_NEWTON_STEPS {
            let delta = self.position_at(s) - point;
            let t = self.tangent_at(s);
            let phi = self.phi0 + self.curvature * s;
            let dt = Vector3::new(-self.curvature * phi.sin(), self.curvature * phi.cos(), 0.0);
            let grad = delta.dot(&t);
            let hess = t.norm_squared() + delta.dot(&dt);
            if hess <= 0.0 {
                break;
            }
            let step = grad / hess;
            s -= step;
            if step.abs() < 1e-12 {
                break;
            }
        }

        if s.is_finite() {
            Ok(s)
        } else {
            Err(PropagationError::NonFinite)
        }
    }
}

/// Wrap an angle into `[-pi, pi)`.
fn wrap_angle(a: f64) -> f64 {
    (a + PI).rem_euclid(2.0 * PI) - PI
}

/// Analytic helix propagator.
#[derive(Debug, Clone, Copy, Default)]
pub struct HelixPropagator;

impl TrackPropagator for HelixPropagator {
    fn propagate_to_dca(
        &self,
        track: &TrackParam,
        reference: &Point3<f64>,
        bz_kg: f64,
        max_step: f64,
    ) -> Result<Dca, PropagationError> {
        if !track.is_finite() || !reference.coords.iter().all(|v| v.is_finite()) || !bz_kg.is_finite()
        {
            return Err(PropagationError::NonFinite);
        }

        let helix = Helix::new(track, bz_kg);
        let s = helix.transverse_closest_approach(reference)?;
        let path = helix.arc_length(s);
        if path > max_step {
            return Err(PropagationError::StepBudget { path, max_step });
        }

        let pca = helix.position_at(s);
        let t = helix.tangent_at(s);
        let rx = reference.x - pca.x;
        let ry = reference.y - pca.y;
        // Positive when the reference lies to the left of the direction of flight.
        let dca = Dca {
            xy: t.x * ry - t.y * rx,
            z: pca.z - reference.z,
        };
        if dca.xy.is_finite() && dca.z.is_finite() {
            Ok(dca)
        } else {
            Err(PropagationError::NonFinite)
        }
    }
}
