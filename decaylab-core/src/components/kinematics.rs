//! Kinematic combiner: four-momentum sums under fixed mass hypotheses.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// A Lorentz four-momentum `(px, py, pz, E)` in GeV.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FourMomentum {
    pub px: f64,
    pub py: f64,
    pub pz: f64,
    pub e: f64,
}

impl FourMomentum {
    /// Build from transverse momentum, pseudorapidity, azimuth and mass.
    pub fn from_pt_eta_phi_m(pt: f64, eta: f64, phi: f64, mass: f64) -> Self {
        let px = pt * phi.cos();
        let py = pt * phi.sin();
        let pz = pt * eta.sinh();
        let e = (px * px + py * py + pz * pz + mass * mass).sqrt();
        Self { px, py, pz, e }
    }

    pub fn momentum(&self) -> Vector3<f64> {
        Vector3::new(self.px, self.py, self.pz)
    }

    pub fn pt(&self) -> f64 {
        self.px.hypot(self.py)
    }

    pub fn p(&self) -> f64 {
        self.momentum().norm()
    }

    pub fn mass_squared(&self) -> f64 {
        self.e * self.e - self.momentum().norm_squared()
    }

    /// Invariant mass; negative for a space-like vector.
    pub fn mass(&self) -> f64 {
        let m2 = self.mass_squared();
        if m2 < 0.0 {
            -(-m2).sqrt()
        } else {
            m2.sqrt()
        }
    }
}

impl Add for FourMomentum {
    type Output = FourMomentum;

    fn add(self, rhs: FourMomentum) -> FourMomentum {
        FourMomentum {
            px: self.px + rhs.px,
            py: self.py + rhs.py,
            pz: self.pz + rhs.pz,
            e: self.e + rhs.e,
        }
    }
}

impl AddAssign for FourMomentum {
    fn add_assign(&mut self, rhs: FourMomentum) {
        *self = *self + rhs;
    }
}

/// A track's kinematic inputs: `(pt, eta, phi)` plus the assumed mass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hypothesis {
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
    pub mass: f64,
}

impl Hypothesis {
    pub fn four_momentum(&self) -> FourMomentum {
        FourMomentum::from_pt_eta_phi_m(self.pt, self.eta, self.phi, self.mass)
    }
}

/// Derived kinematics of a three-body combination.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Kinematics {
    pub mass: f64,
    pub pt: f64,
    pub p: f64,
    pub momentum: Vector3<f64>,
}

/// Sum three daughters and extract the mother's kinematics.
pub fn combine(daughters: [Hypothesis; 3]) -> Kinematics {
    let mut sum = daughters[0].four_momentum();
    sum += daughters[1].four_momentum();
    sum += daughters[2].four_momentum();
    Kinematics {
        mass: sum.mass(),
        pt: sum.pt(),
        p: sum.p(),
        momentum: sum.momentum(),
    }
}
