//! Toy event generation.
//!
//! Produces self-consistent events for demos, tests and benchmarks:
//! - a Gaussian-smeared collision point and a reconstructed vertex around it
//! - optionally one mother particle decaying into the three channel species,
//!   displaced along its flight direction by an exponential decay length
//! - primary background tracks of each channel species
//!
//! Tracks are expressed at their production point, smeared with the
//! configured resolutions and given a matching diagonal covariance.
//! Every event draws from its own RNG stream, so event `n` is identical
//! regardless of how many events are generated or on which thread.

use std::f64::consts::PI;

use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use decaylab_core::components::FourMomentum;
use decaylab_core::domain::{
    Event, EventVertex, ParticleId, Track, TrackCovariance, TrackId, TrackParam, TruthParticle,
};
use decaylab_core::engine::DecayChannel;

use crate::config::ConfigError;
use crate::rng::RngHierarchy;

/// Placeholder code for the generated mother. Not an official PDG code.
pub const TOY_MOTHER_PDG: i32 = 2_010_010_020;

/// Tries before accepting the last phase-space sample unweighted.
const MAX_PHASE_SPACE_TRIES: usize = 1000;

/// Parameters of the toy generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToyConfig {
    pub seed: u64,
    /// Probability that an event carries a decay.
    pub signal_fraction: f64,
    /// Primary tracks generated per event for each channel slot.
    pub background: [usize; 3],
    pub channel: DecayChannel,
    /// GeV/c^2.
    pub mother_mass: f64,
    pub mother_pdg: i32,
    /// Mean proper decay length c*tau, in cm.
    pub mean_decay_length: f64,
    /// Mother transverse momentum range (GeV/c).
    pub mother_pt: [f64; 2],
    /// Background transverse momentum range (GeV/c).
    pub background_pt: [f64; 2],
    pub eta_max: f64,
    /// Spread of the collision point in x/y and in z (cm).
    pub beam_sigma: [f64; 2],
    /// Smearing of the reconstructed vertex around the collision (cm).
    pub vertex_resolution: f64,
    /// Track position resolution, transverse and longitudinal (cm).
    pub position_resolution: f64,
    /// Resolution of phi and tan(lambda).
    pub angle_resolution: f64,
    /// Relative resolution of q/pt.
    pub qpt_resolution: f64,
}

impl Default for ToyConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            signal_fraction: 0.5,
            background: [1, 4, 10],
            channel: DecayChannel::default(),
            mother_mass: 3.2,
            mother_pdg: TOY_MOTHER_PDG,
            mean_decay_length: 0.006,
            mother_pt: [1.0, 10.0],
            background_pt: [0.2, 4.0],
            eta_max: 1.5,
            beam_sigma: [0.001, 0.05],
            vertex_resolution: 0.0005,
            position_resolution: 0.0005,
            angle_resolution: 1e-3,
            qpt_resolution: 0.01,
        }
    }
}

impl ToyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &'static str, reason: String| Err(ConfigError::Invalid { field, reason });

        if !(0.0..=1.0).contains(&self.signal_fraction) {
            return invalid(
                "signal_fraction",
                format!("{} outside [0, 1]", self.signal_fraction),
            );
        }
        let threshold: f64 = self.channel.masses.iter().sum();
        if self.mother_mass.is_nan() || self.mother_mass <= threshold {
            return invalid(
                "mother_mass",
                format!("{} below decay threshold {threshold}", self.mother_mass),
            );
        }
        for (field, [lo, hi]) in [("mother_pt", self.mother_pt), ("background_pt", self.background_pt)] {
            if lo.is_nan() || hi.is_nan() || lo <= 0.0 || lo > hi {
                return invalid(field, format!("[{lo}, {hi}] is not a positive range"));
            }
        }
        let widths = [
            self.mean_decay_length,
            self.eta_max,
            self.beam_sigma[0],
            self.beam_sigma[1],
            self.vertex_resolution,
            self.position_resolution,
            self.angle_resolution,
            self.qpt_resolution,
        ];
        if widths.iter().any(|w| !(w.is_finite() && *w >= 0.0)) {
            return invalid("resolution", "widths must be finite and >= 0".into());
        }
        Ok(())
    }
}

/// Generate one event.
pub fn generate_event(config: &ToyConfig, index: u64) -> Event {
    let mut rng = RngHierarchy::new(config.seed).rng_for("event", index);
    let mut builder = EventBuilder::default();

    let [sxy, sz] = config.beam_sigma;
    let collision = Point3::new(
        gaussian(&mut rng, sxy),
        gaussian(&mut rng, sxy),
        gaussian(&mut rng, sz),
    );

    if rng.gen::<f64>() < config.signal_fraction {
        add_decay(config, &mut rng, &mut builder, collision);
    }

    let mut primaries = 0u32;
    for (slot, &n) in config.background.iter().enumerate() {
        let pdg = config.channel.species[slot];
        for _ in 0..n {
            let momentum = random_momentum(&mut rng, config.background_pt, config.eta_max);
            let id = builder.particle(|id| TruthParticle::primary(id, pdg, collision));
            builder.track(config, &mut rng, collision, momentum, pdg, id);
            primaries += 1;
        }
    }

    let r = config.vertex_resolution;
    let vertex = collision
        + Vector3::new(
            gaussian(&mut rng, r),
            gaussian(&mut rng, r),
            gaussian(&mut rng, r),
        );

    Event {
        index,
        vertex: EventVertex {
            position: vertex,
            n_contributors: primaries,
        },
        truth_vertex: Some(collision),
        tracks: builder.tracks,
        particles: builder.particles,
    }
}

/// Generate `n` events in parallel, in index order.
pub fn generate_events(config: &ToyConfig, n: u64) -> Vec<Event> {
    (0..n)
        .into_par_iter()
        .map(|i| generate_event(config, i))
        .collect()
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Accumulates tracks and truth particles with ids equal to their index.
#[derive(Default)]
struct EventBuilder {
    tracks: Vec<Track>,
    particles: Vec<TruthParticle>,
}

impl EventBuilder {
    fn particle(&mut self, make: impl FnOnce(ParticleId) -> TruthParticle) -> ParticleId {
        let id = ParticleId(self.particles.len());
        self.particles.push(make(id));
        id
    }

    fn track(
        &mut self,
        config: &ToyConfig,
        rng: &mut StdRng,
        origin: Point3<f64>,
        momentum: Vector3<f64>,
        pdg: i32,
        truth: ParticleId,
    ) {
        let charge = pdg.signum() as i8;
        let param = smear(config, rng, TrackParam::from_momentum(origin, momentum, charge));
        let pos = config.position_resolution.powi(2);
        let ang = config.angle_resolution.powi(2);
        let qpt = (config.qpt_resolution * param.q_over_pt).powi(2);
        let cov = TrackCovariance::from_diagonal([pos, pos, ang, ang, qpt]);
        let id = TrackId(self.tracks.len());
        self.tracks.push(Track::from_helix(id, param, cov, Some(truth)));
    }
}

/// Embed one mother and its three daughters.
fn add_decay(config: &ToyConfig, rng: &mut StdRng, builder: &mut EventBuilder, collision: Point3<f64>) {
    let p = random_momentum(rng, config.mother_pt, config.eta_max);
    let m = config.mother_mass;
    let mother = FourMomentum {
        px: p.x,
        py: p.y,
        pz: p.z,
        e: (p.norm_squared() + m * m).sqrt(),
    };

    let proper = -config.mean_decay_length * (1.0 - rng.gen::<f64>()).ln();
    let flight = p.normalize() * proper * p.norm() / m;
    let decay_vertex = collision + flight;

    let mother_id = builder.particle(|id| TruthParticle::primary(id, config.mother_pdg, collision));
    for (slot, daughter) in three_body(rng, m, config.channel.masses).into_iter().enumerate() {
        let lab = boost(daughter, &mother);
        let pdg = config.channel.species[slot];
        let id = builder.particle(|id| TruthParticle::daughter_of(id, pdg, decay_vertex, mother_id));
        builder.track(config, rng, decay_vertex, lab.momentum(), pdg, id);
    }
}

/// Daughter four-momenta in the mother rest frame, from two successive
/// two-body decays: `M -> 1 + (23)`, then `(23) -> 2 + 3`.
///
/// The intermediate mass is accepted with the phase-space weight
/// `p*(M) * p*(23)`, bounded by the product of each factor's maximum.
fn three_body(rng: &mut StdRng, mass: f64, m: [f64; 3]) -> [FourMomentum; 3] {
    let lo = m[1] + m[2];
    let hi = mass - m[0];
    let bound = two_body_momentum(mass, m[0], lo) * two_body_momentum(hi, m[1], m[2]);

    let mut m23 = lo;
    for _ in 0..MAX_PHASE_SPACE_TRIES {
        m23 = uniform(rng, lo, hi);
        let weight = two_body_momentum(mass, m[0], m23) * two_body_momentum(m23, m[1], m[2]);
        if rng.gen::<f64>() * bound <= weight {
            break;
        }
    }

    let p1 = two_body_momentum(mass, m[0], m23);
    let dir = isotropic(rng);
    let first = at_rest_frame(dir * p1, m[0]);
    let pair = at_rest_frame(-dir * p1, m23);

    let q = two_body_momentum(m23, m[1], m[2]);
    let dir = isotropic(rng);
    let second = boost(at_rest_frame(dir * q, m[1]), &pair);
    let third = boost(at_rest_frame(-dir * q, m[2]), &pair);

    [first, second, third]
}

/// Momentum of either daughter of a two-body decay at rest.
fn two_body_momentum(mass: f64, m1: f64, m2: f64) -> f64 {
    let s = mass * mass;
    let k = (s - (m1 + m2).powi(2)) * (s - (m1 - m2).powi(2));
    k.max(0.0).sqrt() / (2.0 * mass)
}

fn at_rest_frame(p: Vector3<f64>, mass: f64) -> FourMomentum {
    FourMomentum {
        px: p.x,
        py: p.y,
        pz: p.z,
        e: (p.norm_squared() + mass * mass).sqrt(),
    }
}

/// Boost `v` from the rest frame of `frame` into the frame `frame` is given in.
fn boost(v: FourMomentum, frame: &FourMomentum) -> FourMomentum {
    let b = frame.momentum() / frame.e;
    let b2 = b.norm_squared();
    if b2 <= 0.0 {
        return v;
    }
    let gamma = 1.0 / (1.0 - b2).sqrt();
    let p = v.momentum();
    let bp = b.dot(&p);
    let p_lab = p + b * ((gamma - 1.0) * bp / b2 + gamma * v.e);
    FourMomentum {
        px: p_lab.x,
        py: p_lab.y,
        pz: p_lab.z,
        e: gamma * (v.e + bp),
    }
}

fn isotropic(rng: &mut StdRng) -> Vector3<f64> {
    let cos_theta = uniform(rng, -1.0, 1.0);
    let sin_theta = (1.0 - cos_theta * cos_theta).sqrt();
    let phi = uniform(rng, 0.0, 2.0 * PI);
    Vector3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
}

fn random_momentum(rng: &mut StdRng, pt_range: [f64; 2], eta_max: f64) -> Vector3<f64> {
    let pt = uniform(rng, pt_range[0], pt_range[1]);
    let eta = uniform(rng, -eta_max, eta_max);
    let phi = uniform(rng, -PI, PI);
    Vector3::new(pt * phi.cos(), pt * phi.sin(), pt * eta.sinh())
}

/// Smear a helix state: transverse offset perpendicular to the momentum,
/// z, both angles, and q/pt relative to its value.
fn smear(config: &ToyConfig, rng: &mut StdRng, mut p: TrackParam) -> TrackParam {
    let dy = gaussian(rng, config.position_resolution);
    p.x -= dy * p.phi.sin();
    p.y += dy * p.phi.cos();
    p.z += gaussian(rng, config.position_resolution);
    p.phi += gaussian(rng, config.angle_resolution);
    p.tgl += gaussian(rng, config.angle_resolution);
    p.q_over_pt *= 1.0 + gaussian(rng, config.qpt_resolution);
    p
}

/// Uniform in `[lo, hi)`; returns `lo` for an empty range.
fn uniform(rng: &mut StdRng, lo: f64, hi: f64) -> f64 {
    lo + (hi - lo) * rng.gen::<f64>()
}

/// Box-Muller normal deviate with mean 0.
fn gaussian(rng: &mut StdRng, sigma: f64) -> f64 {
    if sigma == 0.0 {
        return 0.0;
    }
    let u1 = 1.0 - rng.gen::<f64>();
    let u2 = rng.gen::<f64>();
    sigma * (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}
