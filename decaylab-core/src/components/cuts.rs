//! Cut evaluator: selection thresholds on DCA, momentum, radius and pointing angle.
//!
//! Every clause is evaluated for every candidate; the verdict keeps each
//! clause's outcome so both selected and rejected candidates can be booked
//! and the cut flow reconstructed afterwards.

use serde::{Deserialize, Serialize};

use super::propagator::Dca;

/// Run-level selection thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CutThresholds {
    /// Lower bound on |DCA| of every track, both components.
    #[serde(with = "crate::float_serde")]
    pub min_dca: f64,
    /// Upper bound on |DCA| of every track, both components.
    #[serde(with = "crate::float_serde")]
    pub max_dca: f64,
    /// Extra lower bound on |DCA| of the second track, both components.
    #[serde(with = "crate::float_serde")]
    pub min_dca_second: f64,
    /// Lower bound on the second track's transverse momentum.
    #[serde(with = "crate::float_serde")]
    pub min_second_pt: f64,
    /// Lower bound on the third track's transverse momentum.
    #[serde(with = "crate::float_serde")]
    pub min_third_pt: f64,
    /// Lower bound on the combined transverse momentum.
    #[serde(with = "crate::float_serde")]
    pub min_mom_pt: f64,
    #[serde(with = "crate::float_serde")]
    pub min_radius: f64,
    #[serde(with = "crate::float_serde")]
    pub max_radius: f64,
    /// Lower bound on |cos(pointing angle)|.
    #[serde(with = "crate::float_serde")]
    pub min_cpa: f64,
}

impl Default for CutThresholds {
    fn default() -> Self {
        Self {
            min_dca: -100.0,
            max_dca: 100.0,
            min_dca_second: -100.0,
            min_second_pt: -100.0,
            min_third_pt: -100.0,
            min_mom_pt: -100.0,
            min_radius: -100.0,
            max_radius: 100.0,
            min_cpa: 0.0,
        }
    }
}

impl CutThresholds {
    /// Thresholds that reject nothing.
    pub fn disabled() -> Self {
        Self {
            min_dca: f64::NEG_INFINITY,
            max_dca: f64::INFINITY,
            min_dca_second: f64::NEG_INFINITY,
            min_second_pt: f64::NEG_INFINITY,
            min_third_pt: f64::NEG_INFINITY,
            min_mom_pt: f64::NEG_INFINITY,
            min_radius: f64::NEG_INFINITY,
            max_radius: f64::INFINITY,
            min_cpa: f64::NEG_INFINITY,
        }
    }
}

/// Observables a verdict is computed from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutInput {
    pub dca: [Dca; 3],
    pub second_pt: f64,
    pub third_pt: f64,
    pub decay_radius: f64,
    pub cpa: f64,
    pub mom_pt: f64,
}

/// Outcome of every clause; `true` means the clause rejects the candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CutVerdict {
    pub dca_window: bool,
    pub dca_second: bool,
    pub second_pt: bool,
    pub third_pt: bool,
    pub mom_pt: bool,
    pub radius: bool,
    pub cpa: bool,
}

impl CutVerdict {
    /// Clause names in evaluation order.
    pub const CLAUSES: [&'static str; 7] = [
        "dca_window",
        "dca_second",
        "second_pt",
        "third_pt",
        "mom_pt",
        "radius",
        "cpa",
    ];

    /// True when any clause rejects.
    pub fn is_cut(&self) -> bool {
        self.flags().iter().any(|&f| f)
    }

    /// Clause outcomes in the order of [`CutVerdict::CLAUSES`].
    pub fn flags(&self) -> [bool; 7] {
        [
            self.dca_window,
            self.dca_second,
            self.second_pt,
            self.third_pt,
            self.mom_pt,
            self.radius,
            self.cpa,
        ]
    }
}

/// Applies [`CutThresholds`] to candidate observables.
#[derive(Debug, Clone, PartialEq)]
pub struct CutEvaluator {
    thresholds: CutThresholds,
}

impl CutEvaluator {
    pub fn new(thresholds: CutThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &CutThresholds {
        &self.thresholds
    }

    pub fn evaluate(&self, input: &CutInput) -> CutVerdict {
        let t = &self.thresholds;
        let outside = |v: f64| v.abs() < t.min_dca || v.abs() > t.max_dca;

        CutVerdict {
            dca_window: input
                .dca
                .iter()
                .any(|d| outside(d.xy) || outside(d.z)),
            dca_second: input.dca[1].xy.abs() < t.min_dca_second
                || input.dca[1].z.abs() < t.min_dca_second,
            second_pt: input.second_pt < t.min_second_pt,
            third_pt: input.third_pt < t.min_third_pt,
            mom_pt: input.mom_pt < t.min_mom_pt,
            radius: input.decay_radius < t.min_radius || input.decay_radius > t.max_radius,
            cpa: input.cpa.abs() < t.min_cpa,
        }
    }

    /// Convenience: `evaluate(input).is_cut()`.
    pub fn is_cut(&self, input: &CutInput) -> bool {
        self.evaluate(input).is_cut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> CutInput {
        CutInput {
            dca: [
                Dca { xy: 0.010, z: -0.020 },
                Dca { xy: -0.005, z: 0.004 },
                Dca { xy: 0.030, z: 0.015 },
            ],
            second_pt: 0.8,
            third_pt: 0.4,
            decay_radius: 0.05,
            cpa: 0.98,
            mom_pt: 2.5,
        }
    }

    #[test]
    fn default_thresholds_pass_typical_candidate() {
        let eval = CutEvaluator::new(CutThresholds::default());
        assert!(!eval.is_cut(&input()));
    }

    #[test]
    fn disabled_thresholds_pass_everything() {
        let eval = CutEvaluator::new(CutThresholds::disabled());
        let mut i = input();
        i.cpa = 0.0;
        i.decay_radius = 1e6;
        i.mom_pt = -5.0;
        assert_eq!(eval.evaluate(&i), CutVerdict::default());
    }

    #[test]
    fn disabled_thresholds_survive_json() {
        let json = serde_json::to_string(&CutThresholds::disabled()).unwrap();
        assert!(!json.contains("null"));
        assert!(json.contains(r#""max_dca":"inf""#));
        let back: CutThresholds = serde_json::from_str(&json).unwrap();
        assert_eq!(back, CutThresholds::disabled());
    }

    #[test]
    fn dca_window_applies_to_every_track_and_component() {
        let eval = CutEvaluator::new(CutThresholds {
            min_dca: 0.003,
            max_dca: 0.025,
            ..CutThresholds::default()
        });
        let v = eval.evaluate(&input());
        // Third track's xy = 0.030 is above max.
        assert!(v.dca_window);
        assert!(!v.dca_second);

        let mut i = input();
        i.dca[2].xy = 0.020;
        assert!(!eval.is_cut(&i));
        i.dca[0].z = 0.001;
        assert!(eval.evaluate(&i).dca_window);
    }

    #[test]
    fn second_track_has_its_own_dca_floor() {
        let eval = CutEvaluator::new(CutThresholds {
            min_dca_second: 0.0045,
            ..CutThresholds::default()
        });
        let v = eval.evaluate(&input());
        // |z| = 0.004 of the second track is below the floor.
        assert!(v.dca_second);
        assert!(!v.dca_window);
    }

    #[test]
    fn momentum_clauses() {
        let eval = CutEvaluator::new(CutThresholds {
            min_second_pt: 1.0,
            min_third_pt: 0.5,
            min_mom_pt: 3.0,
            ..CutThresholds::default()
        });
        let v = eval.evaluate(&input());
        assert!(v.second_pt && v.third_pt && v.mom_pt);
        assert!(!v.radius && !v.cpa);
    }

    #[test]
    fn radius_window_and_cpa() {
        let eval = CutEvaluator::new(CutThresholds {
            min_radius: 0.06,
            min_cpa: 0.99,
            ..CutThresholds::default()
        });
        let v = eval.evaluate(&input());
        assert!(v.radius);
        assert!(v.cpa);

        let mut i = input();
        i.cpa = -0.995;
        assert!(!eval.evaluate(&i).cpa);
    }

    #[test]
    fn verdict_flags_follow_clause_order() {
        let v = CutVerdict {
            mom_pt: true,
            ..CutVerdict::default()
        };
        let idx = CutVerdict::CLAUSES.iter().position(|c| *c == "mom_pt").unwrap();
        assert!(v.flags()[idx]);
        assert_eq!(v.flags().iter().filter(|f| **f).count(), 1);
        assert!(v.is_cut());
    }
}
