//! Property tests for core invariants.
//!
//! Uses proptest to verify:
//! 1. Cut monotonicity: widening a window never cuts an accepted candidate,
//!    tightening never accepts a rejected one
//! 2. Combiner determinism: identical inputs give bit-identical kinematics
//! 3. Propagator round trip: a reference point on the helix has zero DCA
//! 4. Histogram merge: entries and contents add up

use proptest::prelude::*;

use decaylab_core::components::{
    combine, CutEvaluator, CutInput, CutThresholds, Dca, Helix, HelixPropagator, Hypothesis,
    TrackPropagator,
};
use decaylab_core::domain::TrackParam;
use decaylab_core::sink::{Axis, Histogram1D};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_dca() -> impl Strategy<Value = Dca> {
    (-0.1..0.1_f64, -0.1..0.1_f64).prop_map(|(xy, z)| Dca { xy, z })
}

fn arb_input() -> impl Strategy<Value = CutInput> {
    (
        [arb_dca(), arb_dca(), arb_dca()],
        0.0..5.0_f64,
        0.0..5.0_f64,
        0.0..1.0_f64,
        -1.0..1.0_f64,
        0.0..10.0_f64,
    )
        .prop_map(|(dca, second_pt, third_pt, decay_radius, cpa, mom_pt)| CutInput {
            dca,
            second_pt,
            third_pt,
            decay_radius,
            cpa,
            mom_pt,
        })
}

fn arb_thresholds() -> impl Strategy<Value = CutThresholds> {
    (
        0.0..0.02_f64,
        0.02..0.1_f64,
        0.0..0.02_f64,
        0.0..2.0_f64,
        0.0..2.0_f64,
        0.0..4.0_f64,
        0.0..0.3_f64,
        0.3..1.0_f64,
        0.0..1.0_f64,
    )
        .prop_map(
            |(min_dca, max_dca, min_dca_second, min_second_pt, min_third_pt, min_mom_pt, min_radius, max_radius, min_cpa)| {
                CutThresholds {
                    min_dca,
                    max_dca,
                    min_dca_second,
                    min_second_pt,
                    min_third_pt,
                    min_mom_pt,
                    min_radius,
                    max_radius,
                    min_cpa,
                }
            },
        )
}

/// Widen every lower bound down and every upper bound up by `delta`.
fn widened(t: &CutThresholds, delta: f64) -> CutThresholds {
    CutThresholds {
        min_dca: t.min_dca - delta,
        max_dca: t.max_dca + delta,
        min_dca_second: t.min_dca_second - delta,
        min_second_pt: t.min_second_pt - delta,
        min_third_pt: t.min_third_pt - delta,
        min_mom_pt: t.min_mom_pt - delta,
        min_radius: t.min_radius - delta,
        max_radius: t.max_radius + delta,
        min_cpa: t.min_cpa - delta,
    }
}

fn arb_hypothesis() -> impl Strategy<Value = Hypothesis> {
    (0.1..10.0_f64, -2.0..2.0_f64, -3.0..3.0_f64, 0.1..2.0_f64)
        .prop_map(|(pt, eta, phi, mass)| Hypothesis { pt, eta, phi, mass })
}

// ── 1. Cut monotonicity ──────────────────────────────────────────────

proptest! {
    /// Widening any window never rejects a candidate that was accepted.
    #[test]
    fn widening_never_cuts(input in arb_input(), t in arb_thresholds(), delta in 0.0..0.5_f64) {
        let narrow = CutEvaluator::new(t.clone());
        let wide = CutEvaluator::new(widened(&t, delta));
        if !narrow.is_cut(&input) {
            prop_assert!(!wide.is_cut(&input));
        }
    }

    /// Tightening any window never accepts a candidate that was rejected.
    #[test]
    fn tightening_never_accepts(input in arb_input(), t in arb_thresholds(), delta in 0.0..0.5_f64) {
        let wide = CutEvaluator::new(widened(&t, delta));
        let narrow = CutEvaluator::new(t);
        if wide.is_cut(&input) {
            prop_assert!(narrow.is_cut(&input));
        }
    }

    /// Each clause on its own is monotonic too.
    #[test]
    fn clause_flags_only_clear_when_widened(input in arb_input(), t in arb_thresholds(), delta in 0.0..0.5_f64) {
        let before = CutEvaluator::new(t.clone()).evaluate(&input).flags();
        let after = CutEvaluator::new(widened(&t, delta)).evaluate(&input).flags();
        for (b, a) in before.iter().zip(after.iter()) {
            prop_assert!(!(*a && !*b));
        }
    }
}

// ── 2. Combiner determinism ──────────────────────────────────────────

proptest! {
    #[test]
    fn combine_is_deterministic(a in arb_hypothesis(), b in arb_hypothesis(), c in arb_hypothesis()) {
        let first = combine([a, b, c]);
        let second = combine([a, b, c]);
        prop_assert_eq!(first.mass.to_bits(), second.mass.to_bits());
        prop_assert_eq!(first.pt.to_bits(), second.pt.to_bits());
        prop_assert_eq!(first.p.to_bits(), second.p.to_bits());
        // Three massive daughters are always time-like.
        prop_assert!(first.mass >= a.mass + b.mass + c.mass - 1e-9);
    }
}

// ── 3. Propagator round trip ─────────────────────────────────────────

proptest! {
    /// A reference point taken on the track's own helix has DCA (0, 0).
    #[test]
    fn point_on_helix_has_zero_dca(
        x in -1.0..1.0_f64,
        y in -1.0..1.0_f64,
        z in -5.0..5.0_f64,
        phi in -3.1..3.1_f64,
        tgl in -2.0..2.0_f64,
        pt in 0.2..10.0_f64,
        positive in any::<bool>(),
        s in -20.0..20.0_f64,
    ) {
        let charge = if positive { 1.0 } else { -1.0 };
        let param = TrackParam { x, y, z, phi, tgl, q_over_pt: charge / pt };
        let bz_kg = 5.0;
        let reference = Helix::new(&param, bz_kg).position_at(s);

        let dca = HelixPropagator
            .propagate_to_dca(&param, &reference, bz_kg, 100.0)
            .unwrap();
        prop_assert!(dca.xy.abs() < 1e-9, "xy = {}", dca.xy);
        prop_assert!(dca.z.abs() < 1e-9, "z = {}", dca.z);
    }
}

// ── 4. Histogram merge ───────────────────────────────────────────────

proptest! {
    #[test]
    fn merge_adds_entries_and_contents(
        xs in prop::collection::vec(-2.0..2.0_f64, 0..50),
        ys in prop::collection::vec(-2.0..2.0_f64, 0..50),
    ) {
        let axis = Axis::new(20, -1.0, 1.0, "x");
        let mut a = Histogram1D::new(axis.clone());
        let mut b = Histogram1D::new(axis.clone());
        let mut both = Histogram1D::new(axis);
        for &x in &xs {
            a.fill(x);
            both.fill(x);
        }
        for &y in &ys {
            b.fill(y);
            both.fill(y);
        }
        a.merge(&b).unwrap();
        prop_assert_eq!(a.entries(), both.entries());
        prop_assert_eq!(a.counts(), both.counts());
        prop_assert_eq!(a.underflow() + a.overflow(), both.underflow() + both.overflow());
    }
}
