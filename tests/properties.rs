//! Property tests for pipeline invariants.
//!
//! Uses proptest to verify:
//! 1. Bounds: chop in [0, 100], category scores under their ceilings, opportunity in [0, 150]
//! 2. No direction means no score
//! 3. Raising the winning side never lowers the pre-damping score
//! 4. Level geometry: sl_pct derived from (entry, sl), targets ordered by side
//! 5. Determinism and the minimum-window gate

mod common;

use proptest::prelude::*;

use behaviour_engine::analysis::{Analyzer, Rejection};
use behaviour_engine::config::{GateContext, Settings, StopPolicy};
use behaviour_engine::core::categories::{Category, CategoryResult, CategoryScores};
use behaviour_engine::core::features::{compute_features, FeatureRecord};
use behaviour_engine::core::levels::build_levels;
use behaviour_engine::core::scoring::aggregate_opportunity;
use behaviour_engine::models::{CandleSeries, Direction, Tier};

use common::bar;

// ── Strategies (proptest) ────────────────────────────────────────────

/// (signed body, upper wick, lower wick, gap to next open)
fn arb_shape() -> impl Strategy<Value = (f64, f64, f64, f64)> {
    (-5.0..5.0_f64, 0.0..3.0_f64, 0.0..3.0_f64, -1.0..1.0_f64)
}

/// Well-formed random walk around 1000.
fn arb_series(min: usize, max: usize) -> impl Strategy<Value = CandleSeries> {
    prop::collection::vec(arb_shape(), min..max).prop_map(|shapes| {
        let mut open = 1000.0;
        let candles = shapes
            .into_iter()
            .enumerate()
            .map(|(i, (body, upper, lower, gap))| {
                let close = open + body;
                let c = bar(
                    i,
                    open,
                    open.max(close) + upper,
                    open.min(close) - lower,
                    close,
                );
                open = close + gap;
                c
            })
            .collect();
        CandleSeries::new(candles)
    })
}

fn arb_bias() -> impl Strategy<Value = Option<Direction>> {
    prop_oneof![
        Just(None),
        Just(Some(Direction::Long)),
        Just(Some(Direction::Short)),
    ]
}

fn arb_result(ceiling: f64) -> impl Strategy<Value = CategoryResult> {
    (0.0..=ceiling, arb_bias()).prop_map(|(score, bias)| CategoryResult { score, bias })
}

fn arb_scores() -> impl Strategy<Value = CategoryScores> {
    (
        arb_result(25.0),
        arb_result(30.0),
        arb_result(20.0),
        (0.0..=12.0_f64).prop_map(|score| CategoryResult { score, bias: None }),
        arb_result(12.0),
        arb_result(15.0),
        arb_result(10.0),
    )
        .prop_map(|(elr, far, cec, mc, vsde, awp, hbp)| CategoryScores {
            elr,
            far,
            cec,
            mc,
            vsde,
            awp,
            hbp,
        })
}

fn open_gate() -> GateContext {
    GateContext {
        min_tier: Tier::None,
        debug: false,
    }
}

// ── 1. Bounds ────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn scores_stay_in_bounds(candles in arb_series(5, 80)) {
        let s = Settings::default();
        let f = compute_features(&candles, &s).unwrap();
        prop_assert!((0.0..=100.0).contains(&f.chop_score));
        prop_assert!((0.0..=1.0).contains(&f.pos_in_range));

        let cats = CategoryScores::evaluate_all(&f, &s);
        for (cat, r) in cats.iter() {
            prop_assert!(r.score >= 0.0 && r.score <= cat.ceiling(), "{} = {}", cat, r.score);
        }
        prop_assert_eq!(cats.get(Category::Mc).bias, None);

        let opp = aggregate_opportunity(&f, &cats, &s);
        prop_assert!((0.0..=150.0).contains(&opp.score));
        if opp.direction.is_none() {
            prop_assert_eq!(opp.score, 0.0);
        }
    }
}

// ── 2. No direction, no score ────────────────────────────────────────

proptest! {
    #[test]
    fn unbiased_categories_score_zero(scores in prop::collection::vec(0.0..30.0_f64, 7)) {
        let mut cats = CategoryScores::default();
        for (cat, score) in Category::ALL.into_iter().zip(scores) {
            *cats.get_mut(cat) = CategoryResult { score, bias: None };
        }
        let opp = aggregate_opportunity(&FeatureRecord::default(), &cats, &Settings::default());
        prop_assert_eq!(opp.direction, None);
        prop_assert_eq!(opp.score, 0.0);
    }
}

// ── 3. Monotonic in the winning side ─────────────────────────────────

proptest! {
    #[test]
    fn raising_winner_never_lowers_raw_score(cats in arb_scores(), bump in 0.0..20.0_f64) {
        let s = Settings::default();
        let f = FeatureRecord::default();
        let before = aggregate_opportunity(&f, &cats, &s);

        if let Some(side) = before.direction {
            let mut raised = cats;
            let winner = Category::ALL
                .into_iter()
                .find(|c| cats.get(*c).bias == Some(side));
            if let Some(cat) = winner {
                raised.get_mut(cat).score += bump;
                let after = aggregate_opportunity(&f, &raised, &s);
                prop_assert_eq!(after.direction, Some(side));
                prop_assert!(after.raw_score >= before.raw_score);
            }
        }
    }
}

// ── 4. Level geometry ────────────────────────────────────────────────

proptest! {
    #[test]
    fn levels_are_consistent(
        candles in arb_series(1, 60),
        long in any::<bool>(),
        fixed in any::<bool>(),
        score in 0.0..150.0_f64,
    ) {
        let side = if long { Direction::Long } else { Direction::Short };
        let s = Settings {
            stop_policy: if fixed { StopPolicy::FixedPercent } else { StopPolicy::NoiseFloor },
            ..Settings::default()
        };
        let f = compute_features(&candles, &s).unwrap();
        let cats = CategoryScores::default();
        let mut opp = aggregate_opportunity(&f, &cats, &s);
        opp.score = score;
        opp.direction = Some(side);

        let lv = build_levels(side, &candles, &f, &opp, &s).unwrap();
        prop_assert!(lv.risk() > 0.0);
        prop_assert_eq!(lv.sl_pct, (lv.entry - lv.sl).abs() / lv.entry * 100.0);
        match side {
            Direction::Long => {
                prop_assert!(lv.sl < lv.entry);
                prop_assert!(lv.tp1 <= lv.tp2 && lv.tp2 <= lv.tp3);
            }
            Direction::Short => {
                prop_assert!(lv.sl > lv.entry);
                prop_assert!(lv.tp1 >= lv.tp2 && lv.tp2 >= lv.tp3);
            }
        }
        prop_assert!(lv.rr_to(lv.tp2) >= s.min_rr_tp2 * (1.0 - 1e-6));
    }
}

// ── 5. Determinism & minimum window ──────────────────────────────────

proptest! {
    #[test]
    fn evaluation_is_deterministic(candles in arb_series(40, 70)) {
        let analyzer = Analyzer::default();
        let a = analyzer.evaluate("x", &candles, &open_gate());
        let b = analyzer.evaluate("x", &candles, &open_gate());
        prop_assert_eq!(a, b);
    }

    #[test]
    fn short_windows_never_signal(candles in arb_series(0, 40)) {
        let err = Analyzer::default()
            .evaluate("x", &candles, &open_gate())
            .unwrap_err();
        let is_insufficient = matches!(err, Rejection::InsufficientCandles { .. });
        prop_assert!(is_insufficient);
    }
}
