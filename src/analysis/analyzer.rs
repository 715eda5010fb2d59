use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, trace};

use crate::analysis::alert::render_alert;
use crate::analysis::signals::{HtfContext, SignalRecord};
use crate::config::{GateContext, Settings, StopPolicy};
use crate::core::categories::CategoryScores;
use crate::core::features::{compute_features, FeatureRecord};
use crate::core::levels::build_levels;
use crate::core::scoring::aggregate_opportunity;
use crate::models::{CandleSeries, Direction, Tier};

/// Slack on the fixed SL% band so a stop clamped onto the boundary is not rejected by rounding.
const SL_BAND_TOLERANCE: f64 = 1e-9;
/// Leg dominance a side needs over the other to count as a strong environment.
const STRONG_LEG_RATIO: f64 = 1.2;

/// Why a cycle produced no signal.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Rejection {
    #[error("insufficient data: {have} candles, need {need}")]
    InsufficientCandles { have: usize, need: usize },

    #[error("insufficient data: empty feature record")]
    NoFeatures,

    #[error("no clear direction (long {long:.1} vs short {short:.1})")]
    NoDirection { long: f64, short: f64 },

    #[error("score {score:.1} below minimum {min:.1}")]
    ScoreBelowMinimum { score: f64, min: f64 },

    #[error("{side} against a strong trend without a flush")]
    AntiCountertrend { side: Direction },

    #[error("could not build levels")]
    NoLevels,

    #[error("degenerate risk (entry {entry}, sl {sl})")]
    ZeroRisk { entry: f64, sl: f64 },

    #[error("RR to TP2 {rr:.2} below minimum {min:.2}")]
    RrBelowMinimum { rr: f64, min: f64 },

    #[error("SL {sl_pct:.2}% outside [{min:.2}%, {max:.2}%]")]
    SlOutOfBand { sl_pct: f64, min: f64, max: f64 },

    #[error("tier {tier} below minimum {min_tier}")]
    TierBelowMinimum { tier: Tier, min_tier: Tier },
}

impl Rejection {
    /// Rejections caused by missing data rather than a failed quality gate.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(
            self,
            Rejection::InsufficientCandles { .. } | Rejection::NoFeatures
        )
    }
}

pub fn tier_for_score(score: f64, settings: &Settings) -> Tier {
    if score >= settings.a_plus_score {
        Tier::APlus
    } else if score >= settings.a_score() {
        Tier::A
    } else if score >= settings.min_score_to_send {
        Tier::B
    } else {
        Tier::None
    }
}

/// Up-leg dominating the window, or a confirmed bullish HTF read.
pub fn is_strong_bull_env(f: &FeatureRecord) -> bool {
    let strong_leg =
        f.bull_count as f64 > f.bear_count as f64 * STRONG_LEG_RATIO && f.net_flow > 0.0;
    strong_leg || f.htf_confirmed_bull()
}

pub fn is_strong_bear_env(f: &FeatureRecord) -> bool {
    let strong_leg =
        f.bear_count as f64 > f.bull_count as f64 * STRONG_LEG_RATIO && f.net_flow < 0.0;
    strong_leg || f.htf_confirmed_bear()
}

/// Counter-trend entries are only allowed off a flush in the signal's favour.
pub fn fails_anti_countertrend(side: Direction, f: &FeatureRecord) -> bool {
    match side {
        Direction::Long => is_strong_bear_env(f) && !f.has_flush_down,
        Direction::Short => is_strong_bull_env(f) && !f.has_flush_up,
    }
}

/// Runs the full pipeline for one instrument. Holds only immutable settings, so one
/// analyzer can serve every symbol in parallel.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    settings: Settings,
}

impl Analyzer {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Gate chain; the first failing gate ends the cycle.
    pub fn evaluate(
        &self,
        symbol: &str,
        candles: &CandleSeries,
        gate: &GateContext,
    ) -> Result<SignalRecord, Rejection> {
        let s = &self.settings;

        if candles.len() < s.min_candles {
            return Err(Rejection::InsufficientCandles {
                have: candles.len(),
                need: s.min_candles,
            });
        }

        let features = compute_features(candles, s).ok_or(Rejection::NoFeatures)?;
        let categories = CategoryScores::evaluate_all(&features, s);
        let opp = aggregate_opportunity(&features, &categories, s);

        trace!(
            "[EVAL] {} chop={:.1} {} -> L{:.1}/S{:.1} score={:.1}",
            symbol,
            features.chop_score,
            categories.summary(),
            opp.bias_long_score,
            opp.bias_short_score,
            opp.score
        );

        let side = opp.direction.ok_or(Rejection::NoDirection {
            long: opp.bias_long_score,
            short: opp.bias_short_score,
        })?;

        if opp.score < s.min_score_to_send {
            return Err(Rejection::ScoreBelowMinimum {
                score: opp.score,
                min: s.min_score_to_send,
            });
        }

        if s.anti_countertrend && fails_anti_countertrend(side, &features) {
            return Err(Rejection::AntiCountertrend { side });
        }

        let levels = build_levels(side, candles, &features, &opp, s).ok_or(Rejection::NoLevels)?;

        if levels.risk() <= 0.0 {
            return Err(Rejection::ZeroRisk {
                entry: levels.entry,
                sl: levels.sl,
            });
        }
        let rr = levels.rr_to(levels.tp2);
        if rr < s.min_rr_tp2 {
            return Err(Rejection::RrBelowMinimum {
                rr,
                min: s.min_rr_tp2,
            });
        }

        if s.stop_policy == StopPolicy::FixedPercent
            && (levels.sl_pct < s.min_sl_pct - SL_BAND_TOLERANCE
                || levels.sl_pct > s.max_sl_pct + SL_BAND_TOLERANCE)
        {
            return Err(Rejection::SlOutOfBand {
                sl_pct: levels.sl_pct,
                min: s.min_sl_pct,
                max: s.max_sl_pct,
            });
        }

        let tier = tier_for_score(opp.score, s);
        if tier < gate.min_tier {
            return Err(Rejection::TierBelowMinimum {
                tier,
                min_tier: gate.min_tier,
            });
        }

        let symbol = symbol.to_uppercase();
        let message = render_alert(&symbol, side, &levels, tier, opp.score, s);

        Ok(SignalRecord {
            symbol,
            side,
            entry: levels.entry,
            sl: levels.sl,
            tp1: levels.tp1,
            tp2: levels.tp2,
            tp3: levels.tp3,
            sl_pct: levels.sl_pct,
            lev_min: levels.lev_min,
            lev_max: levels.lev_max,
            tier,
            score: opp.score,
            htf_context: HtfContext::from(&features),
            categories,
            features,
            message,
        })
    }

    /// `evaluate` with the rejection logged and dropped.
    pub fn analyze(
        &self,
        symbol: &str,
        candles: &CandleSeries,
        gate: &GateContext,
    ) -> Option<SignalRecord> {
        match self.evaluate(symbol, candles, gate) {
            Ok(signal) => Some(signal),
            Err(reason) => {
                if gate.debug {
                    debug!("[EVAL] {} rejected: {}", symbol, reason);
                } else {
                    trace!("[EVAL] {} rejected: {}", symbol, reason);
                }
                None
            }
        }
    }

    /// One cycle per `(symbol, window)` pair, in parallel. Output keeps input order.
    pub fn analyze_batch(
        &self,
        windows: &[(String, CandleSeries)],
        gate: &GateContext,
    ) -> Vec<SignalRecord> {
        windows
            .par_iter()
            .filter_map(|(symbol, candles)| self.analyze(symbol, candles, gate))
            .collect()
    }
}
