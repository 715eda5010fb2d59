use serde::{Deserialize, Serialize};

use crate::config::{Settings, StopPolicy};
use crate::core::features::{mean, FeatureRecord};
use crate::core::scoring::Opportunity;
use crate::models::{Candle, CandleSeries, Direction};

/// Stop distance used when the computed risk collapses to zero, as a fraction of entry.
const ZERO_RISK_FALLBACK: f64 = 0.003;
const ENTRY_ANCHOR: f64 = 0.25;
const STOP_CANDLE_BUFFER: f64 = 0.15;
const STOP_RANGE_BUFFER: f64 = 0.10;
const MIN_CANDLE_RANGE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelSet {
    pub entry: f64,
    pub sl: f64,
    pub tp1: f64,
    pub tp2: f64,
    pub tp3: f64,
    /// Percent, e.g. `0.45` means 0.45%.
    pub sl_pct: f64,
    pub lev_min: f64,
    pub lev_max: f64,
}

impl LevelSet {
    pub fn risk(&self) -> f64 {
        (self.entry - self.sl).abs()
    }

    /// Reward-to-risk of a target; zero when risk is degenerate.
    pub fn rr_to(&self, target: f64) -> f64 {
        let risk = self.risk();
        if risk <= 0.0 {
            return 0.0;
        }
        (target - self.entry).abs() / risk
    }
}

/// Local volatility envelope the stop distance must sit inside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseBand {
    pub floor: f64,
    pub ceiling: f64,
}

impl NoiseBand {
    /// Measured over the trailing `noise_lookback` raw candles.
    pub fn measure(candles: &CandleSeries, settings: &Settings) -> Self {
        let window = candles.tail(settings.noise_lookback);
        let mean_wick = (mean(&window.upper_wicks()) + mean(&window.lower_wicks())) / 2.0;
        let mean_range = mean(&window.ranges());

        Self {
            floor: (settings.noise_wick_factor * mean_wick)
                .max(settings.noise_range_factor * mean_range),
            ceiling: settings.max_risk_factor * mean_range,
        }
    }

    /// Push the stop out to the floor, then pull it back in to the ceiling.
    fn bound(&self, side: Direction, entry: f64, sl: f64) -> f64 {
        let mut risk = (entry - sl).abs();
        if risk < self.floor {
            risk = self.floor;
        }
        if self.ceiling > 0.0 && risk > self.ceiling {
            risk = self.ceiling;
        }
        stop_at(side, entry, risk)
    }
}

pub fn sl_pct_of(entry: f64, sl: f64) -> f64 {
    if entry == 0.0 {
        return 0.0;
    }
    (entry - sl).abs() / entry * 100.0
}

fn stop_at(side: Direction, entry: f64, risk: f64) -> f64 {
    entry - side.sign() * risk
}

fn target_at(side: Direction, entry: f64, rr: f64, risk: f64) -> f64 {
    entry + side.sign() * rr * risk
}

/// Clamp the stop so its percent distance lies in `[min_sl_pct, max_sl_pct]`.
fn clamp_to_sl_band(side: Direction, entry: f64, sl: f64, settings: &Settings) -> f64 {
    if entry <= 0.0 {
        return sl;
    }
    let pct = sl_pct_of(entry, sl);
    if pct < settings.min_sl_pct {
        stop_at(side, entry, entry * settings.min_sl_pct / 100.0)
    } else if pct > settings.max_sl_pct {
        stop_at(side, entry, entry * settings.max_sl_pct / 100.0)
    } else {
        sl
    }
}

/// Guarantee a non-zero risk and derive `sl_pct` from the final pair.
pub fn finalize_risk(side: Direction, entry: f64, sl: f64) -> (f64, f64) {
    let sl = if (entry - sl).abs() <= 0.0 {
        stop_at(side, entry, entry.abs() * ZERO_RISK_FALLBACK)
    } else {
        sl
    };
    (sl, sl_pct_of(entry, sl))
}

/// (tp1, tp2, tp3) reward multiples; higher scores reach further.
pub fn rr_factors(score: f64, settings: &Settings) -> (f64, f64, f64) {
    let norm = score.clamp(0.0, 100.0) / 100.0;
    let rr2 = settings.min_rr_tp2 + 0.8 * norm;
    (0.7 * rr2, rr2, rr2 + 0.8)
}

fn anchor_entry(side: Direction, last: &Candle) -> f64 {
    let range = last.total_range().max(MIN_CANDLE_RANGE);
    let entry = match side {
        Direction::Long => (last.low + ENTRY_ANCHOR * range).min(last.close),
        Direction::Short => (last.high - ENTRY_ANCHOR * range).max(last.close),
    };
    if entry == 0.0 {
        last.close
    } else {
        entry
    }
}

fn structural_stop(side: Direction, last: &Candle, avg_range: f64) -> f64 {
    let range = last.total_range().max(MIN_CANDLE_RANGE);
    let buffer = STOP_CANDLE_BUFFER * range + STOP_RANGE_BUFFER * avg_range;
    match side {
        Direction::Long => last.low - buffer,
        Direction::Short => last.high + buffer,
    }
}

/// Entry, stop, targets and leverage hint for `side`. `None` only for an empty series.
pub fn build_levels(
    side: Direction,
    candles: &CandleSeries,
    f: &FeatureRecord,
    opp: &Opportunity,
    settings: &Settings,
) -> Option<LevelSet> {
    let last = candles.last()?;
    let entry = anchor_entry(side, last);
    let raw_sl = structural_stop(side, last, f.avg_range);

    let bounded = match settings.stop_policy {
        StopPolicy::NoiseFloor => NoiseBand::measure(candles, settings).bound(side, entry, raw_sl),
        StopPolicy::FixedPercent => clamp_to_sl_band(side, entry, raw_sl, settings),
    };
    let (sl, sl_pct) = finalize_risk(side, entry, bounded);
    let risk = (entry - sl).abs();

    let (rr1, rr2, rr3) = rr_factors(opp.score, settings);
    let (lev_min, lev_max) = settings.leverage_range_for_sl(sl_pct);

    Some(LevelSet {
        entry,
        sl,
        tp1: target_at(side, entry, rr1, risk),
        tp2: target_at(side, entry, rr2, risk),
        tp3: target_at(side, entry, rr3, risk),
        sl_pct,
        lev_min,
        lev_max,
    })
}
