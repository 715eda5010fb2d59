use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::models::{CandleSeries, HtfDominance, HtfDrift, VolMode, WickBias};

/// Everything the detectors know about the current window. Computed once per cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    // leg & flow
    pub bull_body_sum: f64,
    pub bear_body_sum: f64,
    pub bull_count: usize,
    pub bear_count: usize,
    pub net_flow: f64,

    // body & range
    pub avg_body: f64,
    pub avg_range: f64,
    pub body_trend: f64,
    pub range_trend: f64,

    // wicks
    pub avg_up_wick: f64,
    pub avg_down_wick: f64,
    pub wick_bias: WickBias,

    // micro range
    pub micro_low: f64,
    pub micro_high: f64,
    pub pos_in_range: f64,
    pub last_price: f64,

    // flush
    pub has_flush_down: bool,
    pub has_flush_up: bool,
    pub flush_depth_down: f64,
    pub flush_depth_up: f64,

    pub chop_score: f64,

    // HTF virtual read
    pub htf_dom: HtfDominance,
    pub htf_drift: HtfDrift,
    pub htf_vol_mode: VolMode,
    pub htf_wick_bias: WickBias,
}

impl Default for FeatureRecord {
    fn default() -> Self {
        Self {
            bull_body_sum: 0.0,
            bear_body_sum: 0.0,
            bull_count: 0,
            bear_count: 0,
            net_flow: 0.0,
            avg_body: 0.0,
            avg_range: 0.0,
            body_trend: 0.0,
            range_trend: 0.0,
            avg_up_wick: 0.0,
            avg_down_wick: 0.0,
            wick_bias: WickBias::Mixed,
            micro_low: 0.0,
            micro_high: 0.0,
            pos_in_range: 0.5,
            last_price: 0.0,
            has_flush_down: false,
            has_flush_up: false,
            flush_depth_down: 0.0,
            flush_depth_up: 0.0,
            chop_score: 0.0,
            htf_dom: HtfDominance::None,
            htf_drift: HtfDrift::Flat,
            htf_vol_mode: VolMode::Normal,
            htf_wick_bias: WickBias::Mixed,
        }
    }
}

impl FeatureRecord {
    /// HTF dominance and drift agree on a bullish read.
    pub fn htf_confirmed_bull(&self) -> bool {
        self.htf_dom == HtfDominance::Bull && self.htf_drift == HtfDrift::Up
    }

    pub fn htf_confirmed_bear(&self) -> bool {
        self.htf_dom == HtfDominance::Bear && self.htf_drift == HtfDrift::Down
    }

    pub fn leg_candles(&self) -> usize {
        self.bull_count + self.bear_count
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct LegFlow {
    bull_body: f64,
    bear_body: f64,
    bull_count: usize,
    bear_count: usize,
}

impl LegFlow {
    fn from_series(segment: &CandleSeries) -> Self {
        let mut flow = LegFlow::default();
        for c in segment {
            let b = c.signed_body();
            if b > 0.0 {
                flow.bull_body += b;
                flow.bull_count += 1;
            } else if b < 0.0 {
                flow.bear_body += b.abs();
                flow.bear_count += 1;
            }
        }
        flow
    }

    fn net(&self) -> f64 {
        self.bull_body - self.bear_body
    }
}

#[derive(Debug, Clone, Copy)]
struct FlushRead {
    has_down: bool,
    has_up: bool,
    depth_down: f64,
    depth_up: f64,
}

impl FlushRead {
    fn none() -> Self {
        Self {
            has_down: false,
            has_up: false,
            depth_down: 0.0,
            depth_up: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct HtfRead {
    dom: HtfDominance,
    drift: HtfDrift,
    vol_mode: VolMode,
    wick_bias: WickBias,
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// `mean(second half) / mean(first half) - 1`; zero for short or degenerate inputs.
fn trend_from_halves(values: &[f64]) -> f64 {
    if values.len() < 4 {
        return 0.0;
    }
    let (first, second) = values.split_at(values.len() / 2);
    let first = mean(first);
    if first <= 0.0 {
        return 0.0;
    }
    mean(second) / first - 1.0
}

/// Compute the feature record for the trailing window. `None` means insufficient data.
pub fn compute_features(candles: &CandleSeries, settings: &Settings) -> Option<FeatureRecord> {
    let last = candles.last()?;
    let segment = candles.tail(settings.feature_window);

    let bodies = segment.bodies();
    let ranges = segment.ranges();
    let avg_body = mean(&bodies);
    let avg_range = mean(&ranges);
    let avg_up_wick = mean(&segment.upper_wicks());
    let avg_down_wick = mean(&segment.lower_wicks());

    let flow = LegFlow::from_series(&segment);
    let (micro_low, micro_high, pos_in_range) = micro_range(&segment);
    let flush = detect_flush(&segment, avg_range, settings);
    let htf = htf_virtual(candles, settings);

    Some(FeatureRecord {
        bull_body_sum: flow.bull_body,
        bear_body_sum: flow.bear_body,
        bull_count: flow.bull_count,
        bear_count: flow.bear_count,
        net_flow: flow.net(),
        avg_body,
        avg_range,
        body_trend: trend_from_halves(&bodies),
        range_trend: trend_from_halves(&ranges),
        avg_up_wick,
        avg_down_wick,
        wick_bias: WickBias::from_wicks(avg_up_wick, avg_down_wick),
        micro_low,
        micro_high,
        pos_in_range,
        last_price: last.close,
        has_flush_down: flush.has_down,
        has_flush_up: flush.has_up,
        flush_depth_down: flush.depth_down,
        flush_depth_up: flush.depth_up,
        chop_score: chop_score(&segment, avg_body, settings),
        htf_dom: htf.dom,
        htf_drift: htf.drift,
        htf_vol_mode: htf.vol_mode,
        htf_wick_bias: htf.wick_bias,
    })
}

fn micro_range(segment: &CandleSeries) -> (f64, f64, f64) {
    let last = match segment.last() {
        Some(c) => c.close,
        None => return (0.0, 0.0, 0.5),
    };
    let high = segment.highs_max();
    let low = segment.lows_min();

    if high <= low {
        return (low, high, 0.5);
    }
    let pos = ((last - low) / (high - low)).clamp(0.0, 1.0);
    (low, high, pos)
}

/// Flush of the last candle beyond the extremes of the `flush_lookback` candles before it.
fn detect_flush(segment: &CandleSeries, avg_range: f64, settings: &Settings) -> FlushRead {
    let n = segment.len();
    let lookback = settings.flush_lookback;
    if n < lookback + 2 || avg_range <= 0.0 {
        return FlushRead::none();
    }

    let last = &segment[n - 1];
    let history = segment.slice(n - lookback - 1, n - 1);
    if history.is_empty() {
        return FlushRead::none();
    }

    let depth_down = (history.lows_min() - last.low).max(0.0) / avg_range;
    let depth_up = (last.high - history.highs_max()).max(0.0) / avg_range;

    FlushRead {
        has_down: depth_down >= settings.flush_min_depth_ratio,
        has_up: depth_up >= settings.flush_min_depth_ratio,
        depth_down,
        depth_up,
    }
}

/// 0..=100, higher is choppier.
fn chop_score(segment: &CandleSeries, avg_body: f64, settings: &Settings) -> f64 {
    let n = segment.len();
    if n < 5 || avg_body <= 0.0 {
        return 0.0;
    }

    // Dojis neither flip nor reset the running colour.
    let mut flips = 0usize;
    let mut prev_sign = 0i8;
    for c in segment {
        let sign = if c.is_bullish() {
            1
        } else if c.is_bearish() {
            -1
        } else {
            0
        };
        if prev_sign != 0 && sign != 0 && sign != prev_sign {
            flips += 1;
        }
        if sign != 0 {
            prev_sign = sign;
        }
    }
    let color_flip_ratio = flips as f64 / (n - 1).max(1) as f64;

    let small_bodies = segment
        .iter()
        .filter(|c| c.body() < settings.small_body_factor * avg_body)
        .count();
    let small_body_ratio = small_bodies as f64 / n as f64;

    let two_sided = segment
        .iter()
        .filter(|c| {
            let r = c.total_range();
            r > 0.0
                && c.upper_wick() / r >= settings.big_wick_ratio
                && c.lower_wick() / r >= settings.big_wick_ratio
        })
        .count();
    let two_sided_ratio = two_sided as f64 / n as f64;

    let raw = settings.chop_weight_color_flip * color_flip_ratio
        + settings.chop_weight_small_body * small_body_ratio
        + settings.chop_weight_two_sided_wick * two_sided_ratio;

    (raw * 100.0).clamp(0.0, 100.0)
}

fn htf_virtual(candles: &CandleSeries, settings: &Settings) -> HtfRead {
    let seg = candles.tail(settings.htf_window);
    if seg.len() < 4 {
        return HtfRead {
            dom: HtfDominance::None,
            drift: HtfDrift::Flat,
            vol_mode: VolMode::Normal,
            wick_bias: WickBias::Mixed,
        };
    }

    let flow = LegFlow::from_series(&seg);
    let margin = flow.bull_body.max(flow.bear_body) * 0.25;
    let dom = if flow.net() > margin {
        HtfDominance::Bull
    } else if flow.net() < -margin {
        HtfDominance::Bear
    } else {
        HtfDominance::None
    };

    let mut drift = HtfDrift::Flat;
    if let (Some(first), Some(last)) = (seg.first(), seg.last()) {
        if first.close > 0.0 {
            let pct = (last.close - first.close) / first.close * 100.0;
            if pct > settings.htf_drift_tolerance_pct {
                drift = HtfDrift::Up;
            } else if pct < -settings.htf_drift_tolerance_pct {
                drift = HtfDrift::Down;
            }
        }
    }

    let ranges = seg.ranges();
    let (first_half, second_half) = ranges.split_at(ranges.len() / 2);
    let r1 = mean(first_half);
    let vol_mode = if r1 > 0.0 {
        let ratio = mean(second_half) / r1;
        if ratio > 1.15 {
            VolMode::Expand
        } else if ratio < 0.85 {
            VolMode::Contract
        } else {
            VolMode::Normal
        }
    } else {
        VolMode::Normal
    };

    HtfRead {
        dom,
        drift,
        vol_mode,
        wick_bias: WickBias::from_wicks(mean(&seg.upper_wicks()), mean(&seg.lower_wicks())),
    }
}
