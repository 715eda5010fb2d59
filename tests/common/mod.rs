#![allow(dead_code)]

use behaviour_engine::models::{Candle, CandleSeries};
use chrono::{DateTime, Duration, Utc};

pub fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

pub fn bar(i: usize, open: f64, high: f64, low: f64, close: f64) -> Candle {
    Candle {
        timestamp: base_time() + Duration::minutes(5 * i as i64),
        open,
        high,
        low,
        close,
    }
}

/// Create candles from (open, high, low, close) tuples with auto-incrementing 5m timestamps.
pub fn make_candles(data: &[(f64, f64, f64, f64)]) -> CandleSeries {
    CandleSeries::new(
        data.iter()
            .enumerate()
            .map(|(i, &(o, h, l, c))| bar(i, o, h, l, c))
            .collect(),
    )
}

/// Wickless bullish candles: opens step up by 0.1, bodies are 1.0.
pub fn make_rising_staircase(n: usize, start: f64) -> CandleSeries {
    CandleSeries::new(
        (0..n)
            .map(|i| {
                let open = start + i as f64 * 0.1;
                let close = open + 1.0;
                bar(i, open, close, open, close)
            })
            .collect(),
    )
}

/// Bear leg fading into a flush-and-reject bar around 20000. Scores 75 long.
pub fn make_flush_reversal() -> CandleSeries {
    let mut candles = Vec::with_capacity(40);
    let mut open = 20_000.0;
    for i in 0..39 {
        let body = 4.0 - 3.0 * i as f64 / 38.0;
        let lower = 4.5 - body;
        let close = open - body;
        candles.push(bar(i, open, open + 0.3, close - lower, close));
        open = close;
    }
    let close = open - 1.0;
    candles.push(bar(39, open, open + 0.3, close - 6.0, close));
    CandleSeries::new(candles)
}

/// Bull leg with fading bodies and growing upper wicks, no breakout flush. Scores 45 short.
pub fn make_tiring_rally() -> CandleSeries {
    let mut candles = Vec::with_capacity(40);
    let mut open = 20_000.0;
    for i in 0..40 {
        let body = 4.0 - 3.0 * i as f64 / 39.0;
        let upper = 4.5 - body;
        let close = open + body;
        candles.push(bar(i, open, close + upper, open - 0.3, close));
        open = close;
    }
    CandleSeries::new(candles)
}

/// Alternating small-bodied candles with long wicks on both sides.
pub fn make_chop(n: usize) -> CandleSeries {
    CandleSeries::new(
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    bar(i, 100.0, 101.0, 99.0, 100.1)
                } else {
                    bar(i, 100.1, 101.0, 99.0, 100.0)
                }
            })
            .collect(),
    )
}
