use chrono::{DateTime, Duration, Utc};

use crate::models::{Candle, CandleSeries};

fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn bar(i: usize, open: f64, high: f64, low: f64, close: f64) -> Candle {
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

/// Create n rising (bullish) candles starting from `start` price.
pub fn make_bullish_trend(n: usize, start: f64) -> CandleSeries {
    CandleSeries::new(
        (0..n)
            .map(|i| {
                let open = start + i as f64 * 10.0;
                let close = open + 8.0;
                bar(i, open, close + 2.0, open - 1.0, close)
            })
            .collect(),
    )
}

/// Create n falling (bearish) candles starting from `start` price.
pub fn make_bearish_trend(n: usize, start: f64) -> CandleSeries {
    CandleSeries::new(
        (0..n)
            .map(|i| {
                let open = start - i as f64 * 10.0;
                let close = open - 8.0;
                bar(i, open, open + 1.0, close - 2.0, close)
            })
            .collect(),
    )
}

/// Wickless bullish candles whose opens step up by 0.1 while each body is 1.0.
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

/// 39-bar bear leg with shrinking bodies and growing lower wicks around 20000,
/// closed by a candle flushing ~3.5 below the prior lows and rejecting.
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
