use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Malformed bar rejected at the boundary, before it can reach the analysis core.
#[derive(Debug, Error, PartialEq)]
pub enum CandleError {
    #[error("non-finite {field} in candle at {timestamp}")]
    NonFinite {
        field: &'static str,
        timestamp: DateTime<Utc>,
    },

    #[error("high {high} below low {low} in candle at {timestamp}")]
    InvertedRange {
        high: f64,
        low: f64,
        timestamp: DateTime<Utc>,
    },

    #[error("open/close outside [low, high] in candle at {timestamp}")]
    BodyOutsideRange { timestamp: DateTime<Utc> },

    #[error("candle at {timestamp} is older than the previous bar")]
    OutOfOrder { timestamp: DateTime<Utc> },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candle {
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// Signed body, positive for bullish candles.
    pub fn signed_body(&self) -> f64 {
        self.close - self.open
    }

    pub fn total_range(&self) -> f64 {
        self.high - self.low
    }

    pub fn upper_wick(&self) -> f64 {
        self.high - self.close.max(self.open)
    }

    pub fn lower_wick(&self) -> f64 {
        self.close.min(self.open) - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    pub fn validate(&self) -> Result<(), CandleError> {
        for (field, value) in [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ] {
            if !value.is_finite() {
                return Err(CandleError::NonFinite {
                    field,
                    timestamp: self.timestamp,
                });
            }
        }

        if self.high < self.low {
            return Err(CandleError::InvertedRange {
                high: self.high,
                low: self.low,
                timestamp: self.timestamp,
            });
        }

        if self.open.max(self.close) > self.high || self.open.min(self.close) < self.low {
            return Err(CandleError::BodyOutsideRange {
                timestamp: self.timestamp,
            });
        }

        Ok(())
    }
}

/// Ordered (oldest first) window of candles for one instrument.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new(candles: Vec<Candle>) -> Self {
        Self { candles }
    }

    /// Build a series, rejecting malformed or out-of-order bars.
    pub fn validated(candles: Vec<Candle>) -> Result<Self, CandleError> {
        let mut prev: Option<DateTime<Utc>> = None;
        for c in &candles {
            c.validate()?;
            if let Some(ts) = prev {
                if c.timestamp < ts {
                    return Err(CandleError::OutOfOrder {
                        timestamp: c.timestamp,
                    });
                }
            }
            prev = Some(c.timestamp);
        }
        Ok(Self { candles })
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn first(&self) -> Option<&Candle> {
        self.candles.first()
    }

    pub fn tail(&self, n: usize) -> CandleSeries {
        let start = self.candles.len().saturating_sub(n);
        CandleSeries::new(self.candles[start..].to_vec())
    }

    pub fn slice(&self, start: usize, end: usize) -> CandleSeries {
        let e = end.min(self.candles.len());
        let s = start.min(e);
        CandleSeries::new(self.candles[s..e].to_vec())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candle> {
        self.candles.iter()
    }

    pub fn as_slice(&self) -> &[Candle] {
        &self.candles
    }

    pub fn highs_max(&self) -> f64 {
        self.candles
            .iter()
            .map(|c| c.high)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn lows_min(&self) -> f64 {
        self.candles
            .iter()
            .map(|c| c.low)
            .fold(f64::INFINITY, f64::min)
    }

    pub fn bodies(&self) -> Vec<f64> {
        self.candles.iter().map(Candle::body).collect()
    }

    pub fn ranges(&self) -> Vec<f64> {
        self.candles.iter().map(Candle::total_range).collect()
    }

    pub fn upper_wicks(&self) -> Vec<f64> {
        self.candles.iter().map(Candle::upper_wick).collect()
    }

    pub fn lower_wicks(&self) -> Vec<f64> {
        self.candles.iter().map(Candle::lower_wick).collect()
    }

    pub fn push(&mut self, candle: Candle) {
        self.candles.push(candle);
    }

    pub fn pop(&mut self) -> Option<Candle> {
        self.candles.pop()
    }

    /// Drop the oldest candles so at most `capacity` remain.
    pub fn truncate_front(&mut self, capacity: usize) {
        let excess = self.candles.len().saturating_sub(capacity);
        if excess > 0 {
            self.candles.drain(..excess);
        }
    }
}

impl std::ops::Index<usize> for CandleSeries {
    type Output = Candle;
    fn index(&self, index: usize) -> &Self::Output {
        &self.candles[index]
    }
}

impl<'a> IntoIterator for &'a CandleSeries {
    type Item = &'a Candle;
    type IntoIter = std::slice::Iter<'a, Candle>;
    fn into_iter(self) -> Self::IntoIter {
        self.candles.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::make_candles;

    fn bullish_candle() -> Candle {
        Candle {
            timestamp: Utc::now(),
            open: 100.0,
            high: 115.0,
            low: 95.0,
            close: 110.0,
        }
    }

    #[test]
    fn candle_body_and_range() {
        let c = bullish_candle();
        assert!((c.body() - 10.0).abs() < 1e-9);
        assert!((c.signed_body() - 10.0).abs() < 1e-9);
        assert!((c.total_range() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn candle_wicks() {
        let c = bullish_candle(); // O=100, H=115, L=95, C=110
        assert!((c.upper_wick() - 5.0).abs() < 1e-9);
        assert!((c.lower_wick() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn validate_rejects_non_finite_and_inverted() {
        let mut c = bullish_candle();
        c.close = f64::NAN;
        assert!(matches!(
            c.validate(),
            Err(CandleError::NonFinite { field: "close", .. })
        ));

        let mut c = bullish_candle();
        c.high = 90.0;
        assert!(matches!(c.validate(), Err(CandleError::InvertedRange { .. })));

        let mut c = bullish_candle();
        c.close = 120.0;
        assert!(matches!(c.validate(), Err(CandleError::BodyOutsideRange { .. })));

        assert!(bullish_candle().validate().is_ok());
    }

    #[test]
    fn validated_series_rejects_out_of_order() {
        let s = make_candles(&[(100.0, 101.0, 99.0, 100.5), (100.5, 102.0, 100.0, 101.0)]);
        let mut candles = s.as_slice().to_vec();
        assert!(CandleSeries::validated(candles.clone()).is_ok());
        candles.swap(0, 1);
        assert!(matches!(
            CandleSeries::validated(candles),
            Err(CandleError::OutOfOrder { .. })
        ));
    }

    #[test]
    fn series_tail_slice_and_extremes() {
        let s = make_candles(&[
            (100.0, 200.0, 50.0, 150.0),
            (150.0, 300.0, 80.0, 250.0),
            (250.0, 280.0, 60.0, 270.0),
        ]);
        assert_eq!(s.tail(2).len(), 2);
        assert!((s.tail(2)[0].open - 150.0).abs() < 1e-9);
        assert_eq!(s.tail(10).len(), 3);
        assert_eq!(s.slice(1, 3).len(), 2);
        assert_eq!(s.slice(5, 2).len(), 0);
        assert!((s.highs_max() - 300.0).abs() < 1e-9);
        assert!((s.lows_min() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn truncate_front_keeps_newest() {
        let mut s = make_candles(&[
            (1.0, 1.0, 1.0, 1.0),
            (2.0, 2.0, 2.0, 2.0),
            (3.0, 3.0, 3.0, 3.0),
        ]);
        s.truncate_front(2);
        assert_eq!(s.len(), 2);
        assert!((s[0].open - 2.0).abs() < 1e-9);
        s.truncate_front(5);
        assert_eq!(s.len(), 2);
    }
}
