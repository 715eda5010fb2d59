use std::collections::HashMap;

use crate::models::{Candle, CandleError, CandleSeries};

/// Rolling per-symbol candle windows. Bars are validated on the way in, so
/// everything handed to the analyzer is finite, well-formed and ordered.
#[derive(Debug, Clone)]
pub struct CandleBuffer {
    capacity: usize,
    series: HashMap<String, CandleSeries>,
}

impl CandleBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            series: HashMap::new(),
        }
    }

    /// Append a closed bar. A bar with the same timestamp as the newest one replaces it.
    pub fn push(&mut self, symbol: &str, candle: Candle) -> Result<(), CandleError> {
        candle.validate()?;
        let series = self.series.entry(symbol.to_string()).or_default();

        if let Some(last_ts) = series.last().map(|c| c.timestamp) {
            if candle.timestamp < last_ts {
                return Err(CandleError::OutOfOrder {
                    timestamp: candle.timestamp,
                });
            }
            if candle.timestamp == last_ts {
                series.pop();
            }
        }

        series.push(candle);
        series.truncate_front(self.capacity);
        Ok(())
    }

    pub fn get(&self, symbol: &str) -> Option<&CandleSeries> {
        self.series.get(symbol)
    }

    pub fn len(&self, symbol: &str) -> usize {
        self.series.get(symbol).map_or(0, CandleSeries::len)
    }

    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.series.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Owned copy of a symbol's window, detached from later pushes.
    pub fn snapshot(&self, symbol: &str) -> Option<CandleSeries> {
        self.series.get(symbol).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::make_candles;

    fn bars(n: usize) -> Vec<Candle> {
        let data: Vec<(f64, f64, f64, f64)> = (0..n)
            .map(|i| {
                let p = 100.0 + i as f64;
                (p, p + 1.0, p - 1.0, p + 0.5)
            })
            .collect();
        make_candles(&data).as_slice().to_vec()
    }

    #[test]
    fn evicts_oldest_beyond_capacity() {
        let mut buf = CandleBuffer::new(3);
        for c in bars(5) {
            buf.push("BTCUSDT", c).unwrap();
        }
        let s = buf.get("BTCUSDT").unwrap();
        assert_eq!(s.len(), 3);
        assert!((s[0].open - 102.0).abs() < 1e-9);
        assert_eq!(buf.len("ETHUSDT"), 0);
    }

    #[test]
    fn rejects_malformed_and_out_of_order() {
        let mut buf = CandleBuffer::new(10);
        let candles = bars(2);
        buf.push("BTCUSDT", candles[1].clone()).unwrap();
        assert!(matches!(
            buf.push("BTCUSDT", candles[0].clone()),
            Err(CandleError::OutOfOrder { .. })
        ));

        let mut bad = candles[1].clone();
        bad.low = bad.high + 1.0;
        assert!(matches!(
            buf.push("ETHUSDT", bad),
            Err(CandleError::InvertedRange { .. })
        ));
        assert_eq!(buf.symbols(), vec!["BTCUSDT"]);
    }

    #[test]
    fn same_timestamp_replaces_last_bar() {
        let mut buf = CandleBuffer::new(10);
        let candles = bars(1);
        buf.push("BTCUSDT", candles[0].clone()).unwrap();
        let mut revised = candles[0].clone();
        revised.close = 100.9;
        buf.push("BTCUSDT", revised).unwrap();

        let s = buf.snapshot("BTCUSDT").unwrap();
        assert_eq!(s.len(), 1);
        assert!((s[0].close - 100.9).abs() < 1e-9);
    }
}
