use std::collections::BTreeSet;

use anyhow::Result;
use tracing::{debug, info, warn};

use behaviour_engine::analysis::{Analyzer, SignalRecord};
use behaviour_engine::config::{Config, GateContext};
use behaviour_engine::feed::{BarBatch, CandleBuffer, CandleFeed};
use behaviour_engine::models::CandleSeries;

#[derive(Debug, Default, Clone, Copy)]
pub struct RunSummary {
    pub batches: usize,
    pub bars: usize,
    pub rejected_bars: usize,
    pub signals: usize,
}

/// Drives one analysis cycle per symbol for every closed bar the feed yields.
pub struct Runner {
    analyzer: Analyzer,
    gate: GateContext,
    feed: Box<dyn CandleFeed>,
    buffer: CandleBuffer,
    summary: RunSummary,
}

impl Runner {
    pub fn new(cfg: &Config, feed: Box<dyn CandleFeed>) -> Self {
        let s = &cfg.settings;

        info!("{}", "=".repeat(60));
        info!("Behaviour engine starting up");
        info!(
            "Bars: {} | window {} (HTF {}) | min candles {}",
            s.bar_timeframe, s.feature_window, s.htf_window, s.min_candles
        );
        info!(
            "Send >= {:.0} | A >= {:.0} | A+ >= {:.0} | min RR(TP2) {:.2}",
            s.min_score_to_send,
            s.a_score(),
            s.a_plus_score,
            s.min_rr_tp2
        );
        info!(
            "Stops: {} | anti-countertrend: {}",
            s.stop_policy,
            if s.anti_countertrend { "on" } else { "off" }
        );
        info!("Min tier: {} | debug: {}", cfg.gate.min_tier, cfg.gate.debug);
        info!("{}", "=".repeat(60));

        Self {
            analyzer: Analyzer::new(cfg.settings.clone()),
            gate: cfg.gate,
            feed,
            buffer: CandleBuffer::new(cfg.buffer_capacity),
            summary: RunSummary::default(),
        }
    }

    pub async fn run(&mut self) -> Result<RunSummary> {
        while let Some(batch) = self.feed.next_batch().await? {
            let signals = self.process(batch);
            for signal in &signals {
                self.emit(signal);
            }
        }

        info!(
            "Feed exhausted: {} batches, {} bars ({} rejected), {} signals",
            self.summary.batches,
            self.summary.bars,
            self.summary.rejected_bars,
            self.summary.signals
        );
        Ok(self.summary)
    }

    fn process(&mut self, batch: BarBatch) -> Vec<SignalRecord> {
        self.summary.batches += 1;
        debug!("Batch {} closed at {}", self.summary.batches, batch.closed_at);

        // a revised bar replaces the buffered one; still one cycle per symbol
        let mut touched = BTreeSet::new();
        for (symbol, candle) in batch.bars {
            self.summary.bars += 1;
            match self.buffer.push(&symbol, candle) {
                Ok(()) => {
                    touched.insert(symbol);
                }
                Err(e) => {
                    self.summary.rejected_bars += 1;
                    warn!("{}: dropping bar: {}", symbol, e);
                }
            }
        }

        let windows: Vec<(String, CandleSeries)> = touched
            .into_iter()
            .filter_map(|symbol| {
                let window = self.buffer.snapshot(&symbol)?;
                Some((symbol, window))
            })
            .collect();

        let signals = self.analyzer.analyze_batch(&windows, &self.gate);
        self.summary.signals += signals.len();
        signals
    }

    fn emit(&self, signal: &SignalRecord) {
        info!(
            "SIGNAL {} {} | tier {} | score {:.1} | entry {:.6} sl {:.6} ({:.2}%)",
            signal.symbol,
            signal.side,
            signal.tier,
            signal.score,
            signal.entry,
            signal.sl,
            signal.sl_pct
        );
        println!("{}\n", signal.message);
    }
}
