use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::Path;

use crate::feed::{BarBatch, CandleFeed};
use crate::models::Candle;

/// A feed that replays pre-loaded closed bars in timestamp order.
/// A cursor walks forward through the merged timeline; each step yields every
/// symbol's bar sharing the next close time.
#[derive(Debug, Default)]
pub struct ReplayFeed {
    data: BTreeMap<String, Vec<Candle>>,
    timeline: Vec<(DateTime<Utc>, String, Candle)>,
    cursor: usize,
}

impl ReplayFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `{"SYMBOL": [candle, ...], ...}`.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let data: BTreeMap<String, Vec<Candle>> =
            serde_json::from_str(json).context("Failed to parse candle JSON")?;
        let mut feed = Self::new();
        for (symbol, candles) in data {
            feed.load(&symbol, candles);
        }
        Ok(feed)
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json_str(&json)
    }

    /// Load candles for one symbol, replacing any previous data. Resets the cursor.
    pub fn load(&mut self, symbol: &str, candles: Vec<Candle>) {
        self.data.insert(symbol.to_string(), candles);
        self.rebuild_timeline();
    }

    fn rebuild_timeline(&mut self) {
        let mut timeline: Vec<(DateTime<Utc>, String, Candle)> = self
            .data
            .iter()
            .flat_map(|(symbol, candles)| {
                candles
                    .iter()
                    .map(move |c| (c.timestamp, symbol.clone(), c.clone()))
            })
            .collect();
        // stable: a symbol's own bars keep their file order on equal timestamps
        timeline.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        self.timeline = timeline;
        self.cursor = 0;
    }

    pub fn symbols(&self) -> Vec<String> {
        self.data.keys().cloned().collect()
    }

    pub fn earliest_time(&self) -> Option<DateTime<Utc>> {
        self.timeline.first().map(|(t, _, _)| *t)
    }

    pub fn latest_time(&self) -> Option<DateTime<Utc>> {
        self.timeline.last().map(|(t, _, _)| *t)
    }

    /// Bars not yet handed out.
    pub fn remaining(&self) -> usize {
        self.timeline.len() - self.cursor
    }
}

#[async_trait]
impl CandleFeed for ReplayFeed {
    async fn next_batch(&mut self) -> Result<Option<BarBatch>> {
        let Some((closed_at, _, _)) = self.timeline.get(self.cursor) else {
            return Ok(None);
        };
        let closed_at = *closed_at;

        let end = self.cursor
            + self.timeline[self.cursor..]
                .partition_point(|(t, _, _)| *t <= closed_at);
        let bars = self.timeline[self.cursor..end]
            .iter()
            .map(|(_, symbol, candle)| (symbol.clone(), candle.clone()))
            .collect();
        self.cursor = end;

        Ok(Some(BarBatch { closed_at, bars }))
    }
}
