pub mod buffer;
pub mod replay;

pub use buffer::CandleBuffer;
pub use replay::ReplayFeed;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::Candle;

/// Bars that closed at the same instant, at most one per symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct BarBatch {
    pub closed_at: DateTime<Utc>,
    pub bars: Vec<(String, Candle)>,
}

#[async_trait]
pub trait CandleFeed: Send + Sync {
    /// Next batch of closed bars, or `None` once the feed is exhausted.
    async fn next_batch(&mut self) -> Result<Option<BarBatch>>;
}
