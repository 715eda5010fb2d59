pub mod candle;
pub mod direction;
pub mod timeframe;

pub use candle::{Candle, CandleError, CandleSeries};
pub use direction::*;
pub use timeframe::Timeframe;
