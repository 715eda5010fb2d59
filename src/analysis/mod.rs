pub mod alert;
pub mod analyzer;
pub mod signals;

pub use analyzer::{Analyzer, Rejection};
pub use signals::{HtfContext, SignalRecord};
