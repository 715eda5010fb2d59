use serde::{Deserialize, Serialize};

use crate::core::categories::CategoryScores;
use crate::core::features::FeatureRecord;
use crate::core::levels::LevelSet;
use crate::models::{Direction, HtfDominance, HtfDrift, Tier, VolMode, WickBias};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HtfContext {
    pub htf_dom: HtfDominance,
    pub htf_drift: HtfDrift,
    pub htf_vol_mode: VolMode,
    pub htf_wick_bias: WickBias,
}

impl From<&FeatureRecord> for HtfContext {
    fn from(f: &FeatureRecord) -> Self {
        Self {
            htf_dom: f.htf_dom,
            htf_drift: f.htf_drift,
            htf_vol_mode: f.htf_vol_mode,
            htf_wick_bias: f.htf_wick_bias,
        }
    }
}

/// Final output of one successful analysis cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub symbol: String,
    pub side: Direction,
    pub entry: f64,
    pub sl: f64,
    pub tp1: f64,
    pub tp2: f64,
    pub tp3: f64,
    pub sl_pct: f64,
    pub lev_min: f64,
    pub lev_max: f64,
    pub tier: Tier,
    pub score: f64,
    pub htf_context: HtfContext,
    pub categories: CategoryScores,
    pub features: FeatureRecord,
    pub message: String,
}

impl SignalRecord {
    pub fn levels(&self) -> LevelSet {
        LevelSet {
            entry: self.entry,
            sl: self.sl,
            tp1: self.tp1,
            tp2: self.tp2,
            tp3: self.tp3,
            sl_pct: self.sl_pct,
            lev_min: self.lev_min,
            lev_max: self.lev_max,
        }
    }
}
