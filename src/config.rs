use crate::models::{Tier, Timeframe};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("Invalid window: {field} = {value}. Must be > 0")]
    InvalidWindow { field: &'static str, value: usize },

    #[error("Invalid threshold: {field} = {value}. Must be positive")]
    InvalidThreshold { field: &'static str, value: f64 },

    #[error("Chop thresholds inverted: low {low} >= high {high}")]
    InvertedChopThresholds { low: f64, high: f64 },

    #[error("SL band inverted: min {min}% > max {max}%")]
    InvertedSlBand { min: f64, max: f64 },

    #[error("Leverage table is empty")]
    EmptyLeverageTable,

    #[error("Leverage breakpoints must be strictly increasing (at {at}%)")]
    UnsortedLeverageTable { at: f64 },
}

/// How the raw structural stop is bounded before targets are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StopPolicy {
    /// Push the stop out to a local noise floor and pull it in to a volatility ceiling.
    #[default]
    NoiseFloor,
    /// Clamp SL% into `[min_sl_pct, max_sl_pct]`. Also enables the global SL% sanity gate.
    FixedPercent,
}

impl StopPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopPolicy::NoiseFloor => "noise_floor",
            StopPolicy::FixedPercent => "fixed_percent",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<StopPolicy> {
        match s.trim().to_lowercase().as_str() {
            "noise_floor" | "noise" => Some(StopPolicy::NoiseFloor),
            "fixed_percent" | "fixed_pct" | "fixed" => Some(StopPolicy::FixedPercent),
            _ => None,
        }
    }
}

impl fmt::Display for StopPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row of the leverage lookup: applies when `sl_pct <= max_sl_pct`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeverageBand {
    pub max_sl_pct: f64,
    pub lev_min: f64,
    pub lev_max: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    // Window & data requirements
    pub min_candles: usize,
    pub feature_window: usize,
    pub htf_window: usize,
    pub flush_lookback: usize,

    // Flush: extension beyond prior extreme, as a fraction of avg range
    pub flush_min_depth_ratio: f64,

    // Chop detection
    pub small_body_factor: f64,
    pub big_wick_ratio: f64,
    pub chop_weight_color_flip: f64,
    pub chop_weight_small_body: f64,
    pub chop_weight_two_sided_wick: f64,
    pub chop_high_threshold: f64,
    pub chop_low_threshold: f64,

    // HTF virtual drift, in percent of price
    pub htf_drift_tolerance_pct: f64,

    // Scoring / tiers
    pub min_score_to_send: f64,
    pub a_plus_score: f64,
    pub a_tier_margin: f64,

    pub min_rr_tp2: f64,

    // Stop bounding
    pub stop_policy: StopPolicy,
    pub noise_lookback: usize,
    pub noise_wick_factor: f64,
    pub noise_range_factor: f64,
    pub max_risk_factor: f64,
    pub min_sl_pct: f64,
    pub max_sl_pct: f64,

    pub anti_countertrend: bool,

    // Output only
    pub leverage_table: Vec<LeverageBand>,
    pub leverage_fallback: (f64, f64),
    pub leverage_invalid_sl: (f64, f64),

    // Alert rendering
    pub bar_timeframe: Timeframe,
    pub entry_validity_candles: u32,
    pub account_risk_pct: f64,
    pub example_balance: f64,
    pub quote_asset: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            min_candles: 40,
            feature_window: 40,
            htf_window: 12,
            flush_lookback: 20,
            flush_min_depth_ratio: 0.35,
            small_body_factor: 0.45,
            big_wick_ratio: 0.35,
            chop_weight_color_flip: 0.4,
            chop_weight_small_body: 0.3,
            chop_weight_two_sided_wick: 0.3,
            chop_high_threshold: 65.0,
            chop_low_threshold: 35.0,
            htf_drift_tolerance_pct: 0.15,
            min_score_to_send: 70.0,
            a_plus_score: 85.0,
            a_tier_margin: 10.0,
            min_rr_tp2: 1.6,
            stop_policy: StopPolicy::NoiseFloor,
            noise_lookback: 20,
            noise_wick_factor: 0.9,
            noise_range_factor: 0.6,
            max_risk_factor: 4.0,
            min_sl_pct: 0.25,
            max_sl_pct: 1.50,
            anti_countertrend: true,
            leverage_table: vec![
                LeverageBand {
                    max_sl_pct: 0.25,
                    lev_min: 20.0,
                    lev_max: 30.0,
                },
                LeverageBand {
                    max_sl_pct: 0.40,
                    lev_min: 15.0,
                    lev_max: 25.0,
                },
                LeverageBand {
                    max_sl_pct: 0.70,
                    lev_min: 8.0,
                    lev_max: 15.0,
                },
                LeverageBand {
                    max_sl_pct: 1.50,
                    lev_min: 5.0,
                    lev_max: 8.0,
                },
            ],
            leverage_fallback: (3.0, 5.0),
            leverage_invalid_sl: (5.0, 10.0),
            bar_timeframe: Timeframe::M5,
            entry_validity_candles: 6,
            account_risk_pct: 1.0,
            example_balance: 100.0,
            quote_asset: "USDT".to_string(),
        }
    }
}

impl Settings {
    /// Defaults overridden by environment variables (a `.env` file is honoured).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let env = |key: &str| -> Option<String> { std::env::var(key).ok() };
        let d = Settings::default();

        Settings {
            min_candles: env("MIN_CANDLES")
                .and_then(|s| s.parse().ok())
                .unwrap_or(d.min_candles),
            feature_window: env("FEATURE_WINDOW")
                .and_then(|s| s.parse().ok())
                .unwrap_or(d.feature_window),
            htf_window: env("HTF_WINDOW")
                .and_then(|s| s.parse().ok())
                .unwrap_or(d.htf_window),
            flush_lookback: env("FLUSH_LOOKBACK")
                .and_then(|s| s.parse().ok())
                .unwrap_or(d.flush_lookback),
            chop_high_threshold: env("CHOP_HIGH_THRESHOLD")
                .and_then(|s| s.parse().ok())
                .unwrap_or(d.chop_high_threshold),
            chop_low_threshold: env("CHOP_LOW_THRESHOLD")
                .and_then(|s| s.parse().ok())
                .unwrap_or(d.chop_low_threshold),
            min_score_to_send: env("MIN_SCORE_TO_SEND")
                .and_then(|s| s.parse().ok())
                .unwrap_or(d.min_score_to_send),
            a_plus_score: env("A_PLUS_SCORE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(d.a_plus_score),
            min_rr_tp2: env("MIN_RR_TP2")
                .and_then(|s| s.parse().ok())
                .unwrap_or(d.min_rr_tp2),
            stop_policy: env("STOP_POLICY")
                .and_then(|s| StopPolicy::from_str_loose(&s))
                .unwrap_or(d.stop_policy),
            min_sl_pct: env("MIN_SL_PCT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(d.min_sl_pct),
            max_sl_pct: env("MAX_SL_PCT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(d.max_sl_pct),
            anti_countertrend: env("ANTI_COUNTERTREND")
                .map(|s| s.to_lowercase() != "false")
                .unwrap_or(d.anti_countertrend),
            bar_timeframe: env("BAR_TIMEFRAME")
                .and_then(|s| Timeframe::from_str_loose(&s))
                .unwrap_or(d.bar_timeframe),
            quote_asset: env("QUOTE_ASSET").unwrap_or(d.quote_asset.clone()),
            ..d
        }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        for (field, value) in [
            ("min_candles", self.min_candles),
            ("feature_window", self.feature_window),
            ("htf_window", self.htf_window),
            ("flush_lookback", self.flush_lookback),
            ("noise_lookback", self.noise_lookback),
        ] {
            if value == 0 {
                return Err(SettingsError::InvalidWindow { field, value });
            }
        }

        for (field, value) in [
            ("flush_min_depth_ratio", self.flush_min_depth_ratio),
            ("min_rr_tp2", self.min_rr_tp2),
            ("max_risk_factor", self.max_risk_factor),
            ("min_sl_pct", self.min_sl_pct),
        ] {
            if value <= 0.0 || !value.is_finite() {
                return Err(SettingsError::InvalidThreshold { field, value });
            }
        }

        if self.chop_low_threshold >= self.chop_high_threshold {
            return Err(SettingsError::InvertedChopThresholds {
                low: self.chop_low_threshold,
                high: self.chop_high_threshold,
            });
        }

        if self.min_sl_pct > self.max_sl_pct {
            return Err(SettingsError::InvertedSlBand {
                min: self.min_sl_pct,
                max: self.max_sl_pct,
            });
        }

        if self.leverage_table.is_empty() {
            return Err(SettingsError::EmptyLeverageTable);
        }
        if let Some(w) = self
            .leverage_table
            .windows(2)
            .find(|w| w[1].max_sl_pct <= w[0].max_sl_pct)
        {
            return Err(SettingsError::UnsortedLeverageTable { at: w[1].max_sl_pct });
        }

        Ok(())
    }

    /// Leverage recommendation for a given SL%. Output only; never feeds back into levels.
    pub fn leverage_range_for_sl(&self, sl_pct: f64) -> (f64, f64) {
        if sl_pct <= 0.0 {
            return self.leverage_invalid_sl;
        }
        self.leverage_table
            .iter()
            .find(|band| sl_pct <= band.max_sl_pct)
            .map(|band| (band.lev_min, band.lev_max))
            .unwrap_or(self.leverage_fallback)
    }

    /// Score needed for tier A.
    pub fn a_score(&self) -> f64 {
        self.min_score_to_send + self.a_tier_margin
    }
}

/// Process state consulted by the analyzer, read-only for the length of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateContext {
    pub min_tier: Tier,
    pub debug: bool,
}

impl Default for GateContext {
    fn default() -> Self {
        Self {
            min_tier: Tier::A,
            debug: false,
        }
    }
}

impl GateContext {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let d = GateContext::default();
        Self {
            min_tier: std::env::var("MIN_TIER")
                .ok()
                .and_then(|s| Tier::from_str_loose(&s))
                .unwrap_or(d.min_tier),
            debug: std::env::var("DEBUG")
                .map(|s| s.to_lowercase() == "true" || s == "1")
                .unwrap_or(d.debug),
        }
    }
}

/// Everything the runner binary needs at start-up.
#[derive(Debug, Clone)]
pub struct Config {
    pub settings: Settings,
    pub gate: GateContext,
    pub candles_file: String,
    pub buffer_capacity: usize,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let env = |key: &str, default: &str| -> String {
            std::env::var(key).unwrap_or_else(|_| default.to_string())
        };

        let settings = Settings::from_env();
        // The buffer must hold at least one full analysis window.
        let min_capacity = settings.min_candles.max(settings.feature_window);

        Config {
            buffer_capacity: env("BUFFER_CAPACITY", "200")
                .parse::<usize>()
                .unwrap_or(200)
                .max(min_capacity),
            settings,
            gate: GateContext::from_env(),
            candles_file: env("CANDLES_FILE", "data/candles.json"),
            log_level: env("LOG_LEVEL", "info"),
        }
    }
}
