//! The seven behaviour detectors.
//!
//! Each evaluator is a pure function of the feature record: threshold gates first
//! (any failure yields a zero, unbiased result), then a base score with margin bonuses,
//! then a chop penalty, then the category ceiling.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::Settings;
use crate::core::features::FeatureRecord;
use crate::models::{Direction, HtfDominance, HtfDrift, WickBias};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Exhausted leg reversal
    Elr,
    /// Flush + absorption reversal
    Far,
    /// Compression then expansion continuation
    Cec,
    /// Momentum collapse (context only)
    Mc,
    /// Volatility squeeze then directional explosion
    Vsde,
    /// Asymmetric wick pressure
    Awp,
    /// HTF behaviour pivot
    Hbp,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Elr,
        Category::Far,
        Category::Cec,
        Category::Mc,
        Category::Vsde,
        Category::Awp,
        Category::Hbp,
    ];

    pub fn ceiling(&self) -> f64 {
        match self {
            Category::Elr => 25.0,
            Category::Far => 30.0,
            Category::Cec => 20.0,
            Category::Mc => 12.0,
            Category::Vsde => 12.0,
            Category::Awp => 15.0,
            Category::Hbp => 10.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Elr => "ELR",
            Category::Far => "FAR",
            Category::Cec => "CEC",
            Category::Mc => "MC",
            Category::Vsde => "VSDE",
            Category::Awp => "AWP",
            Category::Hbp => "HBP",
        }
    }

    pub fn evaluate(&self, f: &FeatureRecord, settings: &Settings) -> CategoryResult {
        match self {
            Category::Elr => eval_elr(f, settings),
            Category::Far => eval_far(f, settings),
            Category::Cec => eval_cec(f, settings),
            Category::Mc => eval_mc(f, settings),
            Category::Vsde => eval_vsde(f, settings),
            Category::Awp => eval_awp(f, settings),
            Category::Hbp => eval_hbp(f),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct CategoryResult {
    pub score: f64,
    pub bias: Option<Direction>,
}

impl CategoryResult {
    pub fn none() -> Self {
        Self {
            score: 0.0,
            bias: None,
        }
    }

    fn clamped(category: Category, score: f64, bias: Option<Direction>) -> Self {
        Self {
            score: score.clamp(0.0, category.ceiling()),
            bias,
        }
    }
}

/// The seven results of one cycle, one named slot per category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct CategoryScores {
    pub elr: CategoryResult,
    pub far: CategoryResult,
    pub cec: CategoryResult,
    pub mc: CategoryResult,
    pub vsde: CategoryResult,
    pub awp: CategoryResult,
    pub hbp: CategoryResult,
}

impl CategoryScores {
    pub fn evaluate_all(f: &FeatureRecord, settings: &Settings) -> Self {
        let mut scores = Self::default();
        for category in Category::ALL {
            *scores.get_mut(category) = category.evaluate(f, settings);
        }
        scores
    }

    pub fn get(&self, category: Category) -> &CategoryResult {
        match category {
            Category::Elr => &self.elr,
            Category::Far => &self.far,
            Category::Cec => &self.cec,
            Category::Mc => &self.mc,
            Category::Vsde => &self.vsde,
            Category::Awp => &self.awp,
            Category::Hbp => &self.hbp,
        }
    }

    pub fn get_mut(&mut self, category: Category) -> &mut CategoryResult {
        match category {
            Category::Elr => &mut self.elr,
            Category::Far => &mut self.far,
            Category::Cec => &mut self.cec,
            Category::Mc => &mut self.mc,
            Category::Vsde => &mut self.vsde,
            Category::Awp => &mut self.awp,
            Category::Hbp => &mut self.hbp,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &CategoryResult)> + '_ {
        Category::ALL.into_iter().map(move |c| (c, self.get(c)))
    }

    /// Compact `ELR=18.0L FAR=0.0 ...` summary for log lines.
    pub fn summary(&self) -> String {
        self.iter()
            .map(|(c, r)| {
                let side = match r.bias {
                    Some(Direction::Long) => "L",
                    Some(Direction::Short) => "S",
                    None => "",
                };
                format!("{}={:.1}{}", c, r.score, side)
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn is_choppy(f: &FeatureRecord, settings: &Settings) -> bool {
    f.chop_score > settings.chop_high_threshold
}

pub fn eval_elr(f: &FeatureRecord, settings: &Settings) -> CategoryResult {
    if f.leg_candles() < 6 {
        return CategoryResult::none();
    }
    let leg_strength = f.net_flow.abs() / f.leg_candles() as f64;
    if leg_strength <= 0.0 || f.body_trend >= -0.05 {
        return CategoryResult::none();
    }

    let (mut score, bias) = if f.net_flow < 0.0
        && matches!(f.wick_bias, WickBias::Buy | WickBias::Mixed)
        && f.pos_in_range <= 0.35
    {
        (15.0 + ((0.35 - f.pos_in_range) * 40.0).max(0.0), Direction::Long)
    } else if f.net_flow > 0.0
        && matches!(f.wick_bias, WickBias::Sell | WickBias::Mixed)
        && f.pos_in_range >= 0.65
    {
        (15.0 + ((f.pos_in_range - 0.65) * 40.0).max(0.0), Direction::Short)
    } else {
        return CategoryResult::none();
    };

    if is_choppy(f, settings) {
        score *= 0.4;
    }
    CategoryResult::clamped(Category::Elr, score, Some(bias))
}

pub fn eval_far(f: &FeatureRecord, settings: &Settings) -> CategoryResult {
    let mut score = 0.0;
    let mut bias = None;

    if f.has_flush_down && f.pos_in_range <= 0.40 {
        score = 18.0 + f.flush_depth_down * 20.0;
        score += match f.wick_bias {
            WickBias::Buy => 4.0,
            WickBias::Mixed => 1.0,
            WickBias::Sell => 0.0,
        };
        bias = Some(Direction::Long);
    }

    if f.has_flush_up && f.pos_in_range >= 0.60 {
        let mut up = 18.0 + f.flush_depth_up * 20.0;
        up += match f.wick_bias {
            WickBias::Sell => 4.0,
            WickBias::Mixed => 1.0,
            WickBias::Buy => 0.0,
        };
        // both sides flushed: keep the stronger one
        if up > score {
            score = up;
            bias = Some(Direction::Short);
        }
    }

    if score > 0.0 && is_choppy(f, settings) {
        score *= 0.5;
    }
    CategoryResult::clamped(Category::Far, score, bias)
}

pub fn eval_cec(f: &FeatureRecord, settings: &Settings) -> CategoryResult {
    if f.net_flow == 0.0 || f.range_trend >= -0.05 {
        return CategoryResult::none();
    }

    let bias = if f.net_flow > 0.0 {
        Direction::Long
    } else {
        Direction::Short
    };

    let mut score = 10.0;
    let htf_agrees = match bias {
        Direction::Long => f.htf_dom == HtfDominance::Bull || f.htf_drift == HtfDrift::Up,
        Direction::Short => f.htf_dom == HtfDominance::Bear || f.htf_drift == HtfDrift::Down,
    };
    if htf_agrees {
        score += 6.0;
    }
    if f.body_trend > -0.2 {
        score += 2.0;
    }

    if is_choppy(f, settings) {
        score *= 0.3;
    }
    CategoryResult::clamped(Category::Cec, score, Some(bias))
}

/// Magnitude only: the old leg is tiring, but which way the next move goes is unknown.
pub fn eval_mc(f: &FeatureRecord, settings: &Settings) -> CategoryResult {
    if f.net_flow == 0.0 || f.body_trend > -0.2 || f.wick_bias != WickBias::Mixed {
        return CategoryResult::none();
    }

    let mut score = 8.0;
    if is_choppy(f, settings) {
        score *= 0.5;
    }
    CategoryResult::clamped(Category::Mc, score, None)
}

pub fn eval_vsde(f: &FeatureRecord, settings: &Settings) -> CategoryResult {
    if f.range_trend > -0.10 {
        return CategoryResult::none();
    }

    let bias = if f.net_flow > 0.0 {
        Some(Direction::Long)
    } else if f.net_flow < 0.0 {
        Some(Direction::Short)
    } else {
        None
    };

    let mut score = 7.0;
    match bias {
        Some(Direction::Long) if f.htf_drift == HtfDrift::Up => score += 3.0,
        Some(Direction::Short) if f.htf_drift == HtfDrift::Down => score += 3.0,
        _ => {}
    }

    if is_choppy(f, settings) {
        score *= 0.4;
    }
    CategoryResult::clamped(Category::Vsde, score, bias)
}

pub fn eval_awp(f: &FeatureRecord, settings: &Settings) -> CategoryResult {
    if f.avg_up_wick <= 0.0 && f.avg_down_wick <= 0.0 {
        return CategoryResult::none();
    }

    // dominant wick / opposing wick, capped at 3x
    let pressure = |dominant: f64, opposing: f64| -> f64 {
        if opposing > 0.0 {
            6.0 + (dominant / opposing).min(3.0) * 2.0
        } else {
            10.0
        }
    };

    let (mut score, bias) = match f.wick_bias {
        WickBias::Buy => (pressure(f.avg_down_wick, f.avg_up_wick), Direction::Long),
        WickBias::Sell => (pressure(f.avg_up_wick, f.avg_down_wick), Direction::Short),
        WickBias::Mixed => return CategoryResult::none(),
    };

    if is_choppy(f, settings) {
        score *= 0.7;
    }
    CategoryResult::clamped(Category::Awp, score, Some(bias))
}

/// HTF pivot: dominance present and HTF wicks turning against it. Chop does not apply.
pub fn eval_hbp(f: &FeatureRecord) -> CategoryResult {
    if f.htf_dom == HtfDominance::None {
        return CategoryResult::none();
    }

    let long_pivot = (f.htf_dom == HtfDominance::Bear || f.htf_drift == HtfDrift::Down)
        && f.htf_wick_bias == WickBias::Buy;
    let short_pivot = (f.htf_dom == HtfDominance::Bull || f.htf_drift == HtfDrift::Up)
        && f.htf_wick_bias == WickBias::Sell;

    let (score, bias) = match (long_pivot, short_pivot) {
        (true, true) => (4.0, None),
        (true, false) => (8.0, Some(Direction::Long)),
        (false, true) => (8.0, Some(Direction::Short)),
        (false, false) => return CategoryResult::none(),
    };
    CategoryResult::clamped(Category::Hbp, score, bias)
}
