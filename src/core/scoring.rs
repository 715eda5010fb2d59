use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::core::categories::CategoryScores;
use crate::core::features::FeatureRecord;
use crate::models::Direction;

/// One side must beat the other by this factor to claim direction.
const DOMINANCE_MARGIN: f64 = 1.3;
const MIN_SIDE_SCORE: f64 = 1.0;
const MC_WEIGHT: f64 = 0.5;
const COUNTER_HTF_DAMPING: f64 = 0.6;
const MAX_SCORE: f64 = 150.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    /// Final score in `[0, 150]`, zero whenever `direction` is `None`.
    pub score: f64,
    /// Winning-side sum plus the MC amplifier, before chop and HTF damping.
    pub raw_score: f64,
    pub direction: Option<Direction>,
    pub bias_long_score: f64,
    pub bias_short_score: f64,
    pub components: CategoryScores,
}

fn side_sums(cats: &CategoryScores) -> (f64, f64) {
    cats.iter().fold((0.0, 0.0), |(long, short), (_, r)| match r.bias {
        Some(Direction::Long) => (long + r.score, short),
        Some(Direction::Short) => (long, short + r.score),
        None => (long, short),
    })
}

fn choose_direction(long: f64, short: f64) -> Option<Direction> {
    if long < MIN_SIDE_SCORE && short < MIN_SIDE_SCORE {
        return None;
    }
    if long > short * DOMINANCE_MARGIN {
        Some(Direction::Long)
    } else if short > long * DOMINANCE_MARGIN {
        Some(Direction::Short)
    } else {
        None
    }
}

/// Multiplier applied for the current chop regime.
pub fn chop_damping(chop_score: f64, settings: &Settings) -> f64 {
    if chop_score >= settings.chop_high_threshold {
        0.35
    } else if chop_score >= settings.chop_low_threshold {
        0.7
    } else {
        1.0
    }
}

/// True when `direction` trades against a confirmed HTF dominance + drift.
pub fn opposes_confirmed_htf(direction: Direction, f: &FeatureRecord) -> bool {
    match direction {
        Direction::Long => f.htf_confirmed_bear(),
        Direction::Short => f.htf_confirmed_bull(),
    }
}

pub fn aggregate_opportunity(
    f: &FeatureRecord,
    cats: &CategoryScores,
    settings: &Settings,
) -> Opportunity {
    let (bias_long_score, bias_short_score) = side_sums(cats);
    let direction = choose_direction(bias_long_score, bias_short_score);

    let Some(side) = direction else {
        return Opportunity {
            score: 0.0,
            raw_score: 0.0,
            direction: None,
            bias_long_score,
            bias_short_score,
            components: *cats,
        };
    };

    let winning = match side {
        Direction::Long => bias_long_score,
        Direction::Short => bias_short_score,
    };
    let raw_score = winning + MC_WEIGHT * cats.mc.score;

    let mut score = raw_score * chop_damping(f.chop_score, settings);
    if opposes_confirmed_htf(side, f) {
        score *= COUNTER_HTF_DAMPING;
    }

    Opportunity {
        score: score.clamp(0.0, MAX_SCORE),
        raw_score,
        direction,
        bias_long_score,
        bias_short_score,
        components: *cats,
    }
}
