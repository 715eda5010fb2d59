use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "long",
            Direction::Short => "short",
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }

    /// +1.0 for long, -1.0 for short. Levels are built as `entry + sign * distance`.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }
}

/// Which side the average wicks lean towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WickBias {
    Buy,
    Sell,
    #[default]
    Mixed,
}

impl WickBias {
    /// Lower wicks more than 1.3x upper wicks read as buying pressure, and vice versa.
    pub fn from_wicks(avg_upper: f64, avg_lower: f64) -> Self {
        if avg_upper <= 0.0 && avg_lower <= 0.0 {
            return WickBias::Mixed;
        }
        if avg_lower > 1.3 * avg_upper {
            WickBias::Buy
        } else if avg_upper > 1.3 * avg_lower {
            WickBias::Sell
        } else {
            WickBias::Mixed
        }
    }
}

impl fmt::Display for WickBias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WickBias::Buy => write!(f, "buy"),
            WickBias::Sell => write!(f, "sell"),
            WickBias::Mixed => write!(f, "mixed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HtfDominance {
    Bull,
    Bear,
    #[default]
    None,
}

impl fmt::Display for HtfDominance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HtfDominance::Bull => write!(f, "bull"),
            HtfDominance::Bear => write!(f, "bear"),
            HtfDominance::None => write!(f, "none"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HtfDrift {
    Up,
    Down,
    #[default]
    Flat,
}

impl fmt::Display for HtfDrift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HtfDrift::Up => write!(f, "up"),
            HtfDrift::Down => write!(f, "down"),
            HtfDrift::Flat => write!(f, "flat"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VolMode {
    Expand,
    Contract,
    #[default]
    Normal,
}

impl fmt::Display for VolMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolMode::Expand => write!(f, "expand"),
            VolMode::Contract => write!(f, "contract"),
            VolMode::Normal => write!(f, "normal"),
        }
    }
}

/// Signal quality bucket. Ordering follows quality: `None < B < A < APlus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    #[serde(rename = "NONE")]
    None,
    B,
    A,
    #[serde(rename = "A+")]
    APlus,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::None => "NONE",
            Tier::B => "B",
            Tier::A => "A",
            Tier::APlus => "A+",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Tier> {
        match s.trim().to_uppercase().as_str() {
            "NONE" => Some(Tier::None),
            "B" => Some(Tier::B),
            "A" => Some(Tier::A),
            "A+" | "APLUS" | "A_PLUS" => Some(Tier::APlus),
            _ => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
