//! Alert text handed to the notifier. Field order and decimal precision are fixed:
//! prices at 6 decimals, percentages at 2.

use std::fmt::Write;

use crate::config::Settings;
use crate::core::levels::LevelSet;
use crate::models::{Direction, Tier};

const MODEL_NAME: &str = "Behaviour-Based Market Engine";

/// Position size that loses `account_risk_pct` of the balance if the stop is hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSizing {
    /// Position value as a multiple of balance.
    pub balance_multiple: f64,
    /// Position value for `Settings::example_balance`.
    pub example_position: f64,
}

impl PositionSizing {
    pub fn for_sl_pct(sl_pct: f64, settings: &Settings) -> Option<Self> {
        if sl_pct <= 0.0 {
            return None;
        }
        let balance_multiple = (settings.account_risk_pct / 100.0) / (sl_pct / 100.0);
        Some(Self {
            balance_multiple,
            example_position: balance_multiple * settings.example_balance,
        })
    }
}

fn side_label(side: Direction) -> (&'static str, &'static str) {
    match side {
        Direction::Long => ("🟢", "LONG"),
        Direction::Short => ("🔴", "SHORT"),
    }
}

fn validity_text(settings: &Settings) -> String {
    let minutes = settings.entry_validity_candles as u64 * settings.bar_timeframe.minutes();
    if minutes > 0 {
        format!("±{} min", minutes)
    } else {
        "short".to_string()
    }
}

fn risk_calc_text(sl_pct: f64, settings: &Settings) -> String {
    let Some(sizing) = PositionSizing::for_sl_pct(sl_pct, settings) else {
        return "Risk Calc: invalid SL% (0), ignore this calculation.".to_string();
    };
    let risk = settings.account_risk_pct;
    let quote = &settings.quote_asset;
    format!(
        "Risk Calc (example {risk:.0}% risk):\n\
         • SL : {sl_pct:.2}% → position ≈ ({risk:.0}% / SL%) × balance ≈ {mult:.3}× balance\n\
         • Example balance {bal:.0} {quote} → position ≈ {pos:.2} {quote}\n\
         (adjust to your own balance & leverage)",
        mult = sizing.balance_multiple,
        bal = settings.example_balance,
        pos = sizing.example_position,
    )
}

pub fn render_alert(
    symbol: &str,
    side: Direction,
    levels: &LevelSet,
    tier: Tier,
    score: f64,
    settings: &Settings,
) -> String {
    let (emoji, label) = side_label(side);
    let mut text = String::new();

    // writing into a String cannot fail
    let _ = writeln!(
        text,
        "{} BEHAVIOUR SIGNAL — {} ({})",
        emoji,
        symbol.to_uppercase(),
        label
    );
    let _ = writeln!(text, "Entry : `{:.6}`", levels.entry);
    let _ = writeln!(text, "SL    : `{:.6}`", levels.sl);
    let _ = writeln!(text, "TP1   : `{:.6}`", levels.tp1);
    let _ = writeln!(text, "TP2   : `{:.6}`", levels.tp2);
    let _ = writeln!(text, "TP3   : `{:.6}`", levels.tp3);
    let _ = writeln!(text, "Model : {}", MODEL_NAME);
    let _ = writeln!(
        text,
        "Leverage : {:.0}x–{:.0}x (SL {:.2}%)",
        levels.lev_min, levels.lev_max, levels.sl_pct
    );
    let _ = writeln!(text, "Entry Validity : {}", validity_text(settings));
    let _ = writeln!(text, "Tier : {} (Score {:.0})", tier, score);
    text.push_str(&risk_calc_text(levels.sl_pct, settings));
    text
}
