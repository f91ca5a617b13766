use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::generator::sample_decimal;
use crate::config::RiskProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Regime {
    Calm,
    Normal,
    Explosive,
}

impl Regime {
    /// `< 8` calm, `[8, 16)` normal, `>= 16` explosive.
    pub fn classify(value: Decimal) -> Self {
        if value < dec!(8) {
            Regime::Calm
        } else if value < dec!(16) {
            Regime::Normal
        } else {
            Regime::Explosive
        }
    }

    pub fn comment(&self) -> &'static str {
        match self {
            Regime::Calm => "Calm market. The bot keeps tight ranges and small size.",
            Regime::Normal => "Normal conditions. Standard grid spacing applies.",
            Regime::Explosive => "Explosive moves. Expect wide swings between cycles.",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regime::Calm => write!(f, "Calm"),
            Regime::Normal => write!(f, "Normal"),
            Regime::Explosive => write!(f, "Explosive"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilityReading {
    pub value: Decimal,
    pub regime: Regime,
    pub comment: String,
    pub profile: RiskProfile,
    pub sampled_at: DateTime<Utc>,
}

/// Synthetic market-regime sampler. Each reading replaces the last; there is no history.
pub struct VolatilityEstimator {
    rng: StdRng,
}

impl VolatilityEstimator {
    pub fn new(rng: StdRng) -> Self {
        Self { rng }
    }

    pub fn sample(&mut self, profile: RiskProfile) -> VolatilityReading {
        let (low, high) = profile.volatility_range();
        let value = sample_decimal(&mut self.rng, low, high, 1);
        let regime = Regime::classify(value);

        VolatilityReading {
            value,
            regime,
            comment: regime.comment().to_string(),
            profile,
            sampled_at: Utc::now(),
        }
    }
}

/// "Next sample in N s" display value. Ticks on its own cadence, so it can
/// drift from the real sample timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    start: u32,
    remaining: u32,
}

impl Countdown {
    pub fn new(start: u32) -> Self {
        Self {
            start,
            remaining: start,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn reset(&mut self) {
        self.remaining = self.start;
    }

    /// Decrements, wrapping back to the start value on reaching zero.
    pub fn tick(&mut self) -> u32 {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.remaining = self.start;
        }
        self.remaining
    }
}
