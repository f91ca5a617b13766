use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::config::RiskProfile;
use crate::error::ValidationError;
use crate::types::TradingPair;

pub const MIN_CAPITAL: u32 = 100;
/// Keeps every per-trade profit and its running sum well inside `Decimal` range.
pub const MAX_CAPITAL: u64 = 1_000_000_000;

/// Frozen simulation parameters. Only the gate constructs one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Configuration {
    pair: TradingPair,
    risk_profile: RiskProfile,
    simulated_capital: Decimal,
}

impl Configuration {
    pub fn pair(&self) -> TradingPair {
        self.pair
    }

    pub fn risk_profile(&self) -> RiskProfile {
        self.risk_profile
    }

    pub fn simulated_capital(&self) -> Decimal {
        self.simulated_capital
    }
}

/// Raw wizard input as typed by the user, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationDraft {
    pub pair: TradingPair,
    pub risk_profile: RiskProfile,
    pub capital: String,
}

impl ConfigurationDraft {
    pub fn new(pair: TradingPair, risk_profile: RiskProfile, capital: impl Into<String>) -> Self {
        Self {
            pair,
            risk_profile,
            capital: capital.into(),
        }
    }

    pub fn validate(&self) -> Result<Configuration, ValidationError> {
        apply_configuration(self.pair, self.risk_profile, &self.capital)
    }
}

/// Validates wizard input and freezes it into a [`Configuration`].
///
/// Capital must parse as a number (plain or scientific notation) between
/// [`MIN_CAPITAL`] and [`MAX_CAPITAL`]. Anything too big is `CapitalTooLarge`;
/// anything else is `InvalidCapital`.
pub fn apply_configuration(
    pair: TradingPair,
    risk_profile: RiskProfile,
    capital_input: &str,
) -> Result<Configuration, ValidationError> {
    let simulated_capital = parse_capital(capital_input)?;

    Ok(Configuration {
        pair,
        risk_profile,
        simulated_capital,
    })
}

fn parse_capital(input: &str) -> Result<Decimal, ValidationError> {
    let invalid = || ValidationError::InvalidCapital {
        input: input.to_string(),
        minimum: MIN_CAPITAL,
    };
    let too_large = || ValidationError::CapitalTooLarge {
        input: input.to_string(),
        maximum: MAX_CAPITAL,
    };

    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(invalid());
    }

    let value = match Decimal::from_str(trimmed).or_else(|_| Decimal::from_scientific(trimmed)) {
        Ok(value) => value,
        // Finite numbers `Decimal` cannot hold are out of range, not malformed.
        Err(_) => {
            return match trimmed.parse::<f64>() {
                Ok(number) if number.is_finite() && number >= f64::from(MIN_CAPITAL) => Err(too_large()),
                _ => Err(invalid()),
            };
        }
    };

    if value < Decimal::from(MIN_CAPITAL) {
        Err(invalid())
    } else if value > Decimal::from(MAX_CAPITAL) {
        Err(too_large())
    } else {
        Ok(value.normalize())
    }
}
