use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::str::FromStr;

use crate::error::PositionSizeError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskAllocation {
    pub balance: Decimal,
    pub risk_pct: Decimal,
    pub max_risk: Decimal,
    pub message: String,
}

/// Maximum amount to put at risk on one trade: `balance * risk_pct / 100`.
pub fn position_size(balance: Decimal, risk_pct: Decimal) -> Result<RiskAllocation, PositionSizeError> {
    if balance <= Decimal::ZERO || risk_pct <= Decimal::ZERO {
        return Err(PositionSizeError::InvalidInput);
    }

    let max_risk = balance * risk_pct / dec!(100);
    let message = format!(
        "Max risk per trade: ${:.2} (at {}% of ${:.2}).",
        max_risk,
        risk_pct.normalize(),
        balance
    );

    Ok(RiskAllocation {
        balance,
        risk_pct,
        max_risk,
        message,
    })
}

/// Form-input variant: blank or unparsable fields are rejected like zeros.
pub fn position_size_from_input(balance: &str, risk_pct: &str) -> Result<RiskAllocation, PositionSizeError> {
    let parse = |raw: &str| Decimal::from_str(raw.trim()).map_err(|_| PositionSizeError::InvalidInput);
    position_size(parse(balance)?, parse(risk_pct)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_size() {
        let allocation = position_size(dec!(2000), dec!(1.5)).unwrap();
        assert_eq!(allocation.max_risk, dec!(30));
        assert_eq!(allocation.message, "Max risk per trade: $30.00 (at 1.5% of $2000.00).");
    }

    #[test]
    fn test_rejects_non_positive_inputs() {
        assert_eq!(position_size(dec!(0), dec!(2)), Err(PositionSizeError::InvalidInput));
        assert_eq!(position_size(dec!(1000), dec!(-1)), Err(PositionSizeError::InvalidInput));
    }

    #[test]
    fn test_from_input() {
        assert_eq!(position_size_from_input(" 500 ", "2").unwrap().max_risk, dec!(10));
        assert!(position_size_from_input("", "2").is_err());
        assert!(position_size_from_input("500", "lots").is_err());
    }
}
