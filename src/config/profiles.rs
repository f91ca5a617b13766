use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Risk bucket picked in the configuration wizard.
///
/// Controls the sampling range of the volatility estimator and is echoed next
/// to the derived risk metric on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskProfile {
    Conservative,
    Balanced,
    Aggressive,
}

impl RiskProfile {
    pub fn all() -> [RiskProfile; 3] {
        [
            RiskProfile::Conservative,
            RiskProfile::Balanced,
            RiskProfile::Aggressive,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conservative => "conservative",
            Self::Balanced => "balanced",
            Self::Aggressive => "aggressive",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Conservative => "Conservative",
            Self::Balanced => "Balanced",
            Self::Aggressive => "Aggressive",
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Self::Conservative =>
                "Low simulated volatility. Small, steady cycles.",
            Self::Balanced =>
                "Medium simulated volatility. The default demo setting.",
            Self::Aggressive =>
                "High simulated volatility. Expect explosive regimes.",
        }
    }

    pub fn risk_level(&self) -> &str {
        match self {
            Self::Conservative => "Low",
            Self::Balanced => "Moderate",
            Self::Aggressive => "High",
        }
    }

    /// Half-open `[low, high)` range the volatility estimator samples from, in percent.
    pub fn volatility_range(&self) -> (Decimal, Decimal) {
        match self {
            Self::Conservative => (dec!(4), dec!(12)),
            Self::Balanced => (dec!(8), dec!(18)),
            Self::Aggressive => (dec!(12), dec!(28)),
        }
    }
}

impl Default for RiskProfile {
    fn default() -> Self {
        Self::Balanced
    }
}

impl fmt::Display for RiskProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RiskProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "conservative" => Ok(Self::Conservative),
            "balanced" => Ok(Self::Balanced),
            "aggressive" => Ok(Self::Aggressive),
            other => Err(format!("unknown risk profile: {}", other)),
        }
    }
}
