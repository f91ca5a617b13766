use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::UnknownPair;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TradingPair {
    #[serde(rename = "BTC/USDT", alias = "BTCUSDT")]
    BTCUSDT,
    #[serde(rename = "ETH/USDT", alias = "ETHUSDT")]
    ETHUSDT,
    #[serde(rename = "SOL/USDT", alias = "SOLUSDT")]
    SOLUSDT,
    #[serde(rename = "BNB/USDT", alias = "BNBUSDT")]
    BNBUSDT,
}

impl TradingPair {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradingPair::BTCUSDT => "BTC/USDT",
            TradingPair::ETHUSDT => "ETH/USDT",
            TradingPair::SOLUSDT => "SOL/USDT",
            TradingPair::BNBUSDT => "BNB/USDT",
        }
    }

    pub fn base_asset(&self) -> &'static str {
        match self {
            TradingPair::BTCUSDT => "BTC",
            TradingPair::ETHUSDT => "ETH",
            TradingPair::SOLUSDT => "SOL",
            TradingPair::BNBUSDT => "BNB",
        }
    }

    pub fn quote_asset(&self) -> &'static str {
        "USDT"
    }

    pub fn all() -> Vec<TradingPair> {
        vec![
            TradingPair::BTCUSDT,
            TradingPair::ETHUSDT,
            TradingPair::SOLUSDT,
            TradingPair::BNBUSDT,
        ]
    }
}

impl fmt::Display for TradingPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TradingPair {
    type Err = UnknownPair;

    /// Accepts both `BTC/USDT` and `BTCUSDT`, case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '/' && *c != '-')
            .collect::<String>()
            .to_uppercase();
        match normalized.as_str() {
            "BTCUSDT" => Ok(TradingPair::BTCUSDT),
            "ETHUSDT" => Ok(TradingPair::ETHUSDT),
            "SOLUSDT" => Ok(TradingPair::SOLUSDT),
            "BNBUSDT" => Ok(TradingPair::BNBUSDT),
            _ => Err(UnknownPair(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Formats a percentage with an explicit sign, e.g. `+0.42%` or `-0.13%`.
pub fn signed_pct(value: Decimal) -> String {
    if value >= Decimal::ZERO {
        format!("+{:.2}%", value)
    } else {
        format!("{:.2}%", value)
    }
}
