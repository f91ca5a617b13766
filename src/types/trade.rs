use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Side, TradingPair};

/// One synthetic fill produced by the trade generator. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeOutcome {
    pub id: String,
    pub cycle: u64,
    pub timestamp: DateTime<Utc>,
    pub pair: TradingPair,
    pub side: Side,
    pub size: Decimal,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub profit_percent: Decimal,
    pub profit_absolute: Decimal,
}

impl TradeOutcome {
    pub fn is_win(&self) -> bool {
        self.profit_percent >= Decimal::ZERO
    }
}
