use chrono::Utc;
use rand::rngs::StdRng;
use rand::Rng;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use uuid::Uuid;

use super::gate::Configuration;
use crate::types::{Side, TradeOutcome};

/// Share of simulated capital a single trade's percentage move is applied to.
pub const PROFIT_SCALE: Decimal = dec!(0.02);

const SIZE_RANGE: (Decimal, Decimal) = (dec!(0.02), dec!(0.35));
const ENTRY_PRICE_RANGE: (Decimal, Decimal) = (dec!(100), dec!(70000));
const EXIT_OFFSET_RANGE: (Decimal, Decimal) = (dec!(-0.9), dec!(0.9));
// Skewed positive on purpose so the demo trends up.
const PROFIT_PCT_RANGE: (Decimal, Decimal) = (dec!(-0.6), dec!(0.8));

const MIN_TRADES_PER_CYCLE: usize = 1;
const MAX_TRADES_PER_CYCLE: usize = 3;

/// Draws uniformly from `[low, high)` and quantizes down to `dp` decimals,
/// so the result never reaches `high`.
pub(crate) fn sample_decimal<R: Rng + ?Sized>(
    rng: &mut R,
    low: Decimal,
    high: Decimal,
    dp: u32,
) -> Decimal {
    let raw = rng.random_range(low.to_f64().unwrap_or(0.0)..high.to_f64().unwrap_or(0.0));
    let value = Decimal::from_f64(raw)
        .unwrap_or(low)
        .round_dp_with_strategy(dp, RoundingStrategy::ToNegativeInfinity);
    value.clamp(low, high - Decimal::new(1, dp))
}

pub struct TradeGenerator {
    rng: StdRng,
}

impl TradeGenerator {
    pub fn new(rng: StdRng) -> Self {
        Self { rng }
    }

    /// Produces the 1 to 3 synthetic trades of one cycle.
    pub fn generate_cycle(&mut self, config: &Configuration, cycle: u64) -> Vec<TradeOutcome> {
        let count = self.rng.random_range(MIN_TRADES_PER_CYCLE..=MAX_TRADES_PER_CYCLE);
        (0..count).map(|_| self.generate_trade(config, cycle)).collect()
    }

    fn generate_trade(&mut self, config: &Configuration, cycle: u64) -> TradeOutcome {
        let side = if self.rng.random_bool(0.5) { Side::Buy } else { Side::Sell };
        let size = sample_decimal(&mut self.rng, SIZE_RANGE.0, SIZE_RANGE.1, 3);
        let entry_price = sample_decimal(&mut self.rng, ENTRY_PRICE_RANGE.0, ENTRY_PRICE_RANGE.1, 2);
        let exit_offset = sample_decimal(&mut self.rng, EXIT_OFFSET_RANGE.0, EXIT_OFFSET_RANGE.1, 2);
        let profit_percent = sample_decimal(&mut self.rng, PROFIT_PCT_RANGE.0, PROFIT_PCT_RANGE.1, 2);

        TradeOutcome {
            id: Uuid::new_v4().to_string(),
            cycle,
            timestamp: Utc::now(),
            pair: config.pair(),
            side,
            size,
            entry_price,
            exit_price: entry_price + exit_offset,
            profit_percent,
            profit_absolute: profit_absolute(config.simulated_capital(), profit_percent),
        }
    }
}

pub fn profit_absolute(capital: Decimal, profit_percent: Decimal) -> Decimal {
    capital * (profit_percent / dec!(100)) * PROFIT_SCALE
}
