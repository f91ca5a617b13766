use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::generator::sample_decimal;
use crate::types::TradeOutcome;

/// Each trade's percentage moves the cumulative PnL by a tenth of itself.
pub const PNL_DAMPING: Decimal = dec!(0.1);

const RISK_FLOOR: Decimal = dec!(-1);
const RISK_CEILING: Decimal = dec!(4);
const RISK_JITTER: (Decimal, Decimal) = (dec!(-0.2), dec!(0.2));

/// Running counters for the current session. Only [`RunningStatistics::fold`] advances them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningStatistics {
    pub total_pnl_percent: Decimal,
    pub total_profit_absolute: Decimal,
    pub wins: u64,
    pub losses: u64,
    pub cycles: u64,
}

impl RunningStatistics {
    /// Folds one cycle's outcomes in. Counts the cycle once, however many trades it had.
    pub fn fold(mut self, cycle_outcomes: &[TradeOutcome]) -> Self {
        for outcome in cycle_outcomes {
            if outcome.is_win() {
                self.wins += 1;
            } else {
                self.losses += 1;
            }
            self.total_pnl_percent = self
                .total_pnl_percent
                .saturating_add(outcome.profit_percent * PNL_DAMPING);
            self.total_profit_absolute = self
                .total_profit_absolute
                .saturating_add(outcome.profit_absolute);
        }
        self.cycles += 1;
        self
    }

    pub fn reset(self) -> Self {
        Self::default()
    }

    pub fn total_trades(&self) -> u64 {
        self.wins + self.losses
    }

    pub fn win_rate(&self) -> Decimal {
        Decimal::from(self.wins) / Decimal::from(self.total_trades().max(1)) * dec!(100)
    }

    /// Win-rate mapped onto `[-1, 4]` before jitter.
    pub fn base_risk_metric(&self) -> Decimal {
        ((self.win_rate() - dec!(50)) / dec!(10)).clamp(RISK_FLOOR, RISK_CEILING)
    }

    /// Cosmetic "Sharpe-like" number. Jitters on every call; never store it.
    pub fn derived_risk_metric<R: Rng + ?Sized>(&self, rng: &mut R) -> Decimal {
        let jitter = sample_decimal(rng, RISK_JITTER.0, RISK_JITTER.1, 2);
        (self.base_risk_metric() + jitter).clamp(RISK_FLOOR, RISK_CEILING)
    }

    pub fn view<R: Rng + ?Sized>(&self, rng: &mut R) -> StatisticsView {
        StatisticsView {
            total_pnl_percent: self.total_pnl_percent.round_dp(4),
            total_profit_absolute: self.total_profit_absolute.round_dp(4),
            wins: self.wins,
            losses: self.losses,
            cycles: self.cycles,
            total_trades: self.total_trades(),
            win_rate: self.win_rate().round_dp(2),
            derived_risk_metric: self.derived_risk_metric(rng),
        }
    }
}

/// Render-time snapshot of the statistics, with a freshly jittered risk metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsView {
    pub total_pnl_percent: Decimal,
    pub total_profit_absolute: Decimal,
    pub wins: u64,
    pub losses: u64,
    pub cycles: u64,
    pub total_trades: u64,
    pub win_rate: Decimal,
    pub derived_risk_metric: Decimal,
}
