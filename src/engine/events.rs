use chrono::{DateTime, Utc};
use serde::Serialize;

use super::controller::SimulationState;
use super::gate::Configuration;
use super::stats::StatisticsView;
use super::volatility::VolatilityReading;
use crate::error::ValidationError;
use crate::types::TradeOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Info,
    Profit,
    Loss,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub kind: LogKind,
    pub message: String,
}

impl LogRecord {
    pub fn new(kind: LogKind, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            message: message.into(),
        }
    }
}

/// Everything the controller publishes to subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum SimulationEvent {
    StateChanged { state: SimulationState },
    ConfigurationApplied { configuration: Configuration },
    ConfigurationRejected { error: ValidationError },
    TradeAppended { trade: TradeOutcome },
    StatisticsUpdated { stats: StatisticsView },
    VolatilityUpdated { reading: VolatilityReading },
    CountdownTick { seconds_remaining: u32 },
    WithdrawConfirmed { withdrawn: StatisticsView },
    NewLog { log: LogRecord },
}
