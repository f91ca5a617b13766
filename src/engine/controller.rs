use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::events::{LogKind, LogRecord, SimulationEvent};
use super::gate::{Configuration, ConfigurationDraft};
use super::generator::TradeGenerator;
use super::scheduler::{Cadence, Scheduler};
use super::stats::{RunningStatistics, StatisticsView, PNL_DAMPING};
use super::volatility::{Countdown, VolatilityEstimator, VolatilityReading};
use crate::config::{RiskProfile, SimulationSettings, MAX_ACTIVITY_LOG, MAX_TRADE_LOG};
use crate::error::ValidationError;
use crate::types::{signed_pct, TradeOutcome, TradingPair};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationState {
    Unconfigured,
    Configured,
    Running,
    Paused,
}

impl std::fmt::Display for SimulationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimulationState::Unconfigured => write!(f, "Unconfigured"),
            SimulationState::Configured => write!(f, "Configured"),
            SimulationState::Running => write!(f, "Running"),
            SimulationState::Paused => write!(f, "Paused"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationSnapshot {
    pub state: SimulationState,
    pub configuration: Option<Configuration>,
    pub draft: Option<ConfigurationDraft>,
    pub stats: StatisticsView,
    pub volatility: Option<VolatilityReading>,
    pub countdown: Option<u32>,
    pub active_cadences: Vec<Cadence>,
    /// Newest first.
    pub trades: Vec<TradeOutcome>,
    /// Newest first.
    pub logs: Vec<LogRecord>,
}

/// The wizard state machine.
///
/// Owns the configuration, the running statistics, the bounded trade log and
/// the cadence timers. Trades are only ever generated from the trade cadence
/// while `Running`. Every mutation is published on the broadcast channel.
pub struct SimulationController {
    settings: SimulationSettings,
    state: SimulationState,
    configuration: Option<Configuration>,
    draft: Option<ConfigurationDraft>,
    stats: RunningStatistics,
    trades: VecDeque<TradeOutcome>,
    logs: VecDeque<LogRecord>,
    volatility: Option<VolatilityReading>,
    countdown: Countdown,
    generator: TradeGenerator,
    estimator: VolatilityEstimator,
    jitter_rng: StdRng,
    scheduler: Scheduler,
    events_tx: broadcast::Sender<SimulationEvent>,
}

impl SimulationController {
    /// Log capacities above [`MAX_TRADE_LOG`] and [`MAX_ACTIVITY_LOG`] are clamped down.
    pub fn new(mut settings: SimulationSettings) -> Self {
        settings.trade_log_capacity = settings.trade_log_capacity.clamp(1, MAX_TRADE_LOG);
        settings.activity_log_capacity = settings.activity_log_capacity.clamp(1, MAX_ACTIVITY_LOG);
        let (events_tx, _) = broadcast::channel(settings.event_buffer);
        let rng = |offset: u64| match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(offset)),
            None => StdRng::from_os_rng(),
        };

        Self {
            state: SimulationState::Unconfigured,
            configuration: None,
            draft: None,
            stats: RunningStatistics::default(),
            trades: VecDeque::with_capacity(settings.trade_log_capacity),
            logs: VecDeque::with_capacity(settings.activity_log_capacity),
            volatility: None,
            countdown: Countdown::new(settings.countdown_start),
            generator: TradeGenerator::new(rng(0)),
            estimator: VolatilityEstimator::new(rng(1)),
            jitter_rng: rng(2),
            scheduler: Scheduler::new(
                settings.trade_cycle_period(),
                settings.volatility_sample_period(),
                settings.countdown_period(),
            ),
            events_tx,
            settings,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SimulationEvent> {
        self.events_tx.subscribe()
    }

    pub fn event_sender(&self) -> broadcast::Sender<SimulationEvent> {
        self.events_tx.clone()
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn configuration(&self) -> Option<&Configuration> {
        self.configuration.as_ref()
    }

    pub fn statistics(&self) -> &RunningStatistics {
        &self.stats
    }

    pub fn trade_log(&self) -> impl Iterator<Item = &TradeOutcome> {
        self.trades.iter()
    }

    pub fn volatility(&self) -> Option<&VolatilityReading> {
        self.volatility.as_ref()
    }

    pub fn countdown_remaining(&self) -> u32 {
        self.countdown.remaining()
    }

    pub fn is_cadence_active(&self, cadence: Cadence) -> bool {
        self.scheduler.is_active(cadence)
    }

    /// Records wizard input without validating it. `start()` from
    /// `Unconfigured` validates whatever was staged last.
    pub fn stage_draft(&mut self, draft: ConfigurationDraft) {
        debug!("Wizard input staged: {} / {} / {:?}", draft.pair, draft.risk_profile, draft.capital);
        self.draft = Some(draft);
    }

    pub fn apply_configuration(
        &mut self,
        pair: TradingPair,
        risk_profile: RiskProfile,
        capital_input: &str,
    ) -> Result<Configuration, ValidationError> {
        self.apply_draft(ConfigurationDraft::new(pair, risk_profile, capital_input))
    }

    /// Runs the gate. On success the configuration is replaced, the state
    /// moves to `Configured` if it was `Unconfigured`, and the volatility
    /// cadences restart with an immediate sample. A run in progress keeps
    /// running. On failure nothing but the staged draft changes.
    pub fn apply_draft(&mut self, draft: ConfigurationDraft) -> Result<Configuration, ValidationError> {
        let result = draft.validate();
        self.draft = Some(draft);

        let configuration = match result {
            Ok(configuration) => configuration,
            Err(error) => {
                warn!("Configuration rejected: {}", error);
                self.log(LogKind::Info, format!("Configuration rejected: {}", error));
                self.emit(SimulationEvent::ConfigurationRejected { error: error.clone() });
                return Err(error);
            }
        };

        info!(
            "Configuration applied: pair={}, risk={}, capital={}",
            configuration.pair(),
            configuration.risk_profile(),
            configuration.simulated_capital()
        );
        self.configuration = Some(configuration.clone());
        self.log(
            LogKind::Info,
            format!(
                "Configured {} with {} risk and ${:.2} simulated capital.",
                configuration.pair(),
                configuration.risk_profile(),
                configuration.simulated_capital()
            ),
        );
        self.emit(SimulationEvent::ConfigurationApplied {
            configuration: configuration.clone(),
        });

        if self.state == SimulationState::Unconfigured {
            self.set_state(SimulationState::Configured);
        }
        self.restart_volatility();

        Ok(configuration)
    }

    pub fn start(&mut self) -> SimulationState {
        match self.state {
            SimulationState::Running => return self.state,
            SimulationState::Unconfigured => {
                let Some(draft) = self.draft.clone() else {
                    warn!("Start ignored: no configuration has been entered");
                    return self.state;
                };
                if self.apply_draft(draft).is_err() {
                    return self.state;
                }
            }
            SimulationState::Configured | SimulationState::Paused => {}
        }

        self.scheduler.start(Cadence::TradeCycle);
        if !self.scheduler.is_active(Cadence::VolatilitySample) {
            self.restart_volatility();
        }
        self.scheduler.ensure(Cadence::VolatilityCountdown);

        self.set_state(SimulationState::Running);
        self.log(LogKind::Info, "Simulation started. This does not place real trades.");
        self.state
    }

    /// Stops the trade cadence only; volatility keeps sampling in the background.
    pub fn pause(&mut self) -> SimulationState {
        if self.state != SimulationState::Running {
            debug!("Pause ignored in state {}", self.state);
            return self.state;
        }

        self.scheduler.stop(Cadence::TradeCycle);
        self.set_state(SimulationState::Paused);
        self.log(LogKind::Info, "Simulation paused.");
        self.state
    }

    /// Zeroes the statistics in any state and publishes a confirmation carrying what was withdrawn.
    pub fn withdraw(&mut self) -> SimulationState {
        let withdrawn = self.stats.view(&mut self.jitter_rng);
        self.stats = std::mem::take(&mut self.stats).reset();

        info!(
            "Withdraw: pnl={}%, trades={}, cycles={}",
            withdrawn.total_pnl_percent, withdrawn.total_trades, withdrawn.cycles
        );
        self.log(
            LogKind::Info,
            format!(
                "Simulated withdrawal of {} PnL over {} cycles. Statistics reset.",
                signed_pct(withdrawn.total_pnl_percent),
                withdrawn.cycles
            ),
        );
        self.emit(SimulationEvent::WithdrawConfirmed { withdrawn });
        self.publish_statistics();
        self.state
    }

    /// External disconnect: drops everything and returns to `Unconfigured`.
    pub fn reset(&mut self) -> SimulationState {
        self.scheduler.stop_all();
        self.configuration = None;
        self.draft = None;
        self.stats = std::mem::take(&mut self.stats).reset();
        self.trades.clear();
        self.volatility = None;
        self.countdown.reset();

        self.set_state(SimulationState::Unconfigured);
        self.log(LogKind::Info, "Disconnected. Simulation reset.");
        self.publish_statistics();
        self.state
    }

    /// Resolves when the next active cadence is due. Pending while none is active.
    pub async fn next_due(&mut self) -> Cadence {
        self.scheduler.next_due().await
    }

    /// Runs the job behind `cadence`. A cadence that has been stopped is ignored.
    pub fn fire(&mut self, cadence: Cadence) {
        if !self.scheduler.is_active(cadence) {
            debug!("Ignoring stale {:?} tick", cadence);
            return;
        }

        match cadence {
            Cadence::TradeCycle => self.run_cycle(),
            Cadence::VolatilitySample => self.sample_volatility(),
            Cadence::VolatilityCountdown => {
                let seconds_remaining = self.countdown.tick();
                self.emit(SimulationEvent::CountdownTick { seconds_remaining });
            }
        }
    }

    pub fn snapshot(&mut self) -> SimulationSnapshot {
        SimulationSnapshot {
            state: self.state,
            configuration: self.configuration.clone(),
            draft: self.draft.clone(),
            stats: self.stats.view(&mut self.jitter_rng),
            volatility: self.volatility.clone(),
            countdown: self
                .scheduler
                .is_active(Cadence::VolatilityCountdown)
                .then(|| self.countdown.remaining()),
            active_cadences: self.scheduler.active(),
            trades: self.trades.iter().rev().cloned().collect(),
            logs: self.logs.iter().cloned().collect(),
        }
    }

    fn run_cycle(&mut self) {
        if self.state != SimulationState::Running {
            return;
        }
        let Some(configuration) = self.configuration.clone() else {
            return;
        };

        let cycle = self.stats.cycles + 1;
        let outcomes = self.generator.generate_cycle(&configuration, cycle);
        self.stats = std::mem::take(&mut self.stats).fold(&outcomes);

        let net: Decimal = outcomes.iter().map(|t| t.profit_percent * PNL_DAMPING).sum();
        debug!("Cycle #{}: {} trades, net {}", cycle, outcomes.len(), net);

        for trade in outcomes {
            self.trades.push_back(trade.clone());
            while self.trades.len() > self.settings.trade_log_capacity {
                self.trades.pop_front();
            }
            self.emit(SimulationEvent::TradeAppended { trade });
        }

        let kind = if net >= Decimal::ZERO { LogKind::Profit } else { LogKind::Loss };
        self.log(kind, format!("Cycle #{}: {}", cycle, signed_pct(net)));
        self.publish_statistics();
    }

    fn sample_volatility(&mut self) {
        let Some(profile) = self.configuration.as_ref().map(|c| c.risk_profile()) else {
            return;
        };

        let reading = self.estimator.sample(profile);
        debug!("Volatility {}% ({})", reading.value, reading.regime);
        self.volatility = Some(reading.clone());
        self.emit(SimulationEvent::VolatilityUpdated { reading });
    }

    fn restart_volatility(&mut self) {
        self.sample_volatility();
        self.countdown.reset();
        self.scheduler.start(Cadence::VolatilitySample);
        self.scheduler.start(Cadence::VolatilityCountdown);
        self.emit(SimulationEvent::CountdownTick {
            seconds_remaining: self.countdown.remaining(),
        });
    }

    fn set_state(&mut self, state: SimulationState) {
        if self.state == state {
            return;
        }
        info!("Simulation state: {} -> {}", self.state, state);
        self.state = state;
        self.emit(SimulationEvent::StateChanged { state });
    }

    fn publish_statistics(&mut self) {
        let stats = self.stats.view(&mut self.jitter_rng);
        self.emit(SimulationEvent::StatisticsUpdated { stats });
    }

    fn log(&mut self, kind: LogKind, message: impl Into<String>) {
        let log = LogRecord::new(kind, message);
        self.logs.push_front(log.clone());
        if self.logs.len() > self.settings.activity_log_capacity {
            self.logs.pop_back();
        }
        self.emit(SimulationEvent::NewLog { log });
    }

    fn emit(&self, event: SimulationEvent) {
        // No subscribers is fine; the dashboard may not be open.
        let _ = self.events_tx.send(event);
    }
}
