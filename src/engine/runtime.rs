use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::controller::{SimulationController, SimulationSnapshot, SimulationState};
use super::events::SimulationEvent;
use super::gate::{Configuration, ConfigurationDraft};
use super::scheduler::Cadence;
use crate::config::{RiskProfile, SimulationSettings};
use crate::error::{SimulationClosed, ValidationError};
use crate::types::TradingPair;

const COMMAND_BUFFER: usize = 64;

enum Command {
    ApplyConfiguration {
        draft: ConfigurationDraft,
        reply: oneshot::Sender<Result<Configuration, ValidationError>>,
    },
    StageDraft {
        draft: ConfigurationDraft,
        reply: oneshot::Sender<()>,
    },
    Start { reply: oneshot::Sender<SimulationState> },
    Pause { reply: oneshot::Sender<SimulationState> },
    Withdraw { reply: oneshot::Sender<SimulationState> },
    Reset { reply: oneshot::Sender<SimulationState> },
    Snapshot { reply: oneshot::Sender<SimulationSnapshot> },
    Shutdown,
}

enum Wake {
    Command(Command),
    Cadence(Cadence),
}

/// Cloneable front door to the simulation task.
///
/// The controller lives on a single task; every command and every timer tick
/// is handled there one at a time, so a command that has returned has fully
/// taken effect before the next tick is looked at.
#[derive(Clone)]
pub struct SimulationHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<SimulationEvent>,
}

impl SimulationHandle {
    /// Spawns the simulation task on the current tokio runtime.
    pub fn spawn(settings: SimulationSettings) -> (Self, JoinHandle<()>) {
        let controller = SimulationController::new(settings);
        let events = controller.event_sender();
        let (commands, rx) = mpsc::channel(COMMAND_BUFFER);
        let task = tokio::spawn(run(controller, rx));

        (Self { commands, events }, task)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SimulationEvent> {
        self.events.subscribe()
    }

    pub async fn apply_configuration(
        &self,
        pair: TradingPair,
        risk_profile: RiskProfile,
        capital_input: impl Into<String>,
    ) -> Result<Result<Configuration, ValidationError>, SimulationClosed> {
        let draft = ConfigurationDraft::new(pair, risk_profile, capital_input);
        self.request(|reply| Command::ApplyConfiguration { draft, reply }).await
    }

    pub async fn stage_draft(&self, draft: ConfigurationDraft) -> Result<(), SimulationClosed> {
        self.request(|reply| Command::StageDraft { draft, reply }).await
    }

    pub async fn start(&self) -> Result<SimulationState, SimulationClosed> {
        self.request(|reply| Command::Start { reply }).await
    }

    pub async fn pause(&self) -> Result<SimulationState, SimulationClosed> {
        self.request(|reply| Command::Pause { reply }).await
    }

    pub async fn withdraw(&self) -> Result<SimulationState, SimulationClosed> {
        self.request(|reply| Command::Withdraw { reply }).await
    }

    pub async fn reset(&self) -> Result<SimulationState, SimulationClosed> {
        self.request(|reply| Command::Reset { reply }).await
    }

    pub async fn snapshot(&self) -> Result<SimulationSnapshot, SimulationClosed> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub async fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown).await;
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, SimulationClosed> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| SimulationClosed)?;
        response.await.map_err(|_| SimulationClosed)
    }
}

async fn run(mut controller: SimulationController, mut commands: mpsc::Receiver<Command>) {
    info!("Simulation runtime started");

    loop {
        let wake = tokio::select! {
            biased;
            command = commands.recv() => match command {
                Some(command) => Wake::Command(command),
                None => break,
            },
            cadence = controller.next_due() => Wake::Cadence(cadence),
        };

        match wake {
            Wake::Command(Command::Shutdown) => break,
            Wake::Command(command) => handle_command(&mut controller, command),
            Wake::Cadence(cadence) => controller.fire(cadence),
        }
    }

    controller.reset();
    info!("Simulation runtime stopped");
}

fn handle_command(controller: &mut SimulationController, command: Command) {
    // A dropped reply receiver only means the caller stopped waiting.
    match command {
        Command::ApplyConfiguration { draft, reply } => {
            let _ = reply.send(controller.apply_draft(draft));
        }
        Command::StageDraft { draft, reply } => {
            controller.stage_draft(draft);
            let _ = reply.send(());
        }
        Command::Start { reply } => {
            let _ = reply.send(controller.start());
        }
        Command::Pause { reply } => {
            let _ = reply.send(controller.pause());
        }
        Command::Withdraw { reply } => {
            let _ = reply.send(controller.withdraw());
        }
        Command::Reset { reply } => {
            let _ = reply.send(controller.reset());
        }
        Command::Snapshot { reply } => {
            let _ = reply.send(controller.snapshot());
        }
        Command::Shutdown => debug!("Shutdown handled by the run loop"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::time::Duration;
    use tokio::time;

    fn spawn() -> (SimulationHandle, JoinHandle<()>) {
        SimulationHandle::spawn(SimulationSettings::default().with_seed(7))
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_full_session() {
        let (handle, _task) = spawn();

        let config = handle
            .apply_configuration(TradingPair::BTCUSDT, RiskProfile::Balanced, "1000")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(config.simulated_capital(), dec!(1000));

        assert_eq!(handle.start().await.unwrap(), SimulationState::Running);
        time::sleep(Duration::from_millis(3600)).await;

        let snapshot = handle.snapshot().await.unwrap();
        assert!((1..=3).contains(&snapshot.trades.len()));
        assert_eq!(snapshot.stats.cycles, 1);
        assert_eq!(snapshot.stats.total_trades, snapshot.trades.len() as u64);

        assert_eq!(handle.pause().await.unwrap(), SimulationState::Paused);
        time::sleep(Duration::from_secs(20)).await;
        let paused = handle.snapshot().await.unwrap();
        assert_eq!(paused.trades.len(), snapshot.trades.len());
        assert_eq!(paused.stats.cycles, 1);

        assert_eq!(handle.start().await.unwrap(), SimulationState::Running);
        time::sleep(Duration::from_millis(3600)).await;
        assert_eq!(handle.snapshot().await.unwrap().stats.cycles, 2);

        assert_eq!(handle.withdraw().await.unwrap(), SimulationState::Running);
        let withdrawn = handle.snapshot().await.unwrap();
        assert_eq!(withdrawn.stats.total_trades, 0);
        assert_eq!(withdrawn.stats.total_pnl_percent, dec!(0));

        assert_eq!(handle.reset().await.unwrap(), SimulationState::Unconfigured);
        let reset = handle.snapshot().await.unwrap();
        assert!(reset.configuration.is_none());
        assert!(reset.trades.is_empty());
        assert!(reset.active_cadences.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_configuration_through_handle() {
        let (handle, _task) = spawn();
        let result = handle
            .apply_configuration(TradingPair::ETHUSDT, RiskProfile::Aggressive, "ten dollars")
            .await
            .unwrap();
        assert!(matches!(result, Err(ValidationError::InvalidCapital { .. })));
        assert_eq!(handle.snapshot().await.unwrap().state, SimulationState::Unconfigured);
    }

    #[tokio::test(start_paused = true)]
    async fn test_staged_draft_then_start() {
        let (handle, _task) = spawn();
        handle
            .stage_draft(ConfigurationDraft::new(TradingPair::BNBUSDT, RiskProfile::Conservative, "300"))
            .await
            .unwrap();
        assert_eq!(handle.start().await.unwrap(), SimulationState::Running);

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.configuration.unwrap().pair(), TradingPair::BNBUSDT);
        let reading = snapshot.volatility.unwrap();
        assert!(reading.value >= dec!(4) && reading.value < dec!(12));
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_are_broadcast() {
        let (handle, _task) = spawn();
        let mut rx = handle.subscribe();

        handle
            .apply_configuration(TradingPair::SOLUSDT, RiskProfile::Balanced, "1000")
            .await
            .unwrap()
            .unwrap();
        handle.start().await.unwrap();
        time::sleep(Duration::from_millis(3600)).await;

        let mut saw_running = false;
        let mut saw_trade = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                SimulationEvent::StateChanged { state: SimulationState::Running } => saw_running = true,
                SimulationEvent::TradeAppended { .. } => saw_trade = true,
                _ => {}
            }
        }
        assert!(saw_running);
        assert!(saw_trade);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_runtime_reports_error() {
        let (handle, task) = spawn();
        handle.shutdown().await;
        task.await.unwrap();

        assert_eq!(handle.start().await, Err(SimulationClosed));
        assert!(handle.snapshot().await.is_err());
    }
}
