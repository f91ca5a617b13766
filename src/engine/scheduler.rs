use serde::Serialize;
use std::collections::BTreeMap;
use std::future::poll_fn;
use std::task::Poll;
use std::time::Duration;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::debug;

/// The periodic jobs the controller drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    TradeCycle,
    VolatilitySample,
    VolatilityCountdown,
}

/// Independent repeating timers keyed by [`Cadence`].
///
/// Starting a cadence that is already active replaces its timer, so two
/// copies of the same job can never run side by side. Stopping drops the
/// timer; once `stop` returns, [`Scheduler::next_due`] will not yield that
/// cadence again until it is restarted.
pub struct Scheduler {
    periods: BTreeMap<Cadence, Duration>,
    active: BTreeMap<Cadence, Interval>,
}

impl Scheduler {
    pub fn new(trade_cycle: Duration, volatility_sample: Duration, countdown: Duration) -> Self {
        let periods = BTreeMap::from([
            (Cadence::TradeCycle, trade_cycle),
            (Cadence::VolatilitySample, volatility_sample),
            (Cadence::VolatilityCountdown, countdown),
        ]);

        Self {
            periods,
            active: BTreeMap::new(),
        }
    }

    pub fn period(&self, cadence: Cadence) -> Duration {
        self.periods.get(&cadence).copied().unwrap_or(Duration::from_secs(1))
    }

    /// (Re)starts `cadence`; its first tick is one full period from now.
    pub fn start(&mut self, cadence: Cadence) {
        let period = self.period(cadence);
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        if self.active.insert(cadence, interval).is_some() {
            debug!("Cadence {:?} restarted", cadence);
        } else {
            debug!("Cadence {:?} started ({} ms)", cadence, period.as_millis());
        }
    }

    /// Starts `cadence` only if it is not already running.
    pub fn ensure(&mut self, cadence: Cadence) {
        if !self.is_active(cadence) {
            self.start(cadence);
        }
    }

    pub fn stop(&mut self, cadence: Cadence) -> bool {
        let stopped = self.active.remove(&cadence).is_some();
        if stopped {
            debug!("Cadence {:?} stopped", cadence);
        }
        stopped
    }

    pub fn stop_all(&mut self) {
        self.active.clear();
    }

    pub fn is_active(&self, cadence: Cadence) -> bool {
        self.active.contains_key(&cadence)
    }

    pub fn active(&self) -> Vec<Cadence> {
        self.active.keys().copied().collect()
    }

    /// Resolves with the next cadence whose timer fired. Pending forever when
    /// nothing is active. Cancel-safe: dropping the future loses no tick.
    pub async fn next_due(&mut self) -> Cadence {
        poll_fn(|cx| {
            for (cadence, interval) in self.active.iter_mut() {
                if interval.poll_tick(cx).is_ready() {
                    return Poll::Ready(*cadence);
                }
            }
            Poll::Pending
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, task};

    fn scheduler() -> Scheduler {
        Scheduler::new(
            Duration::from_millis(3500),
            Duration::from_millis(3000),
            Duration::from_millis(1000),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_scheduler_never_fires() {
        let mut scheduler = scheduler();
        let mut next = task::spawn(scheduler.next_due());
        assert_pending!(next.poll());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cadences_fire_on_their_own_periods() {
        let mut scheduler = scheduler();
        let origin = Instant::now();
        scheduler.start(Cadence::TradeCycle);
        scheduler.start(Cadence::VolatilityCountdown);

        let mut fired = Vec::new();
        while Instant::now() - origin < Duration::from_millis(3500) {
            fired.push((scheduler.next_due().await, (Instant::now() - origin).as_millis()));
        }

        assert_eq!(
            fired,
            vec![
                (Cadence::VolatilityCountdown, 1000),
                (Cadence::VolatilityCountdown, 2000),
                (Cadence::VolatilityCountdown, 3000),
                (Cadence::TradeCycle, 3500),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_instead_of_stacking() {
        let mut scheduler = scheduler();
        let origin = Instant::now();
        scheduler.start(Cadence::TradeCycle);

        time::sleep(Duration::from_millis(2000)).await;
        scheduler.start(Cadence::TradeCycle);
        assert_eq!(scheduler.active(), vec![Cadence::TradeCycle]);

        // Only the replacement timer fires, one full period after the restart.
        assert_eq!(scheduler.next_due().await, Cadence::TradeCycle);
        assert_eq!((Instant::now() - origin).as_millis(), 5500);
        assert_eq!(scheduler.next_due().await, Cadence::TradeCycle);
        assert_eq!((Instant::now() - origin).as_millis(), 9000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_cadence_does_not_fire() {
        let mut scheduler = scheduler();
        scheduler.start(Cadence::TradeCycle);
        scheduler.start(Cadence::VolatilitySample);
        assert!(scheduler.stop(Cadence::TradeCycle));
        assert!(!scheduler.stop(Cadence::TradeCycle));

        for _ in 0..5 {
            assert_eq!(scheduler.next_due().await, Cadence::VolatilitySample);
        }

        scheduler.stop_all();
        assert!(scheduler.active().is_empty());
        time::sleep(Duration::from_secs(30)).await;
        let mut next = task::spawn(scheduler.next_due());
        assert_pending!(next.poll());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ensure_keeps_running_timer_phase() {
        let mut scheduler = scheduler();
        let origin = Instant::now();
        scheduler.start(Cadence::VolatilitySample);
        time::sleep(Duration::from_millis(1500)).await;
        scheduler.ensure(Cadence::VolatilitySample);

        assert_eq!(scheduler.next_due().await, Cadence::VolatilitySample);
        assert_eq!((Instant::now() - origin).as_millis(), 3000);
    }
}
