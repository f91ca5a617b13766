use chrono::{DateTime, Utc};

use crate::engine::SimulationHandle;

/// Shared state for the dashboard server
#[derive(Clone)]
pub struct AppState {
    pub simulation: SimulationHandle,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(simulation: SimulationHandle) -> Self {
        Self {
            simulation,
            started_at: Utc::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        (Utc::now() - self.started_at).num_seconds().max(0) as u64
    }
}
