use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Upper bound on the dashboard trade log.
pub const MAX_TRADE_LOG: usize = 120;
pub const MAX_ACTIVITY_LOG: usize = 80;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub server: ServerSettings,
    pub simulation: SimulationSettings,
    pub logging: LoggingSettings,
}

impl RuntimeConfig {
    /// Loads `path` if it exists, then applies `SIM_*` environment overrides
    /// (after reading a `.env` file when present) and validates the result.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Ok(env_file) = dotenvy::dotenv() {
            debug!("Loaded environment from {}", env_file.display());
        }

        let mut config = match path {
            Some(path) if path.exists() => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                let config = Self::from_toml(&raw)
                    .with_context(|| format!("parsing config file {}", path.display()))?;
                info!("Configuration loaded from {}", path.display());
                config
            }
            Some(path) => {
                info!("No config file at {}, using defaults", path.display());
                Self::default()
            }
            None => Self::default(),
        };

        config
            .apply_overrides(|key| std::env::var(key).ok())
            .map_err(|errors| anyhow!(errors.join(", ")))?;
        config
            .validate()
            .map_err(|errors| anyhow!("invalid configuration: {}", errors.join(", ")))?;

        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), Vec<String>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut errors = Vec::new();

        if let Some(host) = lookup("SIM_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("SIM_PORT") {
            match port.trim().parse() {
                Ok(port) => self.server.port = port,
                Err(_) => errors.push(format!("SIM_PORT is not a valid port: {}", port)),
            }
        }
        if let Some(seed) = lookup("SIM_SEED") {
            match seed.trim().parse() {
                Ok(seed) => self.simulation.seed = Some(seed),
                Err(_) => errors.push(format!("SIM_SEED is not a valid u64: {}", seed)),
            }
        }
        if let Some(level) = lookup("SIM_LOG_LEVEL") {
            self.logging.level = level;
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        // Cadences
        if self.simulation.trade_cycle_ms == 0 {
            errors.push("trade_cycle_ms must be > 0".to_string());
        }
        if self.simulation.volatility_sample_ms == 0 {
            errors.push("volatility_sample_ms must be > 0".to_string());
        }
        if self.simulation.countdown_ms == 0 {
            errors.push("countdown_ms must be > 0".to_string());
        }
        if self.simulation.countdown_start == 0 {
            errors.push("countdown_start must be > 0".to_string());
        }

        // Buffers
        if !(1..=MAX_TRADE_LOG).contains(&self.simulation.trade_log_capacity) {
            errors.push(format!("trade_log_capacity must be between 1 and {}", MAX_TRADE_LOG));
        }
        if !(1..=MAX_ACTIVITY_LOG).contains(&self.simulation.activity_log_capacity) {
            errors.push(format!("activity_log_capacity must be between 1 and {}", MAX_ACTIVITY_LOG));
        }
        if self.simulation.event_buffer == 0 {
            errors.push("event_buffer must be > 0".to_string());
        }

        if self.server.host.trim().is_empty() {
            errors.push("server.host must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Knobs that parametrize the simulation controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub trade_cycle_ms: u64,
    pub volatility_sample_ms: u64,
    pub countdown_ms: u64,
    pub countdown_start: u32,
    pub trade_log_capacity: usize,
    pub activity_log_capacity: usize,
    pub event_buffer: usize,
    /// Fixed RNG seed; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl SimulationSettings {
    pub fn trade_cycle_period(&self) -> Duration {
        Duration::from_millis(self.trade_cycle_ms)
    }

    pub fn volatility_sample_period(&self) -> Duration {
        Duration::from_millis(self.volatility_sample_ms)
    }

    pub fn countdown_period(&self) -> Duration {
        Duration::from_millis(self.countdown_ms)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            trade_cycle_ms: 3500,
            volatility_sample_ms: 3000,
            countdown_ms: 1000,
            countdown_start: 3,
            trade_log_capacity: MAX_TRADE_LOG,
            activity_log_capacity: MAX_ACTIVITY_LOG,
            event_buffer: 256,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = RuntimeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.simulation.trade_cycle_period(), Duration::from_millis(3500));
        assert_eq!(config.simulation.volatility_sample_period(), Duration::from_secs(3));
        assert_eq!(config.simulation.countdown_period(), Duration::from_secs(1));
        assert_eq!(config.simulation.trade_log_capacity, 120);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RuntimeConfig::from_toml(
            r#"
            [server]
            port = 8080

            [simulation]
            seed = 7
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.simulation.seed, Some(7));
        assert_eq!(config.simulation.trade_cycle_ms, 3500);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_validation_collects_errors() {
        let mut config = RuntimeConfig::default();
        config.simulation.trade_cycle_ms = 0;
        config.simulation.trade_log_capacity = 0;

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("trade_cycle_ms"));
    }

    #[test]
    fn test_log_capacities_are_capped() {
        let config = RuntimeConfig::from_toml(
            r#"
            [simulation]
            trade_log_capacity = 500
            activity_log_capacity = 81
            "#,
        )
        .unwrap();

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("trade_log_capacity"));
        assert!(errors[1].contains("activity_log_capacity"));

        let mut config = RuntimeConfig::default();
        config.simulation.trade_log_capacity = 30;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [("SIM_PORT", "4100"), ("SIM_SEED", "99"), ("SIM_LOG_LEVEL", "debug")]
            .into_iter()
            .collect();

        let mut config = RuntimeConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.server.port, 4100);
        assert_eq!(config.simulation.seed, Some(99));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_bad_env_override_is_reported() {
        let mut config = RuntimeConfig::default();
        let errors = config
            .apply_overrides(|key| (key == "SIM_PORT").then(|| "not-a-port".to_string()))
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(config.server.port, 3000);
    }
}
