use serde::Serialize;
use thiserror::Error;

/// Rejection raised by the configuration gate. The only domain error the simulation has.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum ValidationError {
    #[error("invalid simulated capital {input:?}: enter a number of at least {minimum}")]
    InvalidCapital { input: String, minimum: u32 },

    #[error("simulated capital {input:?} is too large: enter at most {maximum}")]
    CapitalTooLarge { input: String, maximum: u64 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported trading pair: {0}")]
pub struct UnknownPair(pub String);

/// The simulation task is gone; the handle outlived the runtime that served it.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("simulation runtime has shut down")]
pub struct SimulationClosed;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PositionSizeError {
    #[error("Enter a valid balance and risk percentage.")]
    InvalidInput,
}
