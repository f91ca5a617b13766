pub mod controller;
pub mod events;
pub mod gate;
pub mod generator;
pub mod runtime;
pub mod scheduler;
pub mod stats;
pub mod volatility;

pub use controller::SimulationState;
pub use events::SimulationEvent;
pub use gate::ConfigurationDraft;
pub use runtime::SimulationHandle;
