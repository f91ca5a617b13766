pub mod position_size;

pub use position_size::*;
