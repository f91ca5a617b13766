pub mod trading;
pub mod trade;

pub use trading::*;
pub use trade::*;
