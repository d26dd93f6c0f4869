//! Rule-augmented credit decisioning with explanation formatting, what-if simulation, and case
//! bookkeeping.

pub mod cases;
pub mod config;
pub mod decisioning;
pub mod error;
pub mod import;
pub mod telemetry;
pub mod whatif;

pub use decisioning::{Decision, DecisionEngine};
pub use error::AppError;
