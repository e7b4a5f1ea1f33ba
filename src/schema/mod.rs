//! Schema module - Configuration and reporting types for NK/OEE runs.

mod config;
mod stats;

pub use config::*;
pub use stats::*;
