//! Compute module - NK landscapes, selection and evolutionary dynamics.

mod environment;
mod fitness;
mod genome;
mod landscape;
mod selection;

pub mod evolution;

pub use environment::*;
pub use fitness::*;
pub use genome::*;
pub use landscape::*;
pub use selection::*;
