//! NK OEE - Open-ended evolution metrics on NK fitness landscapes.
//!
//! A fixed-size population of bitstring genomes evolves on a tunably rugged
//! NK landscape that can change periodically. Every lineage is tracked in a
//! pruned phylogeny, and the run reports the MODES open-endedness potentials
//! (change, novelty, ecology, complexity) behind a persistence filter.
//!
//! # Architecture
//!
//! The crate is split into three modules:
//!
//! - `schema`: Run configuration and reported statistics
//! - `compute`: Landscapes, selection, mutation, phylogeny and OEE tracking
//! - `output`: CSV recording of generation reports
//!
//! # Example
//!
//! ```rust,no_run
//! use nk_oee::{compute::evolution::NkWorld, schema::RunConfig};
//!
//! let mut config = RunConfig::default();
//! config.landscape.n = 40;
//! config.landscape.k = 3;
//! config.population.max_generations = 500;
//!
//! let mut world = NkWorld::new(config).expect("valid configuration");
//! let summary = world.run();
//!
//! println!("Complexity potential: {:?}", summary.final_oee.map(|o| o.complexity));
//! ```

pub mod compute;
pub mod output;
pub mod schema;

// Re-export commonly used types
pub use compute::evolution::NkWorld;
pub use compute::{Genome, NkLandscape, SelectionStrategy};
pub use schema::{GenerationReport, RunConfig, RunSummary};
