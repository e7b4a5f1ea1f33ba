//! Evolutionary dynamics and open-ended evolution tracking.
//!
//! # Overview
//!
//! - **Phylogeny** (`phylogeny`): arena of taxa linked by parent ids, pruned
//!   as lineages die out
//! - **Skeletons** (`skeleton`): per-site fitness sensitivity of a genome
//! - **OEE metrics** (`oee`): change, novelty, ecology and complexity
//!   potentials behind a persistence filter
//! - **World** (`world`): the generation loop that drives all of the above
//!
//! # Example
//!
//! ```rust,no_run
//! use nk_oee::compute::evolution::NkWorld;
//! use nk_oee::schema::RunConfig;
//!
//! let mut world = NkWorld::new(RunConfig::default()).unwrap();
//! let summary = world
//!     .run_with_callback(|report| {
//!         if let Some(oee) = &report.oee {
//!             println!(
//!                 "Generation {}: change={} novelty={} complexity={}",
//!                 report.generation, oee.change, oee.novelty, oee.complexity
//!             );
//!         }
//!         Ok::<(), std::io::Error>(())
//!     })
//!     .unwrap();
//!
//! println!("Max complexity: {:?}", summary.final_oee.map(|o| o.complexity));
//! ```

mod oee;
mod phylogeny;
mod skeleton;
mod world;

pub use oee::OeeTracker;
pub use phylogeny::{Phylogeny, Taxon, TaxonId};
pub use skeleton::{Skeleton, skeletonize};
pub use world::NkWorld;
