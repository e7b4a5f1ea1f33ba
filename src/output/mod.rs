//! Tabular output for NK/OEE runs.
//!
//! A run writes three CSV files into the configured output directory:
//!
//! ```text
//! oee.csv          generation,change,novelty,ecology,complexity,diversity
//! fitness.csv      generation,mean,min,max,std_dev
//! systematics.csv  generation,active_taxa,ancestor_taxa,total_taxa,
//!                  phylogenetic_diversity,mean_depth,mrca_depth
//! ```
//!
//! plus `summary.json` once the run has finished.

mod recorder;

pub use recorder::{
    FITNESS_FILE, OEE_FILE, OutputError, RecorderStats, RunRecorder, SUMMARY_FILE,
    SYSTEMATICS_FILE,
};
