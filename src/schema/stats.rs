//! Per-generation records reported by a run.
//!
//! These are plain serializable values: the world produces them and the
//! output recorder writes them out as CSV rows.

use serde::{Deserialize, Serialize};

/// The four OEE potentials (plus skeleton entropy) at one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OeeSnapshot {
    /// Generation the evaluation ran at.
    pub generation: u64,
    /// Taxa that passed the persistence filter since the previous evaluation.
    pub change: usize,
    /// Newly persistent taxa with a never-before-persisted skeleton.
    pub novelty: usize,
    /// Persisted taxa whose lineage is extant right now.
    pub ecology: usize,
    /// Highest complexity of any persisted taxon so far.
    pub complexity: usize,
    /// Shannon entropy (bits) of skeleton frequencies among persisted extant taxa.
    pub diversity: f64,
}

/// OEE series, one point per evaluation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OeeHistory {
    /// Generation of each evaluation.
    pub generation: Vec<u64>,
    /// Change potential.
    pub change: Vec<usize>,
    /// Novelty potential.
    pub novelty: Vec<usize>,
    /// Ecology potential.
    pub ecology: Vec<usize>,
    /// Complexity potential.
    pub complexity: Vec<usize>,
    /// Skeleton entropy.
    pub diversity: Vec<f64>,
}

impl OeeHistory {
    /// Append one evaluation.
    pub fn push(&mut self, snapshot: &OeeSnapshot) {
        self.generation.push(snapshot.generation);
        self.change.push(snapshot.change);
        self.novelty.push(snapshot.novelty);
        self.ecology.push(snapshot.ecology);
        self.complexity.push(snapshot.complexity);
        self.diversity.push(snapshot.diversity);
    }

    /// Number of evaluations recorded.
    pub fn len(&self) -> usize {
        self.generation.len()
    }

    /// True if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.generation.is_empty()
    }

    /// Most recent evaluation.
    pub fn last(&self) -> Option<OeeSnapshot> {
        let i = self.len().checked_sub(1)?;
        Some(OeeSnapshot {
            generation: self.generation[i],
            change: self.change[i],
            novelty: self.novelty[i],
            ecology: self.ecology[i],
            complexity: self.complexity[i],
            diversity: self.diversity[i],
        })
    }
}

/// Aggregate raw-fitness statistics for the population.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FitnessStats {
    pub generation: u64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub std_dev: f64,
}

impl FitnessStats {
    /// Compute statistics over a slice of fitness values.
    pub fn from_values(generation: u64, values: &[f64]) -> Self {
        if values.is_empty() {
            return Self {
                generation,
                ..Default::default()
            };
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Self {
            generation,
            mean,
            min,
            max,
            std_dev: variance.sqrt(),
        }
    }
}

/// Phylogeny summary statistics.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SystematicsStats {
    pub generation: u64,
    /// Taxa with at least one living organism.
    pub active_taxa: usize,
    /// Taxa with no living organisms but living descendants.
    pub ancestor_taxa: usize,
    /// Taxa ever created, pruned ones included.
    pub total_taxa: u64,
    /// Taxa currently held in the tree (active plus ancestors).
    pub phylogenetic_diversity: usize,
    /// Mean number of ancestors above each active taxon.
    pub mean_depth: f64,
    /// Depth of the most recent common ancestor of all living organisms,
    /// if they share one.
    pub mrca_depth: Option<usize>,
}

/// Everything that happened in one generation step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationReport {
    /// Generation reached by this step.
    pub generation: u64,
    /// Landscape that selection measured fitness against in this step.
    pub landscape_id: u64,
    /// Taxa founded this step.
    pub new_taxa: usize,
    /// Total mutations applied to offspring.
    pub mutations: usize,
    /// Present on OEE evaluation generations.
    pub oee: Option<OeeSnapshot>,
    /// Present on stats-interval generations.
    pub fitness: Option<FitnessStats>,
    /// Present on stats-interval generations.
    pub systematics: Option<SystematicsStats>,
    /// True if the landscape changed at the end of this step.
    pub environment_changed: bool,
}

/// Final summary of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Generations run.
    pub generations: u64,
    /// Seed actually used (resolved from the clock when configured as 0).
    pub seed: u64,
    /// Landscapes constructed over the run.
    pub landscapes_built: u64,
    /// Environment change events.
    pub environment_changes: u64,
    /// Last OEE evaluation, if any ran.
    pub final_oee: Option<OeeSnapshot>,
    /// Fitness of the final population.
    pub final_fitness: FitnessStats,
    /// Time taken (in seconds).
    pub elapsed_seconds: f64,
    /// Full OEE history.
    pub oee_history: OeeHistory,
}
