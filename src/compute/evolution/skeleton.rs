//! Genome skeletons: the sites that matter for fitness.
//!
//! A skeleton keeps the bit at every site where a single flip lowers fitness
//! and masks every other site. It is the phenotype proxy used to judge
//! novelty and complexity, and it is only meaningful under the landscape
//! that produced it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::compute::genome::Genome;
use crate::compute::landscape::NkLandscape;

/// Per-site sensitivity profile of a genome.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Skeleton {
    sites: Vec<Option<bool>>,
}

impl Skeleton {
    pub fn new(sites: Vec<Option<bool>>) -> Self {
        Self { sites }
    }

    pub fn sites(&self) -> &[Option<bool>] {
        &self.sites
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Number of sites that matter.
    pub fn complexity(&self) -> usize {
        self.sites.iter().filter(|s| s.is_some()).count()
    }
}

impl fmt::Display for Skeleton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for site in &self.sites {
            let c = match site {
                Some(true) => "1",
                Some(false) => "0",
                None => "-",
            };
            f.write_str(c)?;
        }
        Ok(())
    }
}

/// Skeleton of `genome` under `landscape`.
///
/// # Panics
///
/// On an empty genome.
pub fn skeletonize(genome: &Genome, landscape: &NkLandscape) -> Skeleton {
    assert!(!genome.is_empty(), "empty genome passed to skeletonize");

    let fitness = landscape.fitness(genome);
    let mut mutant = genome.clone();

    let sites = (0..genome.len())
        .map(|i| {
            mutant.flip(i);
            let flipped = landscape.fitness(&mutant);
            mutant.flip(i);
            (flipped < fitness).then(|| genome.get(i))
        })
        .collect();

    Skeleton { sites }
}
