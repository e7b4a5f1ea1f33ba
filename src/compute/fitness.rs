//! Population fitness evaluation with a stamped cache.
//!
//! Cached values are tagged with the population generation and the
//! environment epoch they were computed under. A lookup with any other stamp
//! recomputes, so a new generation or a landscape change can never be served
//! stale values.

use rayon::prelude::*;

use super::genome::Organism;
use super::landscape::NkLandscape;

/// Validity tag for cached fitness values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStamp {
    /// Generation of the population that was evaluated.
    pub generation: u64,
    /// Environment epoch (bumped on every landscape change).
    pub epoch: u64,
}

/// Raw fitness of every population slot, reused while its stamp holds.
#[derive(Debug, Default)]
pub struct FitnessCache {
    stamp: Option<CacheStamp>,
    values: Vec<f64>,
    hits: u64,
    misses: u64,
}

impl FitnessCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if values for `stamp` are held.
    pub fn is_valid(&self, stamp: CacheStamp) -> bool {
        self.stamp == Some(stamp)
    }

    /// Fitness of each organism, evaluated only if the stamp changed.
    pub fn get_or_evaluate(
        &mut self,
        stamp: CacheStamp,
        population: &[Organism],
        landscape: &NkLandscape,
    ) -> &[f64] {
        if self.is_valid(stamp) && self.values.len() == population.len() {
            self.hits += 1;
        } else {
            self.misses += 1;
            self.values = evaluate_population(population, landscape);
            self.stamp = Some(stamp);
        }
        &self.values
    }

    /// Values for `stamp`, if held.
    pub fn get(&self, stamp: CacheStamp) -> Option<&[f64]> {
        self.is_valid(stamp).then_some(self.values.as_slice())
    }

    /// Drop everything held.
    pub fn invalidate(&mut self) {
        self.stamp = None;
        self.values.clear();
    }

    /// (hits, misses) since creation.
    pub fn counters(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}

/// Evaluate every organism against `landscape` in parallel.
pub fn evaluate_population(population: &[Organism], landscape: &NkLandscape) -> Vec<f64> {
    population
        .par_iter()
        .map(|org| landscape.fitness(&org.genome))
        .collect()
}
