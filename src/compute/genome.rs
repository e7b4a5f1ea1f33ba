//! Bitstring genomes and the random operations applied to them.
//!
//! Provides random generation, per-site mutation, and Hamming distance.

use std::fmt;

use rand::prelude::*;
use rand_distr::Bernoulli;
use serde::{Deserialize, Serialize};

use super::evolution::TaxonId;
use crate::schema::ConfigError;

/// Fixed-length bit sequence.
///
/// The length is fixed for a run; mutation never changes it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Genome {
    bits: Vec<bool>,
}

impl Genome {
    /// Wrap a bit vector.
    pub fn new(bits: Vec<bool>) -> Self {
        Self { bits }
    }

    /// Parse a string of `0` and `1` characters. Other characters are rejected.
    pub fn parse(s: &str) -> Option<Self> {
        s.chars()
            .map(|c| match c {
                '0' => Some(false),
                '1' => Some(true),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .map(Self::new)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> bool {
        self.bits[index]
    }

    /// Invert one site.
    #[inline]
    pub fn flip(&mut self, index: usize) {
        self.bits[index] = !self.bits[index];
    }

    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    pub fn count_ones(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }
}

impl fmt::Display for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &bit in &self.bits {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

/// Number of sites at which two genomes differ.
pub fn hamming_distance(a: &Genome, b: &Genome) -> usize {
    assert_eq!(a.len(), b.len(), "Hamming distance needs equal-length genomes");
    a.bits
        .iter()
        .zip(b.bits.iter())
        .filter(|(x, y)| x != y)
        .count()
}

/// One population slot: a genome and the taxon it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Organism {
    pub genome: Genome,
    pub taxon: TaxonId,
}

/// Random number generator wrapper for genome operations.
pub struct GenomeRng {
    rng: StdRng,
}

impl GenomeRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Genome of length `n` with each bit set with probability 0.5.
    pub fn random_genome(&mut self, n: usize) -> Genome {
        Genome::new((0..n).map(|_| self.rng.gen_bool(0.5)).collect())
    }

    /// Uniform index in `0..len`.
    #[inline]
    pub fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    /// Draw from any distribution.
    #[inline]
    pub fn sample<T, D: Distribution<T>>(&mut self, distribution: &D) -> T {
        self.rng.sample(distribution)
    }
}

/// Independent per-site bit-flip mutation.
#[derive(Debug, Clone, Copy)]
pub struct Mutator {
    rate: f64,
    site: Bernoulli,
}

impl Mutator {
    /// Mutator flipping each site with probability `rate`.
    pub fn new(rate: f64) -> Result<Self, ConfigError> {
        let site = Bernoulli::new(rate).map_err(|_| ConfigError::InvalidMutationRate(rate))?;
        Ok(Self { rate, site })
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Flip each site with probability `rate`. Returns the number of sites changed.
    pub fn mutate(&self, genome: &mut Genome, rng: &mut GenomeRng) -> usize {
        if self.rate == 0.0 {
            return 0;
        }

        let mut count = 0;
        for i in 0..genome.len() {
            if rng.sample(&self.site) {
                genome.flip(i);
                count += 1;
            }
        }
        count
    }
}
