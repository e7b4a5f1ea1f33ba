//! NK fitness landscape.
//!
//! Each of the N loci contributes a value that depends on its own bit and the
//! bits of the K loci that follow it (wrapping around the end of the genome).
//! Contributions are drawn once, uniformly from `[0, 1)`, when the landscape is
//! built. The fitness of a genome is the mean contribution over all loci.

use rand_distr::Uniform;

use super::genome::{Genome, GenomeRng};
use crate::schema::{ConfigError, validate_landscape};

/// Identifier assigned to each landscape as it is built.
pub type LandscapeId = u64;

/// A fixed NK contribution table.
#[derive(Debug, Clone)]
pub struct NkLandscape {
    id: LandscapeId,
    n: usize,
    k: usize,
    /// Row-major `n x 2^(k+1)` table: `table[locus * states + context]`.
    table: Vec<f64>,
}

impl NkLandscape {
    /// Build a landscape with fresh random contributions.
    ///
    /// Fails without drawing anything if `k >= n`.
    pub fn new(
        id: LandscapeId,
        n: usize,
        k: usize,
        rng: &mut GenomeRng,
    ) -> Result<Self, ConfigError> {
        validate_landscape(n, k)?;

        let table = random_table(n << (k + 1), rng);
        Ok(Self { id, n, k, table })
    }

    /// Fresh random contributions with the same N and K.
    pub fn regenerate(&self, id: LandscapeId, rng: &mut GenomeRng) -> Self {
        Self {
            id,
            n: self.n,
            k: self.k,
            table: random_table(self.table.len(), rng),
        }
    }

    /// Build from an explicit table of `n * 2^(k+1)` contributions.
    pub fn from_table(
        id: LandscapeId,
        n: usize,
        k: usize,
        table: Vec<f64>,
    ) -> Result<Self, ConfigError> {
        validate_landscape(n, k)?;
        assert_eq!(
            table.len(),
            n << (k + 1),
            "NK table must hold N * 2^(K+1) contributions"
        );
        Ok(Self { id, n, k, table })
    }

    #[inline]
    pub fn id(&self) -> LandscapeId {
        self.id
    }

    /// Genome length.
    #[inline]
    pub fn n(&self) -> usize {
        self.n
    }

    /// Epistasis degree.
    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Number of context states per locus, `2^(K+1)`.
    #[inline]
    pub fn states(&self) -> usize {
        1 << (self.k + 1)
    }

    pub fn table(&self) -> &[f64] {
        &self.table
    }

    /// Contribution of `locus` in local context `state`.
    #[inline]
    pub fn contribution(&self, locus: usize, state: usize) -> f64 {
        self.table[locus * self.states() + state]
    }

    /// Context index of `locus`: bit `locus + j` (mod N) is bit `j` of the index.
    #[inline]
    fn context(&self, genome: &Genome, locus: usize) -> usize {
        let mut state = 0;
        for j in 0..=self.k {
            if genome.get((locus + j) % self.n) {
                state |= 1 << j;
            }
        }
        state
    }

    /// Mean per-locus contribution.
    pub fn fitness(&self, genome: &Genome) -> f64 {
        assert_eq!(genome.len(), self.n, "genome length does not match landscape");

        let total: f64 = (0..self.n)
            .map(|locus| self.contribution(locus, self.context(genome, locus)))
            .sum();
        total / self.n as f64
    }
}

fn random_table(len: usize, rng: &mut GenomeRng) -> Vec<f64> {
    let contribution = Uniform::new(0.0, 1.0);
    (0..len).map(|_| rng.sample(&contribution)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_table_size() {
        let mut rng = GenomeRng::new(42);
        let landscape = NkLandscape::new(0, 20, 3, &mut rng).unwrap();
        assert_eq!(landscape.table().len(), 20 * 16);
        assert!(landscape.table().iter().all(|&c| (0.0..1.0).contains(&c)));
    }

    #[test]
    fn test_rejects_k_at_least_n() {
        let mut rng = GenomeRng::new(42);
        assert_eq!(
            NkLandscape::new(0, 5, 5, &mut rng).unwrap_err(),
            ConfigError::EpistasisTooHigh { k: 5, n: 5 }
        );
        assert!(NkLandscape::new(0, 5, 9, &mut rng).is_err());
        assert!(NkLandscape::new(0, 5, 4, &mut rng).is_ok());
    }

    #[test]
    fn test_k_zero_is_mean_of_site_values() {
        // states: [bit = 0, bit = 1] per locus
        let table = vec![0.0, 1.0, 0.2, 0.4, 0.5, 0.9];
        let landscape = NkLandscape::from_table(0, 3, 0, table).unwrap();

        let genome = Genome::parse("101").unwrap();
        let expected = (1.0 + 0.2 + 0.9) / 3.0;
        assert!((landscape.fitness(&genome) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_context_wraps_around() {
        // N = 3, K = 1: locus 2 reads bits 2 and 0.
        let mut table = vec![0.0; 3 * 4];
        // locus 2, bit2 = 1, bit0 = 1 -> state 0b11
        table[2 * 4 + 3] = 0.9;
        let landscape = NkLandscape::from_table(0, 3, 1, table).unwrap();

        let genome = Genome::parse("101").unwrap();
        assert!((landscape.fitness(&genome) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_regenerate_keeps_shape() {
        let mut rng = GenomeRng::new(5);
        let old = NkLandscape::new(0, 10, 2, &mut rng).unwrap();
        let new = old.regenerate(1, &mut rng);
        assert_eq!((new.n(), new.k(), new.id()), (10, 2, 1));
        assert_eq!(new.table().len(), old.table().len());
        assert_ne!(new.table(), old.table());
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = NkLandscape::new(0, 16, 2, &mut GenomeRng::new(1)).unwrap();
        let b = NkLandscape::new(1, 16, 2, &mut GenomeRng::new(2)).unwrap();
        assert_ne!(a.table(), b.table());
    }

    proptest! {
        #[test]
        fn fitness_is_deterministic_and_in_range(
            seed in any::<u64>(),
            n in 1usize..40,
            k_frac in 0.0f64..1.0,
        ) {
            let k = ((n as f64 * k_frac) as usize).min(n - 1).min(6);
            let mut rng = GenomeRng::new(seed);
            let landscape = NkLandscape::new(0, n, k, &mut rng).unwrap();
            let genome = rng.random_genome(n);

            let first = landscape.fitness(&genome);
            prop_assert!((0.0..1.0).contains(&first));
            prop_assert_eq!(first, landscape.fitness(&genome));
        }
    }
}
