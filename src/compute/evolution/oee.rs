//! Open-ended evolution (MODES) metrics.
//!
//! Every `resolution` generations the tracker takes the taxa founded since
//! its previous evaluation, skeletonizes them under the active landscape and
//! buffers them. A buffered taxon is committed once its lineage has stayed
//! extant for `filter_length` generations, and discarded as soon as its
//! lineage dies out. Committed taxa feed four potentials:
//!
//! - **change**: taxa committed at this evaluation
//! - **novelty**: committed taxa whose skeleton no earlier persistent taxon had
//! - **ecology**: persistent taxa whose lineage is extant right now
//! - **complexity**: highest skeleton complexity ever committed (never decreases)
//!
//! Skeletons are stamped with the environment epoch they were computed
//! under. A stale skeleton is recomputed under the active landscape before it
//! is used, both for buffered taxa and for persistent ones.

use std::collections::HashMap;

use log::debug;
use rayon::prelude::*;

use super::phylogeny::{Phylogeny, TaxonId};
use super::skeleton::{Skeleton, skeletonize};
use crate::compute::landscape::NkLandscape;
use crate::schema::{OeeHistory, OeeSnapshot};

type SkeletonId = usize;

/// A taxon waiting out the persistence filter.
#[derive(Debug, Clone)]
struct PendingTaxon {
    id: TaxonId,
    origin: u64,
    skeleton: Skeleton,
    /// Environment epoch the skeleton was computed under.
    epoch: u64,
}

/// A taxon that passed the filter, with the skeleton it currently has.
#[derive(Debug, Clone, Copy)]
struct PersistentTaxon {
    skeleton: SkeletonId,
    epoch: u64,
}

/// Online OEE metric tracker.
#[derive(Debug)]
pub struct OeeTracker {
    resolution: u64,
    filter_length: u64,
    pending: Vec<PendingTaxon>,
    /// Skeletons of every taxon that ever persisted.
    seen: HashMap<Skeleton, SkeletonId>,
    /// Persistent taxa whose lineage may still be extant.
    persisted: HashMap<TaxonId, PersistentTaxon>,
    max_complexity: usize,
    history: OeeHistory,
}

impl OeeTracker {
    pub fn new(resolution: u64, filter_length: u64) -> Self {
        Self {
            resolution: resolution.max(1),
            filter_length,
            pending: Vec::new(),
            seen: HashMap::new(),
            persisted: HashMap::new(),
            max_complexity: 0,
            history: OeeHistory::default(),
        }
    }

    pub fn resolution(&self) -> u64 {
        self.resolution
    }

    pub fn filter_length(&self) -> u64 {
        self.filter_length
    }

    /// Whether `generation` is an evaluation generation.
    pub fn is_evaluation(&self, generation: u64) -> bool {
        generation % self.resolution == 0
    }

    /// Taxa still waiting out the filter.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Distinct skeletons among all persistent taxa so far.
    pub fn distinct_skeletons(&self) -> usize {
        self.seen.len()
    }

    /// All evaluations so far.
    pub fn history(&self) -> &OeeHistory {
        &self.history
    }

    /// Evaluate the potentials at `generation`.
    ///
    /// `births` are the taxa founded since the previous evaluation; any that
    /// are already extinct are skipped. `epoch` identifies `landscape` so
    /// skeletons computed under an earlier landscape are redone on commit.
    pub fn evaluate(
        &mut self,
        generation: u64,
        births: &[TaxonId],
        phylogeny: &Phylogeny,
        landscape: &NkLandscape,
        epoch: u64,
    ) -> OeeSnapshot {
        self.buffer_births(births, phylogeny, landscape, epoch);

        let mut change = 0;
        let mut novelty = 0;
        let filter_length = self.filter_length;

        let pending = std::mem::take(&mut self.pending);
        for mut entry in pending {
            let Some(taxon) = phylogeny.get(entry.id) else {
                continue;
            };
            if generation.saturating_sub(entry.origin) < filter_length {
                self.pending.push(entry);
                continue;
            }

            if entry.epoch != epoch {
                entry.skeleton = skeletonize(taxon.genome(), landscape);
            }

            change += 1;
            self.max_complexity = self.max_complexity.max(entry.skeleton.complexity());

            let (skeleton, is_new) = self.intern(entry.skeleton);
            if is_new {
                novelty += 1;
            }
            self.persisted.insert(entry.id, PersistentTaxon { skeleton, epoch });
        }

        self.persisted.retain(|&id, _| phylogeny.is_alive(id));
        self.refresh_persisted(phylogeny, landscape, epoch);

        let snapshot = OeeSnapshot {
            generation,
            change,
            novelty,
            ecology: self.persisted.len(),
            complexity: self.max_complexity,
            diversity: self.skeleton_entropy(),
        };

        debug!(
            "OEE at generation {}: change={} novelty={} ecology={} complexity={} pending={}",
            generation,
            snapshot.change,
            snapshot.novelty,
            snapshot.ecology,
            snapshot.complexity,
            self.pending.len()
        );

        self.history.push(&snapshot);
        snapshot
    }

    /// Skeletonize living newborn taxa in parallel and add them to the buffer.
    fn buffer_births(
        &mut self,
        births: &[TaxonId],
        phylogeny: &Phylogeny,
        landscape: &NkLandscape,
        epoch: u64,
    ) {
        let fresh: Vec<PendingTaxon> = births
            .par_iter()
            .filter_map(|&id| {
                let taxon = phylogeny.get(id)?;
                Some(PendingTaxon {
                    id,
                    origin: taxon.origin(),
                    skeleton: skeletonize(taxon.genome(), landscape),
                    epoch,
                })
            })
            .collect();
        self.pending.extend(fresh);
    }

    /// Id of `skeleton`, and whether it was seen for the first time.
    fn intern(&mut self, skeleton: Skeleton) -> (SkeletonId, bool) {
        let next_id = self.seen.len();
        let id = *self.seen.entry(skeleton).or_insert(next_id);
        (id, id == next_id)
    }

    /// Recompute persistent skeletons left over from an earlier epoch.
    ///
    /// Refreshed skeletons join the seen set without counting as novelty.
    fn refresh_persisted(
        &mut self,
        phylogeny: &Phylogeny,
        landscape: &NkLandscape,
        epoch: u64,
    ) {
        let stale: Vec<(TaxonId, Skeleton)> = self
            .persisted
            .par_iter()
            .filter(|(_, p)| p.epoch != epoch)
            .filter_map(|(&id, _)| {
                let taxon = phylogeny.get(id)?;
                Some((id, skeletonize(taxon.genome(), landscape)))
            })
            .collect();

        if !stale.is_empty() {
            debug!(
                "recomputing {} persistent skeletons for epoch {}",
                stale.len(),
                epoch
            );
        }
        for (id, skeleton) in stale {
            let (skeleton, _) = self.intern(skeleton);
            self.persisted.insert(id, PersistentTaxon { skeleton, epoch });
        }
    }

    /// Shannon entropy (bits) of skeleton frequencies among persistent taxa.
    fn skeleton_entropy(&self) -> f64 {
        if self.persisted.is_empty() {
            return 0.0;
        }

        let mut counts: HashMap<SkeletonId, usize> = HashMap::new();
        for taxon in self.persisted.values() {
            *counts.entry(taxon.skeleton).or_default() += 1;
        }

        let total = self.persisted.len() as f64;
        counts
            .values()
            .map(|&c| {
                let p = c as f64 / total;
                -p * p.log2()
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::genome::{Genome, Organism};
    use crate::schema::TaxonIdentity;

    /// K = 0 landscape where every site prefers 1, so a genome's complexity
    /// is its number of ones.
    fn ones_landscape(n: usize) -> NkLandscape {
        let table = (0..n).flat_map(|_| [0.0, 1.0]).collect();
        NkLandscape::from_table(0, n, 0, table).unwrap()
    }

    struct Fixture {
        phylogeny: Phylogeny,
        population: Vec<Organism>,
        generation: u64,
    }

    impl Fixture {
        fn new(genomes: &[&str]) -> Self {
            let mut phylogeny = Phylogeny::new(TaxonIdentity::Genotype);
            let population = genomes
                .iter()
                .map(|g| {
                    let genome = Genome::parse(g).unwrap();
                    let taxon = phylogeny.inject(&genome, 0);
                    Organism { genome, taxon }
                })
                .collect();
            Self {
                phylogeny,
                population,
                generation: 0,
            }
        }

        /// Advance one generation with explicit parents and offspring.
        fn step(&mut self, parents: &[usize], offspring: &[&str]) {
            self.generation += 1;
            let genomes: Vec<Genome> = offspring
                .iter()
                .map(|g| Genome::parse(g).unwrap())
                .collect();
            let taxa = self.phylogeny.record_generation(
                self.generation,
                &self.population,
                parents,
                &genomes,
            );
            self.population = genomes
                .into_iter()
                .zip(taxa)
                .map(|(genome, taxon)| Organism { genome, taxon })
                .collect();
        }

        /// Every organism copies itself unchanged.
        fn hold(&mut self) {
            let parents: Vec<usize> = (0..self.population.len()).collect();
            let genomes: Vec<String> = self
                .population
                .iter()
                .map(|o| o.genome.to_string())
                .collect();
            let refs: Vec<&str> = genomes.iter().map(String::as_str).collect();
            self.step(&parents, &refs);
        }

        fn evaluate(
            &mut self,
            tracker: &mut OeeTracker,
            landscape: &NkLandscape,
        ) -> OeeSnapshot {
            let births = self.phylogeny.drain_births();
            tracker.evaluate(self.generation, &births, &self.phylogeny, landscape, 0)
        }
    }

    #[test]
    fn test_taxa_count_only_after_filter() {
        let landscape = ones_landscape(4);
        let mut tracker = OeeTracker::new(1, 3);
        let mut fx = Fixture::new(&["1100", "1100"]);

        let snap = fx.evaluate(&mut tracker, &landscape);
        assert_eq!(snap.change, 0);
        assert_eq!(tracker.pending_len(), 2);

        for expected_change in [0, 0, 2] {
            fx.hold();
            let snap = fx.evaluate(&mut tracker, &landscape);
            assert_eq!(snap.change, expected_change, "generation {}", fx.generation);
        }

        let snap = tracker.history().last().unwrap();
        assert_eq!(snap.generation, 3);
        assert_eq!(snap.novelty, 1, "both founders share the skeleton");
        assert_eq!(snap.ecology, 2);
        assert_eq!(snap.complexity, 2);
        assert!((snap.diversity - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_short_lived_taxa_never_count() {
        let landscape = ones_landscape(4);
        let mut tracker = OeeTracker::new(1, 2);
        let mut fx = Fixture::new(&["1000", "0000"]);
        fx.evaluate(&mut tracker, &landscape);

        // "1000" dies out after one generation
        fx.step(&[1, 1], &["0000", "0000"]);
        fx.evaluate(&mut tracker, &landscape);
        fx.hold();
        let snap = fx.evaluate(&mut tracker, &landscape);

        assert_eq!(snap.change, 1);
        assert_eq!(snap.complexity, 0);
        assert_eq!(tracker.pending_len(), 0);
    }

    #[test]
    fn test_complexity_never_decreases() {
        let landscape = ones_landscape(4);
        let mut tracker = OeeTracker::new(1, 1);
        let mut fx = Fixture::new(&["1111", "0000"]);
        fx.evaluate(&mut tracker, &landscape);
        fx.hold();
        let snap = fx.evaluate(&mut tracker, &landscape);
        assert_eq!(snap.complexity, 4);

        // The complex lineage goes extinct
        fx.step(&[1, 1], &["0000", "0000"]);
        let snap = fx.evaluate(&mut tracker, &landscape);
        assert_eq!(snap.complexity, 4);
        assert_eq!(snap.ecology, 1);

        let series = &tracker.history().complexity;
        assert!(series.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_novelty_is_by_skeleton() {
        let landscape = ones_landscape(4);
        let mut tracker = OeeTracker::new(1, 0);
        let mut fx = Fixture::new(&["1100"]);

        let snap = fx.evaluate(&mut tracker, &landscape);
        assert_eq!((snap.change, snap.novelty), (1, 1));

        // A new genotype with a new skeleton
        fx.step(&[0], &["1110"]);
        let snap = fx.evaluate(&mut tracker, &landscape);
        assert_eq!((snap.change, snap.novelty), (1, 1));

        // Reverting to an earlier genotype founds a new taxon but no new skeleton
        fx.step(&[0], &["1100"]);
        let snap = fx.evaluate(&mut tracker, &landscape);
        assert_eq!((snap.change, snap.novelty), (1, 0));
        assert_eq!(tracker.distinct_skeletons(), 2);
    }

    #[test]
    fn test_resolution() {
        let tracker = OeeTracker::new(5, 10);
        assert!(tracker.is_evaluation(0));
        assert!(!tracker.is_evaluation(3));
        assert!(tracker.is_evaluation(10));
    }

    #[test]
    fn test_stale_skeleton_recomputed_on_commit() {
        let old = ones_landscape(2);
        // Every site now prefers 0
        let new = NkLandscape::from_table(1, 2, 0, vec![1.0, 0.0, 1.0, 0.0]).unwrap();
        let mut tracker = OeeTracker::new(1, 1);
        let mut fx = Fixture::new(&["10"]);

        let births = fx.phylogeny.drain_births();
        tracker.evaluate(0, &births, &fx.phylogeny, &old, 0);
        fx.hold();
        let snap = tracker.evaluate(1, &[], &fx.phylogeny, &new, 1);

        // Under `old` the skeleton is "1-"; under `new` it is "-0"
        assert_eq!(snap.change, 1);
        assert_eq!(snap.complexity, 1);
        assert!(tracker.seen.contains_key(&Skeleton::new(vec![None, Some(false)])));
    }

    #[test]
    fn test_persistent_skeletons_follow_landscape_change() {
        let old = ones_landscape(2);
        let neutral = NkLandscape::from_table(1, 2, 0, vec![0.5; 4]).unwrap();
        let mut tracker = OeeTracker::new(1, 0);
        let mut fx = Fixture::new(&["10", "01"]);

        // "1-" and "-1": two equally common skeletons
        let births = fx.phylogeny.drain_births();
        let snap = tracker.evaluate(0, &births, &fx.phylogeny, &old, 0);
        assert_eq!(snap.change, 2);
        assert!((snap.diversity - 1.0).abs() < 1e-12);

        // Nothing matters under a flat landscape, so both collapse to "--"
        fx.hold();
        let snap = tracker.evaluate(1, &[], &fx.phylogeny, &neutral, 1);
        assert_eq!(snap.ecology, 2);
        assert_eq!(snap.novelty, 0);
        assert!(snap.diversity.abs() < 1e-12);
        assert!(tracker.seen.contains_key(&Skeleton::new(vec![None, None])));
    }
}
