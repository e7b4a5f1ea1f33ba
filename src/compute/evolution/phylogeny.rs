//! Phylogeny tracking.
//!
//! Taxa live in an arena keyed by a stable integer id. Parent links are ids,
//! not owning references, so a lookup of a pruned ancestor simply misses.
//! A taxon is pruned as soon as it has no living organisms and no living
//! child taxa; its clade is extinct at that point and can never come back,
//! so "still in the tree" is the same as "lineage still extant".

use std::collections::{BTreeSet, HashMap};

use log::trace;

use crate::compute::genome::{Genome, Organism};
use crate::schema::{SystematicsStats, TaxonIdentity};

/// Stable taxon identifier. Never reused within a run.
pub type TaxonId = u64;

/// A node in the phylogeny.
#[derive(Debug, Clone)]
pub struct Taxon {
    id: TaxonId,
    parent: Option<TaxonId>,
    origin: u64,
    depth: usize,
    genome: Genome,
    num_orgs: usize,
    total_orgs: u64,
    children: Vec<TaxonId>,
}

impl Taxon {
    pub fn id(&self) -> TaxonId {
        self.id
    }

    /// Taxon this one descends from; `None` for injected founders.
    pub fn parent(&self) -> Option<TaxonId> {
        self.parent
    }

    /// Generation the taxon was founded in.
    pub fn origin(&self) -> u64 {
        self.origin
    }

    /// Number of ancestors above this taxon.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Genome of the founding organism.
    pub fn genome(&self) -> &Genome {
        &self.genome
    }

    /// Living organisms directly in this taxon.
    pub fn num_orgs(&self) -> usize {
        self.num_orgs
    }

    /// Organisms ever assigned to this taxon.
    pub fn total_orgs(&self) -> u64 {
        self.total_orgs
    }

    /// Child taxa that are still in the tree.
    pub fn children(&self) -> &[TaxonId] {
        &self.children
    }

    pub fn is_active(&self) -> bool {
        self.num_orgs > 0
    }
}

/// Forest of taxa with birth, extinction and pruning bookkeeping.
#[derive(Debug)]
pub struct Phylogeny {
    identity: TaxonIdentity,
    taxa: HashMap<TaxonId, Taxon>,
    roots: BTreeSet<TaxonId>,
    next_id: TaxonId,
    generation: u64,
    /// Created in the most recent generation.
    new_taxa: Vec<TaxonId>,
    /// Created since the last `drain_births`.
    births: Vec<TaxonId>,
    pruned: u64,
}

impl Phylogeny {
    pub fn new(identity: TaxonIdentity) -> Self {
        Self {
            identity,
            taxa: HashMap::new(),
            roots: BTreeSet::new(),
            next_id: 0,
            generation: 0,
            new_taxa: Vec::new(),
            births: Vec::new(),
            pruned: 0,
        }
    }

    pub fn identity(&self) -> TaxonIdentity {
        self.identity
    }

    /// Generation of the latest recorded update.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn create(&mut self, parent: Option<TaxonId>, origin: u64, genome: Genome) -> TaxonId {
        let id = self.next_id;
        self.next_id += 1;

        let depth = match parent.and_then(|p| self.taxa.get_mut(&p)) {
            Some(p) => {
                p.children.push(id);
                p.depth + 1
            }
            None => {
                self.roots.insert(id);
                0
            }
        };

        self.taxa.insert(
            id,
            Taxon {
                id,
                parent,
                origin,
                depth,
                genome,
                num_orgs: 0,
                total_orgs: 0,
                children: Vec::new(),
            },
        );
        self.new_taxa.push(id);
        self.births.push(id);
        id
    }

    fn add_org(&mut self, id: TaxonId) {
        if let Some(taxon) = self.taxa.get_mut(&id) {
            taxon.num_orgs += 1;
            taxon.total_orgs += 1;
        }
    }

    /// Add an organism with no parent. It founds its own root taxon.
    pub fn inject(&mut self, genome: &Genome, generation: u64) -> TaxonId {
        if generation != self.generation {
            self.generation = generation;
            self.new_taxa.clear();
        }
        let id = self.create(None, generation, genome.clone());
        self.add_org(id);
        id
    }

    /// Record one synchronous generation.
    ///
    /// `old` is the outgoing population, `parents[i]` the index in `old` of
    /// the parent of offspring `i`. Returns the taxon of each offspring.
    /// Births are applied before deaths so no parent taxon is pruned while
    /// its offspring are still being placed.
    pub fn record_generation(
        &mut self,
        generation: u64,
        old: &[Organism],
        parents: &[usize],
        offspring: &[Genome],
    ) -> Vec<TaxonId> {
        assert_eq!(parents.len(), offspring.len(), "one parent per offspring");
        self.generation = generation;
        self.new_taxa.clear();

        let placed: Vec<TaxonId> = parents
            .iter()
            .zip(offspring)
            .map(|(&p, genome)| {
                let parent_taxon = old[p].taxon;
                let id = if self.same_taxon(parent_taxon, genome) {
                    parent_taxon
                } else {
                    self.create(Some(parent_taxon), generation, genome.clone())
                };
                self.add_org(id);
                id
            })
            .collect();

        for org in old {
            if let Some(taxon) = self.taxa.get_mut(&org.taxon) {
                taxon.num_orgs = taxon.num_orgs.saturating_sub(1);
            }
        }

        let before = self.pruned;
        for org in old {
            self.prune_extinct(org.taxon);
        }

        trace!(
            "generation {}: {} new taxa, {} pruned, {} in tree",
            generation,
            self.new_taxa.len(),
            self.pruned - before,
            self.taxa.len()
        );

        placed
    }

    fn same_taxon(&self, parent: TaxonId, genome: &Genome) -> bool {
        match self.identity {
            TaxonIdentity::Genotype => self
                .taxa
                .get(&parent)
                .is_some_and(|t| t.genome == *genome),
            TaxonIdentity::Lineage => self.taxa.contains_key(&parent),
        }
    }

    /// Remove `id` and then its ancestors for as long as each has no living
    /// organisms and no remaining children.
    fn prune_extinct(&mut self, mut id: TaxonId) {
        loop {
            let Some(taxon) = self.taxa.get(&id) else {
                return;
            };
            if taxon.num_orgs > 0 || !taxon.children.is_empty() {
                return;
            }

            let parent = taxon.parent;
            self.taxa.remove(&id);
            self.pruned += 1;

            match parent.and_then(|p| self.taxa.get_mut(&p).map(|t| (p, t))) {
                Some((p, parent_taxon)) => {
                    parent_taxon.children.retain(|&c| c != id);
                    id = p;
                }
                None => {
                    self.roots.remove(&id);
                    return;
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn get(&self, id: TaxonId) -> Option<&Taxon> {
        self.taxa.get(&id)
    }

    /// True while the taxon or any descendant has a living organism.
    pub fn is_alive(&self, id: TaxonId) -> bool {
        self.taxa.contains_key(&id)
    }

    /// True only during the generation the taxon was founded in.
    pub fn is_new_taxon(&self, id: TaxonId) -> bool {
        self.taxa
            .get(&id)
            .is_some_and(|t| t.origin == self.generation)
    }

    /// Generations since the taxon was founded, if it is still in the tree.
    pub fn age(&self, id: TaxonId, generation: u64) -> Option<u64> {
        self.taxa
            .get(&id)
            .map(|t| generation.saturating_sub(t.origin))
    }

    /// Living organisms directly in the taxon (0 once pruned).
    pub fn extant_count(&self, id: TaxonId) -> usize {
        self.taxa.get(&id).map_or(0, |t| t.num_orgs)
    }

    /// Taxa founded in the latest generation.
    pub fn new_taxa(&self) -> &[TaxonId] {
        &self.new_taxa
    }

    /// Take the taxa founded since the previous call.
    pub fn drain_births(&mut self) -> Vec<TaxonId> {
        std::mem::take(&mut self.births)
    }

    /// Ancestor chain of `id`, nearest first, not including `id` itself.
    pub fn ancestors(&self, id: TaxonId) -> impl Iterator<Item = &Taxon> + '_ {
        let mut next = self.taxa.get(&id).and_then(|t| t.parent);
        std::iter::from_fn(move || {
            let taxon = self.taxa.get(&next?)?;
            next = taxon.parent;
            Some(taxon)
        })
    }

    /// Taxa with at least one living organism.
    pub fn active(&self) -> impl Iterator<Item = &Taxon> + '_ {
        self.taxa.values().filter(|t| t.is_active())
    }

    /// Taxa currently in the tree.
    pub fn len(&self) -> usize {
        self.taxa.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taxa.is_empty()
    }

    /// Taxa ever created.
    pub fn total_created(&self) -> u64 {
        self.next_id
    }

    /// Taxa removed by pruning.
    pub fn total_pruned(&self) -> u64 {
        self.pruned
    }

    /// Most recent common ancestor of every living organism, if there is one.
    pub fn mrca(&self) -> Option<TaxonId> {
        if self.roots.len() != 1 {
            return None;
        }
        let mut id = *self.roots.first()?;
        loop {
            let taxon = self.taxa.get(&id)?;
            if taxon.num_orgs > 0 || taxon.children.len() != 1 {
                return Some(id);
            }
            id = taxon.children[0];
        }
    }

    /// Summary statistics for the current tree.
    pub fn stats(&self, generation: u64) -> SystematicsStats {
        let (active, depth_sum) = self
            .active()
            .fold((0usize, 0usize), |(n, d), t| (n + 1, d + t.depth));

        SystematicsStats {
            generation,
            active_taxa: active,
            ancestor_taxa: self.taxa.len() - active,
            total_taxa: self.next_id,
            phylogenetic_diversity: self.taxa.len(),
            mean_depth: if active > 0 {
                depth_sum as f64 / active as f64
            } else {
                0.0
            },
            mrca_depth: self.mrca().and_then(|id| self.taxa.get(&id)).map(|t| t.depth),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genome(s: &str) -> Genome {
        Genome::parse(s).unwrap()
    }

    /// Inject `genomes` at generation 0 and return the population.
    fn founders(phylogeny: &mut Phylogeny, genomes: &[&str]) -> Vec<Organism> {
        genomes
            .iter()
            .map(|g| {
                let genome = genome(g);
                let taxon = phylogeny.inject(&genome, 0);
                Organism { genome, taxon }
            })
            .collect()
    }

    fn advance(
        phylogeny: &mut Phylogeny,
        generation: u64,
        old: &[Organism],
        parents: &[usize],
        offspring: &[&str],
    ) -> Vec<Organism> {
        let genomes: Vec<Genome> = offspring.iter().map(|g| genome(g)).collect();
        let taxa = phylogeny.record_generation(generation, old, parents, &genomes);
        genomes
            .into_iter()
            .zip(taxa)
            .map(|(genome, taxon)| Organism { genome, taxon })
            .collect()
    }

    #[test]
    fn test_injection_creates_roots() {
        let mut phylogeny = Phylogeny::new(TaxonIdentity::Genotype);
        let pop = founders(&mut phylogeny, &["00", "01", "10"]);

        assert_eq!(phylogeny.len(), 3);
        assert!(pop.iter().all(|o| phylogeny.extant_count(o.taxon) == 1));
        assert!(pop.iter().all(|o| phylogeny.is_new_taxon(o.taxon)));
        assert_eq!(phylogeny.mrca(), None);
    }

    #[test]
    fn test_unchanged_offspring_stay_in_parent_taxon() {
        let mut phylogeny = Phylogeny::new(TaxonIdentity::Genotype);
        let pop = founders(&mut phylogeny, &["00", "11"]);

        let next = advance(&mut phylogeny, 1, &pop, &[0, 0], &["00", "00"]);
        assert_eq!(next[0].taxon, pop[0].taxon);
        assert_eq!(phylogeny.extant_count(pop[0].taxon), 2);
        assert!(phylogeny.new_taxa().is_empty());

        // The "11" founder left no offspring
        assert!(!phylogeny.is_alive(pop[1].taxon));
        assert_eq!(phylogeny.extant_count(pop[1].taxon), 0);
        assert_eq!(phylogeny.mrca(), Some(pop[0].taxon));
    }

    #[test]
    fn test_mutant_founds_child_taxon() {
        let mut phylogeny = Phylogeny::new(TaxonIdentity::Genotype);
        let pop = founders(&mut phylogeny, &["00", "11"]);

        let next = advance(&mut phylogeny, 1, &pop, &[0, 0], &["00", "01"]);
        let child = next[1].taxon;
        assert_ne!(child, pop[0].taxon);
        assert!(phylogeny.is_new_taxon(child));
        assert!(!phylogeny.is_new_taxon(pop[0].taxon));
        assert_eq!(phylogeny.get(child).unwrap().parent(), Some(pop[0].taxon));
        assert_eq!(phylogeny.get(child).unwrap().depth(), 1);
        assert_eq!(phylogeny.age(child, 4), Some(3));
        assert_eq!(phylogeny.new_taxa(), &[child]);

        // Not new once the next generation is recorded
        let _ = advance(&mut phylogeny, 2, &next, &[0, 1], &["00", "01"]);
        assert!(!phylogeny.is_new_taxon(child));
    }

    #[test]
    fn test_ancestor_kept_while_descendants_live() {
        let mut phylogeny = Phylogeny::new(TaxonIdentity::Genotype);
        let pop = founders(&mut phylogeny, &["00", "11"]);
        let root = pop[0].taxon;

        // The "00" founder only survives through a mutant child
        let next = advance(&mut phylogeny, 1, &pop, &[0, 1], &["01", "11"]);
        let child = next[0].taxon;
        assert_eq!(next[1].taxon, pop[1].taxon);

        assert!(phylogeny.is_alive(root));
        assert_eq!(phylogeny.extant_count(root), 0);
        assert_eq!(
            phylogeny.ancestors(child).map(|t| t.id()).collect::<Vec<_>>(),
            vec![root]
        );

        let stats = phylogeny.stats(1);
        assert_eq!(stats.active_taxa, 2);
        assert_eq!(stats.ancestor_taxa, 1);
        assert_eq!(stats.total_taxa, 3);
        assert!((stats.mean_depth - 0.5).abs() < 1e-12);
        assert_eq!(stats.mrca_depth, None);

        // Extinction of the child clade takes the root with it
        let last = advance(&mut phylogeny, 2, &next, &[1, 1], &["11", "11"]);
        assert!(!phylogeny.is_alive(child));
        assert!(!phylogeny.is_alive(root));
        assert_eq!(phylogeny.len(), 1);
        assert_eq!(phylogeny.total_pruned(), 2);
        assert_eq!(phylogeny.mrca(), Some(last[0].taxon));
        assert_eq!(phylogeny.stats(2).mrca_depth, Some(0));
    }

    #[test]
    fn test_lineage_identity_never_splits() {
        let mut phylogeny = Phylogeny::new(TaxonIdentity::Lineage);
        let pop = founders(&mut phylogeny, &["00", "11"]);

        let next = advance(&mut phylogeny, 1, &pop, &[0, 1], &["01", "10"]);
        assert_eq!(next[0].taxon, pop[0].taxon);
        assert_eq!(next[1].taxon, pop[1].taxon);
        assert_eq!(phylogeny.total_created(), 2);
    }

    #[test]
    fn test_drain_births() {
        let mut phylogeny = Phylogeny::new(TaxonIdentity::Genotype);
        let pop = founders(&mut phylogeny, &["00"]);
        assert_eq!(phylogeny.drain_births(), vec![pop[0].taxon]);
        assert!(phylogeny.drain_births().is_empty());

        let next = advance(&mut phylogeny, 1, &pop, &[0], &["10"]);
        assert_eq!(phylogeny.drain_births(), vec![next[0].taxon]);
    }
}
