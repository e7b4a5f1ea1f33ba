//! The generation loop.
//!
//! [`NkWorld`] owns every piece of simulation state and advances it one
//! synchronous generation at a time. Each step runs the same fixed sequence:
//!
//! 1. raw fitness (from the stamped cache) if the selector reads it
//! 2. parent selection
//! 3. copy and mutate offspring
//! 4. phylogeny update, births before deaths
//! 5. OEE evaluation on resolution boundaries
//! 6. fitness and systematics statistics on stats-interval boundaries
//! 7. environment change check
//!
//! Steps 5 to 7 also run once for the injected population, so generation 0
//! is reported like every other.

use std::convert::Infallible;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use log::{debug, info, trace};

use super::oee::OeeTracker;
use super::phylogeny::Phylogeny;
use crate::compute::environment::Environment;
use crate::compute::fitness::{CacheStamp, FitnessCache};
use crate::compute::genome::{Genome, GenomeRng, Mutator, Organism};
use crate::compute::landscape::LandscapeId;
use crate::compute::selection::SelectionStrategy;
use crate::schema::{ConfigError, FitnessStats, GenerationReport, RunConfig, RunSummary};

/// A whole NK evolution run.
pub struct NkWorld {
    config: RunConfig,
    seed: u64,
    rng: GenomeRng,
    environment: Environment,
    selection: SelectionStrategy,
    mutator: Mutator,
    population: Vec<Organism>,
    fitness: FitnessCache,
    phylogeny: Phylogeny,
    oee: OeeTracker,
    generation: u64,
    initial_reported: bool,
}

impl NkWorld {
    /// Validate `config`, build the landscape(s) and inject a random
    /// population at generation 0.
    pub fn new(config: RunConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let seed = resolve_seed(config.seed);
        let mut rng = GenomeRng::new(seed);

        let environment = Environment::new(&config.landscape, &config.environment, &mut rng)?;
        let selection = SelectionStrategy::from_config(&config.selection)?;
        let mutator = Mutator::new(config.population.mutation_rate)?;

        let mut phylogeny = Phylogeny::new(config.oee.taxon_identity);
        let population = (0..config.population.size)
            .map(|_| {
                let genome = rng.random_genome(config.landscape.n);
                let taxon = phylogeny.inject(&genome, 0);
                Organism { genome, taxon }
            })
            .collect();

        let oee = OeeTracker::new(config.oee.resolution, config.oee.filter_length);

        info!(
            "NK world: N={} K={} pop={} selection={} change={}/{} seed={}",
            config.landscape.n,
            config.landscape.k,
            config.population.size,
            config.selection.scheme,
            config.environment.change_type,
            config.environment.change_rate,
            seed
        );

        Ok(Self {
            config,
            seed,
            rng,
            environment,
            selection,
            mutator,
            population,
            fitness: FitnessCache::new(),
            phylogeny,
            oee,
            generation: 0,
            initial_reported: false,
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Effective seed (never 0).
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn population(&self) -> &[Organism] {
        &self.population
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn phylogeny(&self) -> &Phylogeny {
        &self.phylogeny
    }

    pub fn oee(&self) -> &OeeTracker {
        &self.oee
    }

    pub fn fitness_cache(&self) -> &FitnessCache {
        &self.fitness
    }

    fn stamp(&self) -> CacheStamp {
        CacheStamp {
            generation: self.generation,
            epoch: self.environment.epoch(),
        }
    }

    /// Raw fitness of the current population under the active landscape.
    pub fn fitness(&mut self) -> &[f64] {
        let stamp = self.stamp();
        self.fitness
            .get_or_evaluate(stamp, &self.population, self.environment.active())
    }

    /// Advance one generation.
    pub fn step(&mut self) -> GenerationReport {
        let landscape_id = self.environment.active().id();
        let stamp = self.stamp();

        let fitness: &[f64] = if self.selection.uses_fitness() {
            self.fitness
                .get_or_evaluate(stamp, &self.population, self.environment.active())
        } else {
            &[]
        };
        let parents = self.selection.select(&self.population, fitness, &mut self.rng);

        let mut mutations = 0;
        let offspring: Vec<Genome> = parents
            .iter()
            .map(|&p| {
                let mut genome = self.population[p].genome.clone();
                mutations += self.mutator.mutate(&mut genome, &mut self.rng);
                genome
            })
            .collect();

        let next = self.generation + 1;
        let taxa = self
            .phylogeny
            .record_generation(next, &self.population, &parents, &offspring);
        self.population = offspring
            .into_iter()
            .zip(taxa)
            .map(|(genome, taxon)| Organism { genome, taxon })
            .collect();
        self.generation = next;

        self.finish_generation(landscape_id, mutations)
    }

    /// Report on the injected population before any step has run.
    ///
    /// Evaluates generation 0 the way [`step`](Self::step) evaluates the
    /// generations it produces. Only valid while the world is at generation 0.
    pub fn initial_report(&mut self) -> GenerationReport {
        debug_assert_eq!(self.generation, 0);
        self.initial_reported = true;
        let landscape_id = self.environment.active().id();
        self.finish_generation(landscape_id, 0)
    }

    /// OEE, statistics and environment change for the current generation.
    fn finish_generation(
        &mut self,
        landscape_id: LandscapeId,
        mutations: usize,
    ) -> GenerationReport {
        let new_taxa = self.phylogeny.new_taxa().len();

        let oee = if self.oee.is_evaluation(self.generation) {
            let births = self.phylogeny.drain_births();
            Some(self.oee.evaluate(
                self.generation,
                &births,
                &self.phylogeny,
                self.environment.active(),
                self.environment.epoch(),
            ))
        } else {
            None
        };

        let (fitness, systematics) = if self.generation % self.config.output.stats_interval == 0 {
            let generation = self.generation;
            let stats = FitnessStats::from_values(generation, self.fitness());
            debug!(
                "generation {}: fitness mean {:.4} max {:.4}",
                generation, stats.mean, stats.max
            );
            (Some(stats), Some(self.phylogeny.stats(generation)))
        } else {
            (None, None)
        };

        let environment_changed = self.environment.maybe_change(self.generation, &mut self.rng);

        trace!(
            "generation {}: {} new taxa, {} mutations",
            self.generation, new_taxa, mutations
        );

        GenerationReport {
            generation: self.generation,
            landscape_id,
            new_taxa,
            mutations,
            oee,
            fitness,
            systematics,
            environment_changed,
        }
    }

    /// Run the remaining generations, handing each report to `callback`.
    ///
    /// A fresh world reports generation 0 first, so a full run yields
    /// `max_generations + 1` reports. Stops at the first callback error.
    pub fn run_with_callback<F, E>(&mut self, mut callback: F) -> Result<RunSummary, E>
    where
        F: FnMut(&GenerationReport) -> Result<(), E>,
    {
        let start_time = Instant::now();

        if self.generation == 0 && !self.initial_reported {
            let report = self.initial_report();
            callback(&report)?;
        }

        while self.generation < self.config.population.max_generations {
            let report = self.step();
            callback(&report)?;
        }

        let elapsed = start_time.elapsed().as_secs_f64();
        info!(
            "finished {} generations in {:.2}s ({} taxa created, {} environment changes)",
            self.generation,
            elapsed,
            self.phylogeny.total_created(),
            self.environment.changes()
        );

        Ok(self.summary(elapsed))
    }

    /// Run the remaining generations.
    pub fn run(&mut self) -> RunSummary {
        match self.run_with_callback(|_| Ok::<(), Infallible>(())) {
            Ok(summary) => summary,
            Err(never) => match never {},
        }
    }

    fn summary(&mut self, elapsed_seconds: f64) -> RunSummary {
        let generation = self.generation;
        let final_fitness = FitnessStats::from_values(generation, self.fitness());

        RunSummary {
            generations: generation,
            seed: self.seed,
            landscapes_built: self.environment.landscapes_built(),
            environment_changes: self.environment.changes(),
            final_oee: self.oee.history().last(),
            final_fitness,
            elapsed_seconds,
            oee_history: self.oee.history().clone(),
        }
    }
}

/// A configured seed of 0 means "pick one from the clock".
fn resolve_seed(seed: u64) -> u64 {
    if seed != 0 {
        return seed;
    }
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();
    let seed = nanos.max(1);
    info!("seed 0 requested, using clock-derived seed {}", seed);
    seed
}
