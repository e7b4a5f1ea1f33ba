//! Parent selection.
//!
//! A [`SelectionStrategy`] is chosen once from the configuration and then
//! turns a population plus its raw fitness into one parent index per slot.

use rayon::prelude::*;

use super::genome::{GenomeRng, Organism, hamming_distance};
use crate::schema::{ConfigError, SelectionConfig, SelectionScheme};

/// Selection algorithm with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionStrategy {
    /// Best of `size` uniform draws with replacement, ties broken uniformly.
    /// A tournament at least as large as the population covers all of it.
    Tournament { size: usize },
    /// Tournament on fitness divided by niche count.
    Sharing {
        tournament_size: usize,
        threshold: f64,
        alpha: f64,
    },
    /// Uniform draw per slot, fitness ignored.
    Random,
}

impl SelectionStrategy {
    /// Build the strategy for a configured scheme.
    pub fn from_config(config: &SelectionConfig) -> Result<Self, ConfigError> {
        if config.tournament_size == 0 {
            return Err(ConfigError::InvalidTournamentSize);
        }

        match config.scheme {
            SelectionScheme::Tournament => Ok(Self::Tournament {
                size: config.tournament_size,
            }),
            SelectionScheme::Sharing => {
                if config.sharing_threshold.is_nan() || config.sharing_threshold <= 0.0 {
                    return Err(ConfigError::InvalidSharingThreshold(
                        config.sharing_threshold,
                    ));
                }
                if config.sharing_alpha.is_nan() || config.sharing_alpha < 0.0 {
                    return Err(ConfigError::InvalidSharingAlpha(config.sharing_alpha));
                }
                Ok(Self::Sharing {
                    tournament_size: config.tournament_size,
                    threshold: config.sharing_threshold,
                    alpha: config.sharing_alpha,
                })
            }
            SelectionScheme::Random => Ok(Self::Random),
            scheme @ (SelectionScheme::Lexicase | SelectionScheme::EcoEa) => {
                Err(ConfigError::UnsupportedSelection(scheme))
            }
        }
    }

    /// Whether selection reads raw fitness at all.
    pub fn uses_fitness(&self) -> bool {
        !matches!(self, Self::Random)
    }

    /// Choose a parent for each of the `population.len()` offspring slots.
    pub fn select(
        &self,
        population: &[Organism],
        fitness: &[f64],
        rng: &mut GenomeRng,
    ) -> Vec<usize> {
        assert!(!population.is_empty(), "cannot select from an empty population");
        let count = population.len();

        match self {
            Self::Tournament { size } => {
                assert_eq!(fitness.len(), count, "one fitness value per organism");
                tournament_select(fitness, *size, count, rng)
            }
            Self::Sharing {
                tournament_size,
                threshold,
                alpha,
            } => {
                assert_eq!(fitness.len(), count, "one fitness value per organism");
                let shared = shared_fitness(population, fitness, *threshold, *alpha);
                tournament_select(&shared, *tournament_size, count, rng)
            }
            Self::Random => (0..count).map(|_| rng.index(count)).collect(),
        }
    }
}

/// Run `count` tournaments of `size` entrants over `fitness`.
pub fn tournament_select(
    fitness: &[f64],
    size: usize,
    count: usize,
    rng: &mut GenomeRng,
) -> Vec<usize> {
    let len = fitness.len();
    let mut entrants = Vec::with_capacity(size.min(len));

    (0..count)
        .map(|_| {
            entrants.clear();
            if size >= len {
                entrants.extend(0..len);
            } else {
                entrants.extend((0..size).map(|_| rng.index(len)));
            }
            tournament_winner(fitness, &entrants, rng)
        })
        .collect()
}

/// Highest-fitness entrant, uniform among ties.
fn tournament_winner(fitness: &[f64], entrants: &[usize], rng: &mut GenomeRng) -> usize {
    let mut best = entrants[0];
    let mut ties = 1;

    for &idx in &entrants[1..] {
        if fitness[idx] > fitness[best] {
            best = idx;
            ties = 1;
        } else if fitness[idx] == fitness[best] {
            // Reservoir sampling over the tied entrants
            ties += 1;
            if rng.index(ties) == 0 {
                best = idx;
            }
        }
    }
    best
}

/// Sharing kernel: `(1 - d / threshold)^alpha` inside the niche, 0 outside.
#[inline]
pub fn sharing_kernel(distance: usize, threshold: f64, alpha: f64) -> f64 {
    let d = distance as f64;
    if d < threshold {
        (1.0 - d / threshold).powf(alpha)
    } else {
        0.0
    }
}

/// Raw fitness divided by `1 + sum of kernel(distance)` over all other organisms.
///
/// O(population^2) Hamming distances, computed in parallel per organism.
pub fn shared_fitness(
    population: &[Organism],
    fitness: &[f64],
    threshold: f64,
    alpha: f64,
) -> Vec<f64> {
    population
        .par_iter()
        .enumerate()
        .map(|(i, org)| {
            let penalty: f64 = population
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, other)| {
                    sharing_kernel(hamming_distance(&org.genome, &other.genome), threshold, alpha)
                })
                .sum();
            fitness[i] / (1.0 + penalty)
        })
        .collect()
}
