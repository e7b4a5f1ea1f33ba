//! Environment controller: which landscape is active, and when it changes.
//!
//! Every change bumps the environment epoch. Anything computed against a
//! landscape (fitness values, skeletons) is stamped with the epoch it was
//! computed under and is stale once the epoch moves on.

use log::{debug, info};

use super::genome::GenomeRng;
use super::landscape::{LandscapeId, NkLandscape};
use crate::schema::{ChangeType, ConfigError, EnvironmentConfig, LandscapeConfig};

/// How the active landscape is replaced at each change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStrategy {
    /// Rebuild the single landscape with fresh contributions.
    Complete,
    /// Alternate between two landscapes built at setup.
    Oscillating,
}

impl From<ChangeType> for ChangeStrategy {
    fn from(change_type: ChangeType) -> Self {
        match change_type {
            ChangeType::Complete => Self::Complete,
            ChangeType::Oscillating => Self::Oscillating,
        }
    }
}

/// The landscapes of a run and the schedule that switches between them.
#[derive(Debug, Clone)]
pub struct Environment {
    strategy: ChangeStrategy,
    change_rate: u64,
    landscapes: Vec<NkLandscape>,
    active: usize,
    epoch: u64,
    next_id: LandscapeId,
    changes: u64,
}

impl Environment {
    /// Build the initial landscape(s). Fails if K >= N.
    pub fn new(
        landscape: &LandscapeConfig,
        config: &EnvironmentConfig,
        rng: &mut GenomeRng,
    ) -> Result<Self, ConfigError> {
        let strategy = ChangeStrategy::from(config.change_type);
        let count = match strategy {
            ChangeStrategy::Complete => 1,
            ChangeStrategy::Oscillating => 2,
        };

        let landscapes = (0..count)
            .map(|id| NkLandscape::new(id, landscape.n, landscape.k, rng))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            strategy,
            change_rate: config.change_rate,
            landscapes,
            active: 0,
            epoch: 0,
            next_id: count,
            changes: 0,
        })
    }

    pub fn strategy(&self) -> ChangeStrategy {
        self.strategy
    }

    pub fn change_rate(&self) -> u64 {
        self.change_rate
    }

    /// The landscape fitness is currently measured against.
    pub fn active(&self) -> &NkLandscape {
        &self.landscapes[self.active]
    }

    /// Number of changes applied so far.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn landscapes(&self) -> &[NkLandscape] {
        &self.landscapes
    }

    /// Landscapes constructed since setup, including the initial ones.
    pub fn landscapes_built(&self) -> u64 {
        self.next_id
    }

    pub fn changes(&self) -> u64 {
        self.changes
    }

    /// True if a change is due once `generation` has been committed.
    pub fn is_change_generation(&self, generation: u64) -> bool {
        self.change_rate > 0 && generation > 0 && generation % self.change_rate == 0
    }

    /// Apply a change if one is due at `generation`. Returns whether it did.
    pub fn maybe_change(&mut self, generation: u64, rng: &mut GenomeRng) -> bool {
        if !self.is_change_generation(generation) {
            return false;
        }
        self.change(rng);
        info!(
            "environment change at generation {}: landscape {} active (epoch {})",
            generation,
            self.active().id(),
            self.epoch
        );
        true
    }

    /// Switch the active landscape now.
    pub fn change(&mut self, rng: &mut GenomeRng) {
        match self.strategy {
            ChangeStrategy::Complete => {
                let fresh = self.landscapes[self.active].regenerate(self.next_id, rng);
                self.next_id += 1;
                self.landscapes[self.active] = fresh;
            }
            ChangeStrategy::Oscillating => {
                self.active = (self.active + 1) % self.landscapes.len();
            }
        }
        self.epoch += 1;
        self.changes += 1;
        debug!(
            "epoch {}: {} landscapes built so far",
            self.epoch, self.next_id
        );
    }
}
