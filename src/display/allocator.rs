//! Key to position allocation.
//!
//! The allocator owns the table that pins every logical key to one physical
//! position for the lifetime of the process. A position once handed out is
//! never reassigned or freed. When the pool runs dry every further key
//! resolves to the geometry's fallback position; those keys share the slot
//! and are not recorded in the table.

use super::geometry::{Geometry, Position};
use crate::error::PaasError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;
use tracing::{debug, warn};

/// How a free position is chosen for a new key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocationPolicy {
    /// Highest remaining free position
    #[default]
    Linear,
    /// Uniformly random remaining free position
    Random,
}

impl FromStr for AllocationPolicy {
    type Err = PaasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(AllocationPolicy::Linear),
            "random" => Ok(AllocationPolicy::Random),
            other => Err(PaasError::InvalidArguments(format!(
                "Unknown allocation policy: '{}'. Valid options are: linear, random",
                other
            ))),
        }
    }
}

pub struct Allocator {
    policy: AllocationPolicy,
    table: HashMap<String, Position>,
    free: BTreeSet<Position>,
    fallback: Position,
    rng: fastrand::Rng,
}

impl Allocator {
    /// Creates an allocator with every position of `geometry` free
    pub fn new(geometry: &Geometry, policy: AllocationPolicy) -> Self {
        Allocator::with_rng(geometry, policy, fastrand::Rng::new())
    }

    /// Same as [`Allocator::new`] with a seeded generator, so random
    /// allocation can be replayed
    pub fn with_seed(geometry: &Geometry, policy: AllocationPolicy, seed: u64) -> Self {
        Allocator::with_rng(geometry, policy, fastrand::Rng::with_seed(seed))
    }

    fn with_rng(geometry: &Geometry, policy: AllocationPolicy, rng: fastrand::Rng) -> Self {
        Allocator {
            policy,
            table: HashMap::new(),
            free: geometry.positions().collect(),
            fallback: geometry.fallback(),
            rng,
        }
    }

    /// Resolves a key to its position, committing an allocation on first use
    ///
    /// # Arguments
    /// * `key` - Logical key of the entity
    ///
    /// # Returns
    /// * `Position` - The key's permanent position, or the shared fallback
    ///   position when the pool is exhausted
    pub fn resolve(&mut self, key: &str) -> Position {
        if let Some(position) = self.table.get(key) {
            return *position;
        }

        let Some(position) = self.take_free() else {
            warn!(
                "Position pool exhausted, key '{}' shares fallback position {}",
                key, self.fallback
            );
            return self.fallback;
        };

        debug!("Allocated position {} to key '{}'", position, key);
        self.table.insert(key.to_string(), position);
        position
    }

    /// Position already committed to `key`, without allocating
    pub fn lookup(&self, key: &str) -> Option<Position> {
        self.table.get(key).copied()
    }

    /// Number of keys holding a position of their own
    pub fn allocated(&self) -> usize {
        self.table.len()
    }

    /// Number of positions still free
    pub fn remaining(&self) -> usize {
        self.free.len()
    }

    fn take_free(&mut self) -> Option<Position> {
        match self.policy {
            AllocationPolicy::Linear => self.free.pop_last(),
            AllocationPolicy::Random => {
                if self.free.is_empty() {
                    return None;
                }
                let index = self.rng.usize(..self.free.len());
                let position = self.free.iter().nth(index).copied()?;
                self.free.remove(&position);
                Some(position)
            }
        }
    }
}
