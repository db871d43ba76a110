//! Per-player resource ledger.
//!
//! Counts are capped at a maximum stack. Adding clamps and reports the
//! amount that fit; removing is all-or-nothing. Every add and every
//! successful removal sends the owner a full `ResourceUpdate`.

use crate::board::{PlayerId, Resource};
use crate::error::CapacityError;
use crate::events::{EventSink, ServerEvent};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Resource amounts keyed by kind, used for costs and hands
pub type Cost = BTreeMap<Resource, u32>;

/// Resource counts for one player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLedger {
    owner: PlayerId,
    max_stack: u32,
    counts: [u32; 5],
}

impl ResourceLedger {
    /// Create an empty ledger
    pub fn new(owner: PlayerId, max_stack: u32) -> Self {
        Self {
            owner,
            max_stack,
            counts: [0; 5],
        }
    }

    /// Create a ledger holding a starting hand (clamped to the stack limit)
    pub fn with_starting(owner: PlayerId, max_stack: u32, starting: &Cost) -> Self {
        let mut ledger = Self::new(owner, max_stack);
        for (&resource, &amount) in starting {
            ledger.add_quiet(resource, amount);
        }
        ledger
    }

    pub fn owner(&self) -> PlayerId {
        self.owner
    }

    pub fn max_stack(&self) -> u32 {
        self.max_stack
    }

    pub fn get(&self, resource: Resource) -> u32 {
        self.counts[index(resource)]
    }

    /// Total number of resource units held
    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Add up to `amount`, stopping at the stack limit.
    ///
    /// Returns how many were actually added. The owner gets the updated
    /// ledger even when the stack was already full.
    pub fn add(&mut self, resource: Resource, amount: u32, sink: &mut dyn EventSink) -> u32 {
        let added = self.add_quiet(resource, amount);
        self.notify(sink);
        added
    }

    /// Remove exactly `amount`, or nothing if the ledger holds less.
    pub fn remove(
        &mut self,
        resource: Resource,
        amount: u32,
        sink: &mut dyn EventSink,
    ) -> Result<(), CapacityError> {
        self.remove_quiet(resource, amount)?;
        self.notify(sink);
        Ok(())
    }

    /// True if every entry in `cost` is covered
    pub fn has_resources(&self, cost: &Cost) -> bool {
        cost.iter().all(|(&r, &n)| self.get(r) >= n)
    }

    /// Remove a whole cost, or nothing if any entry is short.
    pub fn spend(&mut self, cost: &Cost, sink: &mut dyn EventSink) -> Result<(), CapacityError> {
        if let Some((&resource, &needed)) = cost.iter().find(|&(&r, &n)| self.get(r) < n) {
            return Err(CapacityError::Insufficient {
                resource,
                needed,
                available: self.get(resource),
            });
        }
        for (&resource, &amount) in cost {
            self.counts[index(resource)] -= amount;
        }
        self.notify(sink);
        Ok(())
    }

    /// First entry of `cost` that would overflow its stack, if any
    pub fn check_room(&self, cost: &Cost) -> Result<(), CapacityError> {
        match cost
            .iter()
            .find(|&(&r, &n)| self.max_stack.saturating_sub(self.get(r)) < n)
        {
            Some((&resource, _)) => Err(CapacityError::StackFull { resource }),
            None => Ok(()),
        }
    }

    /// Add a whole cost, or nothing if any entry would overflow.
    pub fn receive(&mut self, cost: &Cost, sink: &mut dyn EventSink) -> Result<(), CapacityError> {
        self.check_room(cost)?;
        for (&resource, &amount) in cost {
            self.counts[index(resource)] += amount;
        }
        self.notify(sink);
        Ok(())
    }

    /// Remove up to `count` single units, each drawn uniformly from the
    /// units currently held.
    ///
    /// Every draw sees the ledger as left by the previous one. Kinds are
    /// walked in canonical order when mapping the draw to a resource.
    /// Returns the removed kinds in removal order.
    pub fn remove_random<R: Rng>(
        &mut self,
        count: u32,
        rng: &mut R,
        sink: &mut dyn EventSink,
    ) -> Vec<Resource> {
        let mut removed = Vec::new();
        for _ in 0..count {
            let total = self.total();
            if total == 0 {
                break;
            }
            let mut pick = rng.gen_range(1..=total);
            for resource in Resource::ALL {
                let held = self.get(resource);
                if pick <= held {
                    self.counts[index(resource)] -= 1;
                    removed.push(resource);
                    break;
                }
                pick -= held;
            }
        }
        if !removed.is_empty() {
            self.notify(sink);
        }
        removed
    }

    /// Full ledger keyed by resource name, every kind included
    pub fn snapshot(&self) -> BTreeMap<String, u32> {
        Resource::ALL
            .iter()
            .map(|&r| (r.name().to_string(), self.get(r)))
            .collect()
    }

    /// Send the owner a full ledger update
    pub fn notify(&self, sink: &mut dyn EventSink) {
        sink.to_player(
            self.owner,
            ServerEvent::ResourceUpdate {
                resources: self.snapshot(),
            },
        );
    }

    pub(crate) fn add_quiet(&mut self, resource: Resource, amount: u32) -> u32 {
        let slot = &mut self.counts[index(resource)];
        let added = amount.min(self.max_stack.saturating_sub(*slot));
        *slot += added;
        added
    }

    pub(crate) fn remove_quiet(&mut self, resource: Resource, amount: u32) -> Result<(), CapacityError> {
        let slot = &mut self.counts[index(resource)];
        if *slot < amount {
            return Err(CapacityError::Insufficient {
                resource,
                needed: amount,
                available: *slot,
            });
        }
        *slot -= amount;
        Ok(())
    }
}

fn index(resource: Resource) -> usize {
    match resource {
        Resource::Brick => 0,
        Resource::Wood => 1,
        Resource::Wheat => 2,
        Resource::Ore => 3,
        Resource::Wool => 4,
    }
}

/// Convert a cost to the name-keyed form used on the wire
pub fn cost_names(cost: &Cost) -> BTreeMap<String, u32> {
    cost.iter().map(|(r, &n)| (r.name().to_string(), n)).collect()
}
