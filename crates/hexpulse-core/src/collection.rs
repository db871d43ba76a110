//! Collectible resources on the map and the pickup rules.
//!
//! A player picks up a collectible when all of these hold:
//! - the player is off cooldown and has a tracked position
//! - the collectible is within range of that position
//! - the tile under the collectible's *current* position belongs to the player
//!
//! Ownership is checked against the live position, so a collectible that
//! drifts onto another player's tile can be taken by that player.

use crate::board::{PlayerId, Resource};
use crate::config::GameConfig;
use crate::events::{EventSink, ServerEvent};
use crate::hex::{HexCoord, Vec3};
use crate::ownership::OwnershipLedger;
use crate::player::Player;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// A resource lying on the map, waiting to be picked up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collectible {
    pub id: u64,
    pub resource: Resource,
    pub amount: u32,
    /// Tile that produced it
    pub tile: HexCoord,
    pub spawned_at: f64,
    pub position: Vec3,
}

#[derive(Debug, Clone)]
pub struct CollectionEngine {
    range: f64,
    cooldown: f64,
    hex_size: f64,
    next_id: u64,
    /// Keyed by id, so iteration follows spawn order
    items: BTreeMap<u64, Collectible>,
    cooldowns: BTreeMap<PlayerId, f64>,
}

impl CollectionEngine {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            range: config.collection_range,
            cooldown: config.collection_cooldown,
            hex_size: config.hex_size,
            next_id: 1,
            items: BTreeMap::new(),
            cooldowns: BTreeMap::new(),
        }
    }

    /// Put a single unit of `resource` on the map and announce it
    pub fn spawn(
        &mut self,
        resource: Resource,
        tile: HexCoord,
        position: Vec3,
        now: f64,
        sink: &mut dyn EventSink,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.items.insert(
            id,
            Collectible {
                id,
                resource,
                amount: 1,
                tile,
                spawned_at: now,
                position,
            },
        );
        sink.broadcast(ServerEvent::ResourceSpawned {
            collectible_id: id,
            resource,
            tile,
            position,
        });
        id
    }

    pub fn get(&self, id: u64) -> Option<&Collectible> {
        self.items.get(&id)
    }

    /// Live collectibles in spawn order
    pub fn iter(&self) -> impl Iterator<Item = &Collectible> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Move a collectible, e.g. when it drifts across the map
    pub fn move_collectible(&mut self, id: u64, position: Vec3) -> bool {
        match self.items.get_mut(&id) {
            Some(item) => {
                item.position = position;
                true
            }
            None => false,
        }
    }

    /// Seconds left before the player may pick up again
    pub fn cooldown_remaining(&self, player: PlayerId) -> f64 {
        self.cooldowns.get(&player).copied().unwrap_or(0.0)
    }

    /// Try to hand a collectible to a player.
    ///
    /// Returns false and changes nothing if any pickup rule fails or the
    /// player's stack has no room.
    pub fn try_collect(
        &mut self,
        player: &mut Player,
        id: u64,
        ownership: &OwnershipLedger,
        sink: &mut dyn EventSink,
    ) -> bool {
        if self.cooldown_remaining(player.id) > 0.0 {
            return false;
        }
        let Some(position) = player.position else {
            return false;
        };
        let Some(item) = self.items.get(&id) else {
            return false;
        };
        if position.distance_to(&item.position) > self.range {
            return false;
        }
        let tile = HexCoord::from_world(item.position, self.hex_size);
        if !ownership.player_owns_tile(player.id, tile) {
            return false;
        }

        let (resource, amount) = (item.resource, item.amount);
        // Refused pickups are retried every tick and stay silent
        let added = player.ledger.add_quiet(resource, amount);
        if added == 0 {
            debug!(player = player.id, "No room for {} from collectible {}", resource, id);
            return false;
        }
        player.ledger.notify(sink);

        self.items.remove(&id);
        self.cooldowns.insert(player.id, self.cooldown);
        sink.broadcast(ServerEvent::Collected {
            collectible_id: id,
            player: player.id,
            resource,
            amount: added,
        });
        debug!(player = player.id, "Collected {} {}", added, resource);
        true
    }

    /// Tick cooldowns, then offer every collectible to players in order.
    ///
    /// The first eligible player wins each collectible. Returns the ids
    /// picked up during this update.
    pub fn update(
        &mut self,
        dt: f64,
        players: &mut [Player],
        ownership: &OwnershipLedger,
        sink: &mut dyn EventSink,
    ) -> Vec<u64> {
        for remaining in self.cooldowns.values_mut() {
            *remaining = (*remaining - dt).max(0.0);
        }
        self.cooldowns.retain(|_, remaining| *remaining > 0.0);

        let ids: Vec<u64> = self.items.keys().copied().collect();
        let mut collected = Vec::new();
        for id in ids {
            for player in players.iter_mut() {
                if self.try_collect(player, id, ownership, sink) {
                    collected.push(id);
                    break;
                }
            }
        }
        collected
    }

    /// Forget a departed player's cooldown
    pub fn remove_player(&mut self, player: PlayerId) {
        self.cooldowns.remove(&player);
    }
}
