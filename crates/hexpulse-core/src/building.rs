//! Two-phase construction: foundations and resource deposits.
//!
//! Placing a foundation reserves the spot and announces what it needs.
//! Players then deposit one unit at a time from their ledger. When every
//! required unit is in, the foundation completes into its structure.

use crate::board::{Board, PlayerId, Resource};
use crate::error::{SessionError, ValidationError};
use crate::events::{EventSink, ServerEvent};
use crate::hex::Vec3;
use crate::placement::{validate_city, validate_road, validate_settlement};
use crate::player::Player;
use crate::resources::{cost_names, Cost};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Things that can be built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Blueprint {
    /// Town on a vertex; claims the surrounding tiles and any port
    Settlement,
    /// Upgrade of the player's own settlement
    City,
    /// Road on an edge, extending the player's network
    Road,
}

impl Blueprint {
    pub const ALL: [Blueprint; 3] = [Blueprint::Settlement, Blueprint::City, Blueprint::Road];

    pub fn name(&self) -> &'static str {
        match self {
            Blueprint::Settlement => "Settlement",
            Blueprint::City => "City",
            Blueprint::Road => "Road",
        }
    }

    pub fn cost(&self) -> Cost {
        match self {
            Blueprint::Settlement => Cost::from([
                (Resource::Wood, 1),
                (Resource::Brick, 1),
                (Resource::Wheat, 1),
                (Resource::Wool, 1),
            ]),
            Blueprint::City => Cost::from([(Resource::Wheat, 2), (Resource::Ore, 3)]),
            Blueprint::Road => Cost::from([(Resource::Wood, 1), (Resource::Brick, 1)]),
        }
    }
}

impl fmt::Display for Blueprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Blueprint {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Blueprint::ALL
            .into_iter()
            .find(|b| b.name() == s)
            .ok_or_else(|| ValidationError::InvalidBlueprint(s.to_string()))
    }
}

/// A placed structure waiting for resources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Foundation {
    pub id: u32,
    pub owner: PlayerId,
    pub blueprint: Blueprint,
    /// Snapped world position (vertex or edge midpoint)
    pub position: Vec3,
    pub rotation: Vec3,
    /// Vertex key for towns and cities, edge key for roads
    pub snap_key: String,
    pub required: Cost,
    pub deposited: Cost,
    pub completed: bool,
}

impl Foundation {
    /// Fraction of required units deposited, in [0, 1]
    pub fn progress(&self) -> f64 {
        let required: u32 = self.required.values().sum();
        if required == 0 {
            return 1.0;
        }
        let deposited: u32 = self.deposited.values().sum();
        deposited as f64 / required as f64
    }

    /// Units of `resource` still missing
    pub fn outstanding(&self, resource: Resource) -> u32 {
        let needed = self.required.get(&resource).copied().unwrap_or(0);
        let have = self.deposited.get(&resource).copied().unwrap_or(0);
        needed.saturating_sub(have)
    }
}

/// Result of a successful deposit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deposit {
    pub progress: f64,
    pub completed: bool,
}

/// All foundations in a session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Foundations {
    next_id: u32,
    items: BTreeMap<u32, Foundation>,
}

impl Foundations {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            items: BTreeMap::new(),
        }
    }

    pub fn get(&self, id: u32) -> Option<&Foundation> {
        self.items.get(&id)
    }

    /// Foundations still waiting for resources, oldest first
    pub fn pending(&self) -> impl Iterator<Item = &Foundation> {
        self.items.values().filter(|f| !f.completed)
    }

    /// Whether the player already has an unfinished foundation of this kind
    pub fn has_pending(&self, player: PlayerId, blueprint: Blueprint) -> bool {
        self.pending()
            .any(|f| f.owner == player && f.blueprint == blueprint)
    }

    /// Validate and reserve a new foundation.
    ///
    /// A player may have one unfinished foundation per blueprint. They must
    /// hold at least one unit the blueprint needs; full payment happens
    /// through deposits.
    #[allow(clippy::too_many_arguments)]
    pub fn place(
        &mut self,
        board: &mut Board,
        player: &mut Player,
        blueprint: Blueprint,
        position: Vec3,
        rotation: Vec3,
        snap_key: &str,
        sink: &mut dyn EventSink,
    ) -> Result<u32, SessionError> {
        if self.has_pending(player.id, blueprint) {
            return Err(ValidationError::FoundationPending(blueprint.name().to_string()).into());
        }

        let snapped = match blueprint {
            Blueprint::Settlement => {
                let is_setup = !player.has_placed_first_settlement;
                validate_settlement(board, snap_key, player.id, is_setup)?;
                board.vertex(snap_key).map(|v| v.position)
            }
            Blueprint::City => {
                validate_city(board, snap_key, player.id)?;
                if self.pending().any(|f| f.snap_key == snap_key) {
                    return Err(ValidationError::AlreadyOccupied.into());
                }
                board.vertex(snap_key).map(|v| v.position)
            }
            Blueprint::Road => {
                let setup_town = player.last_setup_town.as_deref();
                validate_road(board, snap_key, player.id, setup_town.is_some(), setup_town)?;
                board.edge_midpoint(snap_key)
            }
        };

        let required = blueprint.cost();
        if !required.keys().any(|&r| player.ledger.get(r) > 0) {
            return Err(ValidationError::Unaffordable.into());
        }

        match blueprint {
            Blueprint::Settlement => {
                board.reserve_town(snap_key, player.id);
                if !player.has_placed_first_settlement {
                    player.has_placed_first_settlement = true;
                    player.last_setup_town = Some(snap_key.to_string());
                }
            }
            Blueprint::Road => {
                board.reserve_road(snap_key, player.id);
                player.last_setup_town = None;
            }
            Blueprint::City => {}
        }

        let id = self.next_id.max(1);
        self.next_id = id + 1;
        let foundation = Foundation {
            id,
            owner: player.id,
            blueprint,
            position: snapped.unwrap_or(position),
            rotation,
            snap_key: snap_key.to_string(),
            required: required.clone(),
            deposited: Cost::new(),
            completed: false,
        };

        sink.broadcast(ServerEvent::FoundationPlaced {
            foundation_id: id,
            owner: player.id,
            blueprint: blueprint.name().to_string(),
            position: foundation.position,
            required: cost_names(&required),
        });
        info!(
            player = player.id,
            foundation = id,
            "Placed {} foundation at {}",
            blueprint,
            snap_key
        );

        self.items.insert(id, foundation);
        Ok(id)
    }

    /// Move one unit of `resource` from the player into a foundation.
    ///
    /// Returns the new progress; `completed` is set when the last unit lands.
    /// Structure side effects are left to the caller.
    pub fn deposit(
        &mut self,
        player: &mut Player,
        id: u32,
        resource: Resource,
        sink: &mut dyn EventSink,
    ) -> Result<Deposit, SessionError> {
        let foundation = self
            .items
            .get_mut(&id)
            .ok_or_else(|| ValidationError::NotFound(format!("foundation {}", id)))?;

        if foundation.owner != player.id {
            return Err(ValidationError::NotOwned.into());
        }
        if foundation.completed {
            return Err(ValidationError::AlreadyCompleted.into());
        }
        if foundation.outstanding(resource) == 0 {
            return Err(ValidationError::ResourceNotNeeded(resource).into());
        }
        if player.ledger.get(resource) == 0 {
            return Err(ValidationError::Unaffordable.into());
        }

        player.ledger.remove(resource, 1, sink)?;
        *foundation.deposited.entry(resource).or_insert(0) += 1;

        let progress = foundation.progress();
        sink.broadcast(ServerEvent::ResourceDeposited {
            foundation_id: id,
            resource,
            progress,
        });

        let completed = progress >= 1.0;
        if completed {
            foundation.completed = true;
        }
        Ok(Deposit {
            progress,
            completed,
        })
    }

    /// Turn a completed foundation into its structure on the board
    pub fn complete(&self, board: &mut Board, id: u32, sink: &mut dyn EventSink) -> Option<&Foundation> {
        let foundation = self.items.get(&id).filter(|f| f.completed)?;
        match foundation.blueprint {
            Blueprint::Settlement => board.complete_town(&foundation.snap_key),
            Blueprint::City => board.upgrade_to_city(&foundation.snap_key),
            Blueprint::Road => board.complete_road(&foundation.snap_key),
        }
        sink.broadcast(ServerEvent::StructureCompleted {
            foundation_id: id,
            owner: foundation.owner,
            blueprint: foundation.blueprint.name().to_string(),
            snap_key: foundation.snap_key.clone(),
        });
        info!(
            player = foundation.owner,
            foundation = id,
            "{} completed",
            foundation.blueprint
        );
        Some(foundation)
    }

    /// Drop every foundation a player owns
    pub fn remove_player(&mut self, player: PlayerId) {
        self.items.retain(|_, f| f.owner != player);
    }
}
