//! Player state.
//!
//! This module contains:
//! - `PlayerKind`: human or synthetic (bot) players sharing one code path
//! - `PlacementPhase`: forced setup placements vs. free building
//! - `Player`: ledger, owned ports, tracked position, setup progress and colony

use crate::board::{PlayerId, PortKind};
use crate::colony::Colony;
use crate::hex::Vec3;
use crate::resources::{Cost, ResourceLedger};
use serde::{Deserialize, Serialize};

/// Whether a player is a person or driven by a decision-making client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerKind {
    Human,
    Bot,
}

/// Per-player placement phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementPhase {
    /// First town may go anywhere legal; the next road must touch it
    Setup,
    /// Settlements must connect to the player's road network
    Normal,
}

/// A player in a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    pub kind: PlayerKind,
    pub ledger: ResourceLedger,
    /// Port kinds owned, in claim order
    pub ports: Vec<PortKind>,
    pub has_placed_first_settlement: bool,
    /// Vertex of the most recent setup town still waiting for its road
    pub last_setup_town: Option<String>,
    /// Last reported avatar position
    pub position: Option<Vec3>,
    pub colony: Colony,
}

impl Player {
    pub fn new(
        id: PlayerId,
        display_name: impl Into<String>,
        kind: PlayerKind,
        max_stack: u32,
        starting: &Cost,
    ) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            kind,
            ledger: ResourceLedger::with_starting(id, max_stack, starting),
            ports: Vec::new(),
            has_placed_first_settlement: false,
            last_setup_town: None,
            position: None,
            colony: Colony::default(),
        }
    }

    /// True for players whose decisions come from a bot
    pub fn is_synthetic(&self) -> bool {
        self.kind == PlayerKind::Bot
    }

    /// Setup lasts until the first town is placed and its road follows
    pub fn phase(&self) -> PlacementPhase {
        if !self.has_placed_first_settlement || self.last_setup_town.is_some() {
            PlacementPhase::Setup
        } else {
            PlacementPhase::Normal
        }
    }

    pub fn owns_port(&self, kind: PortKind) -> bool {
        self.ports.contains(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Resource;

    #[test]
    fn test_new_player() {
        let starting = Cost::from([(Resource::Wood, 2)]);
        let player = Player::new(4, "Ana", PlayerKind::Human, 50, &starting);
        assert_eq!(player.ledger.owner(), 4);
        assert_eq!(player.ledger.get(Resource::Wood), 2);
        assert_eq!(player.phase(), PlacementPhase::Setup);
        assert!(!player.is_synthetic());
        assert!(player.position.is_none());
    }

    #[test]
    fn test_phase_follows_first_settlement() {
        let mut player = Player::new(1, "Bot 1", PlayerKind::Bot, 50, &Cost::new());
        assert!(player.is_synthetic());
        player.has_placed_first_settlement = true;
        player.last_setup_town = Some("3_4".to_string());
        assert_eq!(player.phase(), PlacementPhase::Setup);
        player.last_setup_town = None;
        assert_eq!(player.phase(), PlacementPhase::Normal);
    }
}
