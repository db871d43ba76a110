//! Tunable game parameters.
//!
//! Every field has a default matching the standard game, and missing
//! fields fall back to it when a partial config is deserialized.

use crate::board::{Resource, Terrain};
use crate::resources::Cost;
use serde::{Deserialize, Serialize};

/// Configuration for one game session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Rings of tiles around the center tile
    pub rings: u32,
    /// Distance from a tile center to each of its flat sides
    pub hex_size: f64,
    /// Grid used to merge tile corners into shared vertices
    pub snap_grid: f64,
    /// Terrain pool, shuffled across tiles in generation order
    pub terrain_frequencies: Vec<(Terrain, u32)>,
    /// Dice numbers handed to producing tiles
    pub dice_numbers: Vec<u8>,
    /// Shuffle-and-place attempts before keeping a partial port layout
    pub port_attempts: u32,

    pub max_stack: u32,
    pub starting_resources: Cost,

    /// Seconds between pulses
    pub pulse_interval: f64,
    /// Seconds the dice roll stays on screen before resolving
    pub roll_duration: f64,
    pub spawn_min_distance: f64,
    pub spawn_max_distance: f64,

    pub collection_range: f64,
    pub collection_cooldown: f64,

    /// Max distance from a settlement to its vertex when claiming tiles
    pub claim_radius: f64,
    /// Max distance from a settlement to a port vertex when claiming ports
    pub port_claim_radius: f64,
    /// Distinct ports needed before harbor-master updates are sent
    pub harbor_master_threshold: usize,

    /// Halve large hands when a 7 is rolled
    pub robber_penalty: bool,
    /// Hands strictly larger than this lose half on a 7
    pub robber_hand_limit: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            rings: 2,
            hex_size: 40.0,
            snap_grid: 8.0,
            terrain_frequencies: Terrain::standard_frequencies(),
            dice_numbers: vec![2, 3, 3, 4, 4, 5, 5, 6, 6, 8, 8, 9, 9, 10, 10, 11, 11, 12],
            port_attempts: 50,
            max_stack: 50,
            starting_resources: Cost::from([
                (Resource::Wood, 2),
                (Resource::Brick, 2),
                (Resource::Wheat, 1),
                (Resource::Wool, 1),
            ]),
            pulse_interval: 60.0,
            roll_duration: 3.0,
            spawn_min_distance: 5.0,
            spawn_max_distance: 20.0,
            collection_range: 8.0,
            collection_cooldown: 0.5,
            claim_radius: 10.0,
            port_claim_radius: 5.0,
            harbor_master_threshold: 3,
            robber_penalty: true,
            robber_hand_limit: 7,
        }
    }
}

impl GameConfig {
    /// Parse a config from JSON, filling unspecified fields with defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = GameConfig::from_json(r#"{ "rings": 3, "pulse_interval": 30.0 }"#).unwrap();
        assert_eq!(config.rings, 3);
        assert_eq!(config.pulse_interval, 30.0);
        assert_eq!(config.max_stack, 50);
        assert_eq!(config.terrain_frequencies, Terrain::standard_frequencies());
    }

    #[test]
    fn test_default_roundtrips_through_json() {
        let config = GameConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(GameConfig::from_json(&json).unwrap(), config);
    }
}
