//! Tile ownership ledger.
//!
//! Each tile has at most one owner, recorded with the settlement that
//! claimed it. Only the current record is kept; claims do not build history.

use crate::board::{Board, PlayerId};
use crate::error::OwnershipError;
use crate::events::{EventSink, ServerEvent};
use crate::hex::{HexCoord, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Current owner of a tile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileClaim {
    pub player: PlayerId,
    pub player_name: String,
    pub settlement_id: u32,
    /// Session clock (seconds) at the time of the claim
    pub claimed_at: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OwnershipLedger {
    records: BTreeMap<HexCoord, TileClaim>,
}

impl OwnershipLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a tile for a player.
    ///
    /// Succeeds when the tile is free or already held by the same player
    /// (the record is refreshed). Fails if another player owns it.
    pub fn claim_tile(
        &mut self,
        player: PlayerId,
        player_name: &str,
        tile: HexCoord,
        settlement_id: u32,
        now: f64,
        sink: &mut dyn EventSink,
    ) -> Result<(), OwnershipError> {
        if let Some(existing) = self.records.get(&tile) {
            if existing.player != player {
                return Err(OwnershipError::AlreadyOwned {
                    tile,
                    owner: existing.player,
                });
            }
        }

        self.records.insert(
            tile,
            TileClaim {
                player,
                player_name: player_name.to_string(),
                settlement_id,
                claimed_at: now,
            },
        );
        sink.broadcast(ServerEvent::TileOwnershipChanged {
            tile,
            owner: Some(player),
            owner_name: Some(player_name.to_string()),
        });
        Ok(())
    }

    /// Claim every tile around the vertex a settlement stands on.
    ///
    /// Nothing is claimed unless the nearest vertex is within `radius`.
    /// Tiles owned by someone else are skipped. Returns the tiles claimed.
    #[allow(clippy::too_many_arguments)]
    pub fn claim_tiles_near_settlement(
        &mut self,
        board: &Board,
        player: PlayerId,
        player_name: &str,
        position: Vec3,
        settlement_id: u32,
        radius: f64,
        now: f64,
        sink: &mut dyn EventSink,
    ) -> Vec<HexCoord> {
        let Some((vertex, distance)) = board.find_nearest_vertex(position) else {
            return Vec::new();
        };
        if distance > radius {
            debug!(distance, "No vertex close enough to settlement");
            return Vec::new();
        }

        let mut claimed = Vec::new();
        for tile in &vertex.tiles {
            if board.tile(tile).is_none() {
                continue;
            }
            match self.claim_tile(player, player_name, *tile, settlement_id, now, sink) {
                Ok(()) => claimed.push(*tile),
                Err(e) => debug!("Skipping claim: {}", e),
            }
        }
        claimed
    }

    /// True only if the tile has a record naming this player
    pub fn player_owns_tile(&self, player: PlayerId, tile: HexCoord) -> bool {
        self.records
            .get(&tile)
            .is_some_and(|claim| claim.player == player)
    }

    /// Clear a tile's owner
    pub fn release_tile(&mut self, tile: HexCoord, sink: &mut dyn EventSink) -> Option<TileClaim> {
        let released = self.records.remove(&tile)?;
        sink.broadcast(ServerEvent::TileOwnershipChanged {
            tile,
            owner: None,
            owner_name: None,
        });
        Some(released)
    }

    /// Clear every tile a player owns
    pub fn release_all(&mut self, player: PlayerId, sink: &mut dyn EventSink) -> Vec<HexCoord> {
        let tiles = self.player_tiles(player);
        for tile in &tiles {
            self.release_tile(*tile, sink);
        }
        tiles
    }

    pub fn player_tiles(&self, player: PlayerId) -> Vec<HexCoord> {
        self.records
            .iter()
            .filter(|(_, claim)| claim.player == player)
            .map(|(tile, _)| *tile)
            .collect()
    }

    /// Every claimed tile in coordinate order
    pub fn iter(&self) -> impl Iterator<Item = (HexCoord, &TileClaim)> {
        self.records.iter().map(|(tile, claim)| (*tile, claim))
    }

    pub fn owner(&self, tile: HexCoord) -> Option<&TileClaim> {
        self.records.get(&tile)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::events::{NullSink, Outbound};
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn board() -> Board {
        Board::generate(&GameConfig::default(), &mut StdRng::seed_from_u64(8)).unwrap()
    }

    #[test]
    fn test_unowned_tile_is_not_owned() {
        let ledger = OwnershipLedger::new();
        assert!(!ledger.player_owns_tile(1, HexCoord::new(0, 0)));
    }

    #[test]
    fn test_claim_and_check() {
        let mut ledger = OwnershipLedger::new();
        let tile = HexCoord::new(1, -1);
        ledger.claim_tile(1, "Ana", tile, 7, 0.0, &mut NullSink).unwrap();
        assert!(ledger.player_owns_tile(1, tile));
        assert!(!ledger.player_owns_tile(2, tile));
        assert_eq!(ledger.owner(tile).unwrap().settlement_id, 7);
    }

    #[test]
    fn test_claim_conflict() {
        let mut ledger = OwnershipLedger::new();
        let tile = HexCoord::new(0, 0);
        ledger.claim_tile(1, "Ana", tile, 1, 0.0, &mut NullSink).unwrap();
        let err = ledger.claim_tile(2, "Ben", tile, 2, 1.0, &mut NullSink);
        assert_eq!(err, Err(OwnershipError::AlreadyOwned { tile, owner: 1 }));
        assert!(ledger.player_owns_tile(1, tile));
    }

    #[test]
    fn test_reclaim_refreshes_record() {
        let mut ledger = OwnershipLedger::new();
        let tile = HexCoord::new(0, 0);
        ledger.claim_tile(1, "Ana", tile, 1, 0.0, &mut NullSink).unwrap();
        ledger.claim_tile(1, "Ana", tile, 5, 9.0, &mut NullSink).unwrap();
        let claim = ledger.owner(tile).unwrap();
        assert_eq!(claim.settlement_id, 5);
        assert_eq!(claim.claimed_at, 9.0);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_release_tile() {
        let mut ledger = OwnershipLedger::new();
        let tile = HexCoord::new(0, 0);
        ledger.claim_tile(1, "Ana", tile, 1, 0.0, &mut NullSink).unwrap();
        let mut sink: Vec<Outbound> = Vec::new();
        assert!(ledger.release_tile(tile, &mut sink).is_some());
        assert!(!ledger.player_owns_tile(1, tile));
        assert_eq!(
            sink[0].event,
            ServerEvent::TileOwnershipChanged {
                tile,
                owner: None,
                owner_name: None,
            }
        );
        assert!(ledger.release_tile(tile, &mut NullSink).is_none());
    }

    #[test]
    fn test_claim_near_settlement_inland() {
        let board = board();
        let vertex = board
            .vertices
            .values()
            .find(|v| v.tiles.len() == 3)
            .unwrap()
            .clone();
        let mut ledger = OwnershipLedger::new();
        let claimed = ledger.claim_tiles_near_settlement(
            &board,
            1,
            "Ana",
            vertex.position,
            1,
            10.0,
            0.0,
            &mut NullSink,
        );
        assert_eq!(claimed.len(), 3);
        for tile in &vertex.tiles {
            assert!(ledger.player_owns_tile(1, *tile));
        }
    }

    #[test]
    fn test_claim_near_settlement_skips_foreign_tiles() {
        let board = board();
        let vertex = board
            .vertices
            .values()
            .find(|v| v.tiles.len() == 3)
            .unwrap()
            .clone();
        let mut ledger = OwnershipLedger::new();
        ledger
            .claim_tile(2, "Ben", vertex.tiles[0], 9, 0.0, &mut NullSink)
            .unwrap();
        let claimed = ledger.claim_tiles_near_settlement(
            &board,
            1,
            "Ana",
            vertex.position,
            1,
            10.0,
            1.0,
            &mut NullSink,
        );
        assert_eq!(claimed.len(), 2);
        assert!(ledger.player_owns_tile(2, vertex.tiles[0]));
    }

    #[test]
    fn test_claim_near_settlement_requires_snap() {
        let board = board();
        let mut ledger = OwnershipLedger::new();
        // Tile centers are far from every corner
        let center = board.tiles[9].center;
        let claimed =
            ledger.claim_tiles_near_settlement(&board, 1, "Ana", center, 1, 10.0, 0.0, &mut NullSink);
        assert!(claimed.is_empty());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_release_all() {
        let mut ledger = OwnershipLedger::new();
        ledger.claim_tile(1, "Ana", HexCoord::new(0, 0), 1, 0.0, &mut NullSink).unwrap();
        ledger.claim_tile(1, "Ana", HexCoord::new(1, 0), 1, 0.0, &mut NullSink).unwrap();
        ledger.claim_tile(2, "Ben", HexCoord::new(0, 1), 2, 0.0, &mut NullSink).unwrap();
        let released = ledger.release_all(1, &mut NullSink);
        assert_eq!(released.len(), 2);
        assert_eq!(ledger.player_tiles(2), vec![HexCoord::new(0, 1)]);
        assert!(ledger.player_tiles(1).is_empty());
    }
}
