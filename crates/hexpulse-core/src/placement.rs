//! Placement rules for towns, cities and roads.
//!
//! Validators only read the board. They return the first rule a placement
//! breaks, and callers mutate nothing unless validation passes.

use crate::board::{Board, PlayerId, StructureKind};
use crate::error::ValidationError;

/// Check a town (settlement) placement.
///
/// Rules, in order:
/// - the vertex exists and touches at least two tiles
/// - the vertex is free
/// - no structure on any neighboring vertex (distance rule)
/// - outside setup, one of the player's built roads touches the vertex
pub fn validate_settlement(
    board: &Board,
    vertex_key: &str,
    player: PlayerId,
    is_setup: bool,
) -> Result<(), ValidationError> {
    let vertex = board
        .vertex(vertex_key)
        .ok_or_else(|| ValidationError::NotFound(vertex_key.to_string()))?;

    if vertex.tiles.len() < 2 {
        return Err(ValidationError::NotBuildable);
    }

    if board.structure_at(vertex_key).is_some() {
        return Err(ValidationError::AlreadyOccupied);
    }

    if vertex
        .neighbors
        .iter()
        .any(|n| board.structure_at(n).is_some())
    {
        return Err(ValidationError::DistanceRule);
    }

    if !is_setup && !has_own_road_at(board, vertex_key, player) {
        return Err(ValidationError::ConnectivityRule);
    }

    Ok(())
}

/// Check a city placement: it must upgrade one of the player's own towns.
pub fn validate_city(board: &Board, vertex_key: &str, player: PlayerId) -> Result<(), ValidationError> {
    if board.vertex(vertex_key).is_none() {
        return Err(ValidationError::NotFound(vertex_key.to_string()));
    }
    let structure = board
        .structure_at(vertex_key)
        .filter(|s| s.kind == StructureKind::Town && s.built)
        .ok_or_else(|| ValidationError::NotFound(format!("town at {}", vertex_key)))?;
    if structure.owner != player {
        return Err(ValidationError::NotOwned);
    }
    Ok(())
}

/// Check a road placement.
///
/// During setup, right after a setup town, the road has to touch that town.
/// Otherwise it has to touch one of the player's built structures or roads.
pub fn validate_road(
    board: &Board,
    edge_key: &str,
    player: PlayerId,
    is_setup: bool,
    last_setup_town: Option<&str>,
) -> Result<(), ValidationError> {
    let edge = board
        .edge(edge_key)
        .ok_or_else(|| ValidationError::NotFound(edge_key.to_string()))?;

    if board.road_at(edge_key).is_some() {
        return Err(ValidationError::AlreadyOccupied);
    }

    if is_setup {
        if let Some(town) = last_setup_town {
            return if edge.touches(town) {
                Ok(())
            } else {
                Err(ValidationError::ConnectivityRule)
            };
        }
    }

    let connected = edge
        .vertices
        .iter()
        .any(|v| board.player_touches_vertex(v, player));
    if !connected {
        return Err(ValidationError::ConnectivityRule);
    }

    Ok(())
}

/// Every vertex where the player could start a town right now
pub fn valid_settlement_spots(board: &Board, player: PlayerId, is_setup: bool) -> Vec<String> {
    board
        .vertices
        .keys()
        .filter(|k| validate_settlement(board, k, player, is_setup).is_ok())
        .cloned()
        .collect()
}

/// Every edge where the player could start a road right now
pub fn valid_road_spots(
    board: &Board,
    player: PlayerId,
    is_setup: bool,
    last_setup_town: Option<&str>,
) -> Vec<String> {
    board
        .edges
        .keys()
        .filter(|k| validate_road(board, k, player, is_setup, last_setup_town).is_ok())
        .cloned()
        .collect()
}

fn has_own_road_at(board: &Board, vertex_key: &str, player: PlayerId) -> bool {
    board
        .incident_edges(vertex_key)
        .any(|e| board.road_at(&e.key).is_some_and(|r| r.owner == player && r.built))
}
