//! Synthetic players.
//!
//! A bot never touches game state directly. Like any client it looks at
//! the session and produces a [`ClientRequest`], which goes through the
//! same validation as a human's.
//!
//! Difficulty levels:
//! - Easy: a random plausible request
//! - Medium: fixed priorities (setup, pick up, deposit, expand)
//! - Hard: Medium plus bank trades for missing units and research

use crate::board::{PlayerId, Resource, StructureKind};
use crate::building::Blueprint;
use crate::colony::Tech;
use crate::events::ClientRequest;
use crate::hex::{HexCoord, Vec3};
use crate::placement::{valid_road_spots, valid_settlement_spots};
use crate::player::Player;
use crate::session::GameSession;
use crate::trade::best_trade_ratio;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Anything that can choose requests on behalf of a player
pub trait Decider {
    fn player_id(&self) -> PlayerId;

    /// Next request to send, or `None` to wait
    fn decide(&mut self, session: &GameSession) -> Option<ClientRequest>;
}

/// Bot difficulty level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BotDifficulty {
    Easy,
    Medium,
    Hard,
}

/// A heuristic bot
pub struct Bot {
    pub player_id: PlayerId,
    pub difficulty: BotDifficulty,
    rng: StdRng,
}

impl Bot {
    pub fn new(player_id: PlayerId, difficulty: BotDifficulty) -> Self {
        Self {
            player_id,
            difficulty,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(player_id: PlayerId, difficulty: BotDifficulty, seed: u64) -> Self {
        Self {
            player_id,
            difficulty,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Easy: any request that could be accepted right now
    fn choose_easy(&mut self, session: &GameSession, player: &Player) -> Option<ClientRequest> {
        if let Some(setup) = self.setup_request(session, player, false) {
            return Some(setup);
        }
        let mut options = Vec::new();
        options.extend(self.chase_collectible(session, player));
        options.extend(deposit_request(session, player));
        options.extend(self.expansion_requests(session, player, false));
        options.choose(&mut self.rng).cloned()
    }

    /// Medium: setup first, then pick up, pay for what's started, expand
    fn choose_medium(&mut self, session: &GameSession, player: &Player) -> Option<ClientRequest> {
        if let Some(setup) = self.setup_request(session, player, true) {
            return Some(setup);
        }
        if let Some(chase) = self.chase_collectible(session, player) {
            return Some(chase);
        }
        if let Some(deposit) = deposit_request(session, player) {
            return Some(deposit);
        }
        if has_pending_foundation(session, player) {
            return None;
        }

        let mut expansion = self.expansion_requests(session, player, true);
        // Settlements first, then cities, roads only now and then
        if let Some(pos) = expansion.iter().position(|r| is_blueprint(r, Blueprint::Settlement)) {
            return Some(expansion.swap_remove(pos));
        }
        if let Some(pos) = expansion.iter().position(|r| is_blueprint(r, Blueprint::City)) {
            return Some(expansion.swap_remove(pos));
        }
        if !expansion.is_empty() && self.rng.gen_bool(0.3) {
            return expansion.choose(&mut self.rng).cloned();
        }
        None
    }

    /// Hard: Medium, but trades for missing units and keeps research going
    fn choose_hard(&mut self, session: &GameSession, player: &Player) -> Option<ClientRequest> {
        if let Some(request) = self.choose_medium(session, player) {
            return Some(request);
        }
        if let Some(trade) = trade_for_pending(session, player) {
            return Some(trade);
        }
        research_request(player)
    }

    /// Forced placements until the first town and its road are down
    fn setup_request(
        &mut self,
        session: &GameSession,
        player: &Player,
        ranked: bool,
    ) -> Option<ClientRequest> {
        let board = session.board();
        if !player.has_placed_first_settlement {
            let spots = valid_settlement_spots(board, player.id, true);
            let spot = if ranked {
                self.rank_settlement_spots(session, &spots)
            } else {
                spots.choose(&mut self.rng).cloned()
            }?;
            return Some(place(Blueprint::Settlement, spot));
        }

        let town = player.last_setup_town.as_deref()?;
        let roads = valid_road_spots(board, player.id, true, Some(town));
        roads
            .choose(&mut self.rng)
            .cloned()
            .map(|edge| place(Blueprint::Road, edge))
    }

    /// Step onto a collectible lying on one of the player's tiles
    fn chase_collectible(&self, session: &GameSession, player: &Player) -> Option<ClientRequest> {
        let range = session.config().collection_range;
        let hex_size = session.board().hex_size;
        let target = session.collection().iter().find(|c| {
            let tile = HexCoord::from_world(c.position, hex_size);
            session.ownership().player_owns_tile(player.id, tile)
        })?;

        let in_range = player
            .position
            .is_some_and(|p| p.distance_to(&target.position) <= range);
        if in_range {
            return None;
        }
        Some(ClientRequest::UpdatePosition {
            position: target.position,
        })
    }

    /// New foundations the player could start
    fn expansion_requests(
        &mut self,
        session: &GameSession,
        player: &Player,
        fully_funded: bool,
    ) -> Vec<ClientRequest> {
        let board = session.board();
        let foundations = session.foundations();
        let affordable = |blueprint: Blueprint| {
            if foundations.has_pending(player.id, blueprint) {
                return false;
            }
            let cost = blueprint.cost();
            if fully_funded {
                player.ledger.has_resources(&cost)
            } else {
                cost.keys().any(|&r| player.ledger.get(r) > 0)
            }
        };

        let mut requests = Vec::new();
        if affordable(Blueprint::Settlement) {
            let spots = valid_settlement_spots(board, player.id, false);
            if let Some(spot) = self.rank_settlement_spots(session, &spots) {
                requests.push(place(Blueprint::Settlement, spot));
            }
        }
        if affordable(Blueprint::City) {
            let towns = board.structures.iter().filter(|(_, s)| {
                s.owner == player.id && s.kind == StructureKind::Town && s.built
            });
            if let Some((key, _)) = towns.max_by_key(|(key, _)| score_vertex(session, key)) {
                requests.push(place(Blueprint::City, key.clone()));
            }
        }
        if affordable(Blueprint::Road) {
            let roads = valid_road_spots(board, player.id, false, None);
            if let Some(edge) = roads.choose(&mut self.rng) {
                requests.push(place(Blueprint::Road, edge.clone()));
            }
        }
        requests
    }

    /// Best spot by dice value, with a small chance of the runner-up
    fn rank_settlement_spots(&mut self, session: &GameSession, spots: &[String]) -> Option<String> {
        let mut scored: Vec<(&String, i32)> = spots
            .iter()
            .map(|key| (key, score_vertex(session, key)))
            .collect();
        scored.sort_by(|a, b| b.1.cmp(&a.1));

        if scored.len() >= 2 && self.rng.gen_bool(0.1) {
            Some(scored[1].0.clone())
        } else {
            scored.first().map(|(key, _)| (*key).clone())
        }
    }
}

impl Decider for Bot {
    fn player_id(&self) -> PlayerId {
        self.player_id
    }

    fn decide(&mut self, session: &GameSession) -> Option<ClientRequest> {
        let player = session.player(self.player_id)?;
        match self.difficulty {
            BotDifficulty::Easy => self.choose_easy(session, player),
            BotDifficulty::Medium => self.choose_medium(session, player),
            BotDifficulty::Hard => self.choose_hard(session, player),
        }
    }
}

fn place(blueprint: Blueprint, snap_key: String) -> ClientRequest {
    ClientRequest::PlaceFoundation {
        blueprint: blueprint.name().to_string(),
        position: Vec3::ZERO,
        rotation: Vec3::ZERO,
        snap_key,
    }
}

fn is_blueprint(request: &ClientRequest, blueprint: Blueprint) -> bool {
    matches!(request, ClientRequest::PlaceFoundation { blueprint: b, .. } if b == blueprint.name())
}

/// Score a vertex by the dice value of its tiles
fn score_vertex(session: &GameSession, key: &str) -> i32 {
    let board = session.board();
    let Some(vertex) = board.vertex(key) else {
        return 0;
    };
    vertex
        .tiles
        .iter()
        .filter_map(|t| board.tile(t)?.number)
        .map(|dice| match dice {
            6 | 8 => 5,
            5 | 9 => 4,
            4 | 10 => 3,
            3 | 11 => 2,
            2 | 12 => 1,
            _ => 0,
        })
        .sum()
}

fn has_pending_foundation(session: &GameSession, player: &Player) -> bool {
    session.foundations().pending().any(|f| f.owner == player.id)
}

/// Pay one unit into the oldest foundation that needs something we hold
fn deposit_request(session: &GameSession, player: &Player) -> Option<ClientRequest> {
    session
        .foundations()
        .pending()
        .filter(|f| f.owner == player.id)
        .find_map(|f| {
            f.required
                .keys()
                .find(|&&r| f.outstanding(r) > 0 && player.ledger.get(r) > 0)
                .map(|r| ClientRequest::DepositResource {
                    foundation_id: f.id,
                    resource: r.name().to_string(),
                })
        })
}

/// Trade surplus for a unit a pending foundation still lacks
fn trade_for_pending(session: &GameSession, player: &Player) -> Option<ClientRequest> {
    let missing = session
        .foundations()
        .pending()
        .filter(|f| f.owner == player.id)
        .find_map(|f| {
            f.required
                .keys()
                .copied()
                .find(|&r| f.outstanding(r) > 0 && player.ledger.get(r) == 0)
        })?;

    let give = Resource::ALL
        .into_iter()
        .filter(|&r| r != missing)
        .filter(|&r| player.ledger.get(r) >= best_trade_ratio(&player.ports, r))
        .max_by_key(|&r| player.ledger.get(r))?;

    Some(ClientRequest::ExecuteTrade {
        give: give.name().to_string(),
        receive: missing.name().to_string(),
        amount: 1,
    })
}

/// First tech that can be started right now
fn research_request(player: &Player) -> Option<ClientRequest> {
    let colony = &player.colony;
    if colony.current_research().is_some() {
        return None;
    }
    Tech::ALL
        .into_iter()
        .filter(|t| !colony.has_researched(*t))
        .filter(|t| t.prerequisites().iter().all(|p| colony.has_researched(*p)))
        .find(|t| player.ledger.has_resources(&t.cost()))
        .map(|t| ClientRequest::StartResearch {
            tech: t.name().to_string(),
        })
}
