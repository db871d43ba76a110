//! One running game: the board, every ledger, the players and the clock.
//!
//! `GameSession` is the only thing that mutates game state. Callers feed it
//! requests and time; it answers with addressed events.
//!
//! A tick runs these stages in order:
//! 1. pulse (gated on every player having placed a first settlement)
//! 2. collection
//! 3. robber penalty, when the pulse just rolled a 7
//! 4. per-player colony updates, in join order

use crate::board::{Board, PlayerId, Resource};
use crate::building::{Blueprint, Foundations};
use crate::collection::CollectionEngine;
use crate::config::GameConfig;
use crate::error::{BoardError, Rejection, SessionError, ValidationError};
use crate::events::{ClientRequest, EventSink, Outbound, ServerEvent};
use crate::hex::Vec3;
use crate::market::Market;
use crate::ownership::OwnershipLedger;
use crate::player::{Player, PlayerKind};
use crate::pulse::{PulseOutcome, PulseScheduler};
use crate::resources::{cost_names, Cost};
use crate::trade;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

pub struct GameSession {
    config: GameConfig,
    seed: u64,
    rng: StdRng,
    board: Board,
    ownership: OwnershipLedger,
    /// Join order
    players: Vec<Player>,
    next_player_id: PlayerId,
    foundations: Foundations,
    pulse: PulseScheduler,
    collection: CollectionEngine,
    market: Market,
    /// Seconds of game time since the session started
    clock: f64,
}

impl GameSession {
    /// Create a session with a freshly generated board
    pub fn new(config: GameConfig, seed: u64) -> Result<Self, BoardError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let board = Board::generate(&config, &mut rng)?;
        info!(
            seed,
            tiles = board.tiles.len(),
            ports = board.ports.len(),
            "Created game session"
        );
        Ok(Self {
            pulse: PulseScheduler::new(&config),
            collection: CollectionEngine::new(&config),
            config,
            seed,
            rng,
            board,
            ownership: OwnershipLedger::new(),
            players: Vec::new(),
            next_player_id: 1,
            foundations: Foundations::new(),
            market: Market::new(),
            clock: 0.0,
        })
    }

    // ==================== Accessors ====================

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn ownership(&self) -> &OwnershipLedger {
        &self.ownership
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn foundations(&self) -> &Foundations {
        &self.foundations
    }

    pub fn pulse(&self) -> &PulseScheduler {
        &self.pulse
    }

    pub fn collection(&self) -> &CollectionEngine {
        &self.collection
    }

    pub fn market(&self) -> &Market {
        &self.market
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// At least one player, and every player has placed a first settlement
    pub fn all_ready(&self) -> bool {
        !self.players.is_empty() && self.players.iter().all(|p| p.has_placed_first_settlement)
    }

    // ==================== Players ====================

    /// Add a player with the starting hand
    pub fn join(&mut self, name: &str, kind: PlayerKind, sink: &mut dyn EventSink) -> PlayerId {
        let id = self.next_player_id;
        self.next_player_id += 1;
        let player = Player::new(
            id,
            name,
            kind,
            self.config.max_stack,
            &self.config.starting_resources,
        );
        player.ledger.notify(sink);
        self.players.push(player);
        info!(player = id, "{} joined", name);
        id
    }

    /// Send one player the live state a broadcast would have told them.
    ///
    /// Covers tile owners, collectibles on the ground, unfinished
    /// foundations and open market offers. The board layout itself is not
    /// included.
    pub fn catch_up(&self, player: PlayerId, sink: &mut dyn EventSink) {
        for (tile, claim) in self.ownership.iter() {
            sink.to_player(
                player,
                ServerEvent::TileOwnershipChanged {
                    tile,
                    owner: Some(claim.player),
                    owner_name: Some(claim.player_name.clone()),
                },
            );
        }
        for item in self.collection.iter() {
            sink.to_player(
                player,
                ServerEvent::ResourceSpawned {
                    collectible_id: item.id,
                    resource: item.resource,
                    tile: item.tile,
                    position: item.position,
                },
            );
        }
        for foundation in self.foundations.pending() {
            sink.to_player(
                player,
                ServerEvent::FoundationPlaced {
                    foundation_id: foundation.id,
                    owner: foundation.owner,
                    blueprint: foundation.blueprint.name().to_string(),
                    position: foundation.position,
                    required: cost_names(&foundation.required),
                },
            );
        }
        sink.to_player(
            player,
            ServerEvent::MarketUpdate {
                offers: self.market.offers().cloned().collect(),
            },
        );
    }

    /// Remove a player along with everything they hold on the map
    pub fn leave(&mut self, id: PlayerId, sink: &mut dyn EventSink) -> Option<Player> {
        let index = self.players.iter().position(|p| p.id == id)?;
        let player = self.players.remove(index);
        let released = self.ownership.release_all(id, sink);
        self.board.clear_player(id);
        self.foundations.remove_player(id);
        self.collection.remove_player(id);
        self.market.remove_player(id, sink);
        info!(player = id, tiles = released.len(), "{} left", player.display_name);
        Some(player)
    }

    // ==================== Requests ====================

    /// Apply a request and collect the resulting events.
    ///
    /// A refused request produces a single `Rejected` event for the requester.
    pub fn handle(&mut self, player: PlayerId, request: ClientRequest) -> Vec<Outbound> {
        let mut out = Vec::new();
        if let Err(e) = self.apply(player, request, &mut out) {
            let rejection = Rejection::from(&e);
            debug!(player, kind = ?rejection.kind, "Rejected: {}", rejection.message);
            out.to_player(player, ServerEvent::Rejected(rejection));
        }
        out
    }

    /// Apply a request, pushing events into `sink`
    pub fn apply(
        &mut self,
        player_id: PlayerId,
        request: ClientRequest,
        sink: &mut dyn EventSink,
    ) -> Result<(), SessionError> {
        let index = self
            .players
            .iter()
            .position(|p| p.id == player_id)
            .ok_or(ValidationError::UnknownPlayer(player_id))?;

        match request {
            ClientRequest::PlaceFoundation {
                blueprint,
                position,
                rotation,
                snap_key,
            } => {
                let blueprint: Blueprint = blueprint.parse()?;
                self.foundations.place(
                    &mut self.board,
                    &mut self.players[index],
                    blueprint,
                    position,
                    rotation,
                    &snap_key,
                    sink,
                )?;
            }

            ClientRequest::DepositResource {
                foundation_id,
                resource,
            } => {
                let resource: Resource = resource.parse()?;
                let deposit =
                    self.foundations
                        .deposit(&mut self.players[index], foundation_id, resource, sink)?;
                if deposit.completed {
                    self.complete_foundation(index, foundation_id, sink);
                }
            }

            ClientRequest::ExecuteTrade {
                give,
                receive,
                amount,
            } => {
                let give: Resource = give.parse()?;
                let receive: Resource = receive.parse()?;
                trade::execute_trade(&mut self.players[index], give, receive, amount, sink)?;
            }

            ClientRequest::HireNpc { npc_type, position } => {
                let player = &mut self.players[index];
                let position = position.or(player.position).unwrap_or(Vec3::ZERO);
                player
                    .colony
                    .hire(&mut player.ledger, &npc_type, position, sink)?;
            }

            ClientRequest::StartResearch { tech } => {
                let player = &mut self.players[index];
                player
                    .colony
                    .start_research(&mut player.ledger, &tech, sink)?;
            }

            ClientRequest::PostOffer {
                give,
                want,
                want_amount,
            } => {
                let give = give
                    .iter()
                    .map(|(name, &n)| name.parse::<Resource>().map(|r| (r, n)))
                    .collect::<Result<Cost, _>>()?;
                let want: Resource = want.parse()?;
                self.market.post_offer(
                    &mut self.players[index],
                    give,
                    want,
                    want_amount,
                    self.clock,
                    sink,
                )?;
            }

            ClientRequest::AcceptOffer { offer_id } => {
                self.market
                    .accept_offer(&mut self.players, player_id, offer_id, sink)?;
            }

            ClientRequest::CancelOffer { offer_id } => {
                self.market
                    .cancel_offer(&mut self.players[index], offer_id, sink)?;
            }

            ClientRequest::GetMarket => {
                sink.to_player(
                    player_id,
                    ServerEvent::MarketUpdate {
                        offers: self.market.offers().cloned().collect(),
                    },
                );
            }

            ClientRequest::GetInventory => {
                self.players[index].ledger.notify(sink);
            }

            ClientRequest::UpdatePosition { position } => {
                self.players[index].position = Some(position);
            }
        }
        Ok(())
    }

    /// Structure side effects once the last unit is deposited
    fn complete_foundation(&mut self, index: usize, id: u32, sink: &mut dyn EventSink) {
        let Some(foundation) = self.foundations.complete(&mut self.board, id, sink) else {
            return;
        };
        if foundation.blueprint != Blueprint::Settlement {
            return;
        }

        let player = &mut self.players[index];
        let position = foundation.position;
        self.ownership.claim_tiles_near_settlement(
            &self.board,
            player.id,
            &player.display_name,
            position,
            id,
            self.config.claim_radius,
            self.clock,
            sink,
        );
        trade::claim_port(
            &self.board,
            player,
            position,
            self.config.port_claim_radius,
            self.config.harbor_master_threshold,
            sink,
        );
    }

    // ==================== Time ====================

    /// Advance the session and collect the resulting events
    pub fn tick(&mut self, dt: f64) -> Vec<Outbound> {
        let mut out = Vec::new();
        self.tick_into(dt, &mut out);
        out
    }

    /// Advance the session by `dt` seconds, pushing events into `sink`
    pub fn tick_into(&mut self, dt: f64, sink: &mut dyn EventSink) {
        self.clock += dt;

        let ready = self.all_ready();
        let outcome = self.pulse.update(
            dt,
            ready,
            &self.board,
            &mut self.collection,
            &mut self.rng,
            self.clock,
            sink,
        );

        self.collection
            .update(dt, &mut self.players, &self.ownership, sink);

        if matches!(outcome, Some(PulseOutcome::Robber(_))) && self.config.robber_penalty {
            self.apply_robber_penalty(sink);
        }

        for player in &mut self.players {
            player.colony.update(&mut player.ledger, dt, sink);
        }
    }

    /// Make the next tick roll the dice
    pub fn force_pulse(&mut self) {
        self.pulse.force_pulse();
    }

    /// Halve every hand above the limit, dropping random units
    fn apply_robber_penalty(&mut self, sink: &mut dyn EventSink) {
        for player in &mut self.players {
            let total = player.ledger.total();
            if total <= self.config.robber_hand_limit {
                continue;
            }
            let lost = player.ledger.remove_random(total / 2, &mut self.rng, sink);
            info!(player = player.id, lost = lost.len(), "Robber took half a hand");
        }
    }
}
