//! Request and event contracts between players and the engine.
//!
//! - `ClientRequest`: what a player may ask the session to do
//! - `ServerEvent`: what the session tells players happened
//! - `EventSink`: the observer the engine pushes events into
//!
//! The engine never decides how an event reaches a client. It only tags
//! each event with a [`Recipient`]; the transport adapter does the rest.

use crate::board::{PlayerId, Resource};
use crate::error::Rejection;
use crate::hex::{HexCoord, Vec3};
use crate::market::MarketOffer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Actions a player can request.
///
/// Resource and blueprint names arrive as strings and are parsed by the
/// session so unknown names are rejected rather than failing deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientRequest {
    PlaceFoundation {
        blueprint: String,
        position: Vec3,
        rotation: Vec3,
        snap_key: String,
    },
    DepositResource {
        foundation_id: u32,
        resource: String,
    },
    ExecuteTrade {
        give: String,
        receive: String,
        amount: u32,
    },
    HireNpc {
        npc_type: String,
        position: Option<Vec3>,
    },
    StartResearch {
        tech: String,
    },
    /// Escrow `give` and ask for `want_amount` of `want` in return
    PostOffer {
        give: BTreeMap<String, u32>,
        want: String,
        want_amount: u32,
    },
    AcceptOffer {
        offer_id: u32,
    },
    CancelOffer {
        offer_id: u32,
    },
    GetMarket,
    GetInventory,
    /// Report where the player's avatar currently stands
    UpdatePosition {
        position: Vec3,
    },
}

/// Stage of a pulse as shown to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PulsePhase {
    RollStart,
    RollComplete,
    Robber,
}

/// Events emitted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerEvent {
    /// Full ledger of the receiving player
    ResourceUpdate {
        resources: BTreeMap<String, u32>,
    },

    /// Countdown to the next pulse; -1 while waiting for players
    TimerEvent {
        seconds_remaining: i32,
    },

    PulseEvent {
        phase: PulsePhase,
        die1: u8,
        die2: u8,
        total: u8,
        matching_tiles: Option<usize>,
    },

    ResourceSpawned {
        collectible_id: u64,
        resource: Resource,
        tile: HexCoord,
        position: Vec3,
    },

    Collected {
        collectible_id: u64,
        player: PlayerId,
        resource: Resource,
        amount: u32,
    },

    FoundationPlaced {
        foundation_id: u32,
        owner: PlayerId,
        blueprint: String,
        position: Vec3,
        required: BTreeMap<String, u32>,
    },

    ResourceDeposited {
        foundation_id: u32,
        resource: Resource,
        progress: f64,
    },

    StructureCompleted {
        foundation_id: u32,
        owner: PlayerId,
        blueprint: String,
        snap_key: String,
    },

    TradeCompleted {
        give: Resource,
        give_amount: u32,
        receive: Resource,
        receive_amount: u32,
        ratio: u32,
    },

    PortClaimed {
        port: String,
    },

    HarborMasterUpdate {
        points: usize,
    },

    TileOwnershipChanged {
        tile: HexCoord,
        owner: Option<PlayerId>,
        owner_name: Option<String>,
    },

    NpcHired {
        npc_id: u32,
        npc_type: String,
        position: Vec3,
    },

    ResearchStarted {
        tech: String,
        seconds: f64,
    },

    ResearchCompleted {
        tech: String,
    },

    /// Every open market offer
    MarketUpdate {
        offers: Vec<MarketOffer>,
    },

    OfferAccepted {
        offer_id: u32,
        poster: PlayerId,
        accepter: PlayerId,
    },

    /// A request was refused and nothing changed
    Rejected(Rejection),
}

/// Who should receive an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    Player(PlayerId),
    All,
}

/// An event addressed to its recipients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outbound {
    pub to: Recipient,
    pub event: ServerEvent,
}

/// Observer the engine reports events to.
pub trait EventSink {
    fn emit(&mut self, to: Recipient, event: ServerEvent);

    fn to_player(&mut self, player: PlayerId, event: ServerEvent) {
        self.emit(Recipient::Player(player), event);
    }

    fn broadcast(&mut self, event: ServerEvent) {
        self.emit(Recipient::All, event);
    }
}

impl EventSink for Vec<Outbound> {
    fn emit(&mut self, to: Recipient, event: ServerEvent) {
        self.push(Outbound { to, event });
    }
}

/// Sink that drops everything, for callers that only want the state change.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _to: Recipient, _event: ServerEvent) {}
}
