//! Hexpulse - game-state and economy engine for a hex-board simulation
//!
//! This crate provides the authoritative game logic, including:
//! - Hex geometry and board generation with ports
//! - Per-player resource ledgers and tile ownership
//! - Placement rules and two-phase foundation building
//! - Bank trades through ports and a player-to-player market
//! - The timed global pulse and proximity-based collection
//!
//! # Architecture
//!
//! The engine does no I/O. A [`GameSession`] owns all state for one game;
//! transports feed it [`ClientRequest`]s and `tick(dt)` calls and route the
//! addressed [`ServerEvent`]s it returns.
//!
//! # Modules
//!
//! - [`hex`]: Axial coordinates, world geometry and vertex/edge keys
//! - [`board`]: Tiles, vertices, edges, ports and structures
//! - [`ownership`]: Which player owns which tile
//! - [`resources`]: Capped resource ledgers
//! - [`placement`]: Settlement, city and road rules
//! - [`building`]: Foundations and deposits
//! - [`trade`]: Port claims and bank trades
//! - [`market`]: Escrowed offers between players
//! - [`pulse`]: The dice countdown and resource spawns
//! - [`collection`]: Picking up spawned resources
//! - [`colony`]: NPCs and research
//! - [`session`]: The game session tying everything together
//! - [`bot`]: Synthetic players

pub mod board;
pub mod bot;
pub mod building;
pub mod collection;
pub mod colony;
pub mod config;
pub mod error;
pub mod events;
pub mod hex;
pub mod market;
pub mod ownership;
pub mod placement;
pub mod player;
pub mod pulse;
pub mod resources;
pub mod session;
pub mod trade;

// Re-export commonly used types
pub use board::{Board, PlayerId, PortKind, Resource, Terrain, Tile};
pub use bot::{Bot, BotDifficulty, Decider};
pub use building::{Blueprint, Foundation};
pub use collection::Collectible;
pub use config::GameConfig;
pub use error::{BoardError, Rejection, RejectionKind, SessionError, ValidationError};
pub use events::{ClientRequest, EventSink, NullSink, Outbound, PulsePhase, Recipient, ServerEvent};
pub use hex::{HexCoord, Vec3};
pub use market::{Market, MarketOffer};
pub use player::{Player, PlayerKind};
pub use pulse::{PulseOutcome, PulseState};
pub use resources::{Cost, ResourceLedger};
pub use session::GameSession;
