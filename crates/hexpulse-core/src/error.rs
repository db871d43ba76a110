//! Error types for the Hexpulse engine.
//!
//! Errors are split by concern:
//! - `BoardError`: map generation that cannot produce a usable board
//! - `ValidationError`: a request that breaks a game rule
//! - `CapacityError`: a ledger that cannot hold or cannot cover an amount
//! - `OwnershipError`: a tile claim that conflicts with another player
//!
//! `SessionError` wraps all of them so request handlers can use `?`, and
//! converts into a serializable [`Rejection`] for the requesting client.

use crate::board::{PlayerId, Resource};
use crate::hex::HexCoord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Map generation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum BoardError {
    #[error("Board needs at least one ring")]
    NoRings,

    #[error("Terrain frequency table is empty")]
    EmptyTerrainTable,
}

/// Rule violations reported back to the requester.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("Too close to an existing structure")]
    DistanceRule,

    #[error("Not connected to your network")]
    ConnectivityRule,

    #[error("Location already occupied")]
    AlreadyOccupied,

    #[error("Cannot afford this")]
    Unaffordable,

    #[error("You do not own this")]
    NotOwned,

    #[error("Unknown resource kind: {0}")]
    InvalidResourceKind(String),

    #[error("Cannot trade a resource for itself")]
    SameResourceTrade,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Location is not buildable")]
    NotBuildable,

    #[error("Unknown blueprint: {0}")]
    InvalidBlueprint(String),

    #[error("Foundation already completed")]
    AlreadyCompleted,

    #[error("Foundation does not need {0}")]
    ResourceNotNeeded(Resource),

    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Unknown NPC type: {0}")]
    InvalidNpcType(String),

    #[error("Unknown technology: {0}")]
    InvalidTech(String),

    #[error("Already researched: {0}")]
    AlreadyResearched(String),

    #[error("Missing prerequisite: {0}")]
    MissingPrerequisite(String),

    #[error("Already researching: {0}")]
    ResearchBusy(String),

    #[error("Unknown player {0}")]
    UnknownPlayer(PlayerId),

    #[error("Your {0} foundation is still waiting for resources")]
    FoundationPending(String),

    #[error("At most {0} open market offers per player")]
    OfferLimit(usize),

    #[error("Cannot accept your own offer")]
    OwnOffer,
}

/// Ledger capacity failures.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum CapacityError {
    #[error("{resource} stack is full")]
    StackFull { resource: Resource },

    #[error("Need {needed} {resource}, have {available}")]
    Insufficient {
        resource: Resource,
        needed: u32,
        available: u32,
    },
}

/// Tile claim conflicts.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum OwnershipError {
    #[error("Tile ({}, {}) is already owned by player {owner}", .tile.q, .tile.r)]
    AlreadyOwned { tile: HexCoord, owner: PlayerId },
}

/// Any failure a session request can produce.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Capacity(#[from] CapacityError),

    #[error(transparent)]
    Ownership(#[from] OwnershipError),
}

/// Category of a rejected request, as seen by clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectionKind {
    DistanceRule,
    ConnectivityRule,
    AlreadyOccupied,
    Unaffordable,
    NotOwned,
    InvalidResourceKind,
    SameResourceTrade,
    NotFound,
    NotBuildable,
    InvalidBlueprint,
    AlreadyCompleted,
    ResourceNotNeeded,
    InvalidAmount,
    InvalidNpcType,
    InvalidTech,
    AlreadyResearched,
    MissingPrerequisite,
    ResearchBusy,
    UnknownPlayer,
    FoundationPending,
    OfferLimit,
    OwnOffer,
    Capacity,
    AlreadyOwned,
}

/// Structured rejection sent to the requesting client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub kind: RejectionKind,
    pub message: String,
}

impl ValidationError {
    pub fn kind(&self) -> RejectionKind {
        match self {
            ValidationError::DistanceRule => RejectionKind::DistanceRule,
            ValidationError::ConnectivityRule => RejectionKind::ConnectivityRule,
            ValidationError::AlreadyOccupied => RejectionKind::AlreadyOccupied,
            ValidationError::Unaffordable => RejectionKind::Unaffordable,
            ValidationError::NotOwned => RejectionKind::NotOwned,
            ValidationError::InvalidResourceKind(_) => RejectionKind::InvalidResourceKind,
            ValidationError::SameResourceTrade => RejectionKind::SameResourceTrade,
            ValidationError::NotFound(_) => RejectionKind::NotFound,
            ValidationError::NotBuildable => RejectionKind::NotBuildable,
            ValidationError::InvalidBlueprint(_) => RejectionKind::InvalidBlueprint,
            ValidationError::AlreadyCompleted => RejectionKind::AlreadyCompleted,
            ValidationError::ResourceNotNeeded(_) => RejectionKind::ResourceNotNeeded,
            ValidationError::InvalidAmount => RejectionKind::InvalidAmount,
            ValidationError::InvalidNpcType(_) => RejectionKind::InvalidNpcType,
            ValidationError::InvalidTech(_) => RejectionKind::InvalidTech,
            ValidationError::AlreadyResearched(_) => RejectionKind::AlreadyResearched,
            ValidationError::MissingPrerequisite(_) => RejectionKind::MissingPrerequisite,
            ValidationError::ResearchBusy(_) => RejectionKind::ResearchBusy,
            ValidationError::UnknownPlayer(_) => RejectionKind::UnknownPlayer,
            ValidationError::FoundationPending(_) => RejectionKind::FoundationPending,
            ValidationError::OfferLimit(_) => RejectionKind::OfferLimit,
            ValidationError::OwnOffer => RejectionKind::OwnOffer,
        }
    }
}

impl SessionError {
    /// The client-facing category of this error.
    pub fn kind(&self) -> RejectionKind {
        match self {
            SessionError::Validation(e) => e.kind(),
            SessionError::Capacity(_) => RejectionKind::Capacity,
            SessionError::Ownership(_) => RejectionKind::AlreadyOwned,
        }
    }
}

impl From<&SessionError> for Rejection {
    fn from(err: &SessionError) -> Self {
        Rejection {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}
