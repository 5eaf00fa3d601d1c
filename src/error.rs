//! Error types for the lobby coordinator
//!
//! Every failure the core can produce is a recoverable, caller-visible outcome.
//! The transport layer maps each variant to a user-facing message through
//! [`LobbyError::reason`].

use crate::types::{PlayerId, RejectionReason, SlotId};
use chrono::{DateTime, Utc};

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, LobbyError>;

/// Errors returned by lobby, draft, ban and match operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LobbyError {
    #[error("Player {player_id} is banned from joining lobbies")]
    PlayerBanned {
        player_id: PlayerId,
        until: Option<DateTime<Utc>>,
    },

    #[error("Lobby {slot} is full")]
    LobbyFull { slot: SlotId },

    #[error("Player {player_id} is already seated in lobby {slot}")]
    AlreadyMember { player_id: PlayerId, slot: SlotId },

    #[error("Player {player_id} is not a member of the lobby")]
    NotMember { player_id: PlayerId },

    #[error("It is not {player_id}'s turn to ban a map")]
    NotYourTurn { player_id: PlayerId },

    #[error("Map '{map}' is not available for banning")]
    MapNotAvailable { map: String },

    #[error("Lobby {slot} has already been finalized")]
    AlreadyFinalized { slot: SlotId },

    #[error("Could not resolve player '{identifier}'")]
    ActorNotFound { identifier: String },

    #[error("Storage unavailable: {message}")]
    StorageUnavailable { message: String },

    #[error("Lobby slot {slot} does not exist")]
    InvalidSlot { slot: SlotId },

    #[error("Lobby {slot} has no draft in progress")]
    NoActiveDraft { slot: SlotId },

    #[error("Draft for lobby {slot} has not finished")]
    DraftNotComplete { slot: SlotId },

    #[error("Invalid map pool: {reason}")]
    InvalidMapPool { reason: String },

    #[error("Ban of {requested_minutes} minutes exceeds the limit of {max_minutes} minutes")]
    DurationLimitExceeded {
        requested_minutes: i64,
        max_minutes: i64,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl LobbyError {
    /// Stable code the transport layer uses to pick a message
    pub fn reason(&self) -> RejectionReason {
        match self {
            LobbyError::PlayerBanned { .. } => RejectionReason::PlayerBanned,
            LobbyError::LobbyFull { .. } => RejectionReason::LobbyFull,
            LobbyError::AlreadyMember { .. } => RejectionReason::AlreadyMember,
            LobbyError::NotMember { .. } => RejectionReason::NotMember,
            LobbyError::NotYourTurn { .. } => RejectionReason::NotYourTurn,
            LobbyError::MapNotAvailable { .. } => RejectionReason::MapNotAvailable,
            LobbyError::AlreadyFinalized { .. } => RejectionReason::AlreadyFinalized,
            LobbyError::ActorNotFound { .. } => RejectionReason::ActorNotFound,
            LobbyError::StorageUnavailable { .. } => RejectionReason::StorageUnavailable,
            LobbyError::InvalidSlot { .. } => RejectionReason::InvalidSlot,
            LobbyError::NoActiveDraft { .. } | LobbyError::DraftNotComplete { .. } => {
                RejectionReason::NoActiveDraft
            }
            LobbyError::DurationLimitExceeded { .. } => RejectionReason::DurationLimitExceeded,
            LobbyError::InvalidMapPool { .. }
            | LobbyError::Configuration { .. }
            | LobbyError::Internal { .. } => RejectionReason::Internal,
        }
    }

    /// Shorthand for a poisoned or otherwise unusable lock
    pub(crate) fn lock(name: &str) -> Self {
        LobbyError::Internal {
            message: format!("Failed to acquire {} lock", name),
        }
    }
}
