//! Common types used throughout the lobby coordinator

use crate::ban::BanRecord;
use crate::draft::DraftView;
use crate::lobby::LobbyStatus;
use crate::matches::MatchPayload;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a chat user / player
pub type PlayerId = String;

/// Lobby slot number, 1-based
pub type SlotId = u32;

/// Unique identifier for one lobby session occupying a slot
pub type LobbyId = Uuid;

/// Identifier assigned by the match store
pub type MatchId = u64;

/// Identifier assigned by the ban store
pub type BanId = u64;

/// One occupied seat in a lobby
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub player_id: PlayerId,
    pub display_name: String,
    pub joined_at: DateTime<Utc>,
}

/// Privilege level of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PlayerRole {
    Player,
    Moderator,
    Admin,
}

/// Profile returned by the identity collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub player_id: PlayerId,
    pub username: Option<String>,
    pub first_name: String,
    /// In-game nickname, present once a game profile is registered
    pub nickname: Option<String>,
    /// In-game account id
    pub game_id: Option<String>,
    pub role: PlayerRole,
}

impl PlayerProfile {
    /// Create a plain player profile without a game profile
    pub fn new(player_id: impl Into<PlayerId>, first_name: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            username: None,
            first_name: first_name.into(),
            nickname: None,
            game_id: None,
            role: PlayerRole::Player,
        }
    }

    /// Name shown in rosters: the game nickname, else the chat first name
    pub fn display_name(&self) -> String {
        self.nickname
            .clone()
            .unwrap_or_else(|| self.first_name.clone())
    }
}

/// Name used for players without a resolvable profile
pub fn placeholder_name(player_id: &str) -> String {
    format!("Player {}", player_id)
}

/// Opaque handle to the chat message a draft is rendered on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySurface {
    pub chat_id: i64,
    pub message_id: i64,
}

/// Reason code attached to a rejected action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectionReason {
    PlayerBanned,
    LobbyFull,
    AlreadyMember,
    NotMember,
    NotYourTurn,
    MapNotAvailable,
    AlreadyFinalized,
    ActorNotFound,
    StorageUnavailable,
    InvalidSlot,
    NoActiveDraft,
    DurationLimitExceeded,
    Internal,
}

impl RejectionReason {
    /// Lowercase label, used for metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::PlayerBanned => "player_banned",
            RejectionReason::LobbyFull => "lobby_full",
            RejectionReason::AlreadyMember => "already_member",
            RejectionReason::NotMember => "not_member",
            RejectionReason::NotYourTurn => "not_your_turn",
            RejectionReason::MapNotAvailable => "map_not_available",
            RejectionReason::AlreadyFinalized => "already_finalized",
            RejectionReason::ActorNotFound => "actor_not_found",
            RejectionReason::StorageUnavailable => "storage_unavailable",
            RejectionReason::InvalidSlot => "invalid_slot",
            RejectionReason::NoActiveDraft => "no_active_draft",
            RejectionReason::DurationLimitExceeded => "duration_limit_exceeded",
            RejectionReason::Internal => "internal",
        }
    }
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a player left a lobby
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaveReason {
    /// Pressed leave
    Requested,
    /// Re-opened the lobby list while seated
    Reselected,
}

/// Per-slot occupancy line for the lobby list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotSummary {
    pub slot: SlotId,
    pub seat_count: usize,
    pub capacity: usize,
    pub status: Option<LobbyStatus>,
    pub is_full: bool,
}

/// Event emitted whenever the seat list of a lobby changes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterUpdated {
    pub slot: SlotId,
    pub lobby_id: LobbyId,
    pub roster: Vec<Seat>,
    pub capacity: usize,
    pub is_full: bool,
    pub captains: Option<[PlayerId; 2]>,
    pub timestamp: DateTime<Utc>,
}

/// Event emitted when a draft starts, advances or is abandoned
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftStateChanged {
    pub slot: SlotId,
    pub view: DraftView,
    /// Set when a captain left with nobody to replace them. `view` is the
    /// last state before the draft was dropped.
    #[serde(default)]
    pub abandoned: bool,
    pub timestamp: DateTime<Utc>,
}

/// Event emitted once a match has been persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchCreated {
    pub payload: MatchPayload,
    pub timestamp: DateTime<Utc>,
}

/// Event emitted when a request is refused
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRejected {
    pub player_id: PlayerId,
    pub slot: Option<SlotId>,
    pub reason: RejectionReason,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Best-effort notice to a player who left a lobby
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerNotice {
    pub player_id: PlayerId,
    pub slot: SlotId,
    pub reason: LeaveReason,
    pub penalty: Option<BanRecord>,
    pub timestamp: DateTime<Utc>,
}

/// Union type for all outbound events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LobbyEvent {
    RosterUpdated(RosterUpdated),
    DraftStateChanged(DraftStateChanged),
    MatchCreated(MatchCreated),
    ActionRejected(ActionRejected),
    PlayerNotice(PlayerNotice),
}

impl LobbyEvent {
    /// Name of the event variant
    pub fn kind(&self) -> &'static str {
        match self {
            LobbyEvent::RosterUpdated(_) => "RosterUpdated",
            LobbyEvent::DraftStateChanged(_) => "DraftStateChanged",
            LobbyEvent::MatchCreated(_) => "MatchCreated",
            LobbyEvent::ActionRejected(_) => "ActionRejected",
            LobbyEvent::PlayerNotice(_) => "PlayerNotice",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_prefers_nickname() {
        let mut profile = PlayerProfile::new("42", "Ivan");
        assert_eq!(profile.display_name(), "Ivan");

        profile.nickname = Some("sn1per".to_string());
        assert_eq!(profile.display_name(), "sn1per");
    }

    #[test]
    fn test_placeholder_name() {
        assert_eq!(placeholder_name("77"), "Player 77");
    }

    #[test]
    fn test_role_ordering() {
        assert!(PlayerRole::Admin > PlayerRole::Moderator);
        assert!(PlayerRole::Moderator > PlayerRole::Player);
    }

    #[test]
    fn test_event_is_tagged() {
        let event = LobbyEvent::ActionRejected(ActionRejected {
            player_id: "p1".to_string(),
            slot: Some(1),
            reason: RejectionReason::LobbyFull,
            message: "Lobby 1 is full".to_string(),
            timestamp: Utc::now(),
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ActionRejected");
        assert_eq!(json["reason"], "LobbyFull");
        assert_eq!(event.kind(), "ActionRejected");
    }
}
