//! Lobby instance implementation and lifecycle management
//!
//! A lobby occupies one slot. It keeps its seats in join order, which later
//! decides the team split, and tracks the two captains once it fills.

use crate::error::{LobbyError, Result};
use crate::types::{LobbyId, PlayerId, Seat, SlotId};
use crate::utils::{current_timestamp, generate_lobby_id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Possible states of a lobby
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LobbyStatus {
    /// Lobby is waiting for players to join
    Waiting,
    /// Every seat taken, captains chosen
    Full,
    /// Captains are banning maps
    Drafting,
    /// Match written (terminal state)
    Finalized,
}

/// One lobby session in a slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LobbyInstance {
    id: LobbyId,
    slot: SlotId,
    seats: Vec<Seat>,
    capacity: usize,
    status: LobbyStatus,
    captains: Option<[PlayerId; 2]>,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
}

impl LobbyInstance {
    /// Create an empty waiting lobby
    pub fn new(slot: SlotId, capacity: usize) -> Self {
        let now = current_timestamp();
        Self {
            id: generate_lobby_id(),
            slot,
            seats: Vec::with_capacity(capacity),
            capacity,
            status: LobbyStatus::Waiting,
            captains: None,
            created_at: now,
            last_activity: now,
        }
    }

    pub fn id(&self) -> LobbyId {
        self.id
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    /// Seats in join order
    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn status(&self) -> LobbyStatus {
        self.status
    }

    pub fn captains(&self) -> Option<&[PlayerId; 2]> {
        self.captains.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    pub fn seat_count(&self) -> usize {
        self.seats.len()
    }

    pub fn is_full(&self) -> bool {
        self.seats.len() >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    pub fn contains(&self, player_id: &str) -> bool {
        self.seats.iter().any(|s| s.player_id == player_id)
    }

    pub fn is_captain(&self, player_id: &str) -> bool {
        self.captains
            .as_ref()
            .is_some_and(|c| c.iter().any(|id| id == player_id))
    }

    /// Player ids in join order
    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.seats.iter().map(|s| s.player_id.clone()).collect()
    }

    /// Display name recorded when the player joined
    pub fn display_name_of(&self, player_id: &str) -> Option<&str> {
        self.seats
            .iter()
            .find(|s| s.player_id == player_id)
            .map(|s| s.display_name.as_str())
    }

    /// Append a seat.
    ///
    /// Returns true when this seat moved the lobby from Waiting to Full. A
    /// refilled drafting lobby stays in Drafting.
    pub fn add_seat(&mut self, seat: Seat) -> Result<bool> {
        if self.status == LobbyStatus::Finalized {
            return Err(LobbyError::AlreadyFinalized { slot: self.slot });
        }
        if self.contains(&seat.player_id) {
            return Err(LobbyError::AlreadyMember {
                player_id: seat.player_id,
                slot: self.slot,
            });
        }
        if self.is_full() {
            return Err(LobbyError::LobbyFull { slot: self.slot });
        }

        self.seats.push(seat);
        self.update_activity();

        if self.is_full() && self.status == LobbyStatus::Waiting {
            self.status = LobbyStatus::Full;
            return Ok(true);
        }
        Ok(false)
    }

    /// Remove a seat, keeping the order of the others
    pub fn remove_seat(&mut self, player_id: &str) -> Result<Seat> {
        let position = self
            .seats
            .iter()
            .position(|s| s.player_id == player_id)
            .ok_or_else(|| LobbyError::NotMember {
                player_id: player_id.to_string(),
            })?;

        let seat = self.seats.remove(position);
        self.update_activity();

        if self.status == LobbyStatus::Full && self.captains.is_none() {
            self.status = LobbyStatus::Waiting;
        }
        Ok(seat)
    }

    /// Record the two captains; both must hold seats
    pub fn assign_captains(&mut self, captains: [PlayerId; 2]) -> Result<()> {
        if captains.iter().any(|c| !self.contains(c)) || captains[0] == captains[1] {
            return Err(LobbyError::Internal {
                message: format!("Invalid captains for lobby {}: {:?}", self.slot, captains),
            });
        }
        self.captains = Some(captains);
        self.status = LobbyStatus::Full;
        Ok(())
    }

    /// Swap a departed captain for a seated player at the same index
    pub fn replace_captain(&mut self, old: &str, new: PlayerId) -> Result<usize> {
        if !self.contains(&new) {
            return Err(LobbyError::NotMember { player_id: new });
        }
        let captains = self.captains.as_mut().ok_or_else(|| LobbyError::Internal {
            message: format!("Lobby {} has no captains", self.slot),
        })?;
        let idx = captains
            .iter()
            .position(|c| c == old)
            .ok_or_else(|| LobbyError::Internal {
                message: format!("'{}' is not a captain of lobby {}", old, self.slot),
            })?;
        captains[idx] = new;
        Ok(idx)
    }

    /// Drop the captains and go back to waiting
    pub fn clear_captains(&mut self) {
        self.captains = None;
        self.status = LobbyStatus::Waiting;
    }

    pub fn mark_drafting(&mut self) {
        self.status = LobbyStatus::Drafting;
        self.update_activity();
    }

    /// Enter the terminal state; a second call is an error
    pub fn mark_finalized(&mut self) -> Result<()> {
        if self.status == LobbyStatus::Finalized {
            return Err(LobbyError::AlreadyFinalized { slot: self.slot });
        }
        self.status = LobbyStatus::Finalized;
        self.update_activity();
        Ok(())
    }

    fn update_activity(&mut self) {
        self.last_activity = current_timestamp();
    }
}
