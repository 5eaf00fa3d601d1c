//! Draft session state
//!
//! One session per full lobby. Captains alternate removing maps from the
//! pool until a single map is left.

use crate::error::{LobbyError, Result};
use crate::types::{DisplaySurface, PlayerId, SlotId};
use serde::{Deserialize, Serialize};

/// Where a draft currently stands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DraftState {
    /// Waiting on the captain at this index
    AwaitingTurn(usize),
    /// Terminal: one map left
    Complete(String),
}

/// Map-ban draft for a single lobby
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftSession {
    slot: SlotId,
    captains: [PlayerId; 2],
    current_turn: usize,
    available: Vec<String>,
    excluded: Vec<String>,
    state: DraftState,
    surface: Option<DisplaySurface>,
}

/// Read-only snapshot of a draft for rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftView {
    pub slot: SlotId,
    pub captains: [PlayerId; 2],
    pub captain_names: [String; 2],
    /// `None` once the draft is complete
    pub current_captain: Option<PlayerId>,
    pub available_maps: Vec<String>,
    /// In ban order
    pub excluded_maps: Vec<String>,
    pub final_map: Option<String>,
    pub surface: Option<DisplaySurface>,
}

impl DraftSession {
    /// Start a draft over the full map pool; the first captain bans first
    pub fn new(slot: SlotId, captains: [PlayerId; 2], maps: Vec<String>) -> Self {
        Self {
            slot,
            captains,
            current_turn: 0,
            available: maps,
            excluded: Vec::new(),
            state: DraftState::AwaitingTurn(0),
            surface: None,
        }
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    pub fn captains(&self) -> &[PlayerId; 2] {
        &self.captains
    }

    pub fn current_turn(&self) -> usize {
        self.current_turn
    }

    pub fn state(&self) -> &DraftState {
        &self.state
    }

    pub fn available(&self) -> &[String] {
        &self.available
    }

    pub fn excluded(&self) -> &[String] {
        &self.excluded
    }

    pub fn surface(&self) -> Option<DisplaySurface> {
        self.surface
    }

    pub fn set_surface(&mut self, surface: DisplaySurface) {
        self.surface = Some(surface);
    }

    /// Captain whose turn it is, while the draft is running
    pub fn current_captain(&self) -> Option<&PlayerId> {
        match self.state {
            DraftState::AwaitingTurn(idx) => self.captains.get(idx),
            DraftState::Complete(_) => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.state, DraftState::Complete(_))
    }

    /// The remaining map once the draft is complete
    pub fn final_map(&self) -> Option<&str> {
        match &self.state {
            DraftState::Complete(map) => Some(map),
            DraftState::AwaitingTurn(_) => None,
        }
    }

    /// Remove `map` from the pool on behalf of `player_id`
    pub fn ban_map(&mut self, player_id: &str, map: &str) -> Result<&DraftState> {
        if self.is_complete() {
            return Err(LobbyError::NoActiveDraft { slot: self.slot });
        }

        if self.captains[self.current_turn] != player_id {
            return Err(LobbyError::NotYourTurn {
                player_id: player_id.to_string(),
            });
        }

        let position = self
            .available
            .iter()
            .position(|m| m == map)
            .ok_or_else(|| LobbyError::MapNotAvailable {
                map: map.to_string(),
            })?;

        let banned = self.available.remove(position);
        self.excluded.push(banned);
        self.current_turn = 1 - self.current_turn;

        self.state = if self.available.len() == 1 {
            DraftState::Complete(self.available[0].clone())
        } else {
            DraftState::AwaitingTurn(self.current_turn)
        };

        Ok(&self.state)
    }

    /// Swap a departed captain for a new one at the same index.
    ///
    /// Returns false if `old` was not a captain.
    pub fn replace_captain(&mut self, old: &str, new: PlayerId) -> bool {
        match self.captains.iter().position(|c| c == old) {
            Some(idx) => {
                self.captains[idx] = new;
                true
            }
            None => false,
        }
    }

    /// Snapshot for the transport layer
    pub fn view(&self, captain_names: [String; 2]) -> DraftView {
        DraftView {
            slot: self.slot,
            captains: self.captains.clone(),
            captain_names,
            current_captain: self.current_captain().cloned(),
            available_maps: self.available.clone(),
            excluded_maps: self.excluded.clone(),
            final_map: self.final_map().map(str::to_string),
            surface: self.surface,
        }
    }
}
