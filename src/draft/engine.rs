//! Map draft engine
//!
//! Holds the master map pool and drives [`DraftSession`]s through the
//! alternating ban protocol. A pool of N maps always takes exactly N - 1 bans.

use crate::draft::session::{DraftSession, DraftState};
use crate::error::{LobbyError, Result};
use crate::types::{PlayerId, SlotId};
use std::collections::HashSet;
use tracing::{debug, info};

/// Starts and advances map drafts
#[derive(Debug, Clone)]
pub struct MapDraftEngine {
    maps: Vec<String>,
}

impl MapDraftEngine {
    /// Create an engine over a fixed, ordered map pool
    pub fn new(maps: Vec<String>) -> Result<Self> {
        if maps.len() < 2 {
            return Err(LobbyError::InvalidMapPool {
                reason: format!("need at least 2 maps, got {}", maps.len()),
            });
        }

        let mut seen = HashSet::new();
        for map in &maps {
            if map.trim().is_empty() {
                return Err(LobbyError::InvalidMapPool {
                    reason: "map names cannot be empty".to_string(),
                });
            }
            if !seen.insert(map.as_str()) {
                return Err(LobbyError::InvalidMapPool {
                    reason: format!("duplicate map '{}'", map),
                });
            }
        }

        Ok(Self { maps })
    }

    /// The master map list
    pub fn maps(&self) -> &[String] {
        &self.maps
    }

    /// Number of bans a full draft takes
    pub fn bans_per_draft(&self) -> usize {
        self.maps.len() - 1
    }

    /// Open a draft for a lobby that just filled
    pub fn start(&self, slot: SlotId, captains: [PlayerId; 2]) -> DraftSession {
        info!(
            "Starting map draft for lobby {} - captains: '{}' and '{}', {} maps",
            slot,
            captains[0],
            captains[1],
            self.maps.len()
        );
        DraftSession::new(slot, captains, self.maps.clone())
    }

    /// Apply one captain's ban
    pub fn ban_map(
        &self,
        session: &mut DraftSession,
        player_id: &str,
        map: &str,
    ) -> Result<DraftState> {
        let state = session.ban_map(player_id, map)?.clone();

        match &state {
            DraftState::AwaitingTurn(next) => debug!(
                "Lobby {}: '{}' banned {} ({} left), captain {} to move",
                session.slot(),
                player_id,
                map,
                session.available().len(),
                next
            ),
            DraftState::Complete(final_map) => info!(
                "Lobby {}: draft complete after {} bans, final map {}",
                session.slot(),
                session.excluded().len(),
                final_map
            ),
        }

        Ok(state)
    }
}
