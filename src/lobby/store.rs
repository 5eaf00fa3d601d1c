//! Lobby store
//!
//! Owns every slot's lobby and draft session plus the player-to-slot index.
//! Each slot has its own async mutex; a [`SlotGuard`] is the critical section
//! for one state transition on that slot. The index is a std `RwLock` that is
//! only taken while a slot lock is already held (or on its own), never the
//! other way round, and never across an `.await`.

use crate::draft::DraftSession;
use crate::error::{LobbyError, Result};
use crate::lobby::instance::{LobbyInstance, LobbyStatus};
use crate::types::{LobbyId, PlayerId, Seat, SlotId};
use crate::utils::{current_timestamp, sample_distinct, sample_indices};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::{Mutex as StdMutex, RwLock};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// Everything that lives in one slot
#[derive(Debug, Default)]
pub struct SlotState {
    lobby: Option<LobbyInstance>,
    draft: Option<DraftSession>,
}

/// Result of seating a player
#[derive(Debug, Clone, PartialEq)]
pub struct AddOutcome {
    pub lobby_id: LobbyId,
    pub seat_count: usize,
    /// This seat moved the lobby from Waiting to Full
    pub became_full: bool,
    /// The lobby was created by this join
    pub created: bool,
}

/// What happened to the captains when a seat was vacated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptainChange {
    /// The departing player was not a captain
    Unchanged,
    /// A remaining player took over at `index`
    Replaced { index: usize, captain: PlayerId },
    /// No one could take over; captains cleared and any draft dropped
    Cleared,
}

/// Result of removing a player
#[derive(Debug, Clone, PartialEq)]
pub struct RemoveOutcome {
    pub lobby_id: LobbyId,
    pub seat: Seat,
    /// Seat count was at capacity before the removal
    pub was_full: bool,
    pub remaining: usize,
    pub captain_change: CaptainChange,
    /// The lobby emptied and was removed from the slot
    pub lobby_destroyed: bool,
    /// An in-flight draft was thrown away
    pub draft_abandoned: bool,
}

/// Per-slot lobby state with a global membership index
pub struct LobbyStore {
    capacity: usize,
    slots: Vec<Mutex<SlotState>>,
    player_index: RwLock<HashMap<PlayerId, SlotId>>,
    rng: StdMutex<StdRng>,
}

impl LobbyStore {
    /// Create a store with `slot_count` empty slots, seeded from entropy
    pub fn new(slot_count: u32, capacity: usize) -> Self {
        Self::with_rng(slot_count, capacity, StdRng::from_entropy())
    }

    /// Create a store whose captain draws are reproducible
    pub fn with_seed(slot_count: u32, capacity: usize, seed: u64) -> Self {
        Self::with_rng(slot_count, capacity, StdRng::seed_from_u64(seed))
    }

    fn with_rng(slot_count: u32, capacity: usize, rng: StdRng) -> Self {
        Self {
            capacity,
            slots: (0..slot_count).map(|_| Mutex::new(SlotState::default())).collect(),
            player_index: RwLock::new(HashMap::new()),
            rng: StdMutex::new(rng),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn slot_count(&self) -> u32 {
        self.slots.len() as u32
    }

    /// Slot the player currently sits in
    pub fn find_lobby_of(&self, player_id: &str) -> Result<Option<SlotId>> {
        let index = self
            .player_index
            .read()
            .map_err(|_| LobbyError::lock("player index read"))?;
        Ok(index.get(player_id).copied())
    }

    /// Number of players seated across all slots
    pub fn seated_players(&self) -> Result<usize> {
        let index = self
            .player_index
            .read()
            .map_err(|_| LobbyError::lock("player index read"))?;
        Ok(index.len())
    }

    /// Enter the critical section for `slot`
    pub async fn lock(&self, slot: SlotId) -> Result<SlotGuard<'_>> {
        let mutex = slot
            .checked_sub(1)
            .and_then(|i| self.slots.get(i as usize))
            .ok_or(LobbyError::InvalidSlot { slot })?;

        Ok(SlotGuard {
            store: self,
            slot,
            state: mutex.lock().await,
        })
    }

    /// Existing lobby for the slot, or a freshly created empty one.
    ///
    /// An empty lobby is not kept: the slot stays free until someone takes a
    /// seat through [`SlotGuard::add_player`].
    pub async fn get_or_create(&self, slot: SlotId) -> Result<LobbyInstance> {
        let guard = self.lock(slot).await?;
        Ok(guard
            .lobby()
            .cloned()
            .unwrap_or_else(|| LobbyInstance::new(slot, self.capacity)))
    }

    /// Clone of the slot's lobby, if any
    pub async fn snapshot(&self, slot: SlotId) -> Result<Option<LobbyInstance>> {
        let guard = self.lock(slot).await?;
        Ok(guard.lobby().cloned())
    }

    /// Seat a player in its own critical section
    pub async fn add_player(
        &self,
        slot: SlotId,
        player_id: &str,
        display_name: &str,
    ) -> Result<AddOutcome> {
        let mut guard = self.lock(slot).await?;
        guard.add_player(player_id, display_name)
    }

    /// Remove a player in its own critical section
    pub async fn remove_player(&self, slot: SlotId, player_id: &str) -> Result<RemoveOutcome> {
        let mut guard = self.lock(slot).await?;
        guard.remove_player(player_id)
    }

    /// Seat count and status for every slot, empty slots included
    pub async fn occupancy(&self) -> Result<Vec<(SlotId, Option<(usize, LobbyStatus)>)>> {
        let mut rows = Vec::with_capacity(self.slots.len());
        for slot in 1..=self.slot_count() {
            let guard = self.lock(slot).await?;
            rows.push((
                slot,
                guard.lobby().map(|l| (l.seat_count(), l.status())),
            ));
        }
        Ok(rows)
    }

    fn draw_indices(&self, length: usize, amount: usize) -> Result<Vec<usize>> {
        let mut rng = self.rng.lock().map_err(|_| LobbyError::lock("rng"))?;
        Ok(sample_indices(&mut *rng, length, amount))
    }
}

/// Exclusive access to one slot for the span of a transition
pub struct SlotGuard<'a> {
    store: &'a LobbyStore,
    slot: SlotId,
    state: MutexGuard<'a, SlotState>,
}

impl<'a> SlotGuard<'a> {
    pub fn slot(&self) -> SlotId {
        self.slot
    }

    pub fn lobby(&self) -> Option<&LobbyInstance> {
        self.state.lobby.as_ref()
    }

    pub fn lobby_mut(&mut self) -> Option<&mut LobbyInstance> {
        self.state.lobby.as_mut()
    }

    pub fn draft(&self) -> Option<&DraftSession> {
        self.state.draft.as_ref()
    }

    pub fn draft_mut(&mut self) -> Option<&mut DraftSession> {
        self.state.draft.as_mut()
    }

    /// Both halves of the slot at once
    pub fn parts_mut(&mut self) -> (Option<&mut LobbyInstance>, Option<&mut DraftSession>) {
        let state = &mut *self.state;
        (state.lobby.as_mut(), state.draft.as_mut())
    }

    /// The slot's lobby, created empty if absent
    pub fn get_or_create(&mut self) -> &mut LobbyInstance {
        let slot = self.slot;
        let capacity = self.store.capacity;
        self.state.lobby.get_or_insert_with(|| {
            debug!("Creating lobby in slot {}", slot);
            LobbyInstance::new(slot, capacity)
        })
    }

    /// Seat a player, updating the index in the same critical section.
    ///
    /// Fails with `AlreadyMember` if the index already places the player in
    /// any slot, and with `LobbyFull` when no seat is free.
    pub fn add_player(&mut self, player_id: &str, display_name: &str) -> Result<AddOutcome> {
        let slot = self.slot;
        let store = self.store;
        let mut index = store
            .player_index
            .write()
            .map_err(|_| LobbyError::lock("player index write"))?;

        if let Some(existing) = index.get(player_id) {
            return Err(LobbyError::AlreadyMember {
                player_id: player_id.to_string(),
                slot: *existing,
            });
        }

        let seat = Seat {
            player_id: player_id.to_string(),
            display_name: display_name.to_string(),
            joined_at: current_timestamp(),
        };

        let created = self.state.lobby.is_none();
        let mut lobby = self
            .state
            .lobby
            .take()
            .unwrap_or_else(|| LobbyInstance::new(slot, store.capacity));

        let became_full = match lobby.add_seat(seat) {
            Ok(became_full) => became_full,
            Err(e) => {
                if !created {
                    self.state.lobby = Some(lobby);
                }
                return Err(e);
            }
        };

        index.insert(player_id.to_string(), slot);

        let outcome = AddOutcome {
            lobby_id: lobby.id(),
            seat_count: lobby.seat_count(),
            became_full,
            created,
        };
        self.state.lobby = Some(lobby);

        if created {
            info!("Created lobby {} in slot {}", outcome.lobby_id, slot);
        }
        Ok(outcome)
    }

    /// Vacate a seat, keeping the index in step and re-captaining if needed.
    ///
    /// When a captain leaves, the other captain stays and one replacement is
    /// drawn uniformly from the remaining non-captains. With no candidate the
    /// draft is abandoned and the lobby returns to Waiting. An emptied lobby
    /// is removed together with its draft.
    pub fn remove_player(&mut self, player_id: &str) -> Result<RemoveOutcome> {
        let slot = self.slot;
        let store = self.store;
        let state = &mut *self.state;

        let lobby = state.lobby.as_mut().ok_or_else(|| LobbyError::NotMember {
            player_id: player_id.to_string(),
        })?;

        let was_full = lobby.seat_count() >= lobby.capacity();
        let was_captain = lobby.is_captain(player_id);

        let seat = {
            let mut index = store
                .player_index
                .write()
                .map_err(|_| LobbyError::lock("player index write"))?;
            let seat = lobby.remove_seat(player_id)?;
            index.remove(player_id);
            seat
        };

        let lobby_id = lobby.id();
        let remaining = lobby.seat_count();
        let mut captain_change = CaptainChange::Unchanged;
        let mut draft_abandoned = false;
        let mut lobby_destroyed = false;

        if remaining == 0 {
            draft_abandoned = state.draft.take().is_some();
            state.lobby = None;
            lobby_destroyed = true;
            info!("Lobby {} in slot {} emptied and removed", lobby_id, slot);
        } else if was_captain {
            let other = lobby
                .captains()
                .and_then(|c| c.iter().find(|id| id.as_str() != player_id).cloned());
            let candidates: Vec<PlayerId> = lobby
                .seats()
                .iter()
                .filter(|s| Some(&s.player_id) != other.as_ref())
                .map(|s| s.player_id.clone())
                .collect();

            match store.draw_indices(candidates.len(), 1)?.first() {
                Some(&i) => {
                    let replacement = candidates[i].clone();
                    let index = lobby.replace_captain(player_id, replacement.clone())?;
                    if let Some(draft) = state.draft.as_mut() {
                        draft.replace_captain(player_id, replacement.clone());
                    }
                    info!(
                        "Lobby {}: captain '{}' left, '{}' takes over as captain {}",
                        slot, player_id, replacement, index
                    );
                    captain_change = CaptainChange::Replaced {
                        index,
                        captain: replacement,
                    };
                }
                None => {
                    lobby.clear_captains();
                    draft_abandoned = state.draft.take().is_some();
                    info!(
                        "Lobby {}: captain '{}' left with no replacement, draft abandoned",
                        slot, player_id
                    );
                    captain_change = CaptainChange::Cleared;
                }
            }
        }

        Ok(RemoveOutcome {
            lobby_id,
            seat,
            was_full,
            remaining,
            captain_change,
            lobby_destroyed,
            draft_abandoned,
        })
    }

    /// Pick two captains uniformly at random from the seated players
    pub fn assign_captains(&mut self) -> Result<[PlayerId; 2]> {
        let slot = self.slot;
        let store = self.store;
        let lobby = self
            .state
            .lobby
            .as_mut()
            .ok_or_else(|| missing_lobby(slot))?;

        let ids = lobby.player_ids();
        let picked = {
            let mut rng = store.rng.lock().map_err(|_| LobbyError::lock("rng"))?;
            sample_distinct(&mut *rng, &ids, 2)
        };
        let captains: [PlayerId; 2] = picked.try_into().map_err(|_| LobbyError::Internal {
            message: format!("Lobby {} has fewer than two players", slot),
        })?;

        lobby.assign_captains(captains.clone())?;
        info!(
            "Lobby {}: captains are '{}' and '{}'",
            slot, captains[0], captains[1]
        );
        Ok(captains)
    }

    /// Attach a draft and move the lobby to Drafting
    pub fn install_draft(&mut self, draft: DraftSession) -> Result<()> {
        let slot = self.slot;
        let lobby = self
            .state
            .lobby
            .as_mut()
            .ok_or_else(|| missing_lobby(slot))?;
        lobby.mark_drafting();
        self.state.draft = Some(draft);
        Ok(())
    }

    /// Tear the slot down: lobby, draft and every index entry
    pub fn close(&mut self) -> Result<Option<LobbyInstance>> {
        let mut index = self
            .store
            .player_index
            .write()
            .map_err(|_| LobbyError::lock("player index write"))?;

        self.state.draft = None;
        let lobby = self.state.lobby.take();
        if let Some(lobby) = &lobby {
            for seat in lobby.seats() {
                index.remove(&seat.player_id);
            }
            debug!("Closed lobby {} in slot {}", lobby.id(), self.slot);
        }
        Ok(lobby)
    }
}

fn missing_lobby(slot: SlotId) -> LobbyError {
    LobbyError::Internal {
        message: format!("Slot {} has no lobby", slot),
    }
}
