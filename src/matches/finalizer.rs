//! Match finalization
//!
//! Turns a completed draft into a match record. Work is split in two: the
//! in-memory part ([`MatchFinalizer::prepare`]) runs under the slot lock and
//! marks the lobby finalized, the persistence part ([`MatchFinalizer::commit`])
//! runs after the lock is released.

use crate::draft::DraftSession;
use crate::error::{LobbyError, Result};
use crate::lobby::{LobbyInstance, LobbyStatus};
use crate::storage::{IdentityProvider, MatchStore};
use crate::types::{placeholder_name, LobbyId, MatchId, PlayerId, Seat, SlotId};
use crate::utils::current_timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// A persisted match; never modified after creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub match_id: MatchId,
    pub slot: SlotId,
    pub lobby_id: LobbyId,
    pub map: String,
    pub team_a: Vec<Seat>,
    pub team_b: Vec<Seat>,
    pub captains: [PlayerId; 2],
    /// Maps removed during the draft, in ban order
    pub excluded_maps: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Render-ready description of a new match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchPayload {
    #[serde(flatten)]
    pub record: MatchRecord,
    pub captain_names: [String; 2],
    /// In-game id of the first captain, who hosts the room
    pub host_game_id: Option<String>,
}

impl MatchPayload {
    pub fn match_id(&self) -> MatchId {
        self.record.match_id
    }

    pub fn map(&self) -> &str {
        &self.record.map
    }

    /// Every participant, team A first
    pub fn participants(&self) -> impl Iterator<Item = &Seat> {
        self.record.team_a.iter().chain(self.record.team_b.iter())
    }
}

/// A finalized lobby whose match is not yet persisted
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMatch {
    pub slot: SlotId,
    pub lobby_id: LobbyId,
    pub map: String,
    pub team_a: Vec<Seat>,
    pub team_b: Vec<Seat>,
    pub captains: [PlayerId; 2],
    pub captain_names: [String; 2],
    pub excluded_maps: Vec<String>,
}

impl PendingMatch {
    /// Player ids in join order
    pub fn roster_ids(&self) -> Vec<PlayerId> {
        self.team_a
            .iter()
            .chain(self.team_b.iter())
            .map(|s| s.player_id.clone())
            .collect()
    }
}

/// Split a roster by join order; an odd player goes to the first team
pub fn split_teams(seats: &[Seat]) -> (Vec<Seat>, Vec<Seat>) {
    let half = seats.len().div_ceil(2);
    let (a, b) = seats.split_at(half);
    (a.to_vec(), b.to_vec())
}

/// Commits completed drafts as matches
pub struct MatchFinalizer {
    store: Arc<dyn MatchStore>,
    identity: Arc<dyn IdentityProvider>,
}

impl MatchFinalizer {
    pub fn new(store: Arc<dyn MatchStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { store, identity }
    }

    /// Mark the lobby finalized and build the match from the draft.
    ///
    /// Fails with `AlreadyFinalized` on a second call for the same lobby and
    /// with `DraftNotComplete` while bans remain.
    pub fn prepare(&self, lobby: &mut LobbyInstance, draft: &DraftSession) -> Result<PendingMatch> {
        if lobby.status() == LobbyStatus::Finalized {
            return Err(LobbyError::AlreadyFinalized {
                slot: lobby.slot(),
            });
        }

        let map = draft
            .final_map()
            .ok_or(LobbyError::DraftNotComplete {
                slot: lobby.slot(),
            })?
            .to_string();

        lobby.mark_finalized()?;

        let (team_a, team_b) = split_teams(lobby.seats());
        let captains = draft.captains().clone();
        let captain_names = captains.clone().map(|id| {
            lobby
                .display_name_of(&id)
                .map(str::to_string)
                .unwrap_or_else(|| placeholder_name(&id))
        });

        Ok(PendingMatch {
            slot: lobby.slot(),
            lobby_id: lobby.id(),
            map,
            team_a,
            team_b,
            captains,
            captain_names,
            excluded_maps: draft.excluded().to_vec(),
        })
    }

    /// Persist a prepared match and build its payload
    pub async fn commit(&self, pending: PendingMatch) -> Result<MatchPayload> {
        let match_id = self
            .store
            .save_match(pending.map.clone(), pending.lobby_id, pending.roster_ids())
            .await?;

        let host_game_id = self.host_game_id(&pending.captains[0]).await;

        info!(
            "Match {} created for lobby {} on {} ({} vs {} players)",
            match_id,
            pending.slot,
            pending.map,
            pending.team_a.len(),
            pending.team_b.len()
        );

        Ok(MatchPayload {
            record: MatchRecord {
                match_id,
                slot: pending.slot,
                lobby_id: pending.lobby_id,
                map: pending.map,
                team_a: pending.team_a,
                team_b: pending.team_b,
                captains: pending.captains,
                excluded_maps: pending.excluded_maps,
                created_at: current_timestamp(),
            },
            captain_names: pending.captain_names,
            host_game_id,
        })
    }

    /// Prepare and commit in one go
    pub async fn finalize(
        &self,
        lobby: &mut LobbyInstance,
        draft: &DraftSession,
    ) -> Result<MatchPayload> {
        let pending = self.prepare(lobby, draft)?;
        self.commit(pending).await
    }

    async fn host_game_id(&self, captain: &str) -> Option<String> {
        match self.identity.resolve_player(captain.to_string()).await {
            Ok(profile) => profile.and_then(|p| p.game_id),
            Err(e) => {
                warn!("Could not look up host profile for '{}': {}", captain, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryStore, MockMatchStore};
    use crate::types::PlayerProfile;

    fn seat(id: &str) -> Seat {
        Seat {
            player_id: id.to_string(),
            display_name: format!("Name {}", id),
            joined_at: current_timestamp(),
        }
    }

    fn completed(ids: &[&str]) -> (LobbyInstance, DraftSession) {
        let mut lobby = LobbyInstance::new(1, ids.len());
        for id in ids {
            lobby.add_seat(seat(id)).unwrap();
        }
        let captains = [ids[1].to_string(), ids[0].to_string()];
        lobby.assign_captains(captains.clone()).unwrap();
        lobby.mark_drafting();

        let mut draft = DraftSession::new(1, captains, vec!["Dune".into(), "Rust".into()]);
        draft.ban_map(ids[1], "Dune").unwrap();
        (lobby, draft)
    }

    #[test]
    fn test_split_teams() {
        let seats: Vec<_> = ["a", "b", "c", "d", "e"].iter().map(|s| seat(s)).collect();
        let (a, b) = split_teams(&seats);
        assert_eq!(a.len(), 3);
        assert_eq!(b.len(), 2);
        assert_eq!(a[0].player_id, "a");
        assert_eq!(b[0].player_id, "d");

        let (a, b) = split_teams(&seats[..4]);
        assert_eq!((a.len(), b.len()), (2, 2));
    }

    #[tokio::test]
    async fn test_finalize_persists_and_resolves_host() {
        let store = Arc::new(InMemoryStore::new());
        let mut host = PlayerProfile::new("b", "Bea");
        host.game_id = Some("765611".to_string());
        store.register_player(host).unwrap();

        let finalizer = MatchFinalizer::new(store.clone(), store.clone());
        let (mut lobby, draft) = completed(&["a", "b", "c", "d"]);

        let payload = finalizer.finalize(&mut lobby, &draft).await.unwrap();
        assert_eq!(payload.map(), "Rust");
        assert_eq!(payload.record.excluded_maps, vec!["Dune"]);
        assert_eq!(payload.host_game_id.as_deref(), Some("765611"));
        assert_eq!(payload.captain_names, ["Name b".to_string(), "Name a".to_string()]);
        assert_eq!(payload.participants().count(), 4);
        assert_eq!(lobby.status(), LobbyStatus::Finalized);

        let stored = store.matches().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, payload.match_id());
        assert_eq!(stored[0].roster, vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_second_finalize_is_rejected() {
        let store = Arc::new(InMemoryStore::new());
        let finalizer = MatchFinalizer::new(store.clone(), store.clone());
        let (mut lobby, draft) = completed(&["a", "b"]);

        finalizer.finalize(&mut lobby, &draft).await.unwrap();
        let err = finalizer.finalize(&mut lobby, &draft).await.unwrap_err();
        assert_eq!(err, LobbyError::AlreadyFinalized { slot: 1 });
        assert_eq!(store.matches().unwrap().len(), 1);
    }

    #[test]
    fn test_incomplete_draft() {
        let store = Arc::new(InMemoryStore::new());
        let finalizer = MatchFinalizer::new(store.clone(), store);

        let mut lobby = LobbyInstance::new(2, 2);
        lobby.add_seat(seat("a")).unwrap();
        lobby.add_seat(seat("b")).unwrap();
        let draft = DraftSession::new(
            2,
            ["a".to_string(), "b".to_string()],
            vec!["Dune".into(), "Rust".into(), "Zone 7".into()],
        );

        let err = finalizer.prepare(&mut lobby, &draft).unwrap_err();
        assert_eq!(err, LobbyError::DraftNotComplete { slot: 2 });
        assert_eq!(lobby.status(), LobbyStatus::Full);
    }

    #[tokio::test]
    async fn test_storage_failure_surfaces_after_prepare() {
        let mut store = MockMatchStore::new();
        store.expect_save_match().times(1).returning(|_, _, _| {
            Err(LobbyError::StorageUnavailable {
                message: "disk full".to_string(),
            })
        });
        let identity = Arc::new(InMemoryStore::new());
        let finalizer = MatchFinalizer::new(Arc::new(store), identity);
        let (mut lobby, draft) = completed(&["a", "b"]);

        let err = finalizer.finalize(&mut lobby, &draft).await.unwrap_err();
        assert!(matches!(err, LobbyError::StorageUnavailable { .. }));
        // In-memory transition is not rolled back
        assert_eq!(lobby.status(), LobbyStatus::Finalized);
    }
}
