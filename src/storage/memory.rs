//! In-memory implementation of the storage collaborators

use crate::ban::{BanRecord, NewBan, UnbanScope};
use crate::error::{LobbyError, Result};
use crate::storage::{BanStore, IdentityProvider, MatchStore};
use crate::types::{LobbyId, MatchId, PlayerId, PlayerProfile};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;

/// A match row as the store keeps it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMatch {
    pub id: MatchId,
    pub map: String,
    pub lobby_id: LobbyId,
    pub roster: Vec<PlayerId>,
    pub created_at: DateTime<Utc>,
}

/// Thread-safe in-memory store implementing every collaborator trait
#[derive(Debug)]
pub struct InMemoryStore {
    profiles: RwLock<HashMap<PlayerId, PlayerProfile>>,
    matches: RwLock<Vec<StoredMatch>>,
    bans: RwLock<Vec<BanRecord>>,
    next_match_id: AtomicU64,
    next_ban_id: AtomicU64,
    unavailable: AtomicBool,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            profiles: RwLock::new(HashMap::new()),
            matches: RwLock::new(Vec::new()),
            bans: RwLock::new(Vec::new()),
            next_match_id: AtomicU64::new(1),
            next_ban_id: AtomicU64::new(1),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Register or replace a player profile
    pub fn register_player(&self, profile: PlayerProfile) -> Result<()> {
        let mut profiles = self
            .profiles
            .write()
            .map_err(|_| LobbyError::lock("profiles write"))?;
        profiles.insert(profile.player_id.clone(), profile);
        Ok(())
    }

    /// Make every write fail with `StorageUnavailable` until switched back
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// All stored matches, in insertion order
    pub fn matches(&self) -> Result<Vec<StoredMatch>> {
        let matches = self
            .matches
            .read()
            .map_err(|_| LobbyError::lock("matches read"))?;
        Ok(matches.clone())
    }

    /// All ban records, in insertion order
    pub fn ban_records(&self) -> Result<Vec<BanRecord>> {
        let bans = self.bans.read().map_err(|_| LobbyError::lock("bans read"))?;
        Ok(bans.clone())
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(LobbyError::StorageUnavailable {
                message: "in-memory store switched off".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl MatchStore for InMemoryStore {
    async fn save_match(
        &self,
        map: String,
        lobby_id: LobbyId,
        roster: Vec<PlayerId>,
    ) -> Result<MatchId> {
        self.check_available()?;

        let id = self.next_match_id.fetch_add(1, Ordering::SeqCst);
        let mut matches = self
            .matches
            .write()
            .map_err(|_| LobbyError::lock("matches write"))?;
        matches.push(StoredMatch {
            id,
            map,
            lobby_id,
            roster,
            created_at: Utc::now(),
        });
        Ok(id)
    }
}

#[async_trait]
impl BanStore for InMemoryStore {
    async fn save_ban_record(&self, ban: NewBan) -> Result<BanRecord> {
        self.check_available()?;

        let id = self.next_ban_id.fetch_add(1, Ordering::SeqCst);
        let record = BanRecord::from_new(id, ban);
        let mut bans = self.bans.write().map_err(|_| LobbyError::lock("bans write"))?;
        bans.push(record.clone());
        Ok(record)
    }

    async fn find_active_ban(
        &self,
        player_id: PlayerId,
        now: DateTime<Utc>,
    ) -> Result<Option<BanRecord>> {
        let bans = self.bans.read().map_err(|_| LobbyError::lock("bans read"))?;
        Ok(bans
            .iter()
            .rev()
            .find(|b| b.player_id == player_id && b.is_in_effect_at(now))
            .cloned())
    }

    async fn deactivate_bans(
        &self,
        player_id: PlayerId,
        scope: UnbanScope,
        lifted_by: PlayerId,
        at: DateTime<Utc>,
    ) -> Result<usize> {
        self.check_available()?;

        let mut bans = self.bans.write().map_err(|_| LobbyError::lock("bans write"))?;
        let mut lifted = 0;
        for ban in bans
            .iter_mut()
            .filter(|b| b.player_id == player_id && b.active && scope.matches(b))
        {
            ban.lift(Some(lifted_by.clone()), at);
            lifted += 1;
        }
        Ok(lifted)
    }

    async fn list_bans(&self, player_id: PlayerId) -> Result<Vec<BanRecord>> {
        let bans = self.bans.read().map_err(|_| LobbyError::lock("bans read"))?;
        let mut history: Vec<_> = bans
            .iter()
            .filter(|b| b.player_id == player_id)
            .cloned()
            .collect();
        history.sort_by(|a, b| b.issued_at.cmp(&a.issued_at).then(b.id.cmp(&a.id)));
        Ok(history)
    }

    async fn list_active_bans(&self) -> Result<Vec<BanRecord>> {
        let bans = self.bans.read().map_err(|_| LobbyError::lock("bans read"))?;
        Ok(bans.iter().filter(|b| b.active).cloned().collect())
    }

    async fn expire_bans(&self, now: DateTime<Utc>) -> Result<usize> {
        self.check_available()?;

        let mut bans = self.bans.write().map_err(|_| LobbyError::lock("bans write"))?;
        let mut expired = 0;
        for ban in bans.iter_mut().filter(|b| b.is_stale_at(now)) {
            ban.lift(None, now);
            expired += 1;
        }
        Ok(expired)
    }
}

#[async_trait]
impl IdentityProvider for InMemoryStore {
    async fn resolve_player(&self, identifier: String) -> Result<Option<PlayerProfile>> {
        let profiles = self
            .profiles
            .read()
            .map_err(|_| LobbyError::lock("profiles read"))?;

        if let Some(username) = identifier.strip_prefix('@') {
            return Ok(find_by_username(&profiles, username));
        }

        if let Some(profile) = profiles.get(&identifier) {
            return Ok(Some(profile.clone()));
        }

        Ok(find_by_username(&profiles, &identifier))
    }
}

fn find_by_username(
    profiles: &HashMap<PlayerId, PlayerProfile>,
    username: &str,
) -> Option<PlayerProfile> {
    profiles
        .values()
        .find(|p| {
            p.username
                .as_deref()
                .is_some_and(|u| u.eq_ignore_ascii_case(username))
        })
        .cloned()
}
