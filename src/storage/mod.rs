//! Persistence and identity collaborators
//!
//! The coordinator never owns a database. It talks to these traits, and the
//! host application plugs in real implementations. [`InMemoryStore`] backs
//! the CLI, the tests and the benchmarks.

pub mod memory;

pub use memory::InMemoryStore;

use crate::ban::{BanRecord, NewBan, UnbanScope};
use crate::error::Result;
use crate::types::{LobbyId, MatchId, PlayerId, PlayerProfile};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Storage for completed matches
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Persist a match and return its id
    async fn save_match(
        &self,
        map: String,
        lobby_id: LobbyId,
        roster: Vec<PlayerId>,
    ) -> Result<MatchId>;
}

/// Storage for player ban records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BanStore: Send + Sync {
    /// Persist a new ban record
    async fn save_ban_record(&self, ban: NewBan) -> Result<BanRecord>;

    /// The newest ban for `player_id` that is in effect at `now`
    async fn find_active_ban(
        &self,
        player_id: PlayerId,
        now: DateTime<Utc>,
    ) -> Result<Option<BanRecord>>;

    /// Deactivate every active ban of `player_id` matching `scope`
    async fn deactivate_bans(
        &self,
        player_id: PlayerId,
        scope: UnbanScope,
        lifted_by: PlayerId,
        at: DateTime<Utc>,
    ) -> Result<usize>;

    /// Every record for a player, newest first
    async fn list_bans(&self, player_id: PlayerId) -> Result<Vec<BanRecord>>;

    /// Every record whose active flag is still set
    async fn list_active_bans(&self) -> Result<Vec<BanRecord>>;

    /// Deactivate active records whose expiry is at or before `now`
    async fn expire_bans(&self, now: DateTime<Utc>) -> Result<usize>;
}

/// Lookup of chat users and their game profiles
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a player id or `@username` to a profile
    async fn resolve_player(&self, identifier: String) -> Result<Option<PlayerProfile>>;
}
