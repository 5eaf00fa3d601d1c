//! Ban registry
//!
//! Tracks time-bounded exclusion of players from joining lobbies. Expiry is
//! evaluated lazily on every check; the optional sweeper only tidies the
//! active list shown to moderators.

use crate::ban::record::{BanCategory, BanRecord, BanTerm, NewBan, UnbanScope};
use crate::error::{LobbyError, Result};
use crate::storage::{BanStore, IdentityProvider};
use crate::types::PlayerProfile;
use crate::utils::current_timestamp;
use chrono::Duration;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, error, info};

/// Issues, lifts and checks player bans
pub struct BanRegistry {
    store: Arc<dyn BanStore>,
    identity: Arc<dyn IdentityProvider>,
    /// Upper bound for `ModeratorIssued` bans, in minutes
    moderator_max_ban_minutes: i64,
}

impl BanRegistry {
    pub fn new(
        store: Arc<dyn BanStore>,
        identity: Arc<dyn IdentityProvider>,
        moderator_max_ban_minutes: i64,
    ) -> Self {
        Self {
            store,
            identity,
            moderator_max_ban_minutes,
        }
    }

    /// True iff an in-effect ban exists for the player
    pub async fn is_banned(&self, player_id: &str) -> Result<bool> {
        Ok(self.active_ban(player_id).await?.is_some())
    }

    /// The in-effect ban for the player, if any
    pub async fn active_ban(&self, player_id: &str) -> Result<Option<BanRecord>> {
        self.store
            .find_active_ban(player_id.to_string(), current_timestamp())
            .await
    }

    /// Create and persist a ban.
    ///
    /// A `duration` of `None` or zero, or the `Permanent` category, yields a
    /// permanent ban. Both `player` and `issued_by` may be an id or an
    /// `@username`; either failing to resolve gives `ActorNotFound`.
    pub async fn ban(
        &self,
        player: &str,
        category: BanCategory,
        reason: &str,
        issued_by: &str,
        duration: Option<Duration>,
    ) -> Result<BanRecord> {
        let issued_at = current_timestamp();
        let term = match category {
            BanCategory::Permanent => BanTerm::Permanent,
            _ => BanTerm::from_duration(issued_at, duration),
        };

        if category == BanCategory::ModeratorIssued {
            self.check_moderator_limit(term, duration)?;
        }

        let target = self.resolve(player).await?;
        let issuer = self.resolve(issued_by).await?;

        let record = self
            .store
            .save_ban_record(NewBan {
                player_id: target.player_id,
                category,
                reason: reason.to_string(),
                issued_by: issuer.player_id,
                issued_at,
                term,
            })
            .await?;

        info!(
            "Issued ban {} - player: '{}', category: {:?}, by: '{}', expires: {}",
            record.id,
            record.player_id,
            record.category,
            record.issued_by,
            record
                .expires_at()
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "never".to_string())
        );

        Ok(record)
    }

    /// Record the automatic ban for leaving a full lobby.
    ///
    /// The player was seated a moment ago, so the id is taken as-is and is
    /// also recorded as the issuer. No identity lookup is involved.
    pub async fn penalize_leave(
        &self,
        player_id: &str,
        reason: &str,
        duration: Duration,
    ) -> Result<BanRecord> {
        if duration <= Duration::zero() {
            return Err(LobbyError::Configuration {
                message: format!("leave penalty must be positive, got {}", duration),
            });
        }

        let issued_at = current_timestamp();
        let record = self
            .store
            .save_ban_record(NewBan {
                player_id: player_id.to_string(),
                category: BanCategory::AutomaticLeave,
                reason: reason.to_string(),
                issued_by: player_id.to_string(),
                issued_at,
                term: BanTerm::Until(issued_at + duration),
            })
            .await?;

        info!(
            "Issued leave ban {} - player: '{}', expires: {}",
            record.id,
            record.player_id,
            (issued_at + duration).to_rfc3339()
        );

        Ok(record)
    }

    /// Deactivate the player's active bans within `scope`.
    ///
    /// Returns how many were lifted; zero means there was nothing to lift.
    pub async fn unban(&self, player: &str, unbanned_by: &str, scope: UnbanScope) -> Result<usize> {
        let target = self.resolve(player).await?;
        let actor = self.resolve(unbanned_by).await?;

        let lifted = self
            .store
            .deactivate_bans(
                target.player_id.clone(),
                scope,
                actor.player_id.clone(),
                current_timestamp(),
            )
            .await?;

        if lifted > 0 {
            info!(
                "Lifted {} ban(s) for player '{}' by '{}'",
                lifted, target.player_id, actor.player_id
            );
        } else {
            debug!("No active bans to lift for player '{}'", target.player_id);
        }

        Ok(lifted)
    }

    /// Active bans for the ban list, after deactivating expired ones
    pub async fn active_bans(&self) -> Result<Vec<BanRecord>> {
        self.expire_stale().await?;
        self.store.list_active_bans().await
    }

    /// Every ban ever issued to the player, newest first
    pub async fn history(&self, player: &str) -> Result<Vec<BanRecord>> {
        let target = self.resolve(player).await?;
        self.store.list_bans(target.player_id).await
    }

    /// Deactivate records whose expiry has passed
    pub async fn expire_stale(&self) -> Result<usize> {
        let expired = self.store.expire_bans(current_timestamp()).await?;
        if expired > 0 {
            debug!("Deactivated {} expired ban(s)", expired);
        }
        Ok(expired)
    }

    /// Start a background task that periodically deactivates expired bans
    pub fn start_sweeper(self: Arc<Self>, every: std::time::Duration) -> JoinHandle<()> {
        let registry = Arc::clone(&self);

        let handle = tokio::spawn(async move {
            let mut sweep_interval = interval(every);

            loop {
                sweep_interval.tick().await;

                if let Err(e) = registry.expire_stale().await {
                    error!("Error during ban sweep: {}", e);
                }
            }
        });

        info!("Started ban sweeper (every {:?})", every);
        handle
    }

    /// Moderator bans are time-limited and capped
    fn check_moderator_limit(&self, term: BanTerm, duration: Option<Duration>) -> Result<()> {
        let requested_minutes = match (term, duration) {
            (BanTerm::Permanent, _) => 0,
            (_, Some(d)) => d.num_minutes(),
            (_, None) => 0,
        };

        if term.is_permanent() || requested_minutes > self.moderator_max_ban_minutes {
            return Err(LobbyError::DurationLimitExceeded {
                requested_minutes,
                max_minutes: self.moderator_max_ban_minutes,
            });
        }
        Ok(())
    }

    async fn resolve(&self, identifier: &str) -> Result<PlayerProfile> {
        self.identity
            .resolve_player(identifier.to_string())
            .await?
            .ok_or_else(|| LobbyError::ActorNotFound {
                identifier: identifier.to_string(),
            })
    }
}
