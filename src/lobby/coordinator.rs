//! Lobby coordinator
//!
//! The per-slot state machine (`Waiting -> Full -> Drafting -> Finalized`)
//! that ties the store, the draft engine, the ban registry and the match
//! finalizer together. Every transition on a slot happens inside that slot's
//! lock; persistence writes and event delivery happen after it is released.

use crate::ban::{BanCategory, BanRecord, BanRegistry};
use crate::config::{LobbyConfig, MAX_LEAVE_PENALTY_SECONDS};
use crate::draft::{DraftSession, DraftView, MapDraftEngine};
use crate::error::{LobbyError, Result};
use crate::events::EventPublisher;
use crate::lobby::instance::LobbyInstance;
use crate::lobby::store::{CaptainChange, LobbyStore};
use crate::matches::{MatchFinalizer, MatchPayload};
use crate::metrics::MetricsCollector;
use crate::storage::{IdentityProvider, MatchStore};
use crate::types::*;
use crate::utils::current_timestamp;
use chrono::Duration as ChronoDuration;
use serde::Serialize;
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Reason text stored on automatic leave bans
const LEAVE_BAN_REASON: &str = "lobby_leave";

/// Statistics about coordinator operations
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoordinatorStats {
    /// Total number of lobbies created
    pub lobbies_created: u64,
    /// Total successful joins
    pub players_joined: u64,
    /// Total leaves, explicit or by re-selection
    pub players_left: u64,
    /// Leave bans issued
    pub penalties_issued: u64,
    /// Drafts opened on full lobbies
    pub drafts_started: u64,
    /// Accepted map bans
    pub maps_banned: u64,
    /// Matches persisted
    pub matches_created: u64,
    /// Requests answered with ActionRejected
    pub actions_rejected: u64,
    /// Events the publisher failed to deliver
    pub notification_failures: u64,
    /// Current number of lobbies occupying a slot
    pub active_lobbies: usize,
    /// Current number of seated players
    pub players_seated: usize,
}

/// Result of a vacated seat
#[derive(Debug, Clone, PartialEq)]
pub struct LeaveOutcome {
    pub slot: SlotId,
    pub lobby_id: LobbyId,
    pub remaining: usize,
    /// Ban issued for leaving a full lobby
    pub penalty: Option<BanRecord>,
    pub captain_change: CaptainChange,
    pub lobby_destroyed: bool,
    pub draft_abandoned: bool,
}

/// Result of a join request
#[derive(Debug, Clone, PartialEq)]
pub enum JoinOutcome {
    /// Seated in the requested slot
    Joined {
        slot: SlotId,
        lobby_id: LobbyId,
        seat_count: usize,
        /// The draft this join started, if it filled the lobby
        draft: Option<DraftView>,
        /// Seat given up in another slot first
        left_previous: Option<LeaveOutcome>,
    },
    /// The player picked the slot they were already in, which toggles them out
    LeftOnly(LeaveOutcome),
}

/// Result of a map ban
#[derive(Debug, Clone, PartialEq)]
pub enum BanMapOutcome {
    InProgress(DraftView),
    Completed(MatchPayload),
}

/// What a map ban did inside the slot lock
enum DraftStep {
    Progress(DraftView),
    Finished {
        pending: crate::matches::PendingMatch,
        view: DraftView,
    },
}

/// Coordinates lobby membership, captain drafts and match creation
pub struct LobbyCoordinator {
    config: LobbyConfig,
    leave_penalty: ChronoDuration,
    store: LobbyStore,
    engine: MapDraftEngine,
    bans: Arc<BanRegistry>,
    finalizer: MatchFinalizer,
    identity: Arc<dyn IdentityProvider>,
    event_publisher: Arc<dyn EventPublisher>,
    stats: RwLock<CoordinatorStats>,
    metrics_collector: Option<Arc<MetricsCollector>>,
}

impl LobbyCoordinator {
    /// Create a coordinator over the given collaborators
    pub fn new(
        config: LobbyConfig,
        bans: Arc<BanRegistry>,
        match_store: Arc<dyn MatchStore>,
        identity: Arc<dyn IdentityProvider>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Result<Self> {
        if config.capacity < 2 {
            return Err(LobbyError::Configuration {
                message: format!("lobby capacity must be at least 2, got {}", config.capacity),
            });
        }
        if config.slot_count == 0 {
            return Err(LobbyError::Configuration {
                message: "at least one lobby slot is required".to_string(),
            });
        }

        let leave_penalty = leave_penalty_of(&config)?;
        let engine = MapDraftEngine::new(config.maps.clone())?;
        let store = LobbyStore::new(config.slot_count, config.capacity);
        let finalizer = MatchFinalizer::new(match_store, identity.clone());

        info!(
            "Lobby coordinator ready - {} slots of {} seats, {} maps",
            config.slot_count,
            config.capacity,
            engine.maps().len()
        );

        Ok(Self {
            config,
            leave_penalty,
            store,
            engine,
            bans,
            finalizer,
            identity,
            event_publisher,
            stats: RwLock::new(CoordinatorStats::default()),
            metrics_collector: None,
        })
    }

    /// Record Prometheus metrics through this collector
    pub fn with_metrics(mut self, metrics_collector: Arc<MetricsCollector>) -> Self {
        self.metrics_collector = Some(metrics_collector);
        self
    }

    /// Make captain draws reproducible. Call before any player joins.
    pub fn with_captain_seed(mut self, seed: u64) -> Self {
        self.store = LobbyStore::with_seed(self.config.slot_count, self.config.capacity, seed);
        self
    }

    pub fn config(&self) -> &LobbyConfig {
        &self.config
    }

    /// The ban registry consulted on every join
    pub fn bans(&self) -> &Arc<BanRegistry> {
        &self.bans
    }

    /// Slot the player currently sits in
    pub fn find_lobby_of(&self, player_id: &str) -> Result<Option<SlotId>> {
        self.store.find_lobby_of(player_id)
    }

    /// Join a lobby slot.
    ///
    /// A player already seated somewhere leaves that slot first. Picking the
    /// slot they already occupy only leaves it.
    pub async fn request_join(
        &self,
        player_id: &str,
        slot: SlotId,
        display_name: Option<&str>,
    ) -> Result<JoinOutcome> {
        let started = Instant::now();
        info!("Join request - player: '{}', slot: {}", player_id, slot);

        let result = self.join(player_id, slot, display_name).await;
        self.finish("join", player_id, Some(slot), started, &result)
            .await;
        result
    }

    /// Leave whichever lobby the player is in
    pub async fn request_leave(&self, player_id: &str) -> Result<LeaveOutcome> {
        let started = Instant::now();
        info!("Leave request - player: '{}'", player_id);

        let result = async {
            let slot = self
                .store
                .find_lobby_of(player_id)?
                .ok_or_else(|| LobbyError::NotMember {
                    player_id: player_id.to_string(),
                })?;
            self.leave_slot(player_id, slot, LeaveReason::Requested)
                .await
        }
        .await;

        self.finish("leave", player_id, None, started, &result).await;
        result
    }

    /// Leave a specific lobby; fails with `NotMember` if the player sits elsewhere
    pub async fn leave_lobby(&self, player_id: &str, slot: SlotId) -> Result<LeaveOutcome> {
        let started = Instant::now();
        info!("Leave request - player: '{}', slot: {}", player_id, slot);

        let result = async {
            self.check_slot(slot)?;
            if self.store.find_lobby_of(player_id)? != Some(slot) {
                return Err(LobbyError::NotMember {
                    player_id: player_id.to_string(),
                });
            }
            self.leave_slot(player_id, slot, LeaveReason::Requested)
                .await
        }
        .await;

        self.finish("leave", player_id, Some(slot), started, &result)
            .await;
        result
    }

    /// A captain's map ban; the last ban finalizes the match
    pub async fn request_ban_map(
        &self,
        player_id: &str,
        slot: SlotId,
        map: &str,
    ) -> Result<BanMapOutcome> {
        let started = Instant::now();
        debug!(
            "Map ban request - player: '{}', slot: {}, map: {}",
            player_id, slot, map
        );

        let result = self.ban_map(player_id, slot, map).await;
        self.finish("ban_map", player_id, Some(slot), started, &result)
            .await;
        result
    }

    /// One summary per configured slot, empty slots included
    pub async fn overview(&self) -> Result<Vec<SlotSummary>> {
        let rows = self.store.occupancy().await?;
        Ok(rows
            .into_iter()
            .map(|(slot, occupancy)| {
                let seat_count = occupancy.map(|(count, _)| count).unwrap_or(0);
                SlotSummary {
                    slot,
                    seat_count,
                    capacity: self.config.capacity,
                    status: occupancy.map(|(_, status)| status),
                    is_full: seat_count >= self.config.capacity,
                }
            })
            .collect())
    }

    /// Copy of the lobby in `slot`, if one exists
    pub async fn lobby_snapshot(&self, slot: SlotId) -> Result<Option<LobbyInstance>> {
        self.check_slot(slot)?;
        self.store.snapshot(slot).await
    }

    /// Current draft view for `slot`, if a draft is running
    pub async fn draft_view(&self, slot: SlotId) -> Result<Option<DraftView>> {
        self.check_slot(slot)?;
        let guard = self.store.lock(slot).await?;
        Ok(match (guard.lobby(), guard.draft()) {
            (Some(lobby), Some(draft)) => Some(view_of(lobby, draft)),
            _ => None,
        })
    }

    /// Remember which chat message renders the draft for `slot`
    pub async fn attach_surface(&self, slot: SlotId, surface: DisplaySurface) -> Result<DraftView> {
        self.check_slot(slot)?;
        let mut guard = self.store.lock(slot).await?;
        let (lobby, draft) = guard.parts_mut();
        match (lobby, draft) {
            (Some(lobby), Some(draft)) => {
                draft.set_surface(surface);
                debug!(
                    "Lobby {}: draft rendered on message {}/{}",
                    slot, surface.chat_id, surface.message_id
                );
                Ok(view_of(lobby, draft))
            }
            _ => Err(LobbyError::NoActiveDraft { slot }),
        }
    }

    /// Get current coordinator statistics
    pub async fn get_stats(&self) -> Result<CoordinatorStats> {
        let mut stats = self
            .stats
            .read()
            .map_err(|_| LobbyError::lock("stats"))?
            .clone();

        stats.players_seated = self.store.seated_players()?;
        stats.active_lobbies = self
            .store
            .occupancy()
            .await?
            .iter()
            .filter(|(_, occupancy)| occupancy.is_some())
            .count();
        Ok(stats)
    }

    async fn join(
        &self,
        player_id: &str,
        slot: SlotId,
        display_name: Option<&str>,
    ) -> Result<JoinOutcome> {
        self.check_slot(slot)?;

        if let Some(ban) = self.bans.active_ban(player_id).await? {
            info!(
                "Player '{}' is banned until {:?}, join refused",
                player_id,
                ban.expires_at()
            );
            return Err(LobbyError::PlayerBanned {
                player_id: player_id.to_string(),
                until: ban.expires_at(),
            });
        }

        let mut left_previous = None;
        if let Some(current) = self.store.find_lobby_of(player_id)? {
            let leave = self
                .leave_slot(player_id, current, LeaveReason::Reselected)
                .await?;

            if current == slot {
                info!(
                    "Player '{}' re-selected lobby {}, treated as leave",
                    player_id, slot
                );
                return Ok(JoinOutcome::LeftOnly(leave));
            }

            if let Some(penalty) = &leave.penalty {
                return Err(LobbyError::PlayerBanned {
                    player_id: player_id.to_string(),
                    until: penalty.expires_at(),
                });
            }
            left_previous = Some(leave);
        }

        let name = match display_name {
            Some(name) => name.to_string(),
            None => self.display_name_for(player_id).await,
        };

        let (added, roster, draft) = {
            let mut guard = self.store.lock(slot).await?;
            let added = guard.add_player(player_id, &name)?;

            let mut draft = None;
            if added.became_full {
                let captains = guard.assign_captains()?;
                let session = self.engine.start(slot, captains);
                guard.install_draft(session)?;
                draft = match (guard.lobby(), guard.draft()) {
                    (Some(lobby), Some(session)) => Some(view_of(lobby, session)),
                    _ => None,
                };
            }

            let roster = guard.lobby().map(roster_of);
            (added, roster, draft)
        };

        info!(
            "Player '{}' joined lobby {} ({}/{})",
            player_id, slot, added.seat_count, self.config.capacity
        );

        self.update_stats(|stats| {
            stats.players_joined += 1;
            if added.created {
                stats.lobbies_created += 1;
            }
            if draft.is_some() {
                stats.drafts_started += 1;
            }
        });
        if let Some(metrics) = &self.metrics_collector {
            metrics.record_player_joined();
            if added.created {
                metrics.record_lobby_created();
            }
            if draft.is_some() {
                metrics.record_draft_started();
            }
        }

        if let Some(roster) = roster {
            self.deliver(LobbyEvent::RosterUpdated(roster)).await;
        }
        if let Some(view) = &draft {
            self.deliver(LobbyEvent::DraftStateChanged(DraftStateChanged {
                slot,
                view: view.clone(),
                abandoned: false,
                timestamp: current_timestamp(),
            }))
            .await;
        }

        Ok(JoinOutcome::Joined {
            slot,
            lobby_id: added.lobby_id,
            seat_count: added.seat_count,
            draft,
            left_previous,
        })
    }

    /// Vacate the player's seat in `slot`, then apply the leave penalty.
    ///
    /// The penalty is written after the slot lock is released. If that write
    /// fails the seat stays vacated and the error is returned.
    async fn leave_slot(
        &self,
        player_id: &str,
        slot: SlotId,
        reason: LeaveReason,
    ) -> Result<LeaveOutcome> {
        let (removed, roster, draft) = {
            let mut guard = self.store.lock(slot).await?;
            let last_view = match (guard.lobby(), guard.draft()) {
                (Some(lobby), Some(session)) => Some(view_of(lobby, session)),
                _ => None,
            };
            let removed = guard.remove_player(player_id)?;

            let roster = guard.lobby().map(roster_of);
            let draft = match (&removed.captain_change, guard.lobby(), guard.draft()) {
                (CaptainChange::Replaced { .. }, Some(lobby), Some(session)) => {
                    Some((view_of(lobby, session), false))
                }
                _ if removed.draft_abandoned => last_view.map(|view| (view, true)),
                _ => None,
            };
            (removed, roster, draft)
        };

        info!(
            "Player '{}' left lobby {} ({:?}), {} remaining",
            player_id, slot, reason, removed.remaining
        );

        self.update_stats(|stats| stats.players_left += 1);
        if let Some(metrics) = &self.metrics_collector {
            if removed.lobby_destroyed {
                metrics.record_lobby_closed();
            }
            if removed.draft_abandoned {
                metrics.record_draft_abandoned();
            }
        }

        if let Some(roster) = roster {
            self.deliver(LobbyEvent::RosterUpdated(roster)).await;
        }
        if let Some((view, abandoned)) = draft {
            self.deliver(LobbyEvent::DraftStateChanged(DraftStateChanged {
                slot,
                view,
                abandoned,
                timestamp: current_timestamp(),
            }))
            .await;
        }

        let penalty = if removed.was_full {
            Some(self.issue_leave_penalty(player_id, slot).await?)
        } else {
            None
        };

        if let Some(metrics) = &self.metrics_collector {
            metrics.record_player_left(penalty.is_some());
        }

        self.deliver(LobbyEvent::PlayerNotice(PlayerNotice {
            player_id: player_id.to_string(),
            slot,
            reason,
            penalty: penalty.clone(),
            timestamp: current_timestamp(),
        }))
        .await;

        Ok(LeaveOutcome {
            slot,
            lobby_id: removed.lobby_id,
            remaining: removed.remaining,
            penalty,
            captain_change: removed.captain_change,
            lobby_destroyed: removed.lobby_destroyed,
            draft_abandoned: removed.draft_abandoned,
        })
    }

    async fn issue_leave_penalty(&self, player_id: &str, slot: SlotId) -> Result<BanRecord> {
        match self
            .bans
            .penalize_leave(player_id, LEAVE_BAN_REASON, self.leave_penalty)
            .await
        {
            Ok(record) => {
                info!(
                    "Player '{}' left full lobby {}, banned for {}s",
                    player_id, slot, self.config.leave_penalty_seconds
                );
                self.update_stats(|stats| stats.penalties_issued += 1);
                if let Some(metrics) = &self.metrics_collector {
                    metrics.record_ban_issued(BanCategory::AutomaticLeave);
                }
                Ok(record)
            }
            Err(e) => {
                error!(
                    "Leave from lobby {} committed but penalty for '{}' was not recorded: {} - manual reconciliation required",
                    slot, player_id, e
                );
                if let Some(metrics) = &self.metrics_collector {
                    metrics.record_persistence_failure("ban");
                }
                Err(e)
            }
        }
    }

    async fn ban_map(&self, player_id: &str, slot: SlotId, map: &str) -> Result<BanMapOutcome> {
        self.check_slot(slot)?;

        let step = {
            let mut guard = self.store.lock(slot).await?;
            let step = {
                let (lobby, draft) = guard.parts_mut();
                let (lobby, draft) = match (lobby, draft) {
                    (Some(lobby), Some(draft)) => (lobby, draft),
                    _ => return Err(LobbyError::NoActiveDraft { slot }),
                };

                match self.engine.ban_map(draft, player_id, map)? {
                    crate::draft::DraftState::AwaitingTurn(_) => {
                        DraftStep::Progress(view_of(lobby, draft))
                    }
                    crate::draft::DraftState::Complete(_) => {
                        let pending = self.finalizer.prepare(lobby, draft)?;
                        DraftStep::Finished {
                            pending,
                            view: view_of(lobby, draft),
                        }
                    }
                }
            };

            if matches!(step, DraftStep::Finished { .. }) {
                guard.close()?;
            }
            step
        };

        self.update_stats(|stats| stats.maps_banned += 1);
        if let Some(metrics) = &self.metrics_collector {
            metrics.record_map_banned();
        }

        match step {
            DraftStep::Progress(view) => {
                self.deliver(LobbyEvent::DraftStateChanged(DraftStateChanged {
                    slot,
                    view: view.clone(),
                    abandoned: false,
                    timestamp: current_timestamp(),
                }))
                .await;
                Ok(BanMapOutcome::InProgress(view))
            }
            DraftStep::Finished { pending, view } => {
                if let Some(metrics) = &self.metrics_collector {
                    metrics.record_lobby_closed();
                }
                self.deliver(LobbyEvent::DraftStateChanged(DraftStateChanged {
                    slot,
                    view,
                    abandoned: false,
                    timestamp: current_timestamp(),
                }))
                .await;

                let lobby_id = pending.lobby_id;
                let payload = match self.finalizer.commit(pending).await {
                    Ok(payload) => payload,
                    Err(e) => {
                        error!(
                            "Lobby {} ({}) finalized in memory but the match was not saved: {} - manual reconciliation required",
                            slot, lobby_id, e
                        );
                        if let Some(metrics) = &self.metrics_collector {
                            metrics.record_persistence_failure("match");
                        }
                        return Err(e);
                    }
                };

                self.update_stats(|stats| stats.matches_created += 1);
                if let Some(metrics) = &self.metrics_collector {
                    metrics.record_match_created();
                }

                self.deliver(LobbyEvent::MatchCreated(MatchCreated {
                    payload: payload.clone(),
                    timestamp: current_timestamp(),
                }))
                .await;

                Ok(BanMapOutcome::Completed(payload))
            }
        }
    }

    fn check_slot(&self, slot: SlotId) -> Result<()> {
        if !self.config.has_slot(slot) {
            return Err(LobbyError::InvalidSlot { slot });
        }
        Ok(())
    }

    /// Display name from the identity collaborator, or a placeholder
    async fn display_name_for(&self, player_id: &str) -> String {
        match self.identity.resolve_player(player_id.to_string()).await {
            Ok(Some(profile)) => profile.display_name(),
            Ok(None) => placeholder_name(player_id),
            Err(e) => {
                warn!("Profile lookup for '{}' failed: {}", player_id, e);
                placeholder_name(player_id)
            }
        }
    }

    /// Metrics and rejection event for a finished operation
    async fn finish<T>(
        &self,
        operation: &str,
        player_id: &str,
        slot: Option<SlotId>,
        started: Instant,
        result: &Result<T>,
    ) {
        if let Some(metrics) = &self.metrics_collector {
            metrics.record_operation(operation, started.elapsed());
        }

        if let Err(e) = result {
            let reason = e.reason();
            debug!(
                "Rejected {} for player '{}': {} ({})",
                operation, player_id, e, reason
            );

            self.update_stats(|stats| stats.actions_rejected += 1);
            if let Some(metrics) = &self.metrics_collector {
                metrics.record_rejection(reason);
            }

            self.deliver(LobbyEvent::ActionRejected(ActionRejected {
                player_id: player_id.to_string(),
                slot,
                reason,
                message: e.to_string(),
                timestamp: current_timestamp(),
            }))
            .await;
        }
    }

    /// Hand an event to the publisher. Failures are logged once and counted.
    async fn deliver(&self, event: LobbyEvent) {
        let kind = event.kind();
        let result = match event {
            LobbyEvent::RosterUpdated(e) => self.event_publisher.publish_roster_updated(e).await,
            LobbyEvent::DraftStateChanged(e) => {
                self.event_publisher.publish_draft_state_changed(e).await
            }
            LobbyEvent::MatchCreated(e) => self.event_publisher.publish_match_created(e).await,
            LobbyEvent::ActionRejected(e) => {
                self.event_publisher.publish_action_rejected(e).await
            }
            LobbyEvent::PlayerNotice(e) => self.event_publisher.publish_player_notice(e).await,
        };

        if let Err(e) = result {
            warn!("Failed to publish {} event: {}", kind, e);
            self.update_stats(|stats| stats.notification_failures += 1);
            if let Some(metrics) = &self.metrics_collector {
                metrics.record_notification_failure();
            }
        }
    }

    fn update_stats(&self, update: impl FnOnce(&mut CoordinatorStats)) {
        match self.stats.write() {
            Ok(mut stats) => update(&mut stats),
            Err(_) => warn!("Failed to acquire stats lock, statistics skipped"),
        }
    }
}

/// Roster snapshot for a RosterUpdated event
fn roster_of(lobby: &LobbyInstance) -> RosterUpdated {
    RosterUpdated {
        slot: lobby.slot(),
        lobby_id: lobby.id(),
        roster: lobby.seats().to_vec(),
        capacity: lobby.capacity(),
        is_full: lobby.is_full(),
        captains: lobby.captains().cloned(),
        timestamp: current_timestamp(),
    }
}

/// Draft view with captain names taken from the roster
/// The configured leave penalty, bounded to `1..=MAX_LEAVE_PENALTY_SECONDS`
fn leave_penalty_of(config: &LobbyConfig) -> Result<ChronoDuration> {
    let seconds = config.leave_penalty_seconds;
    if seconds == 0 || seconds > MAX_LEAVE_PENALTY_SECONDS {
        return Err(LobbyError::Configuration {
            message: format!(
                "leave penalty must be between 1 and {} seconds, got {}",
                MAX_LEAVE_PENALTY_SECONDS, seconds
            ),
        });
    }

    i64::try_from(seconds)
        .ok()
        .and_then(ChronoDuration::try_seconds)
        .ok_or_else(|| LobbyError::Configuration {
            message: format!("leave penalty of {} seconds is out of range", seconds),
        })
}

fn view_of(lobby: &LobbyInstance, draft: &DraftSession) -> DraftView {
    let names = draft.captains().clone().map(|id| {
        lobby
            .display_name_of(&id)
            .map(str::to_string)
            .unwrap_or_else(|| placeholder_name(&id))
    });
    draft.view(names)
}
