//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the draft-room coordinator
//! using Prometheus metrics on a private registry.

use crate::ban::BanCategory;
use crate::types::RejectionReason;
use anyhow::Result;
use prometheus::{
    HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the coordinator
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Lobby membership metrics
    lobby_metrics: LobbyMetrics,

    /// Draft and match metrics
    draft_metrics: DraftMetrics,

    /// Bans and rejections
    moderation_metrics: ModerationMetrics,

    /// Timings and failures
    performance_metrics: PerformanceMetrics,
}

/// Lobby membership metrics
#[derive(Clone)]
pub struct LobbyMetrics {
    /// Total lobbies created
    pub lobbies_created_total: IntCounter,

    /// Lobbies currently occupying a slot
    pub active_lobbies: IntGauge,

    /// Total successful joins
    pub players_joined_total: IntCounter,

    /// Total leaves, split by whether a penalty was issued
    pub players_left_total: IntCounterVec,
}

/// Draft and match metrics
#[derive(Clone)]
pub struct DraftMetrics {
    /// Drafts opened on a full lobby
    pub drafts_started_total: IntCounter,

    /// Drafts thrown away before completion
    pub drafts_abandoned_total: IntCounter,

    /// Accepted map bans
    pub maps_banned_total: IntCounter,

    /// Matches persisted
    pub matches_created_total: IntCounter,
}

/// Ban and rejection metrics
#[derive(Clone)]
pub struct ModerationMetrics {
    /// Player bans issued by category
    pub bans_issued_total: IntCounterVec,

    /// Rejected requests by reason code
    pub actions_rejected_total: IntCounterVec,
}

/// Performance and reliability metrics
#[derive(Clone)]
pub struct PerformanceMetrics {
    /// Coordinator operation durations
    pub operation_duration: HistogramVec,

    /// Events the publisher failed to deliver
    pub notification_failures_total: IntCounter,

    /// Writes that failed after an in-memory transition committed
    pub persistence_failures_total: IntCounterVec,
}

impl MetricsCollector {
    /// Create a new metrics collector with its own registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let lobby_metrics = LobbyMetrics::new(&registry)?;
        let draft_metrics = DraftMetrics::new(&registry)?;
        let moderation_metrics = ModerationMetrics::new(&registry)?;
        let performance_metrics = PerformanceMetrics::new(&registry)?;

        Ok(Self {
            registry,
            lobby_metrics,
            draft_metrics,
            moderation_metrics,
            performance_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn lobby(&self) -> &LobbyMetrics {
        &self.lobby_metrics
    }

    pub fn draft(&self) -> &DraftMetrics {
        &self.draft_metrics
    }

    pub fn moderation(&self) -> &ModerationMetrics {
        &self.moderation_metrics
    }

    pub fn performance(&self) -> &PerformanceMetrics {
        &self.performance_metrics
    }

    /// Record a lobby being created
    pub fn record_lobby_created(&self) {
        self.lobby_metrics.lobbies_created_total.inc();
        self.lobby_metrics.active_lobbies.inc();
    }

    /// Record a lobby leaving its slot (emptied or finalized)
    pub fn record_lobby_closed(&self) {
        self.lobby_metrics.active_lobbies.dec();
    }

    pub fn record_player_joined(&self) {
        self.lobby_metrics.players_joined_total.inc();
    }

    pub fn record_player_left(&self, penalized: bool) {
        let label = if penalized { "yes" } else { "no" };
        self.lobby_metrics
            .players_left_total
            .with_label_values(&[label])
            .inc();
    }

    pub fn record_draft_started(&self) {
        self.draft_metrics.drafts_started_total.inc();
    }

    pub fn record_draft_abandoned(&self) {
        self.draft_metrics.drafts_abandoned_total.inc();
    }

    pub fn record_map_banned(&self) {
        self.draft_metrics.maps_banned_total.inc();
    }

    pub fn record_match_created(&self) {
        self.draft_metrics.matches_created_total.inc();
    }

    pub fn record_ban_issued(&self, category: BanCategory) {
        self.moderation_metrics
            .bans_issued_total
            .with_label_values(&[category.as_str()])
            .inc();
    }

    pub fn record_rejection(&self, reason: RejectionReason) {
        self.moderation_metrics
            .actions_rejected_total
            .with_label_values(&[reason.as_str()])
            .inc();
    }

    pub fn record_notification_failure(&self) {
        self.performance_metrics.notification_failures_total.inc();
    }

    /// Record a failed write; `operation` is "match" or "ban"
    pub fn record_persistence_failure(&self, operation: &str) {
        self.performance_metrics
            .persistence_failures_total
            .with_label_values(&[operation])
            .inc();
    }

    /// Record coordinator operation duration
    pub fn record_operation(&self, operation: &str, duration: Duration) {
        self.performance_metrics
            .operation_duration
            .with_label_values(&[operation])
            .observe(duration.as_secs_f64());
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl LobbyMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let lobbies_created_total =
            IntCounter::new("draft_room_lobbies_created_total", "Total lobbies created")?;
        registry.register(Box::new(lobbies_created_total.clone()))?;

        let active_lobbies =
            IntGauge::new("draft_room_active_lobbies", "Lobbies currently occupying a slot")?;
        registry.register(Box::new(active_lobbies.clone()))?;

        let players_joined_total =
            IntCounter::new("draft_room_players_joined_total", "Total lobby joins")?;
        registry.register(Box::new(players_joined_total.clone()))?;

        let players_left_total = IntCounterVec::new(
            Opts::new("draft_room_players_left_total", "Total lobby leaves"),
            &["penalized"],
        )?;
        registry.register(Box::new(players_left_total.clone()))?;

        Ok(Self {
            lobbies_created_total,
            active_lobbies,
            players_joined_total,
            players_left_total,
        })
    }
}

impl DraftMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let drafts_started_total =
            IntCounter::new("draft_room_drafts_started_total", "Map drafts started")?;
        registry.register(Box::new(drafts_started_total.clone()))?;

        let drafts_abandoned_total = IntCounter::new(
            "draft_room_drafts_abandoned_total",
            "Map drafts dropped before completion",
        )?;
        registry.register(Box::new(drafts_abandoned_total.clone()))?;

        let maps_banned_total =
            IntCounter::new("draft_room_maps_banned_total", "Accepted map bans")?;
        registry.register(Box::new(maps_banned_total.clone()))?;

        let matches_created_total =
            IntCounter::new("draft_room_matches_created_total", "Matches persisted")?;
        registry.register(Box::new(matches_created_total.clone()))?;

        Ok(Self {
            drafts_started_total,
            drafts_abandoned_total,
            maps_banned_total,
            matches_created_total,
        })
    }
}

impl ModerationMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let bans_issued_total = IntCounterVec::new(
            Opts::new("draft_room_bans_issued_total", "Player bans issued"),
            &["category"],
        )?;
        registry.register(Box::new(bans_issued_total.clone()))?;

        let actions_rejected_total = IntCounterVec::new(
            Opts::new("draft_room_actions_rejected_total", "Rejected requests"),
            &["reason"],
        )?;
        registry.register(Box::new(actions_rejected_total.clone()))?;

        Ok(Self {
            bans_issued_total,
            actions_rejected_total,
        })
    }
}

impl PerformanceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let operation_duration = HistogramVec::new(
            HistogramOpts::new(
                "draft_room_operation_duration_seconds",
                "Coordinator operation duration",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]),
            &["operation"],
        )?;
        registry.register(Box::new(operation_duration.clone()))?;

        let notification_failures_total = IntCounter::new(
            "draft_room_notification_failures_total",
            "Events that could not be delivered",
        )?;
        registry.register(Box::new(notification_failures_total.clone()))?;

        let persistence_failures_total = IntCounterVec::new(
            Opts::new(
                "draft_room_persistence_failures_total",
                "Writes that failed after the in-memory transition",
            ),
            &["operation"],
        )?;
        registry.register(Box::new(persistence_failures_total.clone()))?;

        Ok(Self {
            operation_duration,
            notification_failures_total,
            persistence_failures_total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collector_creation() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        // Every group registers without name clashes
        assert!(!collector.registry().gather().is_empty());
        assert_eq!(collector.draft().matches_created_total.get(), 0);
    }

    #[test]
    fn test_lobby_counters() {
        let collector = MetricsCollector::new().unwrap();

        collector.record_lobby_created();
        collector.record_lobby_created();
        collector.record_lobby_closed();
        collector.record_player_joined();
        collector.record_player_left(true);
        collector.record_player_left(false);
        collector.record_player_left(false);

        assert_eq!(collector.lobby().lobbies_created_total.get(), 2);
        assert_eq!(collector.lobby().active_lobbies.get(), 1);
        assert_eq!(
            collector
                .lobby()
                .players_left_total
                .with_label_values(&["no"])
                .get(),
            2
        );
    }

    #[test]
    fn test_labelled_counters() {
        let collector = MetricsCollector::new().unwrap();

        collector.record_ban_issued(BanCategory::AutomaticLeave);
        collector.record_rejection(RejectionReason::LobbyFull);
        collector.record_rejection(RejectionReason::LobbyFull);
        collector.record_persistence_failure("match");

        assert_eq!(
            collector
                .moderation()
                .bans_issued_total
                .with_label_values(&["automatic_leave"])
                .get(),
            1
        );
        assert_eq!(
            collector
                .moderation()
                .actions_rejected_total
                .with_label_values(&["lobby_full"])
                .get(),
            2
        );
    }

    #[test]
    fn test_metrics_timer() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");
        let timer = collector.start_timer();

        std::thread::sleep(Duration::from_millis(10));
        let duration = timer.elapsed();

        assert!(duration >= Duration::from_millis(10));

        let final_duration = timer.stop();
        assert!(final_duration >= Duration::from_millis(10));
        collector.record_operation("join", final_duration);
    }
}
