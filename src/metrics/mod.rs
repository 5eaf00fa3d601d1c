//! Metrics for the draft-room coordinator
//!
//! Prometheus counters, gauges and histograms for lobby, draft and
//! moderation activity.

pub mod collector;

pub use collector::{
    DraftMetrics, LobbyMetrics, MetricsCollector, MetricsTimer, ModerationMetrics,
    PerformanceMetrics,
};
