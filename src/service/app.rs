//! Application state and background task management
//!
//! `AppState` wires the configuration into the stores, the ban registry and
//! the coordinator, and owns the background tasks (the ban sweeper) for the
//! lifetime of the process.

use crate::ban::BanRegistry;
use crate::config::{validate_config, AppConfig};
use crate::events::ChannelEventPublisher;
use crate::lobby::{CoordinatorStats, LobbyCoordinator};
use crate::metrics::MetricsCollector;
use crate::storage::InMemoryStore;
use crate::types::LobbyEvent;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("Background task error: {message}")]
    BackgroundTask { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// Storage and identity collaborator
    store: Arc<InMemoryStore>,

    /// Player ban registry, shared with the coordinator
    bans: Arc<BanRegistry>,

    /// The lobby state machine
    coordinator: Arc<LobbyCoordinator>,

    /// Prometheus metrics
    metrics_collector: Arc<MetricsCollector>,

    /// Outbound events until the transport layer takes them
    events: Option<UnboundedReceiver<LobbyEvent>>,

    /// Background task handles
    background_tasks: Vec<JoinHandle<()>>,

    /// Service status
    is_running: Arc<RwLock<bool>>,
}

impl AppState {
    /// Initialize the application with all dependencies
    pub async fn new(config: AppConfig) -> Result<Self, ServiceError> {
        Self::with_captain_seed(config, None).await
    }

    /// Same as [`AppState::new`], optionally with reproducible captain draws
    pub async fn with_captain_seed(
        config: AppConfig,
        seed: Option<u64>,
    ) -> Result<Self, ServiceError> {
        validate_config(&config).map_err(|e| ServiceError::Configuration {
            message: e.to_string(),
        })?;

        info!(
            "Initializing {} - {} slots, capacity {}",
            config.service.name, config.lobby.slot_count, config.lobby.capacity
        );

        let metrics_collector =
            Arc::new(
                MetricsCollector::new().map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to create metrics collector: {}", e),
                })?,
            );

        let store = Arc::new(InMemoryStore::new());
        let bans = Arc::new(BanRegistry::new(
            store.clone(),
            store.clone(),
            config.moderation.moderator_max_ban_minutes,
        ));

        let (publisher, events) = ChannelEventPublisher::channel();

        let mut coordinator = LobbyCoordinator::new(
            config.lobby.clone(),
            bans.clone(),
            store.clone(),
            store.clone(),
            Arc::new(publisher),
        )
        .map_err(|e| ServiceError::Initialization {
            message: format!("Failed to create lobby coordinator: {}", e),
        })?
        .with_metrics(metrics_collector.clone());

        if let Some(seed) = seed {
            info!("Captain draws seeded with {}", seed);
            coordinator = coordinator.with_captain_seed(seed);
        }

        Ok(Self {
            config,
            store,
            bans,
            coordinator: Arc::new(coordinator),
            metrics_collector,
            events: Some(events),
            background_tasks: Vec::new(),
            is_running: Arc::new(RwLock::new(false)),
        })
    }

    /// Start background services
    pub async fn start(&mut self) -> Result<(), ServiceError> {
        if *self.is_running.read().await {
            return Err(ServiceError::BackgroundTask {
                message: "service already started".to_string(),
            });
        }

        *self.is_running.write().await = true;

        let sweeper = self
            .bans
            .clone()
            .start_sweeper(self.config.ban_sweep_interval());
        self.background_tasks.push(sweeper);

        info!("✅ {} started", self.config.service.name);
        Ok(())
    }

    /// Stop background tasks and report final statistics
    pub async fn shutdown(&mut self) -> Result<CoordinatorStats, ServiceError> {
        info!("Shutting down {}", self.config.service.name);
        *self.is_running.write().await = false;

        for handle in self.background_tasks.drain(..) {
            handle.abort();
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    warn!("Background task ended abnormally: {}", e);
                }
            }
        }

        let final_stats =
            self.coordinator
                .get_stats()
                .await
                .map_err(|e| ServiceError::BackgroundTask {
                    message: format!("Failed to get final stats: {}", e),
                })?;

        info!("Final coordinator statistics: {:?}", final_stats);
        Ok(final_stats)
    }

    /// Get service configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Check if service is running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    pub fn coordinator(&self) -> Arc<LobbyCoordinator> {
        self.coordinator.clone()
    }

    pub fn bans(&self) -> Arc<BanRegistry> {
        self.bans.clone()
    }

    /// The in-memory store, for registering profiles and inspecting records
    pub fn store(&self) -> Arc<InMemoryStore> {
        self.store.clone()
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics_collector.clone()
    }

    /// Hand the event stream to the transport layer. Only the first call gets it.
    pub fn take_events(&mut self) -> Option<UnboundedReceiver<LobbyEvent>> {
        self.events.take()
    }
}
