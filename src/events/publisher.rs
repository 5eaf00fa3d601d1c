//! Outbound event publishing
//!
//! The coordinator hands immutable event snapshots to an [`EventPublisher`].
//! Delivery is fire-and-forget from the coordinator's point of view: a failed
//! publish is logged and counted but never changes an operation's result.

use crate::error::{LobbyError, Result};
use crate::types::*;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::debug;

/// Trait for publishing lobby events to the transport layer
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a RosterUpdated event
    async fn publish_roster_updated(&self, event: RosterUpdated) -> Result<()>;

    /// Publish a DraftStateChanged event
    async fn publish_draft_state_changed(&self, event: DraftStateChanged) -> Result<()>;

    /// Publish a MatchCreated event
    async fn publish_match_created(&self, event: MatchCreated) -> Result<()>;

    /// Publish an ActionRejected event
    async fn publish_action_rejected(&self, event: ActionRejected) -> Result<()>;

    /// Publish a PlayerNotice event
    async fn publish_player_notice(&self, event: PlayerNotice) -> Result<()>;
}

/// Publisher that forwards every event into a tokio channel
#[derive(Debug, Clone)]
pub struct ChannelEventPublisher {
    sender: UnboundedSender<LobbyEvent>,
}

impl ChannelEventPublisher {
    /// Create a publisher and the receiving end the transport layer drains
    pub fn channel() -> (Self, UnboundedReceiver<LobbyEvent>) {
        let (sender, receiver) = unbounded_channel();
        (Self { sender }, receiver)
    }

    fn send(&self, event: LobbyEvent) -> Result<()> {
        let kind = event.kind();
        self.sender.send(event).map_err(|_| LobbyError::Internal {
            message: format!("Event channel closed, dropped {}", kind),
        })?;
        debug!("Queued {} event", kind);
        Ok(())
    }
}

#[async_trait]
impl EventPublisher for ChannelEventPublisher {
    async fn publish_roster_updated(&self, event: RosterUpdated) -> Result<()> {
        self.send(LobbyEvent::RosterUpdated(event))
    }

    async fn publish_draft_state_changed(&self, event: DraftStateChanged) -> Result<()> {
        self.send(LobbyEvent::DraftStateChanged(event))
    }

    async fn publish_match_created(&self, event: MatchCreated) -> Result<()> {
        self.send(LobbyEvent::MatchCreated(event))
    }

    async fn publish_action_rejected(&self, event: ActionRejected) -> Result<()> {
        self.send(LobbyEvent::ActionRejected(event))
    }

    async fn publish_player_notice(&self, event: PlayerNotice) -> Result<()> {
        self.send(LobbyEvent::PlayerNotice(event))
    }
}

/// Mock event publisher for testing
#[derive(Debug, Default)]
pub struct MockEventPublisher {
    published_events: std::sync::Mutex<Vec<LobbyEvent>>,
    failing: AtomicBool,
}

impl MockEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every publish fail (events are still not recorded)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Get all published event types (for testing)
    pub fn get_published_events(&self) -> Vec<String> {
        self.events()
            .iter()
            .map(|event| event.kind().to_string())
            .collect()
    }

    /// Get all published events (for testing)
    pub fn events(&self) -> Vec<LobbyEvent> {
        self.published_events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Count published events of one kind
    pub fn count_events_of_type(&self, kind: &str) -> usize {
        self.events().iter().filter(|e| e.kind() == kind).count()
    }

    /// Clear published events (for testing)
    pub fn clear_events(&self) {
        if let Ok(mut events) = self.published_events.lock() {
            events.clear();
        }
    }

    fn record(&self, event: LobbyEvent) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(LobbyError::Internal {
                message: format!("Mock publisher refused {}", event.kind()),
            });
        }
        if let Ok(mut events) = self.published_events.lock() {
            events.push(event);
        }
        Ok(())
    }
}

#[async_trait]
impl EventPublisher for MockEventPublisher {
    async fn publish_roster_updated(&self, event: RosterUpdated) -> Result<()> {
        self.record(LobbyEvent::RosterUpdated(event))
    }

    async fn publish_draft_state_changed(&self, event: DraftStateChanged) -> Result<()> {
        self.record(LobbyEvent::DraftStateChanged(event))
    }

    async fn publish_match_created(&self, event: MatchCreated) -> Result<()> {
        self.record(LobbyEvent::MatchCreated(event))
    }

    async fn publish_action_rejected(&self, event: ActionRejected) -> Result<()> {
        self.record(LobbyEvent::ActionRejected(event))
    }

    async fn publish_player_notice(&self, event: PlayerNotice) -> Result<()> {
        self.record(LobbyEvent::PlayerNotice(event))
    }
}
