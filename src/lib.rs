//! Draft Room - lobby coordinator for a matchmaking chat bot
//!
//! Players join one of a fixed set of lobby slots. A full lobby gets two
//! random captains who alternately ban maps until one is left; the match is
//! then persisted and every participant is notified through outbound events.

pub mod ban;
pub mod config;
pub mod draft;
pub mod error;
pub mod events;
pub mod lobby;
pub mod matches;
pub mod metrics;
pub mod service;
pub mod storage;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{LobbyError, Result};
pub use types::*;

// Re-export key components
pub use ban::BanRegistry;
pub use draft::MapDraftEngine;
pub use events::EventPublisher;
pub use lobby::{LobbyCoordinator, LobbyStore};
pub use matches::MatchFinalizer;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
