//! Configuration management for the draft-room coordinator
//!
//! This module handles configuration loading from environment variables and
//! TOML files, validation, and default values.

pub mod app;
pub mod lobby;

// Re-export commonly used types
pub use app::{validate_config, AppConfig, ModerationSettings, ServiceSettings};
pub use lobby::{LobbyConfig, DEFAULT_MAPS, MAX_LEAVE_PENALTY_SECONDS};
