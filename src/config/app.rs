//! Main application configuration
//!
//! This module defines the primary configuration structures for the draft-room
//! coordinator, including environment variable and TOML loading and validation.

use crate::config::lobby::{LobbyConfig, MAX_LEAVE_PENALTY_SECONDS};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub lobby: LobbyConfig,
    pub moderation: ModerationSettings,
}

/// Service-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// How often the ban sweeper deactivates expired records
    pub ban_sweep_interval_seconds: u64,
}

/// Limits applied to moderator actions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationSettings {
    /// Longest ban a moderator may issue, in minutes
    pub moderator_max_ban_minutes: i64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "draft-room".to_string(),
            log_level: "info".to_string(),
            ban_sweep_interval_seconds: 60,
        }
    }
}

impl Default for ModerationSettings {
    fn default() -> Self {
        Self {
            moderator_max_ban_minutes: 10080, // 7 days
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file; missing keys keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_toml_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(raw)?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Overlay environment variables onto this configuration
    pub fn apply_env(&mut self) -> Result<()> {
        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            self.service.log_level = log_level;
        }
        if let Ok(interval) = env::var("BAN_SWEEP_INTERVAL_SECONDS") {
            self.service.ban_sweep_interval_seconds = interval
                .parse()
                .map_err(|_| anyhow!("Invalid BAN_SWEEP_INTERVAL_SECONDS value: {}", interval))?;
        }

        // Lobby settings
        if let Ok(capacity) = env::var("LOBBY_CAPACITY") {
            self.lobby.capacity = capacity
                .parse()
                .map_err(|_| anyhow!("Invalid LOBBY_CAPACITY value: {}", capacity))?;
        }
        if let Ok(count) = env::var("LOBBY_SLOT_COUNT") {
            self.lobby.slot_count = count
                .parse()
                .map_err(|_| anyhow!("Invalid LOBBY_SLOT_COUNT value: {}", count))?;
        }
        if let Ok(maps) = env::var("LOBBY_MAPS") {
            self.lobby.maps = maps.split(',').map(|m| m.trim().to_string()).collect();
        }
        if let Ok(penalty) = env::var("LEAVE_PENALTY_SECONDS") {
            self.lobby.leave_penalty_seconds = penalty
                .parse()
                .map_err(|_| anyhow!("Invalid LEAVE_PENALTY_SECONDS value: {}", penalty))?;
        }

        // Moderation settings
        if let Ok(minutes) = env::var("MODERATOR_MAX_BAN_MINUTES") {
            self.moderation.moderator_max_ban_minutes = minutes
                .parse()
                .map_err(|_| anyhow!("Invalid MODERATOR_MAX_BAN_MINUTES value: {}", minutes))?;
        }

        Ok(())
    }

    /// Get ban sweep interval as Duration
    pub fn ban_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.service.ban_sweep_interval_seconds)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.ban_sweep_interval_seconds == 0 {
        return Err(anyhow!("Ban sweep interval must be greater than 0"));
    }

    // Validate lobby layout
    if config.lobby.capacity < 2 {
        return Err(anyhow!("Lobby capacity must be at least 2"));
    }
    if config.lobby.slot_count == 0 {
        return Err(anyhow!("At least one lobby slot is required"));
    }
    if config.lobby.leave_penalty_seconds == 0
        || config.lobby.leave_penalty_seconds > MAX_LEAVE_PENALTY_SECONDS
    {
        return Err(anyhow!(
            "Leave penalty must be between 1 and {} seconds, got {}",
            MAX_LEAVE_PENALTY_SECONDS,
            config.lobby.leave_penalty_seconds
        ));
    }

    // Validate map pool
    if config.lobby.maps.len() < 2 {
        return Err(anyhow!("Map pool needs at least 2 maps"));
    }
    let mut seen = HashSet::new();
    for map in &config.lobby.maps {
        if map.trim().is_empty() {
            return Err(anyhow!("Map names cannot be empty"));
        }
        if !seen.insert(map.as_str()) {
            return Err(anyhow!("Duplicate map in pool: {}", map));
        }
    }

    if config.moderation.moderator_max_ban_minutes <= 0 {
        return Err(anyhow!("Moderator ban limit must be positive"));
    }

    Ok(())
}
