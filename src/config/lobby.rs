//! Lobby configuration
//!
//! Slot count, seat capacity, the master map list and the leave penalty.
//! These are fixed for the lifetime of a coordinator.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Canonical map pool, in draft order
pub const DEFAULT_MAPS: [&str; 7] = [
    "Sandstone",
    "Breeze",
    "Dune",
    "Hanami",
    "Province",
    "Rust",
    "Zone 7",
];

/// Longest leave penalty accepted, one week
pub const MAX_LEAVE_PENALTY_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Lobby layout and draft settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LobbyConfig {
    /// Seats per lobby
    pub capacity: usize,
    /// Number of lobby slots, numbered from 1
    pub slot_count: u32,
    /// Master map list; order is the order shown to captains
    pub maps: Vec<String>,
    /// Ban applied to a player who leaves a full lobby, in
    /// `1..=MAX_LEAVE_PENALTY_SECONDS`
    pub leave_penalty_seconds: u64,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            slot_count: 4,
            maps: DEFAULT_MAPS.iter().map(|m| m.to_string()).collect(),
            leave_penalty_seconds: 60,
        }
    }
}

impl LobbyConfig {
    /// Leave penalty as Duration
    pub fn leave_penalty(&self) -> Duration {
        Duration::from_secs(self.leave_penalty_seconds)
    }

    /// Iterator over every configured slot number
    pub fn slots(&self) -> impl Iterator<Item = u32> {
        1..=self.slot_count
    }

    /// Check that a slot number is in range
    pub fn has_slot(&self, slot: u32) -> bool {
        slot >= 1 && slot <= self.slot_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LobbyConfig::default();
        assert_eq!(config.capacity, 10);
        assert_eq!(config.slot_count, 4);
        assert_eq!(config.maps.len(), 7);
        assert_eq!(config.maps[0], "Sandstone");
        assert_eq!(config.leave_penalty(), Duration::from_secs(60));
    }

    #[test]
    fn test_slot_range() {
        let config = LobbyConfig::default();
        assert!(!config.has_slot(0));
        assert!(config.has_slot(1));
        assert!(config.has_slot(4));
        assert!(!config.has_slot(5));
        assert_eq!(config.slots().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    }
}
