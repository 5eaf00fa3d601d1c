//! Test fixtures shared by the integration suites

#![allow(dead_code)]

use draft_room::ban::BanRegistry;
use draft_room::config::LobbyConfig;
use draft_room::events::MockEventPublisher;
use draft_room::lobby::{BanMapOutcome, LobbyCoordinator};
use draft_room::matches::MatchPayload;
use draft_room::storage::InMemoryStore;
use draft_room::types::{PlayerProfile, SlotId};
use std::sync::Arc;

pub const TEST_MAPS: [&str; 5] = ["Breeze", "Dune", "Hanami", "Province", "Zone 7"];

/// A coordinator wired to in-memory collaborators
#[derive(Clone)]
pub struct TestSystem {
    pub coordinator: Arc<LobbyCoordinator>,
    pub store: Arc<InMemoryStore>,
    pub bans: Arc<BanRegistry>,
    pub events: Arc<MockEventPublisher>,
}

impl TestSystem {
    /// Capacity 4, three slots, five maps, 60 second leave penalty
    pub fn new() -> Self {
        Self::with_config(lobby_config(4, 3))
    }

    pub fn with_config(config: LobbyConfig) -> Self {
        Self::build(config, 7)
    }

    pub fn build(config: LobbyConfig, seed: u64) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let events = Arc::new(MockEventPublisher::new());
        let bans = Arc::new(BanRegistry::new(store.clone(), store.clone(), 10080));

        let coordinator = LobbyCoordinator::new(
            config,
            bans.clone(),
            store.clone(),
            store.clone(),
            events.clone(),
        )
        .expect("valid test configuration")
        .with_captain_seed(seed);

        Self {
            coordinator: Arc::new(coordinator),
            store,
            bans,
            events,
        }
    }

    /// Register profiles for `count` players named p1..pN and return their ids
    pub fn register_players(&self, count: usize) -> Vec<String> {
        self.register_range(1, count)
    }

    /// Register profiles for players p{from}..p{from + count - 1}
    pub fn register_range(&self, from: usize, count: usize) -> Vec<String> {
        (from..from + count)
            .map(|n| {
                let id = format!("p{}", n);
                let mut profile = PlayerProfile::new(id.clone(), format!("Player {}", n));
                profile.username = Some(format!("user{}", n));
                profile.game_id = Some(format!("GAME-{}", n));
                self.store
                    .register_player(profile)
                    .expect("profile registration");
                id
            })
            .collect()
    }

    /// Join every player into `slot` in order
    pub async fn fill(&self, slot: SlotId, players: &[String]) {
        for player in players {
            self.coordinator
                .request_join(player, slot, None)
                .await
                .expect("join should succeed");
        }
    }

    /// Let the current captain ban the first available map until the draft ends
    pub async fn run_draft(&self, slot: SlotId) -> MatchPayload {
        loop {
            let view = self
                .coordinator
                .draft_view(slot)
                .await
                .expect("slot is valid")
                .expect("draft is running");
            let captain = view.current_captain.clone().expect("captain to move");
            let map = view.available_maps[0].clone();

            match self
                .coordinator
                .request_ban_map(&captain, slot, &map)
                .await
                .expect("ban should be accepted")
            {
                BanMapOutcome::InProgress(_) => continue,
                BanMapOutcome::Completed(payload) => return payload,
            }
        }
    }
}

pub fn lobby_config(capacity: usize, slot_count: u32) -> LobbyConfig {
    LobbyConfig {
        capacity,
        slot_count,
        maps: TEST_MAPS.iter().map(|m| m.to_string()).collect(),
        leave_penalty_seconds: 60,
    }
}
