//! Concurrency tests for the lobby coordinator
//!
//! Many requests race on a multi-thread runtime; afterwards the seat lists
//! and the player index must still agree.

mod fixtures;

use draft_room::error::LobbyError;
use draft_room::lobby::{JoinOutcome, LobbyStatus};
use futures::future::join_all;
use std::collections::HashSet;
use std::time::{Duration, Instant};

use fixtures::{lobby_config, TestSystem};

/// Every seated player appears in exactly one lobby, and the index agrees
async fn assert_consistent(system: &TestSystem, slots: u32) {
    let mut seen = HashSet::new();
    let mut seated = 0;

    for slot in 1..=slots {
        if let Some(lobby) = system.coordinator.lobby_snapshot(slot).await.unwrap() {
            assert!(lobby.seat_count() <= lobby.capacity());
            for id in lobby.player_ids() {
                assert!(seen.insert(id.clone()), "{} seated twice", id);
                assert_eq!(system.coordinator.find_lobby_of(&id).unwrap(), Some(slot));
                seated += 1;
            }
        }
    }

    let stats = system.coordinator.get_stats().await.unwrap();
    assert_eq!(stats.players_seated, seated);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_joins_never_overfill() {
    let system = TestSystem::with_config(lobby_config(10, 1));
    let players = system.register_players(25);

    let tasks = players.iter().cloned().map(|player| {
        let coordinator = system.coordinator.clone();
        tokio::spawn(async move { coordinator.request_join(&player, 1, None).await })
    });
    let results = join_all(tasks).await;

    let mut joined = 0;
    let mut drafts_started = 0;
    for result in results {
        match result.unwrap() {
            Ok(JoinOutcome::Joined { draft, .. }) => {
                joined += 1;
                if draft.is_some() {
                    drafts_started += 1;
                }
            }
            Ok(other) => panic!("unexpected outcome {:?}", other),
            Err(e) => assert_eq!(e, LobbyError::LobbyFull { slot: 1 }),
        }
    }

    // Exactly one join filled the last seat
    assert_eq!(joined, 10);
    assert_eq!(drafts_started, 1);

    let lobby = system.coordinator.lobby_snapshot(1).await.unwrap().unwrap();
    assert_eq!(lobby.seat_count(), 10);
    assert_eq!(lobby.status(), LobbyStatus::Drafting);
    assert_consistent(&system, 1).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_player_racing_across_slots() {
    let system = TestSystem::with_config(lobby_config(4, 3));
    system.register_players(1);

    let tasks = (0..12u32).map(|i| i % 3 + 1).map(|slot| {
        let coordinator = system.coordinator.clone();
        tokio::spawn(async move { coordinator.request_join("p1", slot, None).await })
    });

    for result in join_all(tasks).await {
        match result.unwrap() {
            Ok(_) => {}
            Err(LobbyError::AlreadyMember { .. }) | Err(LobbyError::NotMember { .. }) => {}
            Err(e) => panic!("unexpected error {:?}", e),
        }
    }

    // Wherever p1 ended up, it is in at most one lobby
    assert_consistent(&system, 3).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_independent_slots_fill_in_parallel() {
    let system = TestSystem::with_config(lobby_config(4, 3));
    let players = system.register_players(12);

    let start = Instant::now();
    let tasks = players.iter().cloned().enumerate().map(|(i, player)| {
        let coordinator = system.coordinator.clone();
        let slot = (i % 3) as u32 + 1;
        tokio::spawn(async move { coordinator.request_join(&player, slot, None).await })
    });

    for result in join_all(tasks).await {
        assert!(result.unwrap().is_ok());
    }
    assert!(start.elapsed() < Duration::from_secs(5));

    for slot in 1..=3 {
        let view = system.coordinator.draft_view(slot).await.unwrap();
        assert!(view.is_some(), "slot {} should be drafting", slot);
    }
    assert_consistent(&system, 3).await;

    let stats = system.coordinator.get_stats().await.unwrap();
    assert_eq!(stats.drafts_started, 3);
    assert_eq!(stats.active_lobbies, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_drafts_complete_independently() {
    let system = TestSystem::with_config(lobby_config(2, 3));
    let players = system.register_players(6);

    for (i, pair) in players.chunks(2).enumerate() {
        system.fill(i as u32 + 1, pair).await;
    }

    let tasks = (1..=3u32).map(|slot| {
        let system = system.clone();
        tokio::spawn(async move { system.run_draft(slot).await })
    });

    let payloads: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    let ids: HashSet<_> = payloads.iter().map(|p| p.match_id()).collect();
    assert_eq!(ids.len(), 3);
    assert_eq!(system.store.matches().unwrap().len(), 3);
    assert_consistent(&system, 3).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_churn_keeps_index_consistent() {
    let system = TestSystem::with_config(lobby_config(6, 3));
    let players = system.register_players(12);

    let tasks = players.iter().cloned().enumerate().map(|(i, player)| {
        let coordinator = system.coordinator.clone();
        tokio::spawn(async move {
            for round in 0..5u32 {
                let slot = ((i as u32 + round) % 3) + 1;
                let _ = coordinator.request_join(&player, slot, None).await;
                if round % 2 == 1 {
                    let _ = coordinator.request_leave(&player).await;
                }
            }
        })
    });

    for result in join_all(tasks).await {
        result.unwrap();
    }

    assert_consistent(&system, 3).await;
}
