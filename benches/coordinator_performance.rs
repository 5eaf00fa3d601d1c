//! Performance benchmarks for the lobby coordinator

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use draft_room::ban::BanRegistry;
use draft_room::config::LobbyConfig;
use draft_room::draft::MapDraftEngine;
use draft_room::error::Result;
use draft_room::lobby::{BanMapOutcome, LobbyCoordinator};
use draft_room::storage::InMemoryStore;
use draft_room::types::*;
use std::sync::Arc;

// Event publisher that drops everything
#[derive(Debug, Clone)]
struct BenchEventPublisher;

#[async_trait::async_trait]
impl draft_room::events::EventPublisher for BenchEventPublisher {
    async fn publish_roster_updated(&self, _event: RosterUpdated) -> Result<()> {
        Ok(())
    }

    async fn publish_draft_state_changed(&self, _event: DraftStateChanged) -> Result<()> {
        Ok(())
    }

    async fn publish_match_created(&self, _event: MatchCreated) -> Result<()> {
        Ok(())
    }

    async fn publish_action_rejected(&self, _event: ActionRejected) -> Result<()> {
        Ok(())
    }

    async fn publish_player_notice(&self, _event: PlayerNotice) -> Result<()> {
        Ok(())
    }
}

fn create_bench_system(config: LobbyConfig) -> LobbyCoordinator {
    let store = Arc::new(InMemoryStore::new());
    let bans = Arc::new(BanRegistry::new(store.clone(), store.clone(), 10080));

    LobbyCoordinator::new(
        config,
        bans,
        store.clone(),
        store,
        Arc::new(BenchEventPublisher),
    )
    .unwrap()
    .with_captain_seed(42)
}

fn bench_single_join(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("single_join", |b| {
        b.iter(|| {
            rt.block_on(async {
                let coordinator = create_bench_system(LobbyConfig::default());
                black_box(coordinator.request_join("bench_player", 1, Some("Bench")).await)
            })
        })
    });
}

fn bench_fill_and_draft(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("fill_and_draft", |b| {
        b.iter(|| {
            rt.block_on(async {
                let coordinator = create_bench_system(LobbyConfig::default());

                for i in 0..coordinator.config().capacity {
                    let player = format!("player_{}", i);
                    let _ = coordinator.request_join(&player, 1, Some(&player)).await;
                }

                loop {
                    let Ok(Some(view)) = coordinator.draft_view(1).await else {
                        break;
                    };
                    let (Some(captain), Some(map)) =
                        (view.current_captain, view.available_maps.first())
                    else {
                        break;
                    };
                    match coordinator.request_ban_map(&captain, 1, map).await {
                        Ok(BanMapOutcome::InProgress(_)) => continue,
                        other => {
                            black_box(other.is_ok());
                            break;
                        }
                    }
                }
            })
        })
    });
}

fn bench_draft_engine(c: &mut Criterion) {
    let engine = MapDraftEngine::new(LobbyConfig::default().maps).unwrap();
    let captains = ["a".to_string(), "b".to_string()];

    c.bench_function("draft_engine_full_draft", |b| {
        b.iter(|| {
            let mut session = engine.start(1, captains.clone());
            let mut turn = 0;
            while !session.is_complete() {
                let map = session.available()[0].clone();
                let _ = engine.ban_map(&mut session, &captains[turn % 2], &map);
                turn += 1;
            }
            black_box(session.final_map().map(str::to_string))
        })
    });
}

fn bench_overview(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let coordinator = create_bench_system(LobbyConfig::default());

    rt.block_on(async {
        for i in 0..20 {
            let player = format!("player_{}", i);
            let slot = (i % 4) as u32 + 1;
            let _ = coordinator.request_join(&player, slot, Some(&player)).await;
        }
    });

    c.bench_function("lobby_overview", |b| {
        b.iter(|| rt.block_on(async { black_box(coordinator.overview().await) }))
    });
}

criterion_group!(
    benches,
    bench_single_join,
    bench_fill_and_draft,
    bench_draft_engine,
    bench_overview
);
criterion_main!(benches);
