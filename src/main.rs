//! Command line entry point for the draft-room coordinator
//!
//! Loads and validates configuration, then plays one lobby through a full
//! cycle (fill, captain draft, match) and prints every outbound event as JSON.
//! Useful for checking a configuration and for watching the event stream the
//! chat transport would receive.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use draft_room::config::AppConfig;
use draft_room::lobby::{BanMapOutcome, JoinOutcome};
use draft_room::service::AppState;
use draft_room::types::{PlayerProfile, SlotId};
use draft_room::LobbyEvent;
use std::path::PathBuf;
use tracing::{info, warn};

/// Draft Room - lobby coordinator with captain map drafts
#[derive(Parser)]
#[command(
    name = "draft-room",
    version,
    about = "Lobby coordinator with captain map drafts",
    long_about = "Draft Room seats players into numbered lobby slots, picks two random captains \
                 when a lobby fills, runs the alternating map-ban draft and records the match. \
                 This binary runs one simulated lobby and prints the resulting events."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Lobby capacity override
    #[arg(long, value_name = "SEATS", help = "Override lobby capacity")]
    capacity: Option<usize>,

    /// Slot to simulate
    #[arg(long, value_name = "SLOT", default_value_t = 1, help = "Lobby slot to fill")]
    slot: SlotId,

    /// Seed for captain selection
    #[arg(long, value_name = "SEED", help = "Seed captain draws for a reproducible run")]
    seed: Option<u64>,

    /// Dry run mode (validate config and exit)
    #[arg(long, help = "Validate configuration and exit without simulating")]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Display startup banner with service information
fn display_startup_banner(config: &AppConfig) {
    info!("🚀 Draft Room");
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!(
        "   Slots: {} x {} seats",
        config.lobby.slot_count, config.lobby.capacity
    );
    info!("   Maps: {}", config.lobby.maps.join(", "));
    info!("   Leave penalty: {}s", config.lobby.leave_penalty_seconds);
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

/// Load and merge configuration from environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    // Apply CLI overrides
    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    if let Some(capacity) = args.capacity {
        config.lobby.capacity = capacity;
    }

    draft_room::config::validate_config(&config)?;
    Ok(config)
}

fn print_event(event: &LobbyEvent) -> Result<()> {
    let line = serde_json::to_string(event).context("Failed to serialize event")?;
    println!("{}", line);
    Ok(())
}

/// Fill the slot with generated players and play the draft to the end
async fn simulate(app: &AppState, slot: SlotId) -> Result<()> {
    let coordinator = app.coordinator();
    let store = app.store();
    let capacity = app.config().lobby.capacity;

    for n in 1..=capacity {
        let player_id = (1000 + n).to_string();
        let mut profile = PlayerProfile::new(player_id.clone(), format!("Player{}", n));
        profile.username = Some(format!("player{}", n));
        profile.game_id = Some(format!("G-{}", 1000 + n));
        store.register_player(profile)?;

        if let JoinOutcome::Joined {
            draft: Some(view), ..
        } = coordinator.request_join(&player_id, slot, None).await?
        {
            info!(
                "Lobby {} full, captains: {} and {}",
                slot, view.captain_names[0], view.captain_names[1]
            );
        }
    }

    loop {
        let view = coordinator
            .draft_view(slot)
            .await?
            .ok_or_else(|| anyhow!("Lobby {} has no draft running", slot))?;
        let captain = view
            .current_captain
            .clone()
            .ok_or_else(|| anyhow!("Draft in lobby {} has no captain to move", slot))?;
        let map = view
            .available_maps
            .last()
            .cloned()
            .ok_or_else(|| anyhow!("Draft in lobby {} has no maps left", slot))?;

        match coordinator.request_ban_map(&captain, slot, &map).await? {
            BanMapOutcome::InProgress(_) => continue,
            BanMapOutcome::Completed(payload) => {
                info!(
                    "Match {} on {} ({} players)",
                    payload.match_id(),
                    payload.map(),
                    payload.participants().count()
                );
                return Ok(());
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration (CLI args can override environment/config file)
    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {:#}", e);
        std::process::exit(1);
    });

    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    display_startup_banner(&config);

    if args.dry_run {
        info!("Configuration validation successful");
        info!("Dry run completed - exiting without simulating");
        return Ok(());
    }

    if !config.lobby.has_slot(args.slot) {
        return Err(anyhow!(
            "Slot {} is outside 1..={}",
            args.slot,
            config.lobby.slot_count
        ));
    }

    let mut app = AppState::with_captain_seed(config, args.seed).await?;
    let mut events = app
        .take_events()
        .ok_or_else(|| anyhow!("Event stream already taken"))?;
    app.start().await?;

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if let Err(e) = print_event(&event) {
                warn!("{}", e);
            }
        }
    });

    let outcome = simulate(&app, args.slot).await;

    let stats = app.shutdown().await?;
    drop(app);
    if let Err(e) = printer.await {
        warn!("Event printer ended abnormally: {}", e);
    }

    outcome?;
    println!(
        "{}",
        serde_json::to_string_pretty(&stats).context("Failed to serialize statistics")?
    );
    info!("🛑 Draft Room simulation finished");
    Ok(())
}
