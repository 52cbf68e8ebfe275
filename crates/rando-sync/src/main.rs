//! `rando-sync`: local tracker hub plus remote match observers.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `rando-sync.yaml`
//! 3. Build the game state source and start the tracker hub
//! 4. Ask the game to reload so trackers get fresh values
//! 5. Seed and watch every configured match
//! 6. Run until Ctrl-C, then stop observers and the hub

mod config;
mod error;

use std::path::Path;
use std::sync::Arc;

use rando_observer::ObserverClient;
use rando_tracker::{GameStateSource, MemorySource, TrackerHub};
use rando_types::{GameId, UserId};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::SyncConfig;
use crate::error::SyncError;

const CONFIG_FILE: &str = "rando-sync.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration fails to load, the tracker port
/// cannot be bound, or the shutdown signal cannot be installed.
#[tokio::main]
async fn main() -> Result<(), SyncError> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("rando-sync starting");

    // 2. Load configuration.
    let config = load_config()?;
    info!(
        tracker_port = config.tracker.port,
        debug_routes = config.tracker.debug_routes,
        games = config.observer.games.len(),
        "Configuration loaded"
    );

    // 3. Start the tracker hub on an in-memory source.
    let source = Arc::new(MemorySource::new());
    let hub = Arc::new(TrackerHub::new(config.tracker.clone(), Arc::clone(&source))?);
    let running_log = log_running_transitions(&hub);
    let addr = hub.start().await?;
    let follow = hub.follow(source.subscribe());
    info!(%addr, "Trackers can connect");

    // 4. Trackers only see real values once the game re-sends its state.
    if !source.try_send("reload").await {
        warn!("Game not reachable, trackers show defaults until it reloads");
    }

    // 5. Watch configured matches.
    let observer = Arc::new(ObserverClient::new(config.observer.clone()));
    let match_log = log_match_updates(&observer);
    match config.observer.user_id.clone() {
        Some(user_id) => {
            for &game_id in &config.observer.games {
                watch_game(&observer, game_id, user_id.clone());
            }
        }
        None if !config.observer.games.is_empty() => {
            warn!(
                games = config.observer.games.len(),
                "No user_id configured, not watching any game"
            );
        }
        None => {}
    }

    // 6. Run until interrupted.
    tokio::signal::ctrl_c().await.map_err(SyncError::Signal)?;
    info!("Shutdown requested");

    observer.stop_all().await;
    hub.stop().await;
    follow.abort();
    match_log.abort();
    running_log.abort();

    info!("rando-sync stopped");
    Ok(())
}

/// Load configuration from `rando-sync.yaml`, or defaults if absent.
fn load_config() -> Result<SyncConfig, SyncError> {
    let config_path = Path::new(CONFIG_FILE);
    if config_path.exists() {
        Ok(SyncConfig::from_file(config_path)?)
    } else {
        info!("Config file not found, using defaults");
        let mut config = SyncConfig::default();
        config.apply_env_overrides();
        Ok(config)
    }
}

/// Seed a match over REST, then keep it synced over its observer socket.
fn watch_game(observer: &Arc<ObserverClient>, game_id: GameId, user_id: UserId) {
    let observer = Arc::clone(observer);
    tokio::spawn(async move {
        if let Err(e) = observer.refresh_match(game_id).await {
            warn!(%game_id, error = %e, "Could not seed match");
        }
        match observer.connect(game_id, &user_id).await {
            Ok(()) => info!(%game_id, "Watching match"),
            Err(e) => error!(%game_id, error = %e, "Could not watch match"),
        }
    });
}

fn log_match_updates(observer: &Arc<ObserverClient>) -> JoinHandle<()> {
    let mut updates = observer.subscribe();
    let observer = Arc::clone(observer);
    tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(game_id) => {
                    let Some(state) = observer.match_state(game_id).await else {
                        debug!(%game_id, "Match evicted");
                        continue;
                    };
                    info!(
                        %game_id,
                        teams = state.teams.len(),
                        has_board = state.bingo_board.is_some(),
                        bingo_teams = state.bingo_teams.len(),
                        "Match updated"
                    );
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Match updates lagged"),
                Err(RecvError::Closed) => return,
            }
        }
    })
}

fn log_running_transitions(hub: &TrackerHub<MemorySource>) -> JoinHandle<()> {
    let mut running = hub.subscribe_running();
    tokio::spawn(async move {
        while running.changed().await.is_ok() {
            let ready = *running.borrow_and_update();
            if ready {
                info!("Tracker hub ready");
            } else {
                warn!("Tracker hub not ready");
            }
        }
    })
}
