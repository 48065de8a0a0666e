mod config;
mod directory;
mod game;
mod net;
mod util;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, Level};

use crate::config::ServerConfig;
use crate::directory::players::PlayerDirectory;
use crate::directory::sessions::SessionDirectory;
use crate::game::waves::standard_roster;
use crate::net::dispatch::QueueDispatch;
use crate::net::handlers::Actions;
use crate::net::scheduler::Scheduler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    info!("Starblitz Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = ServerConfig::load_or_default();
    config.validate().map_err(anyhow::Error::msg)?;
    info!(
        "Configuration loaded: field {}x{}, tick every {}ms",
        config.field_width, config.field_height, config.process_interval_ms
    );
    let config = config.into_shared();

    // Shared state
    let players = Arc::new(PlayerDirectory::new());
    let sessions = Arc::new(SessionDirectory::new());
    let dispatch = Arc::new(QueueDispatch::new(Arc::clone(&players)));
    let waves = standard_roster();

    // Action handlers, wired for the transport layer to call into.
    let _actions = Arc::new(Actions::new(
        Arc::clone(&sessions),
        Arc::clone(&players),
        Arc::clone(&config),
        dispatch,
        waves,
    ));

    // The scheduler owns the simulation cadence on a blocking thread.
    let shutdown = Arc::new(AtomicBool::new(false));
    let scheduler = Scheduler::new(Arc::clone(&sessions), &config, Arc::clone(&shutdown));
    let scheduler_task = tokio::task::spawn_blocking(move || scheduler.run());

    info!("Server ready");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    shutdown.store(true, Ordering::Release);
    scheduler_task.await?;

    info!("Server stopped");
    Ok(())
}
