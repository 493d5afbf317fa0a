//! Argus HTTP Server Binary
//!
//! Loads `argus.toml`, seeds the user directory, starts the orchestration
//! folder monitor and serves the REST API.
//!
//! # Usage
//!
//! ```bash
//! ARGUS_CONFIG=/etc/argus.toml cargo run --bin argus-server
//! ```
//!
//! # Environment Variables
//!
//! - `ARGUS_CONFIG`: Path to the configuration file
//! - `HOST`: Server host (overrides `[server] host`)
//! - `PORT`: Server port (overrides `[server] port`)
//! - `RUST_LOG`: Log level (default: info)

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use argus_backend::config::AppConfig;
use argus_backend::db;
use argus_backend::http::{create_router, serve_with_monitor, AppState};
use argus_backend::services::{FsFolder, Observatory};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::INFO),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting Argus HTTP Server");

    let mut config = AppConfig::from_default_location().context("loading configuration")?;
    config.apply_env_overrides();
    config.check_paths()?;
    let config = Arc::new(config);
    info!(
        "Telescope '{}' at lat {:.4}, lon {:.4}; orchestration folder {}",
        config.telescope.name,
        config.telescope.latitude,
        config.telescope.longitude,
        config.orchestration.folder.display()
    );

    let repository = db::create_repository();
    let seeded = db::seed_users(repository.as_ref(), &config.users).await?;

    let folder = Arc::new(FsFolder::new(config.orchestration.folder.clone()));
    let observatory = Observatory::new(repository, folder, config.clone());
    observatory.telescope.reset();
    info!("Telescope state reset to idle");

    let monitor = observatory.monitor().spawn();

    let app = create_router(AppState::new(observatory, seeded));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    serve_with_monitor(listener, app, monitor).await?;

    Ok(())
}
