//! bandstand-server - song suggestions, voting and setlists for a band
//!
//! Resolves the root folder, opens (or creates) `bandstand.db` inside it and
//! serves the JSON API until interrupted.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use bandstand_common::config::{
    CompiledDefaults, RootFolderInitializer, RootFolderResolver, TomlConfig,
};
use bandstand_common::db::init_database;
use bandstand_server::search::YouTubeClient;
use bandstand_server::{build_router, AppState};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for bandstand-server
#[derive(Parser, Debug)]
#[command(name = "bandstand-server")]
#[command(about = "Song suggestion, voting and setlist service")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "BANDSTAND_PORT")]
    port: Option<u16>,

    /// Folder holding bandstand.db
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Config file (default: ~/.config/bandstand/config.toml, then /etc/bandstand/config.toml)
    #[arg(short, long, env = "BANDSTAND_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = TomlConfig::load_or_default(args.config.as_deref());

    // RUST_LOG wins over the config file level
    let default_filter = format!(
        "bandstand_server={level},bandstand_common={level},tower_http={level}",
        level = config.logging.level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Build identification first, before any database work
    info!(
        "Starting Bandstand server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = RootFolderResolver::new("bandstand-server")
        .with_cli_arg(args.root_folder)
        .with_config_file(args.config)
        .resolve();

    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to create root folder")?;

    let db_path = initializer.database_path();
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;
    info!("✓ Database ready");

    let mut state = AppState::new(pool);
    match &config.media_search {
        Some(search_config) => match YouTubeClient::new(search_config) {
            Ok(client) => {
                info!("Media search enabled ({})", search_config.base_url);
                state = state.with_media_search(Arc::new(client));
            }
            Err(e) => warn!("Media search disabled: {}", e),
        },
        None => info!("Media search not configured; /api/search will answer 503"),
    }

    let app = build_router(state);

    let defaults = CompiledDefaults::for_current_platform();
    let port = args.port.or(config.port).unwrap_or(defaults.port);
    let bind_address = config
        .bind_address
        .clone()
        .unwrap_or(defaults.bind_address);
    let addr: SocketAddr = format!("{}:{}", bind_address, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", bind_address, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("bandstand-server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
