//! experiencia-api - REST service for experiencias
//!
//! Startup order: config, logging, root folder, primary database, search
//! index, optional reindex, then serve until Ctrl-C.

use anyhow::Result;
use clap::Parser;
use experiencia_api::db::ExperienciaStore;
use experiencia_api::search::SqliteSearchIndex;
use experiencia_api::{build_router, AppState};
use experiencia_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};
use experiencia_common::db::init_database;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "experiencia-api")]
#[command(about = "REST service for experiencias with a search index mirror")]
#[command(version)]
struct Args {
    /// HTTP port (overrides the config file)
    #[arg(short, long, env = "EXPERIENCIA_PORT")]
    port: Option<u16>,

    /// Root folder holding the database files
    #[arg(long)]
    root_folder: Option<PathBuf>,

    /// Path to a TOML config file
    #[arg(short, long, env = "EXPERIENCIA_CONFIG")]
    config: Option<PathBuf>,

    /// Rebuild the search index from the primary store before serving
    #[arg(long)]
    reindex: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let (config, config_source) = TomlConfig::load_with_source(args.config.as_deref());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting experiencia-api v{}", env!("CARGO_PKG_VERSION"));
    config_source.log();

    let root_folder = RootFolderResolver::new()
        .with_cli_arg(args.root_folder)
        .with_config(&config)
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder).with_config(&config);
    initializer.ensure_directory_exists()?;

    let db_path = initializer.database_path();
    info!("Database path: {}", db_path.display());
    let pool = match init_database(&db_path).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    let index_path = initializer.search_index_path();
    info!("Search index path: {}", index_path.display());
    let index = Arc::new(SqliteSearchIndex::open(&index_path).await?);

    let state = AppState::new(ExperienciaStore::new(pool), index, config.application_name.clone());

    if args.reindex {
        let written = state.service.reindex().await?;
        info!("Reindexed {} experiencias", written);
    }

    let app = build_router(state);

    let port = args.port.unwrap_or(config.port);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("experiencia-api listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("experiencia-api stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
