//! `henhoused`: the henhouse server binary.
//!
//! Usage:
//!   henhoused -c <context-name-or-path> [--listen <addr>]
//!
//! The context name resolves to `/etc/henhouse/<name>.toml`.
//! If a path with `/` or ending in `.toml` is given, it's used directly.

mod bootstrap;
mod config;
mod routes;

use std::sync::Arc;

use clap::Parser;
use henhouse_core::Module;
use tracing::info;

use config::ServerConfig;
use farm::payment::SandboxGateway;
use farm::FarmModule;

/// Henhouse server.
#[derive(Parser, Debug)]
#[command(name = "henhoused", about = "Henhouse farm-management server")]
struct Cli {
    /// Context name or path to config file.
    #[arg(short = 'c', long = "config", required = true)]
    config: String,

    /// Listen address.
    #[arg(long = "listen", default_value = "0.0.0.0:8080")]
    listen: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    // Load server configuration.
    let config_path = ServerConfig::resolve_path(&cli.config);
    info!("Loading configuration from {}", config_path.display());
    let server_config = ServerConfig::load(&config_path)?;

    bootstrap::verify_config(&server_config)?;

    // Initialize storage.
    let data_dir = std::path::PathBuf::from(&server_config.storage.data_dir);
    std::fs::create_dir_all(&data_dir)?;

    let core_config = henhouse_core::ServiceConfig {
        data_dir: Some(data_dir),
        sqlite_path: server_config.storage.sqlite_path.as_ref().map(std::path::PathBuf::from),
        listen: cli.listen.clone(),
    };
    let sqlite_path = core_config.resolve_sqlite_path();
    let sql: Arc<dyn henhouse_sql::SQLStore> = Arc::new(
        henhouse_sql::SqliteStore::open(&sqlite_path)
            .map_err(|e| anyhow::anyhow!("failed to open SQL store: {}", e))?,
    );
    info!("SQLite store at {}", sqlite_path.display());

    // Farm module.
    if server_config.billing.allow_simulation {
        tracing::warn!("payment simulation is enabled; do not use in production");
    }
    let gateway = Arc::new(SandboxGateway::new(server_config.billing.shortcode.clone()));
    let farm_module = FarmModule::new(sql, server_config.farm_config(), gateway)?;
    info!("{} module initialized", farm_module.name());

    // Background alert sweep.
    let sweep = farm::worker::start(
        Arc::clone(farm_module.service()),
        server_config.sweep_config(),
    );

    let app = routes::build_router(
        vec![farm_module.routes()],
        &server_config.cors.allowed_origins,
    );

    // Start server.
    let listener = tokio::net::TcpListener::bind(&core_config.listen).await?;
    info!("henhoused listening on {}", core_config.listen);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweep.cancel();
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
