use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dzpublish_core::{
    load_config, load_config_from_env, validate_config, Config, JobRunner, SourceRegistry,
    TileGenerator, UploadFanOut, VipsTileGenerator,
};
use dzpublish_server::{api::create_router, state::AppState};

/// Environment variable naming the config file.
const CONFIG_ENV: &str = "DZPUBLISH_CONFIG";

/// Default config file path.
const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let json = std::env::var("DZPUBLISH_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}

/// Loads the config file named by `DZPUBLISH_CONFIG`, or `config.toml` when
/// present, falling back to defaults plus environment.
fn load() -> Result<Config> {
    let explicit = std::env::var(CONFIG_ENV).ok().map(PathBuf::from);
    let config_path = explicit
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    if explicit.is_some() || config_path.exists() {
        info!("Loading configuration from {:?}", config_path);
        load_config(&config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))
    } else {
        info!("No config file found, using defaults and environment");
        load_config_from_env().context("Failed to load config from environment")
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    init_tracing();

    let config = load()?;
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Scratch root: {:?}", config.scratch.root);
    match config.upload.max_concurrent {
        Some(limit) => info!("Upload fan-out bounded to {} per job", limit),
        None => info!("Upload fan-out unbounded"),
    }

    // Storage providers
    let registry = Arc::new(SourceRegistry::with_builtin_sources());
    info!("Storage providers: {}", registry.providers().join(", "));

    // Tile generator
    let tiler = VipsTileGenerator::new(config.tiler.clone());
    if let Err(e) = tiler.validate().await {
        warn!("Tiling tool unavailable, jobs will fail until it is installed: {}", e);
    }

    // Job runner
    let runner = JobRunner::new(registry, Arc::new(tiler), config.scratch.root.clone())
        .with_fan_out(UploadFanOut::new(config.upload.clone()))
        .with_default_settings(config.storage.source_settings());

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), Arc::new(runner)));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Jobs already spawned are detached; they finish or die with the runtime.
    info!("Server shut down");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
