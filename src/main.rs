//! Access-logging HTTP server.
//!
//! ```text
//!     Client ──▶ api listener ──▶ trace ──▶ access log ──▶ timeout ──▶ /ping, /whoami
//!                                              │
//!     Operator ──▶ admin listener ──▶ auth ────┤──▶ /access_log/*, /admin/status
//!                                              ▼
//!                                     AccessLogger ──▶ sink (stdout | stderr | file)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use access_logger::admin::setup_admin_router;
use access_logger::config::{load_config, ConfigWatcher, ServerConfig};
use access_logger::lifecycle::{build_logger, follow_reloads, signals, Shutdown};
use access_logger::observability::{init_logging, metrics};
use access_logger::HttpServer;

#[derive(Parser)]
#[command(name = "access-logger", version)]
#[command(about = "HTTP server with runtime-configurable access logging", long_about = None)]
struct Args {
    /// TOML configuration file; built-in defaults when absent.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };

    init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "access-logger starting");

    tracing::info!(
        api_address = %config.api.bind_address,
        admin_enabled = config.admin.enabled,
        request_timeout_secs = config.api.request_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let logger = build_logger(&config.access_log)?;

    // Keep the watcher alive for the whole run.
    let _watcher = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            tokio::spawn(follow_reloads(
                logger.clone(),
                config.access_log.clone(),
                updates,
            ));
            Some(watcher.run()?)
        }
        None => None,
    };

    let shutdown = Shutdown::new();
    let mut servers = tokio::task::JoinSet::new();

    let listener = TcpListener::bind(&config.api.bind_address).await?;
    let api = HttpServer::api(&config.api, logger.clone());
    servers.spawn(api.run(listener, shutdown.subscribe()));

    if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        let admin = HttpServer::new(
            "admin",
            setup_admin_router(logger.clone(), &config.admin.api_key),
        );
        servers.spawn(admin.run(listener, shutdown.subscribe()));
    }

    tokio::select! {
        _ = signals::wait_for_termination() => {}
        Some(result) = servers.join_next() => {
            tracing::error!(result = ?result, "Server exited unexpectedly");
        }
    }

    shutdown.trigger();
    while let Some(result) = servers.join_next().await {
        if let Ok(Err(e)) = result {
            tracing::error!(error = %e, "Server stopped with error");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
