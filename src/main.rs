//! Avatar Fleet Operations Runtime
//!
//! Entry point for the fleet operations service: CLI args, config
//! resolution, and the HTTP server with graceful shutdown.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use avatarops::api::ApiService;
use avatarops::config::{self, ServiceConfig};
use avatarops::server::{router, AppState};
use avatarops::settings::ServerSettings;

const VERSION: &str = "0.1.0";

/// Avatar Fleet Operations Service
#[derive(Parser, Debug)]
#[command(
    name = "avatarops",
    version = VERSION,
    about = "Operations service for a fleet of automated avatar profiles"
)]
struct Cli {
    /// Start the HTTP service
    #[arg(long)]
    serve: bool,

    /// Show the resolved configuration (API keys redacted)
    #[arg(long)]
    status: bool,
}

// ---- Status Command ---------------------------------------------------------

/// Print the resolved upstream configuration without serving.
fn show_status() {
    let config = match ServiceConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    println!(
        r#"
=== AVATAROPS STATUS ===
Avatars:       {}
Operator:      {}
Orchestrator:  {}
Listen port:   {}
WEB1 data:     {}
Countries:     {}
Version:       {}
========================
"#,
        config.avatars_endpoint,
        config.operator_endpoint,
        config.orchestrator_endpoint,
        config::listen_port(),
        config::web1_data_path().unwrap_or_else(|| "(not configured)".to_string()),
        config::allowed_countries().join(","),
        VERSION,
    );
}

// ---- Serve ------------------------------------------------------------------

async fn serve() -> Result<()> {
    let config =
        ServiceConfig::from_env().context("Failed to resolve service configuration")?;

    let state = AppState::new(
        ApiService::new(&config),
        ServerSettings::default(),
        config::allowed_countries(),
        config::web1_data_path().map(PathBuf::from),
    );
    let app = router(state);

    let port = config::listen_port();
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;

    info!(port, local = config::is_local(), "avatarops v{} listening", VERSION);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("shut down cleanly");
    Ok(())
}

/// Resolve when the process receives SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to register SIGTERM handler");

        tokio::select! {
            _ = ctrl_c => {
                info!("received SIGINT, shutting down");
            }
            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.expect("Failed to register Ctrl+C handler");
        info!("received shutdown signal");
    }
}

// ---- Entry Point -----------------------------------------------------------

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.status {
        show_status();
        return;
    }

    if cli.serve {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .init();

        if let Err(e) = serve().await {
            eprintln!("Fatal: {:#}", e);
            std::process::exit(1);
        }
        return;
    }

    // Default: show help hints.
    println!("Run \"avatarops --help\" for usage information.");
    println!("Run \"avatarops --serve\" to start the service.");
}
