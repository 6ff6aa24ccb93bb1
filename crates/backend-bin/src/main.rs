// ============================
// crates/backend-bin/src/main.rs
// ============================
//! Tokio / Axum entry-point for the Guardian auth server.
use anyhow::Context;
use clap::Parser;
use guardian_backend::{config::Settings, Backends, Guardian};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "guardian", version, about = "Multi-tenant authentication server")]
struct Cli {
    /// Configuration file (TOML); environment variables override it
    #[arg(short, long, env = "GUARDIAN_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load_from(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    init_tracing(settings.log_level.as_str(), cli.json_logs);

    let backends = Backends::flat_file(&settings.storage.path)
        .await
        .with_context(|| format!("opening data directory {}", settings.storage.path.display()))?;
    let addr = settings.server.bind_addr()?;

    let guardian = Guardian::build(settings, backends)?;
    let maintenance = guardian.spawn_maintenance();
    let app = guardian.router();

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    maintenance.shutdown().await;
    guardian.shutdown().await;
    info!("server stopped");
    Ok(())
}

fn init_tracing(default_level: &str, json: bool) {
    // RUST_LOG wins over the configured level.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
