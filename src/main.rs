use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use gh_repo_dashboard::logging::{self, LogFormat};
use gh_repo_dashboard::{DashboardConfig, MemorySessionStore, router};
use tracing::info;

#[derive(Parser)]
#[command(name = "gh-repo-dashboard", about = "Sign in with GitHub and list your repositories")]
struct Cli {
    /// Address to bind.
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0")]
    bind: String,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    logging::init(&cli.log_level, format).context("failed to initialise logging")?;

    let config = DashboardConfig::from_env().context("invalid configuration")?;
    let callback_path = config.oauth().redirect_uri().path().to_string();
    let store = Arc::new(MemorySessionStore::new(config.session_ttl()));
    tokio::spawn(purge_sessions(store.clone()));
    let app = router(config, store);

    let addr: SocketAddr = format!("{}:{}", cli.bind, cli.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", cli.bind, cli.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(%addr, "Server running");
    info!(callback = %callback_path, "Routes: GET /, /login, /dashboard, /api/repos, POST /logout");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

/// Drops expired sessions every few minutes so abandoned ones don't pile up.
async fn purge_sessions(store: Arc<MemorySessionStore>) {
    let mut interval = tokio::time::interval(Duration::from_secs(300));
    loop {
        interval.tick().await;
        store.purge_expired();
    }
}
