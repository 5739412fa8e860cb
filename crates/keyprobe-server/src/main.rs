//! Keyprobe Server - credential verification service
//!
//! This binary runs the HTTP service with:
//! - Batch verification with progress polling
//! - Two-hour stress tests per credential
//! - Announcement banner and optional static UI

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use keyprobe_core::config::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use keyprobe_core::session::SWEEP_INTERVAL;
use keyprobe_core::{HttpProber, ProbeConfig, ServerConfig};
use keyprobe_server::{server, AppState};

#[derive(Parser)]
#[command(name = "keyprobe-server")]
#[command(about = "Verify API credentials against OpenAI-compatible endpoints")]
struct Args {
    /// Host to bind
    #[arg(long, env = "KEYPROBE_HOST", default_value = "0.0.0.0")]
    host: String,

    /// HTTP port
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Endpoint used when a request omits one
    #[arg(long, env = "KEYPROBE_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    default_endpoint: String,

    /// Model used when a request omits one
    #[arg(long, env = "KEYPROBE_MODEL", default_value = DEFAULT_MODEL)]
    default_model: String,

    /// Timeout of a single probe (e.g. "10s", "1m")
    #[arg(long, env = "KEYPROBE_PROBE_TIMEOUT", default_value = "10s", value_parser = humantime::parse_duration)]
    probe_timeout: Duration,

    /// Text file shown as the announcement banner
    #[arg(long, env = "KEYPROBE_ANNOUNCEMENT", default_value = "announcement.txt")]
    announcement_file: PathBuf,

    /// Directory with the static UI
    #[arg(long, env = "KEYPROBE_STATIC_DIR")]
    static_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let probe_config = ProbeConfig {
        timeout: args.probe_timeout,
        ..ProbeConfig::default()
    };
    let config = ServerConfig {
        host: args.host,
        port: args.port,
        default_endpoint: args.default_endpoint,
        default_model: args.default_model,
        announcement_file: args.announcement_file,
        static_dir: args.static_dir,
    };

    if let Some(dir) = &config.static_dir {
        if !dir.is_dir() {
            warn!("Static directory {} does not exist", dir.display());
        }
    }

    let prober = Arc::new(HttpProber::new(probe_config)?);
    let state = Arc::new(AppState::new(prober, config.clone()));
    state.sessions.clone().spawn_sweeper(SWEEP_INTERVAL);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    let local_addr = listener.local_addr()?;

    info!("═══════════════════════════════════════════════════════════");
    info!("  Keyprobe server listening on http://{}", local_addr);
    info!("  Default target: {} ({})", config.default_endpoint, config.default_model);
    info!("  Probe timeout: {}", humantime::format_duration(args.probe_timeout));
    match &config.static_dir {
        Some(dir) => info!("  Static UI: {}", dir.display()),
        None => info!("  Static UI: disabled"),
    }
    info!("═══════════════════════════════════════════════════════════");

    let app = server::create_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
