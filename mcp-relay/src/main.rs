//! mcp-relay entry point.
//!
//! Dispatches to one of three modes: the aggregating proxy, client-side
//! playback, or server-side playback. Exit code 0 on clean shutdown,
//! non-zero on startup failure.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;

use mcp_relay::cli::Cli;
use mcp_relay::record::{PlaybackClient, PlaybackServer, PlaybackSession, Recorder};
use mcp_relay::registry::Registry;
use mcp_relay::server::{UpstreamServer, SERVER_NAME};
use mcp_relay_core::config::load_config;

/// Where proxy-mode logs land when `--log` is not given. Stdout belongs to
/// the protocol, so file logging is not optional in proxy mode.
const DEFAULT_LOG_PATH: &str = "/tmp/mcp-relay.log";

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let code = run(cli).await;
    std::process::exit(code);
}

async fn run(cli: Cli) -> i32 {
    if let Some(file) = cli.playback_client {
        init_tracing_stderr();
        return run_playback_client(&file).await;
    }
    if let Some(file) = cli.playback_server {
        init_tracing_stderr();
        return run_playback_server(&file).await;
    }

    // Proxy mode; clap guarantees --config was given.
    let Some(config_path) = cli.config else {
        eprintln!("mcp-relay: --config is required with --proxy/--dynamic");
        return 1;
    };
    run_proxy(&config_path, cli.log, cli.record.as_deref()).await
}

// ─────────────────────────────────────────────────────────────────────────────
// Proxy mode
// ─────────────────────────────────────────────────────────────────────────────

async fn run_proxy(config_path: &Path, log: Option<PathBuf>, record: Option<&Path>) -> i32 {
    let log_path = log.unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_PATH));
    if let Err(e) = init_tracing_file(&log_path) {
        eprintln!("mcp-relay: failed to set up logging at {}: {e}", log_path.display());
        return 1;
    }

    tracing::info!(config = %config_path.display(), "loading configuration");
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            eprintln!("mcp-relay: {e}");
            return 1;
        }
    };
    tracing::info!(servers = config.servers.len(), "configuration loaded");

    let registry = Arc::new(Registry::new());

    // A statically configured server that fails to come up is logged and
    // skipped; the proxy serves whatever connected, possibly nothing.
    for server_config in config.servers {
        let name = server_config.name.clone();
        match registry.add_server(server_config).await {
            Ok(summary) => tracing::info!(server = %name, "{summary}"),
            Err(e) => {
                tracing::warn!(server = %name, error = %e, "skipping server, continuing startup");
            }
        }
    }

    let recorder = Arc::new(Recorder::disabled());
    if let Some(record_path) = record {
        let info = format!("{SERVER_NAME} v{}", env!("CARGO_PKG_VERSION"));
        if let Err(e) = recorder.enable(record_path, &info) {
            tracing::error!(error = %e, "failed to enable recording");
            eprintln!("mcp-relay: failed to enable recording: {e}");
            return 1;
        }
    }

    let server = UpstreamServer::new(registry, recorder);
    match server.serve().await {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!(error = %e, "upstream server loop failed");
            eprintln!("mcp-relay: {e}");
            1
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Playback modes
// ─────────────────────────────────────────────────────────────────────────────

async fn run_playback_client(file: &Path) -> i32 {
    let session = match PlaybackSession::parse_file(file) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("mcp-relay: failed to read recording {}: {e}", file.display());
            return 1;
        }
    };
    tracing::info!(messages = session.messages.len(), "loaded recorded session");

    match PlaybackClient::new(&session).run().await {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!(error = %e, "playback client failed");
            eprintln!("mcp-relay: {e}");
            1
        }
    }
}

async fn run_playback_server(file: &Path) -> i32 {
    let session = match PlaybackSession::parse_file(file) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("mcp-relay: failed to read recording {}: {e}", file.display());
            return 1;
        }
    };
    tracing::info!(messages = session.messages.len(), "loaded recorded session");

    match PlaybackServer::new(&session).run().await {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!(error = %e, "playback server failed");
            eprintln!("mcp-relay: {e}");
            1
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tracing init
// ─────────────────────────────────────────────────────────────────────────────

/// Playback modes log to stderr; stdout is the replayed dialog.
fn init_tracing_stderr() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

/// Proxy mode logs to a file, creating its parent directory if needed.
fn init_tracing_file(path: &Path) -> std::io::Result<()> {
    use tracing_subscriber::EnvFilter;

    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .init();

    tracing::info!("=== mcp-relay started ===");
    Ok(())
}
