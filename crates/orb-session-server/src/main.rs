//! orb-session-server: local endpoint that mints ephemeral realtime
//! credentials.
//!
//! Browsers and native clients POST to `/api/session` with no body. The
//! server forwards the configured model, voice, instructions and tool
//! manifest upstream using the long-lived API key, and returns the
//! upstream session JSON unchanged. The key never leaves this process.

mod mint;
mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use orb_common::OrbError;
use orb_config::OrbConfig;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::mint::{MintSettings, SessionMinter};

#[derive(Parser)]
#[command(name = "orb-session-server", about = "Ephemeral credential endpoint for orb voice sessions")]
struct Args {
    /// Port to listen on (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Config file path (defaults to the platform config dir).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log directive, e.g. `orb=debug` (overrides config).
    #[arg(long)]
    log_level: Option<String>,
}

/// Load `KEY=value` lines from a `.env` in the working directory without
/// overriding variables already set.
fn load_dotenv() {
    let Ok(contents) = std::fs::read_to_string(".env") else {
        return;
    };
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            let value = value.trim().trim_matches('"').trim_matches('\'');
            if std::env::var(key).is_err() {
                std::env::set_var(key, value);
            }
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<OrbConfig, OrbError> {
    let config = match path {
        Some(path) => orb_config::toml_loader::load_from_path(path)?,
        None => orb_config::toml_loader::load_default()?,
    };
    orb_config::validation::validate(&config)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), OrbError> {
    load_dotenv();
    let args = Args::parse();

    let loaded = load_config(args.config.as_ref());

    let log_directive = args.log_level.clone().unwrap_or_else(|| match &loaded {
        Ok(config) => format!("orb={}", config.logging.level.as_directive()),
        Err(_) => "orb=info".to_string(),
    });
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::try_new(&log_directive).unwrap_or_else(|_| EnvFilter::new("orb=info"))
            }),
        )
        .init();

    tracing::info!("orb-session-server v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = loaded.unwrap_or_else(|e| {
        tracing::warn!("Config load failed, using defaults: {e}");
        OrbConfig::default()
    });

    let minter = SessionMinter::from_env(MintSettings::from_config(&config));
    let port = args.port.unwrap_or(config.server.port);
    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!(
        model = %config.session.model,
        voice = %config.session.voice,
        tools = config.session.tools.len(),
        "orb-session-server listening on {addr}"
    );

    axum::serve(listener, routes::router(Arc::new(minter))).await?;
    Ok(())
}
