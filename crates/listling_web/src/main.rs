//! Listling web boundary server.
//!
//! Serves the JSON API consumed by the companion web view. Every request must
//! carry a signed init-data header; the bot token used for verification is
//! read from the environment, never from the command line.
//!
//! Usage:
//!   LISTLING_BOT_TOKEN=... listling-web --db listling.db --port 8080

use anyhow::{Context, Result};
use clap::Parser;
use listling_core::db::open_db;
use listling_core::{default_log_level, init_logging};
use listling_web::{build_router, AppState};
use log::info;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

const BOT_TOKEN_ENV: &str = "LISTLING_BOT_TOKEN";

#[derive(Parser, Debug)]
#[command(name = "listling-web")]
#[command(about = "Listling web API server")]
struct Args {
    /// Address to bind the HTTP listener on
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    bind: IpAddr,

    /// HTTP port
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Path to the SQLite database file
    #[arg(long, default_value = "listling.db")]
    db: PathBuf,

    /// Log level (trace|debug|info|warn|error)
    #[arg(long)]
    log_level: Option<String>,

    /// Absolute directory for rolling log files
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_dir = args
        .log_dir
        .unwrap_or_else(|| std::env::temp_dir().join("listling-logs"));
    let log_dir = log_dir
        .to_str()
        .context("log directory must be valid UTF-8")?
        .to_string();
    let log_level = args
        .log_level
        .unwrap_or_else(|| default_log_level().to_string());
    init_logging(&log_level, &log_dir).map_err(anyhow::Error::msg)?;

    let bot_token = std::env::var(BOT_TOKEN_ENV)
        .with_context(|| format!("{BOT_TOKEN_ENV} must be set"))?;

    let conn = open_db(&args.db)
        .with_context(|| format!("failed to open database at {}", args.db.display()))?;

    let state = AppState::new(conn, bot_token);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind((args.bind, args.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", args.bind, args.port))?;
    info!(
        "event=http_start module=web status=ok addr={}",
        listener.local_addr()?
    );

    axum::serve(listener, app).await?;
    Ok(())
}
