//! Command-line runner for eco-grid simulations.

mod telemetry;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use eco_core::SimConfig;
use eco_world::{Game, RunSummary};
use serde::Serialize;
use std::path::PathBuf;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "eco-runner", version, about = "Run a grid predator/prey simulation")]
struct Args {
    /// JSON simulation config; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the configured tick limit (0 = no limit)
    #[arg(long)]
    ticks: Option<u64>,

    #[arg(long, value_enum, default_value_t = telemetry::LogFormat::Pretty)]
    log_format: telemetry::LogFormat,

    /// Write the JSON run report here instead of stdout
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct RunReport {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    seed: u64,
    #[serde(flatten)]
    summary: RunSummary,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    telemetry::init_telemetry(args.log_format)?;

    let mut config = match &args.config {
        Some(path) => SimConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => SimConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(ticks) = args.ticks {
        config.max_ticks = ticks;
    }

    let run_id = Uuid::new_v4();
    let seed = config.seed;
    let started_at = Utc::now();
    info!(%run_id, seed, max_ticks = config.max_ticks, "Starting eco-grid run");

    let token = CancellationToken::new();
    let game_token = token.clone();
    let mut handle = tokio::task::spawn_blocking(move || {
        let mut game = Game::new(config)?;
        game.run_until(|| game_token.is_cancelled())
    });

    // A tick always finishes; the stop request is seen before the next one
    let summary = tokio::select! {
        result = &mut handle => result??,
        _ = shutdown_signal() => {
            info!("Stopping after the current tick");
            token.cancel();
            handle.await??
        }
    };

    let report = RunReport {
        run_id,
        started_at,
        finished_at: Utc::now(),
        seed,
        summary,
    };
    let json = serde_json::to_string_pretty(&report)?;

    match &args.report {
        Some(path) => {
            tokio::fs::write(path, json)
                .await
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            info!(path = %path.display(), "Run report written");
        }
        None => println!("{}", json),
    }

    Ok(())
}

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
                error!("Failed to install signal handler: {}", e);
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

    info!("Shutdown signal received");
}
