//! bucketscaled — the bucketscale daemon.
//!
//! Loads trigger definitions, runs one polling loop per trigger against
//! a local bucket root, and serves the resulting decisions over HTTP.
//!
//! # Usage
//!
//! ```text
//! bucketscaled run --config triggers.toml --bucket-root /var/lib/buckets --port 9090
//! bucketscaled check --config triggers.toml
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use bucketscale_core::TriggersFile;
use bucketscale_trigger::{ControllerOptions, DecisionBoard, LocalBucketSource, TriggerRegistry};
use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "bucketscaled",
    about = "Object-count autoscaling trigger daemon",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every trigger in the definitions file and serve decisions.
    Run {
        /// Trigger definitions file (TOML).
        #[arg(short, long)]
        config: PathBuf,

        /// Directory whose subdirectories are the buckets.
        #[arg(long)]
        bucket_root: PathBuf,

        /// Port for the status and metrics API.
        #[arg(long, default_value = "9090")]
        port: u16,
    },
    /// Validate the definitions file and print the resulting rules.
    Check {
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,bucketscale=debug")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            config,
            bucket_root,
            port,
        } => run(&config, bucket_root, port).await,
        Command::Check { config } => {
            for line in check(&config)? {
                println!("{line}");
            }
            Ok(())
        }
    }
}

/// Validate the file and describe each rule on one line.
fn check(config: &Path) -> anyhow::Result<Vec<String>> {
    let file = TriggersFile::from_file(config)
        .with_context(|| format!("invalid trigger definitions in {}", config.display()))?;

    Ok(file
        .rules()?
        .into_iter()
        .map(|(name, rule)| {
            format!(
                "{name}: bucket={} target={} replicas={}..={} interval={}s cooldown={}s",
                rule.bucket(),
                rule.target_object_count(),
                rule.min_replicas(),
                rule.max_replicas(),
                rule.polling_interval().as_secs(),
                rule.cooldown_period().as_secs(),
            )
        })
        .collect())
}

async fn run(config: &Path, bucket_root: PathBuf, port: u16) -> anyhow::Result<()> {
    info!("bucketscale daemon starting");

    // Any invalid trigger stops startup before a loop is spawned.
    let file = TriggersFile::from_file(config)
        .with_context(|| format!("invalid trigger definitions in {}", config.display()))?;
    info!(path = ?config, triggers = file.triggers.len(), "trigger definitions loaded");

    let board = DecisionBoard::new();
    let source = Arc::new(LocalBucketSource::new(&bucket_root));
    info!(root = ?bucket_root, "local bucket source ready");

    let registry = TriggerRegistry::new(
        source,
        Arc::new(board.clone()),
        ControllerOptions::from(&file.controller),
    );
    for definition in &file.triggers {
        registry.register(definition).await?;
    }

    let router = bucketscale_api::build_router(board);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("shutdown signal received");
        })
        .await?;

    registry.stop_all().await;

    info!("bucketscale daemon stopped");
    Ok(())
}
