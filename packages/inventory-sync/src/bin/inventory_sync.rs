//! Inventory sync CLI
//!
//! `run` performs one reconciliation pass and exits; `daemon` keeps the
//! cron scheduler running until Ctrl-C.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use inventory_sync::{
    Config, ErpSourceReader, PostgresCommerceStore, RunCoordinator, SyncScheduler,
    TracingReporter,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "inventory-sync")]
#[command(about = "Reconcile ERP pricing and stock into the commerce catalog")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one sync pass now
    Run {
        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run on the configured schedule until interrupted
    Daemon,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.filter_directive().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    // Config is read before the subscriber exists, so report it now.
    config.log_startup();

    let coordinator = Arc::new(build_coordinator(&config)?);

    match cli.command {
        Commands::Run { json: true } => match coordinator.execute().await {
            Ok(run) => {
                println!("{}", serde_json::to_string_pretty(&run)?);
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                eprintln!("Sync failed: {}", e);
                Ok(ExitCode::FAILURE)
            }
        },
        Commands::Run { json: false } => {
            if coordinator.run_manual_sync().await {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Commands::Daemon => {
            let mut scheduler = SyncScheduler::new(coordinator);
            scheduler.start(&config.schedule).await?;

            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for shutdown signal")?;
            tracing::info!("Shutdown signal received");

            scheduler.shutdown().await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn build_coordinator(config: &Config) -> Result<RunCoordinator> {
    let source = ErpSourceReader::connect(
        &config.erp_database_url,
        config.erp_pool_size,
        config.branch_id,
        config.flag_markers.clone(),
        config.sync.query_timeout,
    )
    .context("Failed to configure ERP connection")?;

    let target = PostgresCommerceStore::connect(
        &config.commerce_database_url,
        config.commerce_pool_size,
        config.sync.query_timeout,
    )
    .context("Failed to configure commerce connection")?;

    let coordinator = RunCoordinator::new(
        Arc::new(source),
        Arc::new(target),
        Arc::new(TracingReporter::new()),
        config.sync.clone(),
    )?;
    Ok(coordinator)
}
