use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ytrep_core::{OwnerScope, SchemaRegistry, StaticSchemaRegistry, SubscriptionKey, SyncError};
use ytrep_sync::{RunStatus, SubscriptionConfig, SyncConfig, SyncPipeline};

#[derive(Debug, Parser)]
#[command(name = "ytrep-cli")]
#[command(about = "YouTube Reporting harvester")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Reconcile jobs and harvest new reports once.
    Sync,
    /// Run sync on YTREP_SYNC_CRON until Ctrl-C.
    Schedule,
    /// List report types and their primary keys.
    ReportTypes {
        /// Ask the remote service instead of the built-in registry.
        #[arg(long)]
        remote: bool,
    },
    /// Print the persisted state snapshot.
    State,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = SyncConfig::from_env();
    let debug = SubscriptionConfig::load(&config.config_path)
        .await
        .map(|c| c.debug)
        .unwrap_or(false);
    init_tracing(debug);

    match run(cli.command.unwrap_or(Commands::Sync), config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            let configuration = err
                .downcast_ref::<SyncError>()
                .is_some_and(SyncError::is_configuration);
            ExitCode::from(if configuration { 1 } else { 2 })
        }
    }
}

fn init_tracing(debug: bool) {
    let fallback = if debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback)),
        )
        .init();
}

async fn run(command: Commands, mut config: SyncConfig) -> Result<()> {
    match command {
        Commands::Sync if config.scheduler_enabled => {
            Arc::new(SyncPipeline::new(config)?).run_scheduled().await?;
        }
        Commands::Sync => {
            let summary = SyncPipeline::new(config)?.run_once().await?;
            let status = match summary.status {
                RunStatus::Succeeded => "complete",
                RunStatus::PartiallySucceeded => "partially complete",
            };
            println!(
                "sync {status}: run_id={} harvested={} failed={} summary={}",
                summary.run_id,
                summary.harvested(),
                summary.failed(),
                summary.summary_path
            );
        }
        Commands::Schedule => {
            config.scheduler_enabled = true;
            Arc::new(SyncPipeline::new(config)?).run_scheduled().await?;
        }
        Commands::ReportTypes { remote: false } => {
            let registry = StaticSchemaRegistry;
            for schema in registry.all() {
                let primary_key =
                    registry.dimension_columns_for(&SubscriptionKey::from(schema.id))?;
                println!("{}\t{}", schema.id, primary_key.join(","));
            }
        }
        Commands::ReportTypes { remote: true } => {
            let owner = match SubscriptionConfig::load(&config.config_path).await {
                Ok(doc) if doc.on_behalf_of_content_owner => {
                    OwnerScope::delegated(doc.content_owner_id.trim())
                }
                _ => OwnerScope::own_account(),
            };
            let pipeline = SyncPipeline::new(config)?;
            let types = pipeline
                .api()
                .list_report_types(&owner)
                .await
                .context("listing remote report types")?;
            for report_type in types {
                let mut line = format!("{}\t{}", report_type.id, report_type.name);
                if report_type.system_managed {
                    line.push_str("\tsystem-managed");
                }
                if let Some(deprecated) = report_type.deprecate_time {
                    line.push_str(&format!("\tdeprecated {deprecated}"));
                }
                println!("{line}");
            }
        }
        Commands::State => {
            let pipeline = SyncPipeline::new(config)?;
            let snapshot = pipeline.state_store().load().await;
            println!(
                "{}",
                serde_json::to_string_pretty(&snapshot).context("serializing state")?
            );
        }
    }
    Ok(())
}
