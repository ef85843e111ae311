use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use honor_pricing::QuoteRequest;
use honor_settlement::{MemoryStore, ReconcileMode, ReconcileSummary, SettlementEngine, SettlementStore};
use honor_types::{HonorAmount, MissionId, MissionModel, Platform};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;

#[derive(Parser)]
#[command(name = "honord")]
#[command(about = "Honor settlement engine - pricing, caps, reviews, reconciliation", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new node configuration
    Init {
        /// Output directory for configuration
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Check aggregate counters against the completion log
    Reconcile {
        /// Limit the pass to one mission
        #[arg(long)]
        mission: Option<String>,

        /// Write corrected counters instead of only reporting drift
        #[arg(long)]
        execute: bool,
    },

    /// Price a mission without creating it
    Price {
        #[command(subcommand)]
        command: PriceCommands,
    },
}

#[derive(Subcommand)]
enum PriceCommands {
    /// Quote a capped fixed-reward mission
    Fixed {
        /// Task type to include (repeat for several tasks)
        #[arg(short, long = "task", required = true)]
        tasks: Vec<String>,

        /// Participant cap
        #[arg(long, default_value = "100")]
        cap: u32,

        /// Social platform
        #[arg(long, default_value = "x")]
        platform: String,

        /// Price at the premium multiplier
        #[arg(long)]
        premium: bool,

        /// Override the computed per-user reward, in Honors
        #[arg(long)]
        reward_per_user: Option<u64>,
    },

    /// Quote a time-boxed degen mission
    Degen {
        /// Mission duration in hours (must match a preset)
        #[arg(long, default_value = "24")]
        hours: u32,

        /// Social platform
        #[arg(long, default_value = "x")]
        platform: String,
    },
}

/// Reconcile output: counter drift plus the task-type anomaly scan.
#[derive(Serialize)]
struct ReconcileOutput {
    summary: ReconcileSummary,
    unpriced_tasks: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Priority order: ENV vars > config file > defaults
    let mut config = if let Some(ref config_path) = cli.config {
        config::NodeConfig::from_file(config_path)?
    } else if Path::new("./honor-config.toml").exists() {
        config::NodeConfig::from_file(Path::new("./honor-config.toml"))?
    } else {
        config::NodeConfig::default()
    };
    config.apply_env_overrides();

    match cli.command {
        Commands::Init { output } => {
            info!(output_dir = ?output, "🧬 Initializing node configuration");
            std::fs::create_dir_all(&output)?;

            let config_path = output.join("honor-config.toml");
            config.save_to_file(&config_path)?;
            info!(path = ?config_path, "✅ Configuration saved");
            Ok(())
        }

        Commands::Reconcile { mission, execute } => {
            let engine = build_engine(&config)?;
            let mode = if execute {
                ReconcileMode::Execute
            } else {
                ReconcileMode::DryRun
            };
            let target = mission.map(MissionId::new);

            let summary = engine.reconcile(target.as_ref(), mode).await?;
            let unpriced_tasks = scan_unpriced_tasks(&config, engine.store.as_ref()).await?;

            let output = ReconcileOutput {
                summary,
                unpriced_tasks,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }

        Commands::Price { command } => {
            let request = match command {
                PriceCommands::Fixed {
                    tasks,
                    cap,
                    platform,
                    premium,
                    reward_per_user,
                } => QuoteRequest {
                    model: MissionModel::Fixed,
                    platform: parse_platform(&platform)?,
                    task_types: tasks,
                    premium,
                    cap: Some(cap),
                    duration_hours: None,
                    reward_per_user: reward_per_user.map(HonorAmount::from_honors),
                },
                PriceCommands::Degen { hours, platform } => QuoteRequest {
                    model: MissionModel::Degen,
                    platform: parse_platform(&platform)?,
                    task_types: vec![],
                    premium: false,
                    cap: None,
                    duration_hours: Some(hours),
                    reward_per_user: None,
                },
            };

            let quote = honor_pricing::quote(&config.pricing, &request)?;
            println!("{}", serde_json::to_string_pretty(&quote)?);
            Ok(())
        }
    }
}

fn parse_platform(raw: &str) -> Result<Platform> {
    raw.parse()
        .map_err(|e| anyhow::anyhow!("invalid platform {:?}: {}", raw, e))
}

fn build_engine(config: &config::NodeConfig) -> Result<SettlementEngine> {
    let store = open_store(config)?;
    let engine =
        SettlementEngine::with_settings(store, config.pricing.clone(), config.engine_settings())?;
    Ok(engine)
}

fn open_store(config: &config::NodeConfig) -> Result<Arc<dyn SettlementStore>> {
    match config.store.backend.as_str() {
        "memory" => {
            info!(storage_type = "memory", "💾 Store opened");
            Ok(Arc::new(MemoryStore::new()))
        }
        #[cfg(feature = "rocksdb")]
        "rocksdb" => {
            let path = config.node.data_dir.join("settlement");
            let store = honor_settlement::RocksStore::new(&path)?;
            info!(storage_type = "rocksdb", path = ?path, "💾 Store opened");
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "rocksdb"))]
        "rocksdb" => {
            bail!("this build does not include rocksdb support")
        }
        other => bail!("unknown store backend {:?}", other),
    }
}

/// Flag mission tasks whose type no longer appears in the price table.
/// These surface as zero prices and mean the table drifted out from
/// under live missions.
async fn scan_unpriced_tasks(
    config: &config::NodeConfig,
    store: &dyn SettlementStore,
) -> Result<usize> {
    let mut unpriced = 0;
    for mission in store.list_missions().await? {
        for task in &mission.tasks {
            if config.pricing.task_prices.price_or_zero(&task.task_type) == HonorAmount::ZERO {
                unpriced += 1;
            }
        }
    }
    Ok(unpriced)
}
