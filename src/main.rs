mod config;
mod data;
mod engine;
mod notifications;
mod tree;
mod types;
mod web;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{AppSettings, LogFormat};
use crate::data::{BarSource, CsvBarSource};
use crate::engine::{EngineContext, SequenceEngine, TrainReport};
use crate::notifications::EventBus;
use crate::types::{PriceBar, Synthesis};
use crate::web::{start_server, AppState};

#[derive(Parser)]
#[command(name = "seqtree")]
#[command(author = "Trading Bot")]
#[command(version)]
#[command(about = "Sequence-tree trading decision engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file path
    #[arg(short, long, default_value = "seqtree.toml", global = true)]
    config: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the REST and WebSocket API
    Serve {
        /// Listen port (overrides settings)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Train on a CSV file and print the report
    Train {
        /// Historical bars (timestamp,open,high,low,close,volume)
        #[arg(short, long)]
        data: String,
        /// Also print the tree snapshot as JSON
        #[arg(long)]
        tree: bool,
    },
    /// Train on one file, then stream another through live inference
    Replay {
        /// Training bars
        #[arg(short, long)]
        train: String,
        /// Bars fed one at a time as live data
        #[arg(short, long)]
        live: String,
    },
    /// Print the effective settings as TOML
    PrintConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let settings = AppSettings::load(&cli.config)
        .with_context(|| format!("failed to load settings from {}", cli.config))?;
    let format = if cli.json { LogFormat::Json } else { settings.log_format };
    init_tracing(cli.verbose, format)?;

    match cli.command {
        Commands::Serve { port } => {
            let port = port.unwrap_or(settings.server.port);
            run_server(&settings, port).await?;
        }
        Commands::Train { data, tree } => {
            run_train(&settings, &data, tree).await?;
        }
        Commands::Replay { train, live } => {
            run_replay(&settings, &train, &live).await?;
        }
        Commands::PrintConfig => {
            print!("{}", toml::to_string_pretty(&settings)?);
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool, format: LogFormat) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let installed = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };
    installed.map_err(|e| anyhow!("failed to install log subscriber: {}", e))
}

async fn run_server(settings: &AppSettings, port: u16) -> Result<()> {
    info!("seqtree v{}", env!("CARGO_PKG_VERSION"));
    let events = EventBus::new(settings.events.capacity);
    let source = Arc::new(CsvBarSource::new(&settings.data.dir));
    info!("Data directory: {}", source.data_dir().display());
    let context = EngineContext::new(source, events, settings.engine.to_config());

    start_server(AppState::new(context), &settings.server.host, port).await
}

/// Splits a CLI path into a source rooted at its directory plus the file name.
fn source_for(path: &str) -> Result<(CsvBarSource, String)> {
    let path = Path::new(path);
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("not a file path: {}", path.display()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => ".".into(),
    };
    Ok((CsvBarSource::new(dir), name.to_string()))
}

async fn read_bars(path: &str) -> Result<(String, Vec<PriceBar>)> {
    let (source, name) = source_for(path)?;
    let bars = source.fetch_bars(&name).await?;
    Ok((name, bars))
}

async fn trained_engine(settings: &AppSettings, path: &str) -> Result<(SequenceEngine, TrainReport)> {
    let (name, bars) = read_bars(path).await?;
    let events = EventBus::new(settings.events.capacity);
    let engine = SequenceEngine::initialize(settings.engine.to_config(), events)?;
    engine.load_bars(&name, bars)?;
    let report = engine.train()?;
    info!(
        "Trained {} sequences into {} nodes in {}ms",
        report.sequences, report.node_count, report.elapsed_ms
    );
    Ok((engine, report))
}

async fn run_train(settings: &AppSettings, path: &str, print_tree: bool) -> Result<()> {
    let (engine, report) = trained_engine(settings, path).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    if print_tree {
        let snapshot = engine.tree_snapshot();
        info!("Tree: {} nodes, depth {}", snapshot.node_count(), snapshot.max_depth());
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }
    Ok(())
}

async fn run_replay(settings: &AppSettings, train_path: &str, live_path: &str) -> Result<()> {
    let (engine, _) = trained_engine(settings, train_path).await?;
    let (_, live) = read_bars(live_path).await?;

    let mut counts = [0usize; 4];
    for bar in live {
        match engine.process_new_data(bar) {
            Ok(decision) => {
                println!("{}  close={:.4}  {}", bar.timestamp.format("%Y-%m-%d %H:%M:%S"), bar.close, decision);
                if let Some(slot) = Synthesis::all().iter().position(|s| *s == decision) {
                    counts[slot] += 1;
                }
            }
            Err(e) => warn!("Skipping bar at {}: {}", bar.timestamp, e),
        }
    }

    println!();
    for (synthesis, count) in Synthesis::all().iter().zip(counts) {
        println!("{:>5}: {}", synthesis.as_str(), count);
    }
    Ok(())
}
