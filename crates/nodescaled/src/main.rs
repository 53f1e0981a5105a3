//! nodescaled — the nodescale daemon.
//!
//! Keeps a node pool sized to a spare-capacity buffer. In this build the
//! cluster is a local redb store and the node pool is simulated on top
//! of it, so the whole scaling loop can run without a cloud provider:
//!
//! - `seed` loads a JSON fixture of nodes and pods into the store
//! - `status` prints the current snapshot and buffer math
//! - `tick` runs one reconciliation pass and prints the report
//! - `run` ticks on an interval until Ctrl-C
//!
//! # Usage
//!
//! ```text
//! nodescaled seed --data-dir /var/lib/nodescale --fixture demos/cluster.json
//! nodescaled run --data-dir /var/lib/nodescale --config demos/nodescale.toml
//! ```

mod config;
mod pool;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use nodescale_autoscale::ScalingController;
use nodescale_cluster::{ClusterSnapshot, ClusterState, ClusterStore};
use tokio::sync::watch;
use tracing::info;

use crate::config::DaemonConfig;
use crate::pool::StoreNodePool;

#[derive(Parser)]
#[command(name = "nodescaled", about = "nodescale daemon")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replace the cluster state with the contents of a JSON fixture.
    Seed {
        /// Data directory holding the cluster store.
        #[arg(long, default_value = "/var/lib/nodescale")]
        data_dir: PathBuf,

        /// JSON file with `nodes` and `pods` arrays.
        #[arg(long)]
        fixture: PathBuf,
    },
    /// Show nodes, pods and the buffer calculation.
    Status {
        #[arg(long, default_value = "/var/lib/nodescale")]
        data_dir: PathBuf,

        /// Path to nodescale.toml (defaults apply when omitted).
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Run a single reconciliation tick.
    Tick {
        #[arg(long, default_value = "/var/lib/nodescale")]
        data_dir: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Run the scaling loop until interrupted.
    Run {
        #[arg(long, default_value = "/var/lib/nodescale")]
        data_dir: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Seed { data_dir, fixture } => seed(&data_dir, &fixture),
        Command::Status { data_dir, config } => status(&data_dir, config.as_deref()),
        Command::Tick { data_dir, config } => tick(&data_dir, config.as_deref()).await,
        Command::Run { data_dir, config } => run(&data_dir, config.as_deref()).await,
    }
}

/// Used when `RUST_LOG` is unset. Target directives match by prefix, so
/// `nodescale` covers both library crates.
const DEFAULT_LOG_FILTER: &str = "info,nodescaled=debug,nodescale=debug";

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn open_store(data_dir: &Path) -> anyhow::Result<ClusterStore> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;
    let db_path = data_dir.join("cluster.redb");
    let store = ClusterStore::open(&db_path)?;
    info!(path = ?db_path, "cluster store opened");
    Ok(store)
}

fn read_fixture(path: &Path) -> anyhow::Result<ClusterState> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading fixture {}", path.display()))?;
    let state = serde_json::from_str(&content)
        .with_context(|| format!("parsing fixture {}", path.display()))?;
    Ok(state)
}

fn build_controller(
    data_dir: &Path,
    config: &DaemonConfig,
) -> anyhow::Result<ScalingController<ClusterStore, StoreNodePool>> {
    let store = open_store(data_dir)?;
    let pool = StoreNodePool::new(store.clone(), &config.pool);
    Ok(ScalingController::new(store, pool, config.scaling_config()?))
}

fn seed(data_dir: &Path, fixture: &Path) -> anyhow::Result<()> {
    let state = read_fixture(fixture)?;
    let store = open_store(data_dir)?;
    store.load_state(&state)?;
    info!(
        nodes = state.nodes.len(),
        pods = state.pods.len(),
        "cluster state seeded"
    );
    Ok(())
}

fn status(data_dir: &Path, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = DaemonConfig::load(config_path)?;
    let scaling = config.scaling_config()?;
    let store = open_store(data_dir)?;
    let snapshot = ClusterSnapshot::from_state(store.read_state()?, &scaling.protection)?;

    println!(
        "{:<24} {:>9} {:>9} {:>5} {:>9}  STATE",
        "NODE", "CAPACITY", "IN-USE", "PODS", "PROTECTED"
    );
    for node in snapshot.nodes() {
        let state = match (node.cordoned, node.cordoned_at()) {
            (false, _) => "schedulable".to_string(),
            (true, Ok(at)) => format!("cordoned since {}", at.to_rfc3339()),
            (true, Err(e)) => format!("cordoned ({e})"),
        };
        println!(
            "{:<24} {:>9} {:>9} {:>5} {:>9}  {}",
            node.id,
            node.capacity,
            snapshot.resource_in_use(&node.id),
            snapshot.pods_on_node(&node.id).len(),
            snapshot.protected_pods_on_node(&node.id),
            state
        );
    }
    println!();
    println!(
        "available: {} blocks of {}m, target buffer: {}",
        snapshot.available_blocks(scaling.block_size),
        scaling.block_size,
        scaling.target_buffer
    );
    Ok(())
}

async fn tick(data_dir: &Path, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = DaemonConfig::load(config_path)?;
    let mut controller = build_controller(data_dir, &config)?;
    let report = controller.tick().await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn run(data_dir: &Path, config_path: Option<&Path>) -> anyhow::Result<()> {
    info!("nodescale daemon starting");
    let config = DaemonConfig::load(config_path)?;
    let interval = config.interval()?;
    let mut controller = build_controller(data_dir, &config)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scaler_handle = tokio::spawn(async move {
        controller.run(interval, shutdown_rx).await;
    });

    tokio::signal::ctrl_c()
        .await
        .context("installing Ctrl-C handler")?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    let _ = scaler_handle.await;
    info!("nodescale daemon stopped");
    Ok(())
}
