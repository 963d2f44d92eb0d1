//! drydock — admin CLI for the drydock node/task store.
//!
//! Operates directly on the redb state database: node and task CRUD,
//! admission-controlled attach/detach, and dry-run feasibility checks.
//!
//! # Usage
//!
//! ```text
//! drydock node add --name edge-1 --address 10.0.0.1 --cpu-cores 4 --cpu-arch arm64 --device gpu0
//! drydock attach <node-id> <task-id>
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::debug;

mod commands;
mod config;

use config::DrydockConfig;

#[derive(Parser)]
#[command(
    name = "drydock",
    about = "Drydock — admission-controlled task assignment for compute nodes",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Path to drydock.toml (default: ./drydock.toml if present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory for the state database (overrides config).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage compute nodes.
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },
    /// Manage task definitions.
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },
    /// Attach a task to a node (admission-controlled).
    Attach {
        node_id: String,
        task_id: String,
    },
    /// Detach a task from a node (idempotent).
    Detach {
        node_id: String,
        task_id: String,
    },
    /// Report whether attaching a task would be feasible, without mutating.
    Plan {
        node_id: String,
        task_id: String,
    },
}

#[derive(Subcommand)]
enum NodeAction {
    /// Register a new node.
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        address: String,
        #[arg(long)]
        cpu_cores: u32,
        /// Node CPU architecture: x86_64, arm64, riscv64.
        #[arg(long)]
        cpu_arch: String,
        /// Device identifier present on the node (repeatable).
        #[arg(long = "device")]
        devices: Vec<String>,
    },
    /// List all nodes.
    List,
    /// Show one node, including its taskset.
    Get { id: String },
    /// Delete a node.
    Delete { id: String },
}

#[derive(Subcommand)]
enum TaskAction {
    /// Register a new task definition.
    Add {
        #[arg(long)]
        name: String,
        /// Executable artifact reference.
        #[arg(long)]
        runtime: String,
        #[arg(long)]
        cpu_cores: u32,
        /// Required CPU architecture, if the task is arch-specific.
        #[arg(long)]
        cpu_arch: Option<String>,
        /// Device identifier the task requires (repeatable).
        #[arg(long = "device")]
        devices: Vec<String>,
    },
    /// List all tasks.
    List,
    /// Show one task.
    Get { id: String },
    /// Delete a task.
    Delete { id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    let data_dir = cli.data_dir.unwrap_or_else(|| config.data_dir());
    std::fs::create_dir_all(&data_dir)?;
    let store = drydock_state::StateStore::open(&data_dir.join("drydock.redb"))?;
    let coordinator = drydock_assign::Coordinator::with_max_attempts(
        store.clone(),
        config.max_attach_attempts(),
    );
    debug!(?data_dir, attempts = config.max_attach_attempts(), "store assembled");

    match cli.command {
        Commands::Node { action } => match action {
            NodeAction::Add {
                name,
                address,
                cpu_cores,
                cpu_arch,
                devices,
            } => commands::node::add(&store, &name, &address, cpu_cores, &cpu_arch, devices),
            NodeAction::List => commands::node::list(&store),
            NodeAction::Get { id } => commands::node::get(&store, &id),
            NodeAction::Delete { id } => commands::node::delete(&store, &id),
        },
        Commands::Task { action } => match action {
            TaskAction::Add {
                name,
                runtime,
                cpu_cores,
                cpu_arch,
                devices,
            } => commands::task::add(&store, &name, &runtime, cpu_cores, cpu_arch.as_deref(), devices),
            TaskAction::List => commands::task::list(&store),
            TaskAction::Get { id } => commands::task::get(&store, &id),
            TaskAction::Delete { id } => commands::task::delete(&store, &id),
        },
        Commands::Attach { node_id, task_id } => {
            commands::assign::attach(&coordinator, &node_id, &task_id).await
        }
        Commands::Detach { node_id, task_id } => {
            commands::assign::detach(&coordinator, &node_id, &task_id).await
        }
        Commands::Plan { node_id, task_id } => {
            commands::assign::plan(&coordinator, &node_id, &task_id).await
        }
    }
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<DrydockConfig> {
    match path {
        Some(path) => DrydockConfig::from_file(path),
        None => {
            let default = std::path::Path::new("drydock.toml");
            if default.exists() {
                DrydockConfig::from_file(default)
            } else {
                Ok(DrydockConfig::default())
            }
        }
    }
}
