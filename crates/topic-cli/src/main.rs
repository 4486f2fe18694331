//! `topic`: inspect topic snapshots from the command line
//!
//! Every subcommand reads a snapshot file (a stored envelope of any schema
//! version, or a bare current-version topic), migrates it, and prints JSON
//! to stdout. Logs go to stderr.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use topic_graph::NodeId;
use topic_sync::EngineConfig;
use tracing_subscriber::EnvFilter;

use commands::{Aspect, Mode};

#[derive(Parser)]
#[command(name = "topic")]
#[command(about = "Inspect topic graph snapshots", version)]
struct Cli {
    /// Engine configuration (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the nodes and edges a view shows
    View {
        /// Topic snapshot (JSON)
        snapshot: PathBuf,
        /// View configuration (TOML); defaults to the config's view
        #[arg(long)]
        view: Option<PathBuf>,
    },
    /// Print aspect filters for one node
    Aspects {
        snapshot: PathBuf,
        /// Node to inspect
        #[arg(long)]
        node: NodeId,
        /// Aspects to compute; all when omitted
        #[arg(long = "aspect", value_enum)]
        aspects: Vec<Aspect>,
    },
    /// Print the display score of every part
    Scores {
        snapshot: PathBuf,
        /// Perspectives to merge; defaults to the config, then to everyone
        #[arg(long = "perspective")]
        perspectives: Vec<String>,
        #[arg(long, value_enum)]
        mode: Option<Mode>,
    },
    /// Rewrite a snapshot at the current schema version
    Migrate {
        snapshot: PathBuf,
        /// Destination; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let output = match cli.command {
        Command::View { snapshot, view } => {
            let state = commands::load_snapshot(&snapshot)?;
            let view = match view {
                Some(path) => commands::load_view(&path)?,
                None => config.view.clone(),
            };
            commands::view(&state, &view)?
        }
        Command::Aspects {
            snapshot,
            node,
            aspects,
        } => {
            let state = commands::load_snapshot(&snapshot)?;
            commands::aspects(&state, node, &aspects)?
        }
        Command::Scores {
            snapshot,
            perspectives,
            mode,
        } => {
            let state = commands::load_snapshot(&snapshot)?;
            commands::scores(&state, &config, &perspectives, mode)?
        }
        Command::Migrate { snapshot, output } => {
            let state = commands::load_snapshot(&snapshot)?;
            let migrated = commands::migrated(&state)?;
            if let Some(path) = output {
                std::fs::write(&path, migrated.to_string())
                    .with_context(|| format!("writing {}", path.display()))?;
                tracing::info!(path = %path.display(), "wrote migrated snapshot");
                return Ok(());
            }
            migrated
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
