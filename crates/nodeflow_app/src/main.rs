// SPDX-License-Identifier: MIT OR Apache-2.0
//! `nodeflow` command-line front end.
//!
//! Builds and evaluates graphs through the same session layer an editor
//! would use:
//! - `demo` assembles a small arithmetic chain and a nested graph
//! - `eval` imports an exported tab and prints every node's outputs

mod demo;

use clap::{Parser, Subcommand};
use nodeflow_graph::{Catalog, Graph, NodeResult};
use nodeflow_session::{SessionConfig, TabManager};
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Typed dataflow graphs from the command line.
#[derive(Parser)]
#[command(name = "nodeflow", version, about = "Typed dataflow graph engine")]
struct Cli {
    /// Session configuration file (RON).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Build the demo graphs, evaluate them and print the exported tab.
    Demo,
    /// Import an exported tab, evaluate it and print each node's outputs.
    Eval {
        /// Path to the tab JSON file.
        path: PathBuf,
    },
}

type AppResult = Result<(), Box<dyn std::error::Error>>;

fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("nodeflow=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        tracing::error!("nodeflow failed: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> AppResult {
    let config = match &cli.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };
    let manager = TabManager::new(Catalog::shared(), config);

    match cli.command {
        Commands::Demo => demo::run(manager),
        Commands::Eval { path } => run_eval(manager, &path),
    }
}

fn run_eval(mut manager: TabManager, path: &Path) -> AppResult {
    let json = std::fs::read_to_string(path)?;
    let id = manager.import_tab_json(&json)?;
    let report = manager.evaluate(id)?;
    tracing::info!(
        path = %path.display(),
        recomputed = report.recomputed.len(),
        undefined = report.undefined.len(),
        "Evaluated tab"
    );
    if !report.is_clean() {
        tracing::warn!(undefined = report.undefined.len(), "Some nodes are undefined");
    }

    if let Some(tab) = manager.tab(id) {
        println!("{}", tab.name());
        print_results(tab.graph());
    }
    Ok(())
}

/// Print one line per node with its resolved outputs or why it is undefined
pub(crate) fn print_results(graph: &Graph) {
    for node in graph.nodes() {
        match graph.node_result(node.id) {
            Some(NodeResult::Resolved(values)) if values.is_empty() => {
                let received = node
                    .last_value()
                    .map_or_else(|| "nothing".to_string(), |v| v.to_string());
                println!("  {}: received {received}", node.title);
            }
            Some(NodeResult::Resolved(values)) => {
                let outputs: Vec<String> = values
                    .iter()
                    .map(|(port, value)| format!("{port} = {value}"))
                    .collect();
                println!("  {}: {}", node.title, outputs.join(", "));
            }
            Some(NodeResult::Undefined(err)) => println!("  {}: undefined ({err})", node.title),
            None => println!("  {}: not evaluated", node.title),
        }
    }
}
