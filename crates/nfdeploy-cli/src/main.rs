//! nfdeploy - NF deployment status aggregation
//!
//! Usage:
//!   nfdeploy graph --topology nfdeploy.yaml
//!   nfdeploy replay --topology nfdeploy.yaml --events events.jsonl

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nfdeploy_core::edge::EdgeEvent;
use nfdeploy_core::prelude::*;

#[derive(Parser)]
#[command(name = "nfdeploy")]
#[command(about = "NF deployment status aggregation", long_about = None)]
struct Cli {
    /// Path to config.toml (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the deployment graph of a resource and print it
    Graph {
        /// NfDeploy resource document (YAML)
        #[arg(long)]
        topology: PathBuf,

        /// Directory of NF type and capacity profiles
        #[arg(long)]
        profiles: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Replay recorded edge events against a resource and print the
    /// resulting status
    Replay {
        /// NfDeploy resource document (YAML)
        #[arg(long)]
        topology: PathBuf,

        /// Edge events, one JSON object per line
        #[arg(long)]
        events: PathBuf,

        /// Directory of NF type and capacity profiles
        #[arg(long)]
        profiles: Option<PathBuf>,

        /// Fail the edge subscription with this error instead of replaying
        #[arg(long, value_name = "MESSAGE")]
        subscription_error: Option<String>,

        /// Close the event stream after the last event
        #[arg(long)]
        close_stream: bool,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let store = match &cli.config {
        Some(path) => ConfigStore::from_path(path.clone()),
        None => ConfigStore::from_default_dir()?,
    };
    let config = store.load()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    debug!(config = %store.config_path().display(), "Loaded configuration");

    match cli.command {
        Commands::Graph {
            topology,
            profiles,
            format,
        } => run_graph(&config, &topology, profiles.as_deref(), format),
        Commands::Replay {
            topology,
            events,
            profiles,
            subscription_error,
            close_stream,
            format,
        } => {
            run_replay(
                &config,
                ReplayOptions {
                    topology,
                    events,
                    profiles,
                    subscription_error,
                    close_stream,
                },
                format,
            )
            .await
        }
    }
}

fn load_profiles(config: &ControllerConfig, dir: Option<&Path>) -> Result<ProfileSet> {
    match dir.or(config.profiles.directory.as_deref()) {
        Some(dir) => ProfileSet::load_dir(dir)
            .with_context(|| format!("Failed to load profiles from {}", dir.display())),
        None => Ok(ProfileSet::new()),
    }
}

fn load_events(path: &Path) -> Result<Vec<EdgeEvent>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read events file: {}", path.display()))?;
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).with_context(|| {
                format!("Invalid event at {}:{}", path.display(), index + 1)
            })
        })
        .collect()
}

fn run_graph(
    config: &ControllerConfig,
    topology: &Path,
    profiles: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let resource = NfDeployResource::load(topology)?;
    let profiles = load_profiles(config, profiles)?;

    let mut graph = DeploymentGraph::new();
    graph.apply_topology(&resource.spec, &profiles);

    match format {
        OutputFormat::Table => print_graph(&resource.key(), &graph),
        OutputFormat::Json => {
            let nodes: Vec<&Node> = graph.nodes().collect();
            let output = serde_json::json!({
                "deployment": resource.key().to_string(),
                "nodes": nodes,
                "edges": graph.edges(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

struct ReplayOptions {
    topology: PathBuf,
    events: PathBuf,
    profiles: Option<PathBuf>,
    subscription_error: Option<String>,
    close_stream: bool,
}

async fn run_replay(
    config: &ControllerConfig,
    options: ReplayOptions,
    format: OutputFormat,
) -> Result<()> {
    let resource = NfDeployResource::load(&options.topology)?;
    let profiles = load_profiles(config, options.profiles.as_deref())?;
    let events = load_events(&options.events)?;
    let key = resource.key();

    let store = Arc::new(InMemoryStatusStore::new());
    store.insert(key.clone()).await;
    let (watcher, mut driver) = ChannelEdgeWatcher::new();
    let manager = DeploymentManager::new(
        store.clone(),
        Arc::new(watcher),
        Arc::new(profiles),
        RetryPolicy::from_config(&config.retry),
    );

    let deployment = manager
        .report_topology_event(&resource)
        .await
        .with_context(|| format!("Failed to create deployment {}", key))?;
    let handle = driver
        .recv()
        .await
        .context("Deployment did not subscribe to edge events")?;
    info!(deployment = %key, clusters = ?handle.request.clusters, "Replaying edge events");

    let exit = if let Some(message) = options.subscription_error {
        let _ = handle.result.send(Err(message));
        manager.join_listener(&key).await
    } else {
        let _ = handle.result.send(Ok(()));
        let mut progress = deployment.progress();
        let total = events.len() as u64;
        for event in events {
            handle
                .events
                .send(event)
                .await
                .context("Listener stopped before all events were delivered")?;
        }
        progress
            .wait_for(|processed| *processed >= total)
            .await
            .context("Deployment stopped before all events were processed")?;

        if options.close_stream {
            drop(handle.events);
            manager.join_listener(&key).await
        } else {
            None
        }
    };

    let summary = deployment.summary().await;
    manager.shutdown().await;
    let status = store.snapshot(&key).await.unwrap_or_default();

    match format {
        OutputFormat::Table => print_status(&summary, &status, exit.as_ref()),
        OutputFormat::Json => {
            let output = serde_json::json!({
                "deployment": key.to_string(),
                "status": status,
                "nfs": summary.nodes,
                "eventsProcessed": summary.events_processed,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

fn print_graph(key: &NamespacedName, graph: &DeploymentGraph) {
    println!("Deployment: {}", key);
    println!();
    println!("NFs ({}):", graph.len());
    println!(
        "  {:<20} {:<8} {:<16} {:<24} CONNECTIONS",
        "ID", "TYPE", "CLUSTER", "INTENT"
    );
    for node in graph.nodes() {
        let connections: Vec<&str> = node.connections.iter().map(String::as_str).collect();
        println!(
            "  {:<20} {:<8} {:<16} {:<24} {}",
            node.id,
            node.nf_type,
            node.spec.cluster_name,
            format_intent(&node.spec.intent),
            connections.join(", ")
        );
    }
    println!();
    println!("Edges ({}):", graph.edges().len());
    for edge in graph.edges() {
        println!("  {} <-> {}", edge.first, edge.second);
    }
}

fn format_intent(intent: &NfIntent) -> String {
    match intent {
        NfIntent::None => "-".to_string(),
        NfIntent::Upf { throughput } => format!("throughput={}", throughput),
        NfIntent::Smf { max_sessions } => format!("maxSessions={}", max_sessions),
    }
}

fn print_status(summary: &DeploymentSummary, status: &DeploymentStatus, exit: Option<&ListenerExit>) {
    println!("Deployment: {}", summary.key);
    println!("Events processed: {}", summary.events_processed);
    if let Some(exit) = exit {
        println!("Listener: {:?}", exit);
    }
    println!(
        "NFs: {} targeted, {} ready, {} available, {} stalled",
        status.targeted_nfs, status.ready_nfs, status.available_nfs, status.stalled_nfs
    );
    println!();

    println!("Conditions:");
    println!("  {:<12} {:<8} {:<32} MESSAGE", "TYPE", "STATUS", "REASON");
    for condition in &status.conditions {
        println!(
            "  {:<12} {:<8} {:<32} {}",
            condition.condition_type.as_str(),
            condition.status.as_str(),
            condition.reason.map(|r| r.as_str()).unwrap_or("-"),
            condition.message
        );
    }
    println!();

    println!("NF Status:");
    println!("  {:<20} {:<8} {:<12} MESSAGE", "ID", "TYPE", "STATE");
    for node in &summary.nodes {
        let state = node
            .status
            .state
            .map(|state| format!("{:?}", state))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<20} {:<8} {:<12} {}",
            node.id, node.nf_type, state, node.status.message
        );
    }
}
