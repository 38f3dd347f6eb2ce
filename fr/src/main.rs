//! fedrouter - federated agent directory and router
//!
//! CLI entry point for inspecting a configured federation and routing through it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{CommandFactory, Parser};
use colored::*;
use eyre::{Context, Result};
use feddir::{Agent, AgentDirectory, Cluster, ClusterRegistry, ClusterStatus};
use tracing::{debug, info};

use fedrouter::cli::{Cli, Command, OutputFormat};
use fedrouter::config::Config;
use fedrouter::delivery::Message;
use fedrouter::healing::{AnomalyReport, LoggingRemediator, SelfHealer};
use fedrouter::router::RouteOutcome;
use fedrouter::scenario::{ScenarioEvent, ScenarioLog};
use fedrouter::service::FederationService;

fn setup_logging(verbose: bool) -> Result<()> {
    // Logs go to stderr so stdout stays parseable
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::WARN };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .try_init()
        .map_err(|e| eyre::eyre!("Failed to install tracing subscriber: {}", e))?;

    debug!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!(
        "fedrouter loaded config: local-cluster-id={}, peers={}, agents={}",
        config.local_cluster_id,
        config.peers.len(),
        config.agents.len()
    );

    match cli.command {
        Some(Command::Route {
            agent_id,
            message,
            record,
            format,
        }) => cmd_route(&config, &agent_id, message.as_deref(), record.as_ref(), format).await,
        Some(Command::Clusters { format }) => cmd_clusters(&config, format).await,
        Some(Command::Agents { cluster, format }) => cmd_agents(&config, cluster.as_deref(), format).await,
        Some(Command::Heal { report, record, format }) => cmd_heal(&config, &report, record.as_ref(), format).await,
        Some(Command::Replay { path, only, format }) => cmd_replay(&config, &path, &only, format).await,
        None => {
            Cli::command().print_help()?;
            println!();
            Ok(())
        }
    }
}

fn status_label(status: ClusterStatus) -> ColoredString {
    match status {
        ClusterStatus::Healthy => status.to_string().green(),
        ClusterStatus::Degraded => status.to_string().yellow(),
        ClusterStatus::Offline => status.to_string().red(),
    }
}

fn outcome_label(outcome: &RouteOutcome) -> ColoredString {
    if outcome.is_delivered() {
        "✓".green()
    } else {
        "✗".red()
    }
}

fn healer_for(config: &Config, directory: Arc<AgentDirectory>, registry: Arc<ClusterRegistry>) -> SelfHealer {
    SelfHealer::new(directory, registry, Arc::new(LoggingRemediator), config.healing.clone())
}

async fn record_event(path: Option<&PathBuf>, event: &ScenarioEvent) -> Result<()> {
    if let Some(path) = path {
        ScenarioLog::new(path).record(event).await?;
        debug!(path = %path.display(), kind = event.kind(), "Recorded scenario event");
    }
    Ok(())
}

/// Route one message through the configured federation
async fn cmd_route(
    config: &Config,
    agent_id: &str,
    message: Option<&str>,
    record: Option<&PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let message: Message = match message {
        Some(raw) => serde_json::from_str(raw).context("Failed to parse --message as JSON")?,
        None => Message::Null,
    };
    record_event(
        record,
        &ScenarioEvent::Route {
            agent_id: agent_id.to_string(),
            message: message.clone(),
        },
    )
    .await?;

    let federation = config.bootstrap().await?;
    let outcome = federation.router.route_message(agent_id, &message).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome.to_json())?),
        OutputFormat::Text => println!("{} {}: {}", outcome_label(&outcome), agent_id.cyan(), outcome),
    }

    if !outcome.is_delivered() {
        std::process::exit(2);
    }
    Ok(())
}

/// List peer clusters
async fn cmd_clusters(config: &Config, format: OutputFormat) -> Result<()> {
    let federation = config.bootstrap().await?;
    let mut clusters: Vec<Cluster> = federation.registry.list();
    clusters.sort_by(|a, b| a.cluster_id.cmp(&b.cluster_id));

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&clusters)?),
        OutputFormat::Text => {
            if clusters.is_empty() {
                println!("{}", "No peer clusters configured".dimmed());
            }
            for cluster in &clusters {
                println!(
                    "{:<20} {:<10} {}",
                    cluster.cluster_id.cyan(),
                    status_label(cluster.status),
                    cluster.api_endpoint.dimmed()
                );
            }
        }
    }
    Ok(())
}

/// List agents, optionally only those of one cluster
async fn cmd_agents(config: &Config, cluster: Option<&str>, format: OutputFormat) -> Result<()> {
    let federation = config.bootstrap().await?;
    let mut agents: Vec<Agent> = match cluster {
        Some(cluster_id) => federation.directory.list_by_cluster(cluster_id),
        None => federation.directory.list(),
    };
    agents.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&agents)?),
        OutputFormat::Text => {
            if agents.is_empty() {
                println!("{}", "No agents registered".dimmed());
            }
            for agent in &agents {
                let location = if agent.cluster_id == federation.local_cluster_id() {
                    format!("{} (local)", agent.cluster_id)
                } else {
                    agent.cluster_id.clone()
                };
                println!("{:<20} {}", agent.agent_id.cyan(), location);
            }
        }
    }
    Ok(())
}

/// Handle one anomaly report
async fn cmd_heal(config: &Config, report: &str, record: Option<&PathBuf>, format: OutputFormat) -> Result<()> {
    let report: AnomalyReport = serde_json::from_str(report).context("Failed to parse anomaly report")?;
    record_event(record, &ScenarioEvent::Anomaly { report: report.clone() }).await?;

    let federation = config.bootstrap().await?;
    let healer = healer_for(config, federation.directory.clone(), federation.registry.clone());
    let outcome = healer.handle(&report).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Text => {
            let cluster = match (&outcome.cluster_id, outcome.cluster_status) {
                (Some(id), Some(status)) => format!(" [{} {}]", id, status_label(status)),
                (Some(id), None) => format!(" [{} unknown]", id),
                _ => String::new(),
            };
            println!(
                "{} {}: {} -> {}{}",
                "✓".green(),
                outcome.agent_id.cyan(),
                outcome.kind.to_string().yellow(),
                outcome.remediation,
                cluster
            );
        }
    }
    Ok(())
}

/// Replay a scenario through the event service
async fn cmd_replay(config: &Config, path: &Path, only: &[String], format: OutputFormat) -> Result<()> {
    let federation = config.bootstrap().await?;
    let service = FederationService::new(config.service.clone(), federation);
    let handle = service.handle();
    let task = tokio::spawn(service.run());
    let healer = healer_for(config, handle.directory().clone(), handle.registry().clone());

    let log = ScenarioLog::new(path);
    let result = if only.is_empty() {
        log.replay(&handle, &healer).await
    } else {
        log.replay_filtered(&handle, &healer, |event| only.iter().any(|kind| kind == event.kind()))
            .await
    };
    let route_metrics = handle.router().metrics();
    let service_metrics = handle.metrics().await?;

    handle.shutdown().await?;
    task.await.context("Federation service task failed")?;

    let steps = result?;
    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "steps": steps,
                "router": route_metrics,
                "service": service_metrics,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            for (idx, step) in steps.iter().enumerate() {
                println!("{:>4} {}", (idx + 1).to_string().dimmed(), step);
            }
            println!(
                "{} {} steps, {} delivered, {} failed",
                "✓".green(),
                steps.len(),
                route_metrics.delivered_local + route_metrics.delivered_remote,
                route_metrics.agent_not_found + route_metrics.cluster_unavailable + route_metrics.transport_failures
            );
        }
    }
    Ok(())
}
