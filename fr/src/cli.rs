//! CLI command definitions and subcommands

use clap::builder::PossibleValuesParser;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::scenario::ScenarioEvent;

/// fedrouter - federated agent directory and router
#[derive(Parser)]
#[command(
    name = "fr",
    about = "Route messages to agents across federated clusters",
    version,
    after_help = "Config is read from --config, ./fedrouter.yml or ~/.config/fedrouter/fedrouter.yml"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Route a message to an agent and report the outcome
    Route {
        /// Destination agent ID
        agent_id: String,

        /// Message payload as JSON
        #[arg(short, long)]
        message: Option<String>,

        /// Append the request to this scenario file
        #[arg(long, value_name = "PATH")]
        record: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List known peer clusters and their health
    Clusters {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List registered agents
    Agents {
        /// Only agents owned by this cluster
        #[arg(long)]
        cluster: Option<String>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Classify an anomaly report and apply remediation
    Heal {
        /// Anomaly report as JSON, e.g. '{"agent_id":"a1","connections":0}'
        report: String,

        /// Append the report to this scenario file
        #[arg(long, value_name = "PATH")]
        record: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Replay a JSON-lines scenario against the configured federation
    Replay {
        /// Scenario file
        path: PathBuf,

        /// Only apply events of this kind (repeatable)
        #[arg(long, value_name = "EVENT", value_parser = PossibleValuesParser::new(ScenarioEvent::KINDS))]
        only: Vec<String>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Output format for command results
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}
