//! Self-healing for anomalous agents
//!
//! Anomaly detectors push [`AnomalyReport`]s; the [`SelfHealer`] classifies
//! them and hands remediation to a [`Remediator`]. The healer reads the
//! directory and registry for context but never mutates them.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use feddir::{AgentDirectory, ClusterRegistry, ClusterStatus};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Raw metrics for one agent as emitted by an anomaly detector
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    #[serde(rename = "agent-id", alias = "agent_id", default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,

    /// Open connections; absent means 1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connections: Option<f64>,

    /// Messages per second; absent means 0
    #[serde(rename = "msg-rate", alias = "msg_rate", default, skip_serializing_if = "Option::is_none")]
    pub msg_rate: Option<f64>,

    /// Milliseconds; absent means 0
    #[serde(rename = "latency", alias = "latency-ms", default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
}

impl AnomalyReport {
    pub fn for_agent(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: Some(agent_id.into()),
            ..Default::default()
        }
    }
}

/// Classification thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealingConfig {
    /// Message rate above which an agent is storming
    #[serde(rename = "msg-rate-threshold", default = "default_msg_rate_threshold")]
    pub msg_rate_threshold: f64,

    /// Latency in milliseconds above which an agent is spiking
    #[serde(rename = "latency-threshold-ms", default = "default_latency_threshold_ms")]
    pub latency_threshold_ms: f64,
}

fn default_msg_rate_threshold() -> f64 {
    1000.0
}

fn default_latency_threshold_ms() -> f64 {
    1000.0
}

impl Default for HealingConfig {
    fn default() -> Self {
        Self {
            msg_rate_threshold: default_msg_rate_threshold(),
            latency_threshold_ms: default_latency_threshold_ms(),
        }
    }
}

/// High-level anomaly type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnomalyKind {
    Disconnect,
    MessageStorm,
    LatencySpike,
    Unknown,
}

impl AnomalyKind {
    /// Classify a report; rules are checked in order and the first match wins
    pub fn classify(report: &AnomalyReport, config: &HealingConfig) -> Self {
        if report.connections.unwrap_or(1.0) == 0.0 {
            return AnomalyKind::Disconnect;
        }
        if report.msg_rate.unwrap_or(0.0) > config.msg_rate_threshold {
            return AnomalyKind::MessageStorm;
        }
        if report.latency_ms.unwrap_or(0.0) > config.latency_threshold_ms {
            return AnomalyKind::LatencySpike;
        }
        AnomalyKind::Unknown
    }
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnomalyKind::Disconnect => write!(f, "disconnect"),
            AnomalyKind::MessageStorm => write!(f, "message-storm"),
            AnomalyKind::LatencySpike => write!(f, "latency-spike"),
            AnomalyKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// Action taken for an anomaly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Remediation {
    Restarted,
    Throttled,
    Investigate,
    None,
}

impl fmt::Display for Remediation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Remediation::Restarted => write!(f, "restarted"),
            Remediation::Throttled => write!(f, "throttled"),
            Remediation::Investigate => write!(f, "investigate"),
            Remediation::None => write!(f, "none"),
        }
    }
}

/// Result of handling one report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealingOutcome {
    #[serde(rename = "agent-id")]
    pub agent_id: String,

    pub kind: AnomalyKind,

    pub remediation: Remediation,

    /// Owning cluster, when the agent is registered
    #[serde(rename = "cluster-id", skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<String>,

    /// Health of the owning cluster, when it is registered
    #[serde(rename = "cluster-status", skip_serializing_if = "Option::is_none")]
    pub cluster_status: Option<ClusterStatus>,
}

/// Errors from the self-healing collaborator
#[derive(Debug, Error)]
pub enum HealingError {
    #[error("Anomaly report has no agent-id")]
    MissingAgentId,

    #[error("Failed to {action} agent {agent_id}: {message}")]
    RemediationFailed {
        agent_id: String,
        action: &'static str,
        message: String,
    },
}

/// Performs remediation actions against agents
#[async_trait]
pub trait Remediator: Send + Sync {
    async fn restart_agent(&self, agent_id: &str) -> eyre::Result<()>;

    async fn throttle_agent(&self, agent_id: &str) -> eyre::Result<()>;
}

/// Remediator that only logs what it would do
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingRemediator;

#[async_trait]
impl Remediator for LoggingRemediator {
    async fn restart_agent(&self, agent_id: &str) -> eyre::Result<()> {
        info!(%agent_id, "Simulated restart");
        Ok(())
    }

    async fn throttle_agent(&self, agent_id: &str) -> eyre::Result<()> {
        info!(%agent_id, "Simulated throttle");
        Ok(())
    }
}

/// Classifies anomaly reports and dispatches remediation
pub struct SelfHealer {
    directory: Arc<AgentDirectory>,
    registry: Arc<ClusterRegistry>,
    remediator: Arc<dyn Remediator>,
    config: HealingConfig,
}

impl SelfHealer {
    pub fn new(
        directory: Arc<AgentDirectory>,
        registry: Arc<ClusterRegistry>,
        remediator: Arc<dyn Remediator>,
        config: HealingConfig,
    ) -> Self {
        debug!(?config, "SelfHealer::new: called");
        Self {
            directory,
            registry,
            remediator,
            config,
        }
    }

    pub fn config(&self) -> &HealingConfig {
        &self.config
    }

    /// Handle one anomaly report
    ///
    /// Unregistered agents are still classified and remediated; the outcome
    /// just carries no cluster context.
    pub async fn handle(&self, report: &AnomalyReport) -> Result<HealingOutcome, HealingError> {
        debug!(?report, "SelfHealer::handle: called");
        let Some(agent_id) = report.agent_id.as_deref().filter(|id| !id.is_empty()) else {
            error!(?report, "Anomaly missing agent-id");
            return Err(HealingError::MissingAgentId);
        };

        let kind = AnomalyKind::classify(report, &self.config);
        warn!(%agent_id, %kind, "Anomaly detected");

        let cluster_id = self.directory.find(agent_id).map(|agent| agent.cluster_id);
        let cluster_status = cluster_id
            .as_deref()
            .and_then(|id| self.registry.get(id))
            .map(|cluster| cluster.status);

        let remediation = match kind {
            AnomalyKind::Disconnect => {
                self.remediator
                    .restart_agent(agent_id)
                    .await
                    .map_err(|e| remediation_failed(agent_id, "restart", e))?;
                Remediation::Restarted
            }
            AnomalyKind::MessageStorm => {
                warn!(%agent_id, "Throttling agent due to message storm");
                self.remediator
                    .throttle_agent(agent_id)
                    .await
                    .map_err(|e| remediation_failed(agent_id, "throttle", e))?;
                Remediation::Throttled
            }
            AnomalyKind::LatencySpike => {
                warn!(%agent_id, ?cluster_status, "Latency spike, investigating");
                Remediation::Investigate
            }
            AnomalyKind::Unknown => Remediation::None,
        };

        Ok(HealingOutcome {
            agent_id: agent_id.to_string(),
            kind,
            remediation,
            cluster_id,
            cluster_status,
        })
    }
}

fn remediation_failed(agent_id: &str, action: &'static str, err: eyre::Report) -> HealingError {
    HealingError::RemediationFailed {
        agent_id: agent_id.to_string(),
        action,
        message: err.to_string(),
    }
}
