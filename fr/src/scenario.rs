//! Scenario recording and replay
//!
//! A scenario is a JSON-lines log of federation events (peer handshakes,
//! health pushes, agent churn, route requests and anomaly reports). Replaying
//! one drives a live federation step by step, which makes routing behavior
//! reproducible outside a real deployment.

use std::fmt;
use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use feddir::{Agent, Cluster, ClusterStatus};
use serde::{Deserialize, Serialize, Serializer};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::delivery::{Channel, Credentials, Message};
use crate::healing::{AnomalyReport, HealingOutcome, SelfHealer};
use crate::router::RouteOutcome;
use crate::service::FederationHandle;

/// One recorded federation event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ScenarioEvent {
    EstablishPeer {
        cluster: Cluster,
        #[serde(default)]
        credentials: Credentials,
    },

    PeerStatus {
        #[serde(rename = "cluster-id")]
        cluster_id: String,
        status: ClusterStatus,
    },

    RemovePeer {
        #[serde(rename = "cluster-id")]
        cluster_id: String,
    },

    RegisterAgent { agent: Agent },

    UnregisterAgent {
        #[serde(rename = "agent-id")]
        agent_id: String,
    },

    Route {
        #[serde(rename = "agent-id")]
        agent_id: String,
        #[serde(default)]
        message: Message,
    },

    Anomaly { report: AnomalyReport },
}

impl ScenarioEvent {
    /// Every value [`ScenarioEvent::kind`] can return
    pub const KINDS: [&'static str; 7] = [
        "establish-peer",
        "peer-status",
        "remove-peer",
        "register-agent",
        "unregister-agent",
        "route",
        "anomaly",
    ];

    /// The `event` tag this variant is written with
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EstablishPeer { .. } => "establish-peer",
            Self::PeerStatus { .. } => "peer-status",
            Self::RemovePeer { .. } => "remove-peer",
            Self::RegisterAgent { .. } => "register-agent",
            Self::UnregisterAgent { .. } => "unregister-agent",
            Self::Route { .. } => "route",
            Self::Anomaly { .. } => "anomaly",
        }
    }
}

/// What applying one event produced
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "step", rename_all = "kebab-case")]
pub enum StepOutcome {
    PeerEstablished { channel: Channel },

    StatusUpdated {
        #[serde(rename = "cluster-id")]
        cluster_id: String,
        applied: bool,
    },

    PeerRemoved {
        #[serde(rename = "cluster-id")]
        cluster_id: String,
        removed: bool,
    },

    AgentRegistered {
        #[serde(rename = "agent-id")]
        agent_id: String,
    },

    AgentUnregistered {
        #[serde(rename = "agent-id")]
        agent_id: String,
        removed: bool,
    },

    Routed {
        #[serde(rename = "agent-id")]
        agent_id: String,
        #[serde(serialize_with = "serialize_route_outcome")]
        outcome: RouteOutcome,
    },

    Healed { outcome: HealingOutcome },
}

fn serialize_route_outcome<S: Serializer>(outcome: &RouteOutcome, serializer: S) -> Result<S::Ok, S::Error> {
    outcome.to_json().serialize(serializer)
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PeerEstablished { channel } => {
                write!(f, "peer {} established ({})", channel.cluster_id, channel.endpoint)
            }
            Self::StatusUpdated { cluster_id, applied: true } => write!(f, "peer {} status updated", cluster_id),
            Self::StatusUpdated { cluster_id, applied: false } => {
                write!(f, "peer {} unknown, status ignored", cluster_id)
            }
            Self::PeerRemoved { cluster_id, removed: true } => write!(f, "peer {} removed", cluster_id),
            Self::PeerRemoved { cluster_id, removed: false } => write!(f, "peer {} was not known", cluster_id),
            Self::AgentRegistered { agent_id } => write!(f, "agent {} registered", agent_id),
            Self::AgentUnregistered { agent_id, removed: true } => write!(f, "agent {} unregistered", agent_id),
            Self::AgentUnregistered { agent_id, removed: false } => write!(f, "agent {} was not known", agent_id),
            Self::Routed { agent_id, outcome } => write!(f, "route to {}: {}", agent_id, outcome),
            Self::Healed { outcome } => write!(
                f,
                "anomaly on {}: {} -> {}",
                outcome.agent_id, outcome.kind, outcome.remediation
            ),
        }
    }
}

/// Apply one event to a running federation
///
/// Mutations go through the service handle and are acknowledged before this
/// returns, so a following route observes them.
pub async fn apply(event: ScenarioEvent, handle: &FederationHandle, healer: &SelfHealer) -> Result<StepOutcome> {
    debug!(?event, "scenario::apply: called");
    let outcome = match event {
        ScenarioEvent::EstablishPeer { cluster, credentials } => {
            let channel = handle.establish_peer(cluster, credentials).await?;
            StepOutcome::PeerEstablished { channel }
        }
        ScenarioEvent::PeerStatus { cluster_id, status } => {
            let applied = handle.peer_status(&cluster_id, status).await?;
            StepOutcome::StatusUpdated { cluster_id, applied }
        }
        ScenarioEvent::RemovePeer { cluster_id } => {
            let removed = handle.remove_peer(&cluster_id).await?;
            StepOutcome::PeerRemoved { cluster_id, removed }
        }
        ScenarioEvent::RegisterAgent { agent } => {
            let agent_id = agent.agent_id.clone();
            handle.register_agent(agent).await?;
            StepOutcome::AgentRegistered { agent_id }
        }
        ScenarioEvent::UnregisterAgent { agent_id } => {
            let removed = handle.unregister_agent(&agent_id).await?;
            StepOutcome::AgentUnregistered { agent_id, removed }
        }
        ScenarioEvent::Route { agent_id, message } => {
            let outcome = handle.route(&agent_id, &message).await?;
            StepOutcome::Routed { agent_id, outcome }
        }
        ScenarioEvent::Anomaly { report } => {
            let outcome = healer.handle(&report).await?;
            StepOutcome::Healed { outcome }
        }
    };
    Ok(outcome)
}

/// Append-only JSON-lines scenario file
pub struct ScenarioLog {
    path: PathBuf,
}

impl ScenarioLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        debug!(?path, "ScenarioLog::new: called");
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an event
    pub async fn record(&self, event: &ScenarioEvent) -> Result<()> {
        debug!(path = ?self.path, "ScenarioLog::record: called");
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }

        let line = serde_json::to_string(event)? + "\n";
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .context(format!("Failed to open scenario {}", self.path.display()))?;

        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Read every event in order
    ///
    /// Blank lines are skipped; a malformed line is an error naming its line
    /// number.
    pub async fn events(&self) -> Result<Vec<ScenarioEvent>> {
        debug!(path = ?self.path, "ScenarioLog::events: called");
        let content = fs::read_to_string(&self.path)
            .await
            .context(format!("Failed to read scenario {}", self.path.display()))?;

        let mut events = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let event: ScenarioEvent = serde_json::from_str(line)
                .context(format!("Invalid event at {}:{}", self.path.display(), idx + 1))?;
            events.push(event);
        }

        debug!(count = events.len(), "ScenarioLog::events: loaded");
        Ok(events)
    }

    /// Apply every event in order, stopping at the first error
    pub async fn replay(&self, handle: &FederationHandle, healer: &SelfHealer) -> Result<Vec<StepOutcome>> {
        self.replay_filtered(handle, healer, |_| true).await
    }

    /// Apply the events `filter` accepts, in order, stopping at the first error
    ///
    /// Skipped events are not applied. Step numbers in errors count every
    /// line of the log, so they point at the failing event in the file.
    pub async fn replay_filtered<F>(
        &self,
        handle: &FederationHandle,
        healer: &SelfHealer,
        filter: F,
    ) -> Result<Vec<StepOutcome>>
    where
        F: Fn(&ScenarioEvent) -> bool,
    {
        let events = self.events().await?;
        info!(path = %self.path.display(), count = events.len(), "Replaying scenario");

        let mut outcomes = Vec::with_capacity(events.len());
        for (idx, event) in events.into_iter().enumerate() {
            if !filter(&event) {
                debug!(step = idx + 1, kind = event.kind(), "Skipping filtered event");
                continue;
            }
            let outcome = apply(event, handle, healer)
                .await
                .context(format!("Scenario step {} failed", idx + 1))?;
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }
}
