//! Route outcomes

use serde::Serialize;
use thiserror::Error;

/// Why a message could not be routed
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum RouteFailure {
    /// The destination agent is not in the directory
    #[error("Agent {agent_id} not found")]
    AgentNotFound {
        #[serde(rename = "agent-id")]
        agent_id: String,
    },

    /// The agent's cluster is unknown or not healthy, and no alternate was usable
    #[error("Cluster {cluster_id} unavailable")]
    ClusterUnavailable {
        #[serde(rename = "cluster-id")]
        cluster_id: String,
    },

    /// A delivery collaborator declined the message
    #[error("Delivery to {target} was not accepted")]
    TransportFailure { target: String },
}

/// Result of a routing decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Handed to the local delivery collaborator
    DeliveredLocal,

    /// Handed to a peer cluster
    DeliveredRemote { via_cluster_id: String },

    Failed(RouteFailure),
}

impl RouteOutcome {
    pub fn is_delivered(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }

    /// JSON form used by the CLI and scenario output
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::DeliveredLocal => serde_json::json!({"outcome": "delivered", "path": "local"}),
            Self::DeliveredRemote { via_cluster_id } => {
                serde_json::json!({"outcome": "delivered", "path": "remote", "via-cluster-id": via_cluster_id})
            }
            Self::Failed(failure) => serde_json::json!({
                "outcome": "failed",
                "failure": failure,
                "message": failure.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for RouteOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DeliveredLocal => write!(f, "delivered locally"),
            Self::DeliveredRemote { via_cluster_id } => write!(f, "delivered via cluster {}", via_cluster_id),
            Self::Failed(failure) => write!(f, "failed: {}", failure),
        }
    }
}
