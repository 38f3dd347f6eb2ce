//! Message types for the FederationService

use feddir::{Agent, Cluster, ClusterStatus};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::delivery::{Channel, Credentials};
use crate::error::TransportError;

/// Internal requests to the FederationService task
///
/// Every mutation carries a reply so callers observe their own writes before
/// routing.
#[derive(Debug)]
pub enum FederationRequest {
    /// Handshake with and record a peer cluster
    EstablishPeer {
        cluster: Cluster,
        credentials: Credentials,
        reply_tx: oneshot::Sender<Result<Channel, TransportError>>,
    },

    /// Health probe result for a peer
    PeerStatus {
        cluster_id: String,
        status: ClusterStatus,
        reply_tx: oneshot::Sender<bool>,
    },

    /// Stop federating with a peer
    RemovePeer {
        cluster_id: String,
        reply_tx: oneshot::Sender<bool>,
    },

    /// Agent joined
    RegisterAgent { agent: Agent, reply_tx: oneshot::Sender<()> },

    /// Agent left
    UnregisterAgent {
        agent_id: String,
        reply_tx: oneshot::Sender<bool>,
    },

    /// Get current metrics
    GetMetrics {
        reply_tx: oneshot::Sender<ServiceMetrics>,
    },

    /// Shutdown the service
    Shutdown,
}

/// Service metrics for observability
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceMetrics {
    #[serde(rename = "requests-received")]
    pub requests_received: u64,
    #[serde(rename = "peers-established")]
    pub peers_established: u64,
    #[serde(rename = "handshake-failures")]
    pub handshake_failures: u64,
    #[serde(rename = "peers-removed")]
    pub peers_removed: u64,
    #[serde(rename = "status-updates-applied")]
    pub status_updates_applied: u64,
    #[serde(rename = "status-updates-ignored")]
    pub status_updates_ignored: u64,
    #[serde(rename = "agents-registered")]
    pub agents_registered: u64,
    #[serde(rename = "agents-unregistered")]
    pub agents_unregistered: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_serialization() {
        let metrics = ServiceMetrics {
            status_updates_ignored: 3,
            ..Default::default()
        };

        let json = serde_json::to_string(&metrics).unwrap();
        assert!(json.contains("status-updates-ignored"));

        let parsed: ServiceMetrics = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, metrics);
    }
}
