//! Collaborator traits for delivery and secure transport
//!
//! The router decides *where* a message goes; these traits perform the actual
//! hand-off. Implementations own all network I/O, timeouts and cancellation.

use async_trait::async_trait;
use feddir::Cluster;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::TransportError;

/// Message payload, opaque to the router
pub type Message = serde_json::Value;

/// Authentication material for peer handshakes, opaque to the controller
pub type Credentials = serde_json::Value;

/// Hands a message to an agent in the local cluster
#[async_trait]
pub trait LocalDelivery: Send + Sync {
    /// Returns Ok(false) if the message was not accepted
    async fn deliver_local(&self, agent_id: &str, message: &Message) -> Result<bool, TransportError>;
}

/// Hands a message to a peer cluster for delivery to one of its agents
#[async_trait]
pub trait RemoteDelivery: Send + Sync {
    /// Returns Ok(false) if the peer did not accept the message
    async fn deliver_remote(&self, cluster: &Cluster, message: &Message) -> Result<bool, TransportError>;
}

/// Negotiates a secure channel with a peer cluster
#[async_trait]
pub trait Transport: Send + Sync {
    async fn establish_secure_channel(
        &self,
        cluster: &Cluster,
        credentials: &Credentials,
    ) -> Result<Channel, TransportError>;
}

/// A channel to a peer cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    #[serde(rename = "session-id")]
    pub session_id: String,

    #[serde(rename = "cluster-id")]
    pub cluster_id: String,

    pub endpoint: String,

    /// False when no handshake was performed
    pub secured: bool,

    /// Unix ms
    #[serde(rename = "established-at")]
    pub established_at: i64,
}

impl Channel {
    /// A channel record for a peer reached without any handshake
    pub fn unsecured(cluster: &Cluster) -> Self {
        debug!(cluster_id = %cluster.cluster_id, "Channel::unsecured: called");
        Self {
            session_id: Uuid::now_v7().to_string(),
            cluster_id: cluster.cluster_id.clone(),
            endpoint: cluster.api_endpoint.clone(),
            secured: false,
            established_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Transport that performs no handshake and accepts every peer
///
/// Credentials are accepted and ignored. Swap in a real implementation to
/// negotiate mTLS or a tunnel.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTransport;

#[async_trait]
impl Transport for NoopTransport {
    async fn establish_secure_channel(
        &self,
        cluster: &Cluster,
        _credentials: &Credentials,
    ) -> Result<Channel, TransportError> {
        debug!(cluster_id = %cluster.cluster_id, "NoopTransport::establish_secure_channel: called");
        Ok(Channel::unsecured(cluster))
    }
}

/// Delivery that logs the hand-off and always reports success
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingDelivery;

#[async_trait]
impl LocalDelivery for LoggingDelivery {
    async fn deliver_local(&self, agent_id: &str, message: &Message) -> Result<bool, TransportError> {
        info!(%agent_id, bytes = message.to_string().len(), "Delivered message to local agent");
        Ok(true)
    }
}

#[async_trait]
impl RemoteDelivery for LoggingDelivery {
    async fn deliver_remote(&self, cluster: &Cluster, message: &Message) -> Result<bool, TransportError> {
        info!(
            cluster_id = %cluster.cluster_id,
            endpoint = %cluster.api_endpoint,
            bytes = message.to_string().len(),
            "Forwarded message to peer cluster"
        );
        Ok(true)
    }
}

/// Chooses an alternate cluster when an agent's own cluster is unavailable
pub trait FailoverPolicy: Send + Sync {
    fn select_alternate(&self, agent_id: &str) -> Option<String>;
}

/// Never selects an alternate; unavailable clusters fail the route
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFailover;

impl FailoverPolicy for NoFailover {
    fn select_alternate(&self, agent_id: &str) -> Option<String> {
        debug!(%agent_id, "NoFailover::select_alternate: called");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feddir::ClusterStatus;
    use serde_json::json;

    #[tokio::test]
    async fn test_noop_transport_ignores_credentials() {
        let cluster = Cluster::new("c2", "https://c2.example:8443", ClusterStatus::Healthy);
        let channel = NoopTransport
            .establish_secure_channel(&cluster, &json!({"cert": "unused"}))
            .await
            .unwrap();

        assert_eq!(channel.cluster_id, "c2");
        assert_eq!(channel.endpoint, "https://c2.example:8443");
        assert!(!channel.secured);
        assert!(!channel.session_id.is_empty());
    }

    #[tokio::test]
    async fn test_logging_delivery_always_succeeds() {
        let cluster = Cluster::new("c2", "https://c2.example:8443", ClusterStatus::Degraded);
        assert!(LoggingDelivery.deliver_local("a1", &json!({"x": 1})).await.unwrap());
        assert!(LoggingDelivery.deliver_remote(&cluster, &json!(null)).await.unwrap());
    }

    #[test]
    fn test_no_failover_selects_nothing() {
        assert_eq!(NoFailover.select_alternate("a1"), None);
    }

    #[test]
    fn test_channel_serialization() {
        let cluster = Cluster::new("c2", "https://c2.example:8443", ClusterStatus::Healthy);
        let json = serde_json::to_string(&Channel::unsecured(&cluster)).unwrap();
        assert!(json.contains("session-id"));
        assert!(json.contains("established-at"));
    }
}
