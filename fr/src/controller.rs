//! FederationController - peer cluster lifecycle

use std::sync::Arc;

use feddir::{Cluster, ClusterRegistry, ClusterStatus};
use tracing::{debug, info, warn};

use crate::delivery::{Channel, Credentials, NoopTransport, Transport};
use crate::error::TransportError;

/// Manages peer clusters on top of the [`ClusterRegistry`]
///
/// The local cluster ID is identity only; the local cluster does not need to
/// be registered and is never special-cased against the registry.
pub struct FederationController {
    local_cluster_id: String,
    registry: Arc<ClusterRegistry>,
    transport: Arc<dyn Transport>,
}

impl FederationController {
    /// Create a controller that records peers without negotiating a channel
    pub fn new(local_cluster_id: impl Into<String>, registry: Arc<ClusterRegistry>) -> Self {
        let local_cluster_id = local_cluster_id.into();
        debug!(%local_cluster_id, "FederationController::new: called");
        Self {
            local_cluster_id,
            registry,
            transport: Arc::new(NoopTransport),
        }
    }

    /// Use `transport` for peer handshakes
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        debug!("FederationController::with_transport: called");
        self.transport = transport;
        self
    }

    pub fn local_cluster_id(&self) -> &str {
        &self.local_cluster_id
    }

    pub fn registry(&self) -> &Arc<ClusterRegistry> {
        &self.registry
    }

    /// Federate with a peer cluster
    ///
    /// Asks the transport for a channel and, once it is established, records
    /// the cluster (replacing any previous entry). A failed handshake leaves
    /// the registry untouched.
    pub async fn establish_peer(
        &self,
        cluster: Cluster,
        credentials: &Credentials,
    ) -> Result<Channel, TransportError> {
        info!(
            local_cluster_id = %self.local_cluster_id,
            cluster_id = %cluster.cluster_id,
            endpoint = %cluster.api_endpoint,
            "Establishing federation with peer"
        );

        let channel = match self.transport.establish_secure_channel(&cluster, credentials).await {
            Ok(channel) => channel,
            Err(e) => {
                warn!(cluster_id = %cluster.cluster_id, "Peer handshake failed: {}", e);
                return Err(e);
            }
        };

        debug!(cluster_id = %cluster.cluster_id, secured = channel.secured, "establish_peer: recording peer");
        self.registry.upsert(cluster);
        Ok(channel)
    }

    /// Apply a health update pushed by a probe
    ///
    /// Unknown clusters are ignored: updates may race with removal.
    pub fn handle_peer_status_update(&self, cluster_id: &str, status: ClusterStatus) -> bool {
        debug!(%cluster_id, %status, "FederationController::handle_peer_status_update: called");
        let applied = self.registry.update_status(cluster_id, status);
        if applied {
            info!(%cluster_id, %status, "Cluster status updated");
        } else {
            debug!(%cluster_id, "handle_peer_status_update: unknown cluster, ignoring");
        }
        applied
    }

    /// Stop federating with a peer; unknown clusters are a no-op
    pub fn remove_peer(&self, cluster_id: &str) -> bool {
        info!(%cluster_id, "Removing federated peer");
        self.registry.remove(cluster_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct RejectingTransport;

    #[async_trait]
    impl Transport for RejectingTransport {
        async fn establish_secure_channel(
            &self,
            cluster: &Cluster,
            _credentials: &Credentials,
        ) -> Result<Channel, TransportError> {
            Err(TransportError::Handshake {
                cluster_id: cluster.cluster_id.clone(),
                message: "certificate rejected".to_string(),
            })
        }
    }

    fn peer(id: &str) -> Cluster {
        Cluster::new(id, format!("https://{}.example:8443", id), ClusterStatus::Healthy)
    }

    #[tokio::test]
    async fn test_establish_peer_records_cluster() {
        let registry = Arc::new(ClusterRegistry::new());
        let controller = FederationController::new("local", registry.clone());

        let channel = controller
            .establish_peer(peer("c2").with_meta("geo", "eu"), &json!({"token": "ignored"}))
            .await
            .unwrap();

        assert_eq!(channel.cluster_id, "c2");
        assert_eq!(registry.get("c2"), Some(peer("c2").with_meta("geo", "eu")));
    }

    #[tokio::test]
    async fn test_establish_peer_replaces_existing() {
        let registry = Arc::new(ClusterRegistry::new());
        let controller = FederationController::new("local", registry.clone());

        controller.establish_peer(peer("c2").with_meta("geo", "eu"), &json!(null)).await.unwrap();
        let replacement = Cluster::new("c2", "https://new.example", ClusterStatus::Degraded);
        controller.establish_peer(replacement.clone(), &json!(null)).await.unwrap();

        assert_eq!(registry.get("c2"), Some(replacement));
    }

    #[tokio::test]
    async fn test_failed_handshake_leaves_registry_untouched() {
        let registry = Arc::new(ClusterRegistry::new());
        let controller =
            FederationController::new("local", registry.clone()).with_transport(Arc::new(RejectingTransport));

        let result = controller.establish_peer(peer("c2"), &json!(null)).await;

        assert!(matches!(result, Err(TransportError::Handshake { .. })));
        assert!(registry.get("c2").is_none());
    }

    #[tokio::test]
    async fn test_status_update() {
        let registry = Arc::new(ClusterRegistry::new());
        let controller = FederationController::new("local", registry.clone());
        controller.establish_peer(peer("c2"), &json!(null)).await.unwrap();

        assert!(controller.handle_peer_status_update("c2", ClusterStatus::Offline));
        assert_eq!(registry.get("c2").unwrap().status, ClusterStatus::Offline);
    }

    #[test]
    fn test_status_update_for_unknown_cluster_is_ignored() {
        let registry = Arc::new(ClusterRegistry::new());
        let controller = FederationController::new("local", registry.clone());

        assert!(!controller.handle_peer_status_update("ghost", ClusterStatus::Healthy));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_remove_peer() {
        let registry = Arc::new(ClusterRegistry::new());
        let controller = FederationController::new("local", registry.clone());
        controller.establish_peer(peer("c2"), &json!(null)).await.unwrap();

        assert!(controller.remove_peer("c2"));
        assert!(!controller.remove_peer("c2"));
        assert!(registry.get("c2").is_none());
    }

    #[test]
    fn test_local_cluster_need_not_be_registered() {
        let registry = Arc::new(ClusterRegistry::new());
        let controller = FederationController::new("local", registry);
        assert_eq!(controller.local_cluster_id(), "local");
        assert!(controller.registry().get("local").is_none());
    }
}
