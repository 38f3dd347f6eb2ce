//! FederationHandle - client interface for federation events and routing

use std::sync::Arc;

use eyre::{Result, eyre};
use feddir::{Agent, AgentDirectory, Cluster, ClusterRegistry, ClusterStatus};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::messages::{FederationRequest, ServiceMetrics};
use crate::delivery::{Channel, Credentials, Message};
use crate::router::{FederatedRouter, RouteOutcome};

/// Handle for collaborators to interact with the FederationService
///
/// Cloneable. Mutations are serialized through the service task and
/// acknowledged before the call returns; routing goes straight to the shared
/// router and runs concurrently.
#[derive(Clone)]
pub struct FederationHandle {
    /// Sender to the FederationService task
    tx: mpsc::Sender<FederationRequest>,

    router: Arc<FederatedRouter>,
}

impl FederationHandle {
    pub(crate) fn new(tx: mpsc::Sender<FederationRequest>, router: Arc<FederatedRouter>) -> Self {
        debug!("FederationHandle::new: called");
        Self { tx, router }
    }

    /// The shared router
    pub fn router(&self) -> &Arc<FederatedRouter> {
        &self.router
    }

    /// Read-only view of peer clusters; mutate through the handle
    pub fn registry(&self) -> &Arc<ClusterRegistry> {
        self.router.registry()
    }

    /// Read-only view of agent locations; mutate through the handle
    pub fn directory(&self) -> &Arc<AgentDirectory> {
        self.router.directory()
    }

    /// Federate with a peer cluster
    pub async fn establish_peer(&self, cluster: Cluster, credentials: Credentials) -> Result<Channel> {
        debug!(cluster_id = %cluster.cluster_id, "FederationHandle::establish_peer: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(FederationRequest::EstablishPeer {
            cluster,
            credentials,
            reply_tx,
        })
        .await?;

        let channel = reply_rx
            .await
            .map_err(|_| eyre!("Federation service shutdown before reply"))??;
        Ok(channel)
    }

    /// Push a health probe result; returns false if the cluster is unknown
    pub async fn peer_status(&self, cluster_id: &str, status: ClusterStatus) -> Result<bool> {
        debug!(%cluster_id, %status, "FederationHandle::peer_status: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(FederationRequest::PeerStatus {
            cluster_id: cluster_id.to_string(),
            status,
            reply_tx,
        })
        .await?;

        reply_rx.await.map_err(|_| eyre!("Federation service shutdown before reply"))
    }

    /// Stop federating with a peer; returns false if it was not known
    pub async fn remove_peer(&self, cluster_id: &str) -> Result<bool> {
        debug!(%cluster_id, "FederationHandle::remove_peer: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(FederationRequest::RemovePeer {
            cluster_id: cluster_id.to_string(),
            reply_tx,
        })
        .await?;

        reply_rx.await.map_err(|_| eyre!("Federation service shutdown before reply"))
    }

    /// Record an agent joining (or moving between clusters)
    pub async fn register_agent(&self, agent: Agent) -> Result<()> {
        debug!(agent_id = %agent.agent_id, "FederationHandle::register_agent: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(FederationRequest::RegisterAgent { agent, reply_tx }).await?;

        reply_rx.await.map_err(|_| eyre!("Federation service shutdown before reply"))
    }

    /// Record an agent leaving; returns false if it was not known
    pub async fn unregister_agent(&self, agent_id: &str) -> Result<bool> {
        debug!(%agent_id, "FederationHandle::unregister_agent: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(FederationRequest::UnregisterAgent {
            agent_id: agent_id.to_string(),
            reply_tx,
        })
        .await?;

        reply_rx.await.map_err(|_| eyre!("Federation service shutdown before reply"))
    }

    /// Route a message through the shared router
    pub async fn route(&self, dest_agent_id: &str, message: &Message) -> Result<RouteOutcome> {
        debug!(%dest_agent_id, "FederationHandle::route: called");
        Ok(self.router.route_message(dest_agent_id, message).await?)
    }

    /// Get current service metrics
    pub async fn metrics(&self) -> Result<ServiceMetrics> {
        debug!("FederationHandle::metrics: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(FederationRequest::GetMetrics { reply_tx }).await?;

        reply_rx.await.map_err(|_| eyre!("Federation service shutdown before reply"))
    }

    /// Ask the service task to stop
    pub async fn shutdown(&self) -> Result<()> {
        debug!("FederationHandle::shutdown: called");
        self.send(FederationRequest::Shutdown).await
    }

    async fn send(&self, req: FederationRequest) -> Result<()> {
        self.tx
            .send(req)
            .await
            .map_err(|_| eyre!("Federation service channel closed"))
    }
}
