//! FederatedRouter - local vs. remote delivery decisions

use std::sync::Arc;

use feddir::{Agent, AgentDirectory, Cluster, ClusterRegistry};
use tracing::{debug, error, info, warn};

use super::metrics::{RouterMetrics, RouterMetricsSnapshot};
use super::outcome::{RouteFailure, RouteOutcome};
use crate::delivery::{FailoverPolicy, LocalDelivery, LoggingDelivery, Message, NoFailover, RemoteDelivery};
use crate::error::TransportError;

/// Routes messages to agents, locally or through peer clusters
///
/// The router only reads the directory and registry. It takes no locks of its
/// own, so a decision is consistent per lookup: a cluster's health may change
/// between the agent lookup and the cluster lookup.
pub struct FederatedRouter {
    local_cluster_id: String,
    registry: Arc<ClusterRegistry>,
    directory: Arc<AgentDirectory>,
    local: Arc<dyn LocalDelivery>,
    remote: Arc<dyn RemoteDelivery>,
    failover: Arc<dyn FailoverPolicy>,
    metrics: RouterMetrics,
}

impl FederatedRouter {
    /// Create a router with logging delivery and no failover
    pub fn new(
        local_cluster_id: impl Into<String>,
        registry: Arc<ClusterRegistry>,
        directory: Arc<AgentDirectory>,
    ) -> Self {
        let local_cluster_id = local_cluster_id.into();
        debug!(%local_cluster_id, "FederatedRouter::new: called");
        Self {
            local_cluster_id,
            registry,
            directory,
            local: Arc::new(LoggingDelivery),
            remote: Arc::new(LoggingDelivery),
            failover: Arc::new(NoFailover),
            metrics: RouterMetrics::default(),
        }
    }

    pub fn with_local_delivery(mut self, local: Arc<dyn LocalDelivery>) -> Self {
        self.local = local;
        self
    }

    pub fn with_remote_delivery(mut self, remote: Arc<dyn RemoteDelivery>) -> Self {
        self.remote = remote;
        self
    }

    pub fn with_failover(mut self, failover: Arc<dyn FailoverPolicy>) -> Self {
        self.failover = failover;
        self
    }

    pub fn local_cluster_id(&self) -> &str {
        &self.local_cluster_id
    }

    /// Peer clusters this router consults
    pub fn registry(&self) -> &Arc<ClusterRegistry> {
        &self.registry
    }

    /// Agent locations this router consults
    pub fn directory(&self) -> &Arc<AgentDirectory> {
        &self.directory
    }

    pub fn metrics(&self) -> RouterMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Route `message` to `dest_agent_id`
    ///
    /// Lookup misses and unavailable clusters are reported as
    /// [`RouteOutcome::Failed`]. Errors raised by a delivery collaborator are
    /// returned as-is; the router never retries.
    pub async fn route_message(&self, dest_agent_id: &str, message: &Message) -> Result<RouteOutcome, TransportError> {
        debug!(%dest_agent_id, "FederatedRouter::route_message: called");

        let Some(agent) = self.directory.find(dest_agent_id) else {
            error!(%dest_agent_id, "Destination agent not found");
            return Ok(self.fail(RouteFailure::AgentNotFound {
                agent_id: dest_agent_id.to_string(),
            }));
        };

        if agent.cluster_id == self.local_cluster_id {
            return self.deliver_local(&agent, message).await;
        }

        match self.registry.get(&agent.cluster_id) {
            Some(cluster) if cluster.status.is_healthy() => {
                info!(%dest_agent_id, cluster_id = %cluster.cluster_id, "Routing message via peer cluster");
                self.deliver_remote(&cluster, message).await
            }
            other => {
                let status = other.map(|c| c.status.to_string());
                warn!(
                    %dest_agent_id,
                    cluster_id = %agent.cluster_id,
                    status = status.as_deref().unwrap_or("unknown"),
                    "Cluster unavailable, attempting failover"
                );
                self.failover(&agent, message).await
            }
        }
    }

    async fn deliver_local(&self, agent: &Agent, message: &Message) -> Result<RouteOutcome, TransportError> {
        debug!(agent_id = %agent.agent_id, "FederatedRouter::deliver_local: called");
        match self.local.deliver_local(&agent.agent_id, message).await {
            Ok(true) => {
                self.metrics.record_local();
                Ok(RouteOutcome::DeliveredLocal)
            }
            Ok(false) => Ok(self.fail(RouteFailure::TransportFailure {
                target: agent.agent_id.clone(),
            })),
            Err(e) => {
                self.metrics.record_transport_error();
                Err(e)
            }
        }
    }

    async fn deliver_remote(&self, cluster: &Cluster, message: &Message) -> Result<RouteOutcome, TransportError> {
        debug!(cluster_id = %cluster.cluster_id, "FederatedRouter::deliver_remote: called");
        match self.remote.deliver_remote(cluster, message).await {
            Ok(true) => {
                self.metrics.record_remote();
                Ok(RouteOutcome::DeliveredRemote {
                    via_cluster_id: cluster.cluster_id.clone(),
                })
            }
            Ok(false) => Ok(self.fail(RouteFailure::TransportFailure {
                target: cluster.cluster_id.clone(),
            })),
            Err(e) => {
                self.metrics.record_transport_error();
                Err(e)
            }
        }
    }

    /// At most one alternate is tried, and only if the policy names one
    async fn failover(&self, agent: &Agent, message: &Message) -> Result<RouteOutcome, TransportError> {
        let unavailable = RouteFailure::ClusterUnavailable {
            cluster_id: agent.cluster_id.clone(),
        };

        let Some(alternate_id) = self.failover.select_alternate(&agent.agent_id) else {
            debug!(agent_id = %agent.agent_id, "failover: no alternate cluster selected");
            return Ok(self.fail(unavailable));
        };

        self.metrics.record_failover_attempt();
        match self.registry.get(&alternate_id) {
            Some(alternate) if alternate.status.is_healthy() => {
                info!(agent_id = %agent.agent_id, %alternate_id, "Failing over to alternate cluster");
                self.deliver_remote(&alternate, message).await
            }
            _ => {
                warn!(agent_id = %agent.agent_id, %alternate_id, "Alternate cluster unavailable");
                Ok(self.fail(unavailable))
            }
        }
    }

    fn fail(&self, failure: RouteFailure) -> RouteOutcome {
        self.metrics.record_failure(&failure);
        RouteOutcome::Failed(failure)
    }
}
