//! Composition root wiring the stores, controller and router together

use std::sync::Arc;

use feddir::{AgentDirectory, ClusterRegistry};
use tracing::debug;

use crate::controller::FederationController;
use crate::delivery::{FailoverPolicy, LocalDelivery, RemoteDelivery, Transport};
use crate::router::FederatedRouter;

/// One process's federation state, explicitly constructed and shared by reference
pub struct Federation {
    pub registry: Arc<ClusterRegistry>,
    pub directory: Arc<AgentDirectory>,
    pub controller: FederationController,
    pub router: Arc<FederatedRouter>,
}

impl Federation {
    /// Empty stores, no-op transport, logging delivery and no failover
    pub fn new(local_cluster_id: impl Into<String>) -> Self {
        Self::builder(local_cluster_id).build()
    }

    pub fn builder(local_cluster_id: impl Into<String>) -> FederationBuilder {
        FederationBuilder {
            local_cluster_id: local_cluster_id.into(),
            transport: None,
            local_delivery: None,
            remote_delivery: None,
            failover: None,
        }
    }

    pub fn local_cluster_id(&self) -> &str {
        self.controller.local_cluster_id()
    }
}

/// Builder for [`Federation`] with injectable collaborators
pub struct FederationBuilder {
    local_cluster_id: String,
    transport: Option<Arc<dyn Transport>>,
    local_delivery: Option<Arc<dyn LocalDelivery>>,
    remote_delivery: Option<Arc<dyn RemoteDelivery>>,
    failover: Option<Arc<dyn FailoverPolicy>>,
}

impl FederationBuilder {
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn local_delivery(mut self, local: Arc<dyn LocalDelivery>) -> Self {
        self.local_delivery = Some(local);
        self
    }

    pub fn remote_delivery(mut self, remote: Arc<dyn RemoteDelivery>) -> Self {
        self.remote_delivery = Some(remote);
        self
    }

    pub fn failover(mut self, failover: Arc<dyn FailoverPolicy>) -> Self {
        self.failover = Some(failover);
        self
    }

    pub fn build(self) -> Federation {
        debug!(local_cluster_id = %self.local_cluster_id, "FederationBuilder::build: called");
        let registry = Arc::new(ClusterRegistry::new());
        let directory = Arc::new(AgentDirectory::new());

        let mut controller = FederationController::new(self.local_cluster_id.clone(), registry.clone());
        if let Some(transport) = self.transport {
            controller = controller.with_transport(transport);
        }

        let mut router = FederatedRouter::new(self.local_cluster_id, registry.clone(), directory.clone());
        if let Some(local) = self.local_delivery {
            router = router.with_local_delivery(local);
        }
        if let Some(remote) = self.remote_delivery {
            router = router.with_remote_delivery(remote);
        }
        if let Some(failover) = self.failover {
            router = router.with_failover(failover);
        }

        Federation {
            registry,
            directory,
            controller,
            router: Arc::new(router),
        }
    }
}
