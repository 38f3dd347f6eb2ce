//! Main FederationService task implementation

use std::sync::Arc;

use feddir::AgentDirectory;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::config::ServiceConfig;
use super::handle::FederationHandle;
use super::messages::{FederationRequest, ServiceMetrics};
use crate::controller::FederationController;
use crate::federation::Federation;
use crate::router::FederatedRouter;

/// Applies external federation events one at a time
///
/// Peer handshakes, health probe pushes and agent join/leave events all flow
/// through this task, so they are applied in arrival order. Handshakes run
/// inline: a slow transport delays later events.
pub struct FederationService {
    tx: mpsc::Sender<FederationRequest>,
    rx: mpsc::Receiver<FederationRequest>,
    controller: FederationController,
    directory: Arc<AgentDirectory>,
    router: Arc<FederatedRouter>,
}

impl FederationService {
    /// Create a service that owns `federation`'s controller
    pub fn new(config: ServiceConfig, federation: Federation) -> Self {
        debug!(channel_buffer = config.channel_buffer, "FederationService::new: called");
        let (tx, rx) = mpsc::channel(config.channel_buffer);
        Self {
            tx,
            rx,
            controller: federation.controller,
            directory: federation.directory,
            router: federation.router,
        }
    }

    /// Create a handle for submitting events and routing
    pub fn handle(&self) -> FederationHandle {
        FederationHandle::new(self.tx.clone(), self.router.clone())
    }

    /// Run the service task
    ///
    /// This consumes the service and runs until shutdown is requested or every
    /// handle has been dropped.
    pub async fn run(self) {
        let Self {
            tx,
            mut rx,
            controller,
            directory,
            router: _,
        } = self;
        // Only handles keep the channel open
        drop(tx);

        let mut metrics = ServiceMetrics::default();

        info!(local_cluster_id = %controller.local_cluster_id(), "Federation service started");

        while let Some(req) = rx.recv().await {
            metrics.requests_received += 1;

            match req {
                FederationRequest::EstablishPeer {
                    cluster,
                    credentials,
                    reply_tx,
                } => {
                    let result = controller.establish_peer(cluster, &credentials).await;
                    match result {
                        Ok(_) => metrics.peers_established += 1,
                        Err(_) => metrics.handshake_failures += 1,
                    }
                    let _ = reply_tx.send(result);
                }

                FederationRequest::PeerStatus {
                    cluster_id,
                    status,
                    reply_tx,
                } => {
                    let applied = controller.handle_peer_status_update(&cluster_id, status);
                    if applied {
                        metrics.status_updates_applied += 1;
                    } else {
                        metrics.status_updates_ignored += 1;
                    }
                    let _ = reply_tx.send(applied);
                }

                FederationRequest::RemovePeer { cluster_id, reply_tx } => {
                    let removed = controller.remove_peer(&cluster_id);
                    if removed {
                        metrics.peers_removed += 1;
                    }
                    let _ = reply_tx.send(removed);
                }

                FederationRequest::RegisterAgent { agent, reply_tx } => {
                    debug!(agent_id = %agent.agent_id, cluster_id = %agent.cluster_id, "Registering agent");
                    directory.register(agent);
                    metrics.agents_registered += 1;
                    let _ = reply_tx.send(());
                }

                FederationRequest::UnregisterAgent { agent_id, reply_tx } => {
                    debug!(%agent_id, "Unregistering agent");
                    let removed = directory.unregister(&agent_id);
                    if removed {
                        metrics.agents_unregistered += 1;
                    }
                    let _ = reply_tx.send(removed);
                }

                FederationRequest::GetMetrics { reply_tx } => {
                    let _ = reply_tx.send(metrics.clone());
                }

                FederationRequest::Shutdown => {
                    info!("Federation service shutting down");
                    break;
                }
            }
        }

        if metrics.handshake_failures > 0 {
            warn!(failures = metrics.handshake_failures, "Peer handshakes failed during this run");
        }
        info!("Federation service stopped");
    }
}
