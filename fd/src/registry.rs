//! ClusterRegistry - authoritative map of known clusters and their health

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use eyre::Result;
use tracing::{debug, info};

use crate::listeners::{ListenerSet, SubscriptionId};
use crate::types::{Cluster, ClusterStatus};

/// Change notifications emitted by the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterEvent {
    /// A cluster was inserted or fully replaced
    Upserted(Cluster),

    /// A cluster was removed
    Removed { cluster_id: String },

    /// A cluster's status changed in place
    StatusChanged {
        cluster_id: String,
        previous: ClusterStatus,
        current: ClusterStatus,
    },
}

/// Concurrency-safe store of clusters keyed by `cluster_id`
///
/// Every operation takes the single map lock for the duration of one map
/// access. Reads return clones, so callers never hold references into the
/// protected state.
#[derive(Debug, Default)]
pub struct ClusterRegistry {
    clusters: Mutex<HashMap<String, Cluster>>,
    listeners: ListenerSet<ClusterEvent>,
}

impl ClusterRegistry {
    pub fn new() -> Self {
        debug!("ClusterRegistry::new: called");
        Self::default()
    }

    /// Insert a cluster, or fully replace an existing one with the same ID
    pub fn upsert(&self, cluster: Cluster) {
        debug!(cluster_id = %cluster.cluster_id, status = %cluster.status, "ClusterRegistry::upsert: called");
        self.lock().insert(cluster.cluster_id.clone(), cluster.clone());
        self.listeners.notify(&ClusterEvent::Upserted(cluster));
    }

    /// Remove a cluster; absent IDs are a no-op
    pub fn remove(&self, cluster_id: &str) -> bool {
        debug!(%cluster_id, "ClusterRegistry::remove: called");
        let removed = self.lock().remove(cluster_id).is_some();
        if removed {
            info!(%cluster_id, "Cluster removed");
            self.listeners.notify(&ClusterEvent::Removed {
                cluster_id: cluster_id.to_string(),
            });
        } else {
            debug!(%cluster_id, "remove: cluster not present");
        }
        removed
    }

    pub fn get(&self, cluster_id: &str) -> Option<Cluster> {
        debug!(%cluster_id, "ClusterRegistry::get: called");
        self.lock().get(cluster_id).cloned()
    }

    /// Point-in-time copy of every cluster, in unspecified order
    pub fn list(&self) -> Vec<Cluster> {
        debug!("ClusterRegistry::list: called");
        self.lock().values().cloned().collect()
    }

    /// Change the status of a registered cluster in place
    ///
    /// Returns false (and changes nothing) if the cluster is absent, so an
    /// update racing with removal can never bring the cluster back.
    pub fn update_status(&self, cluster_id: &str, status: ClusterStatus) -> bool {
        debug!(%cluster_id, %status, "ClusterRegistry::update_status: called");
        let previous = {
            let mut clusters = self.lock();
            match clusters.get_mut(cluster_id) {
                Some(cluster) => std::mem::replace(&mut cluster.status, status),
                None => {
                    debug!(%cluster_id, "update_status: cluster not present");
                    return false;
                }
            }
        };

        self.listeners.notify(&ClusterEvent::StatusChanged {
            cluster_id: cluster_id.to_string(),
            previous,
            current: status,
        });
        true
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Subscribe to change notifications
    ///
    /// Listeners run on the mutating thread after the registry lock has been
    /// released; they may read or mutate the registry.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&ClusterEvent) -> Result<()> + Send + Sync + 'static,
    {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Cluster>> {
        // Each critical section is a single map call, so a poisoned map is still consistent
        self.clusters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
