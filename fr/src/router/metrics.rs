//! Router counters

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use super::outcome::RouteFailure;

/// Routing counters (thread-safe)
#[derive(Debug, Default)]
pub struct RouterMetrics {
    delivered_local: AtomicU64,
    delivered_remote: AtomicU64,
    agent_not_found: AtomicU64,
    cluster_unavailable: AtomicU64,
    transport_failures: AtomicU64,
    transport_errors: AtomicU64,
    failover_attempts: AtomicU64,
}

/// Point-in-time copy of [`RouterMetrics`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterMetricsSnapshot {
    #[serde(rename = "delivered-local")]
    pub delivered_local: u64,
    #[serde(rename = "delivered-remote")]
    pub delivered_remote: u64,
    #[serde(rename = "agent-not-found")]
    pub agent_not_found: u64,
    #[serde(rename = "cluster-unavailable")]
    pub cluster_unavailable: u64,
    /// Deliveries a collaborator declined
    #[serde(rename = "transport-failures")]
    pub transport_failures: u64,
    /// Errors a collaborator raised
    #[serde(rename = "transport-errors")]
    pub transport_errors: u64,
    #[serde(rename = "failover-attempts")]
    pub failover_attempts: u64,
}

impl RouterMetrics {
    pub fn record_local(&self) {
        self.delivered_local.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_remote(&self) {
        self.delivered_remote.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self, failure: &RouteFailure) {
        let counter = match failure {
            RouteFailure::AgentNotFound { .. } => &self.agent_not_found,
            RouteFailure::ClusterUnavailable { .. } => &self.cluster_unavailable,
            RouteFailure::TransportFailure { .. } => &self.transport_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transport_error(&self) {
        self.transport_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failover_attempt(&self) {
        self.failover_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RouterMetricsSnapshot {
        RouterMetricsSnapshot {
            delivered_local: self.delivered_local.load(Ordering::Relaxed),
            delivered_remote: self.delivered_remote.load(Ordering::Relaxed),
            agent_not_found: self.agent_not_found.load(Ordering::Relaxed),
            cluster_unavailable: self.cluster_unavailable.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
            failover_attempts: self.failover_attempts.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_failure_by_kind() {
        let metrics = RouterMetrics::default();
        metrics.record_failure(&RouteFailure::AgentNotFound {
            agent_id: "a1".to_string(),
        });
        metrics.record_failure(&RouteFailure::ClusterUnavailable {
            cluster_id: "c2".to_string(),
        });
        metrics.record_failure(&RouteFailure::ClusterUnavailable {
            cluster_id: "c3".to_string(),
        });
        metrics.record_local();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.agent_not_found, 1);
        assert_eq!(snapshot.cluster_unavailable, 2);
        assert_eq!(snapshot.delivered_local, 1);
        assert_eq!(snapshot.transport_failures, 0);
    }
}
