//! Cluster and agent records

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Open key/value metadata (geography, capabilities, ...)
pub type Meta = BTreeMap<String, String>;

/// Health of a federated cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClusterStatus {
    #[default]
    Healthy,
    Degraded,
    Offline,
}

impl ClusterStatus {
    /// Only healthy clusters are eligible for remote delivery
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}

impl std::fmt::Display for ClusterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded => write!(f, "degraded"),
            Self::Offline => write!(f, "offline"),
        }
    }
}

impl std::str::FromStr for ClusterStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "healthy" => Ok(Self::Healthy),
            "degraded" => Ok(Self::Degraded),
            "offline" => Ok(Self::Offline),
            _ => Err(format!("Unknown cluster status: {}", s)),
        }
    }
}

/// A peer cluster known to the federation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    #[serde(rename = "cluster-id")]
    pub cluster_id: String,

    /// Address used to reach the cluster's API
    #[serde(rename = "api-endpoint")]
    pub api_endpoint: String,

    #[serde(default)]
    pub status: ClusterStatus,

    #[serde(default)]
    pub meta: Meta,
}

impl Cluster {
    pub fn new(cluster_id: impl Into<String>, api_endpoint: impl Into<String>, status: ClusterStatus) -> Self {
        let cluster_id = cluster_id.into();
        debug!(%cluster_id, %status, "Cluster::new: called");
        Self {
            cluster_id,
            api_endpoint: api_endpoint.into(),
            status,
            meta: Meta::new(),
        }
    }

    /// Attach a metadata entry
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }
}

/// An addressable agent and the cluster that currently owns it
///
/// `cluster_id` is advisory: it may name a cluster the registry has never
/// seen, and such an agent is still routable (to an unavailable cluster).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    #[serde(rename = "agent-id")]
    pub agent_id: String,

    #[serde(rename = "cluster-id")]
    pub cluster_id: String,

    #[serde(default)]
    pub meta: Meta,
}

impl Agent {
    pub fn new(agent_id: impl Into<String>, cluster_id: impl Into<String>) -> Self {
        let agent_id = agent_id.into();
        let cluster_id = cluster_id.into();
        debug!(%agent_id, %cluster_id, "Agent::new: called");
        Self {
            agent_id,
            cluster_id,
            meta: Meta::new(),
        }
    }

    /// Attach a metadata entry
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }
}
