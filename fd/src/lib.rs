//! FedDir - in-memory stores for federated agent routing
//!
//! Two independent, concurrency-safe stores:
//!
//! - [`ClusterRegistry`] - known peer clusters and their health
//! - [`AgentDirectory`] - which cluster each agent belongs to
//!
//! Neither store validates against the other: an agent may name a cluster the
//! registry has never heard of. Both hand out copies rather than references,
//! and both support change listeners that are notified outside the store lock.
//!
//! # Example
//!
//! ```
//! use feddir::{Agent, AgentDirectory, Cluster, ClusterRegistry, ClusterStatus};
//!
//! let registry = ClusterRegistry::new();
//! let directory = AgentDirectory::new();
//!
//! registry.upsert(Cluster::new("eu-west", "https://eu-west.example:8443", ClusterStatus::Healthy));
//! directory.register(Agent::new("planner-1", "eu-west"));
//!
//! assert_eq!(directory.list_by_cluster("eu-west").len(), 1);
//! assert!(registry.get("eu-west").unwrap().status.is_healthy());
//! ```

pub mod directory;
pub mod listeners;
pub mod registry;
pub mod types;

pub use directory::{AgentDirectory, DirectoryEvent};
pub use listeners::{Listener, ListenerSet, SubscriptionId};
pub use registry::{ClusterEvent, ClusterRegistry};
pub use types::{Agent, Cluster, ClusterStatus, Meta};
