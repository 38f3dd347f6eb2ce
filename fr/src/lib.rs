//! fedrouter - routing across federated agent clusters
//!
//! Composes the [`feddir`] stores into a working federation:
//!
//! - [`FederationController`] manages peer clusters: handshake, health updates, removal
//! - [`FederatedRouter`] decides local vs remote delivery for each message
//! - [`FederationService`] serializes external events onto the stores
//! - [`SelfHealer`] classifies anomaly reports and dispatches remediation
//!
//! ```no_run
//! use fedrouter::Federation;
//! use feddir::{Agent, Cluster, ClusterStatus};
//!
//! # async fn demo() -> eyre::Result<()> {
//! let federation = Federation::new("us-east");
//! federation
//!     .controller
//!     .establish_peer(
//!         Cluster::new("eu-west", "https://eu-west.example:8443", ClusterStatus::Healthy),
//!         &serde_json::Value::Null,
//!     )
//!     .await?;
//! federation.directory.register(Agent::new("indexer", "eu-west"));
//!
//! let outcome = federation.router.route_message("indexer", &serde_json::json!({"op": "sync"})).await?;
//! assert!(outcome.is_delivered());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod controller;
pub mod delivery;
pub mod error;
pub mod federation;
pub mod healing;
pub mod router;
pub mod scenario;
pub mod service;

pub use config::Config;
pub use controller::FederationController;
pub use delivery::{
    Channel, Credentials, FailoverPolicy, LocalDelivery, LoggingDelivery, Message, NoFailover, NoopTransport,
    RemoteDelivery, Transport,
};
pub use error::TransportError;
pub use federation::{Federation, FederationBuilder};
pub use healing::{
    AnomalyKind, AnomalyReport, HealingConfig, HealingError, HealingOutcome, LoggingRemediator, Remediation,
    Remediator, SelfHealer,
};
pub use router::{FederatedRouter, RouteFailure, RouteOutcome, RouterMetrics, RouterMetricsSnapshot};
pub use scenario::{ScenarioEvent, ScenarioLog, StepOutcome};
pub use service::{FederationHandle, FederationRequest, FederationService, ServiceConfig, ServiceMetrics};
