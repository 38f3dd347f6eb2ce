//! Event-ingestion service for federation state
//!
//! External collaborators (peer handshakes, health probes, agent join/leave)
//! push events through a [`FederationHandle`]; a single [`FederationService`]
//! task applies them to the controller and directory in arrival order.

mod config;
mod core;
mod handle;
mod messages;

pub use self::core::FederationService;
pub use config::ServiceConfig;
pub use handle::FederationHandle;
pub use messages::{FederationRequest, ServiceMetrics};
