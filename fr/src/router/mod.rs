//! Federated routing
//!
//! [`FederatedRouter`] answers "how do I deliver this message": locally, via a
//! healthy peer cluster, or not at all. It reads the agent directory and the
//! cluster registry and never mutates either.

mod core;
mod metrics;
mod outcome;

pub use self::core::FederatedRouter;
pub use metrics::{RouterMetrics, RouterMetricsSnapshot};
pub use outcome::{RouteFailure, RouteOutcome};
