//! Transport error types

use std::time::Duration;
use thiserror::Error;

/// Errors raised by delivery and transport collaborators
///
/// The router never interprets these; it propagates them to its caller, which
/// owns any retry policy.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Secure channel to {cluster_id} failed: {message}")]
    Handshake { cluster_id: String, message: String },

    #[error("Delivery to {target} failed: {message}")]
    Delivery { target: String, message: String },

    #[error("Connection error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),
}

impl TransportError {
    /// Check if a caller-side retry could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Handshake { .. } => false,
            TransportError::Delivery { .. } => true,
            TransportError::Io(_) => true,
            TransportError::Timeout(_) => true,
        }
    }
}
