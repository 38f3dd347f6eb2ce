//! Service configuration

use serde::{Deserialize, Serialize};
use tracing::debug;

/// FederationService configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Channel buffer size for federation events
    #[serde(rename = "channel-buffer", default = "default_channel_buffer")]
    pub channel_buffer: usize,
}

fn default_channel_buffer() -> usize {
    debug!("default_channel_buffer: called");
    1000
}

impl Default for ServiceConfig {
    fn default() -> Self {
        debug!("ServiceConfig::default: called");
        Self {
            channel_buffer: default_channel_buffer(),
        }
    }
}
