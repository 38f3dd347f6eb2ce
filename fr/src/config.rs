//! fedrouter configuration types and loading

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Context, Result, eyre};
use feddir::{Agent, Cluster};
use serde::{Deserialize, Serialize};

use crate::federation::Federation;
use crate::healing::HealingConfig;
use crate::service::ServiceConfig;

const CONFIG_FILE_NAME: &str = "fedrouter.yml";

/// Main fedrouter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cluster this process routes for
    #[serde(rename = "local-cluster-id")]
    pub local_cluster_id: String,

    /// Event service settings
    pub service: ServiceConfig,

    /// Anomaly classification thresholds
    pub healing: HealingConfig,

    /// Peer clusters to federate with at startup
    pub peers: Vec<Cluster>,

    /// Agents known at startup
    pub agents: Vec<Agent>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            local_cluster_id: "local".to_string(),
            service: ServiceConfig::default(),
            healing: HealingConfig::default(),
            peers: Vec::new(),
            agents: Vec::new(),
        }
    }
}

impl Config {
    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        if self.local_cluster_id.trim().is_empty() {
            return Err(eyre!("local-cluster-id must not be empty"));
        }
        if self.service.channel_buffer == 0 {
            return Err(eyre!("service.channel-buffer must be greater than zero"));
        }
        if !self.healing.msg_rate_threshold.is_finite() || self.healing.msg_rate_threshold < 0.0 {
            return Err(eyre!(
                "healing.msg-rate-threshold must be a non-negative number, got {}",
                self.healing.msg_rate_threshold
            ));
        }
        if !self.healing.latency_threshold_ms.is_finite() || self.healing.latency_threshold_ms < 0.0 {
            return Err(eyre!(
                "healing.latency-threshold-ms must be a non-negative number, got {}",
                self.healing.latency_threshold_ms
            ));
        }

        let mut seen = HashSet::new();
        for peer in &self.peers {
            if peer.cluster_id.is_empty() {
                return Err(eyre!("Peer with endpoint {} has an empty cluster-id", peer.api_endpoint));
            }
            if !seen.insert(peer.cluster_id.as_str()) {
                return Err(eyre!("Peer {} is listed more than once", peer.cluster_id));
            }
        }

        let mut seen = HashSet::new();
        for agent in &self.agents {
            if agent.agent_id.is_empty() {
                return Err(eyre!("Agent in cluster {} has an empty agent-id", agent.cluster_id));
            }
            if !seen.insert(agent.agent_id.as_str()) {
                return Err(eyre!("Agent {} is listed more than once", agent.agent_id));
            }
        }
        Ok(())
    }

    /// Config files searched, in order, when no explicit path is given
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("fedrouter").join(CONFIG_FILE_NAME));
        }
        paths
    }

    /// Load the explicit config, or the first usable file on the search path
    ///
    /// An explicit path must load. Search-path candidates that fail to read
    /// or parse are skipped with a warning.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        match config_path {
            Some(path) => Self::read(path),
            None => Ok(Self::first_usable(&Self::search_paths())),
        }
    }

    fn first_usable(candidates: &[PathBuf]) -> Self {
        for path in candidates.iter().filter(|path| path.is_file()) {
            match Self::read(path) {
                Ok(config) => return config,
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Skipping unusable config"),
            }
        }
        tracing::info!(searched = candidates.len(), "No config file found, using defaults");
        Self::default()
    }

    fn read(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).wrap_err_with(|| format!("Failed to load config from {}", path.display()))?;
        let config = serde_yaml::from_str(&content).wrap_err_with(|| format!("Malformed config in {}", path.display()))?;
        tracing::info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Build a federation seeded with the configured peers and agents
    ///
    /// Peers are established through the controller so the transport's
    /// handshake runs for each; a failed handshake aborts startup.
    pub async fn bootstrap(&self) -> Result<Federation> {
        tracing::debug!(local_cluster_id = %self.local_cluster_id, "Config::bootstrap: called");
        let federation = Federation::new(self.local_cluster_id.clone());

        for peer in &self.peers {
            federation
                .controller
                .establish_peer(peer.clone(), &serde_json::Value::Null)
                .await
                .context(format!("Failed to establish peer {}", peer.cluster_id))?;
        }

        for agent in &self.agents {
            federation.directory.register(agent.clone());
        }

        tracing::info!(
            peers = federation.registry.len(),
            agents = federation.directory.len(),
            "Federation bootstrapped"
        );
        Ok(federation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feddir::ClusterStatus;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
local-cluster-id: us-east

service:
  channel-buffer: 64

healing:
  msg-rate-threshold: 500

peers:
  - cluster-id: eu-west
    api-endpoint: https://eu-west.example:8443
  - cluster-id: ap-south
    api-endpoint: https://ap-south.example:8443
    status: degraded
    meta:
      region: ap-south-1

agents:
  - agent-id: planner
    cluster-id: us-east
  - agent-id: indexer
    cluster-id: eu-west
"#;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.local_cluster_id, "local");
        assert_eq!(config.service.channel_buffer, 1000);
        assert_eq!(config.healing.msg_rate_threshold, 1000.0);
        assert!(config.peers.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_config() {
        let config: Config = serde_yaml::from_str(SAMPLE).unwrap();

        assert_eq!(config.local_cluster_id, "us-east");
        assert_eq!(config.service.channel_buffer, 64);
        assert_eq!(config.healing.msg_rate_threshold, 500.0);
        assert_eq!(config.healing.latency_threshold_ms, 1000.0);
        assert_eq!(config.peers.len(), 2);
        assert_eq!(config.peers[0].status, ClusterStatus::Healthy);
        assert_eq!(config.peers[1].status, ClusterStatus::Degraded);
        assert_eq!(config.peers[1].meta.get("region").map(String::as_str), Some("ap-south-1"));
        assert_eq!(config.agents[1], Agent::new("indexer", "eu-west"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_yaml::from_str("peers: []").unwrap();
        assert_eq!(config.local_cluster_id, "local");
        assert_eq!(config.service.channel_buffer, 1000);
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let yaml = "peers:\n  - cluster-id: c2\n    api-endpoint: https://c2\n    status: sideways\n";
        assert!(serde_yaml::from_str::<Config>(yaml).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.local_cluster_id = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.service.channel_buffer = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.healing.latency_threshold_ms = -1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.healing.msg_rate_threshold = f64::NAN;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("msg-rate-threshold"));

        let mut config = Config::default();
        config.peers = vec![
            Cluster::new("c2", "https://a", ClusterStatus::Healthy),
            Cluster::new("c2", "https://b", ClusterStatus::Healthy),
        ];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("more than once"));

        let mut config = Config::default();
        config.agents = vec![Agent::new("", "c2")];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_explicit_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("fedrouter.yml");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.local_cluster_id, "us-east");
    }

    #[test]
    fn test_load_explicit_path_errors() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing.yml");
        let err = Config::load(Some(&missing)).unwrap_err();
        assert!(err.to_string().contains("Failed to load config"));

        let broken = temp.path().join("broken.yml");
        std::fs::write(&broken, "peers: {not: [a list").unwrap();
        let err = Config::load(Some(&broken)).unwrap_err();
        assert!(err.to_string().contains("Malformed config"));
    }

    #[test]
    fn test_fractional_thresholds() {
        let config: Config = serde_yaml::from_str("healing:\n  msg-rate-threshold: 250.5\n").unwrap();
        assert_eq!(config.healing.msg_rate_threshold, 250.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_search_paths_prefer_project_local() {
        let paths = Config::search_paths();
        assert_eq!(paths[0], PathBuf::from("fedrouter.yml"));
        assert!(paths.iter().all(|path| path.ends_with("fedrouter.yml")));
    }

    #[test]
    fn test_first_usable_skips_bad_candidates() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing.yml");
        let broken = temp.path().join("broken.yml");
        std::fs::write(&broken, "peers: {not: [a list").unwrap();
        let good = temp.path().join("good.yml");
        std::fs::write(&good, SAMPLE).unwrap();

        let config = Config::first_usable(&[missing.clone(), broken.clone(), good]);
        assert_eq!(config.local_cluster_id, "us-east");

        let config = Config::first_usable(&[missing, broken]);
        assert_eq!(config.local_cluster_id, "local");
        assert!(config.peers.is_empty());
    }

    #[tokio::test]
    async fn test_bootstrap_seeds_stores() {
        let config: Config = serde_yaml::from_str(SAMPLE).unwrap();
        let federation = config.bootstrap().await.unwrap();

        assert_eq!(federation.local_cluster_id(), "us-east");
        assert_eq!(federation.registry.len(), 2);
        assert_eq!(
            federation.registry.get("ap-south").map(|c| c.status),
            Some(ClusterStatus::Degraded)
        );
        assert_eq!(federation.directory.list_by_cluster("eu-west").len(), 1);

        let outcome = federation
            .router
            .route_message("indexer", &serde_json::json!({}))
            .await
            .unwrap();
        assert!(outcome.is_delivered());
    }
}
