//! AgentDirectory - authoritative map of agents to their owning cluster

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use eyre::Result;
use tracing::{debug, info};

use crate::listeners::{ListenerSet, SubscriptionId};
use crate::types::Agent;

/// Change notifications emitted by the directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryEvent {
    /// An agent was registered or fully replaced
    Registered(Agent),

    /// An agent was removed
    Unregistered { agent_id: String, cluster_id: String },
}

/// Primary map plus a cluster index, kept consistent under one lock
#[derive(Debug, Default)]
struct Entries {
    agents: HashMap<String, Agent>,
    by_cluster: HashMap<String, HashSet<String>>,
}

impl Entries {
    fn insert(&mut self, agent: Agent) {
        let previous_cluster = self.agents.get(&agent.agent_id).map(|a| a.cluster_id.clone());
        if let Some(previous_cluster) = previous_cluster
            && previous_cluster != agent.cluster_id
        {
            self.unindex(&agent.agent_id, &previous_cluster);
        }
        self.by_cluster
            .entry(agent.cluster_id.clone())
            .or_default()
            .insert(agent.agent_id.clone());
        self.agents.insert(agent.agent_id.clone(), agent);
    }

    fn remove(&mut self, agent_id: &str) -> Option<Agent> {
        let agent = self.agents.remove(agent_id)?;
        self.unindex(&agent.agent_id, &agent.cluster_id);
        Some(agent)
    }

    fn unindex(&mut self, agent_id: &str, cluster_id: &str) {
        if let Some(members) = self.by_cluster.get_mut(cluster_id) {
            members.remove(agent_id);
            if members.is_empty() {
                self.by_cluster.remove(cluster_id);
            }
        }
    }
}

/// Concurrency-safe store of agents keyed by `agent_id`
///
/// The directory never checks `Agent::cluster_id` against the cluster
/// registry; agents may be registered before their cluster is known.
#[derive(Debug, Default)]
pub struct AgentDirectory {
    entries: Mutex<Entries>,
    listeners: ListenerSet<DirectoryEvent>,
}

impl AgentDirectory {
    pub fn new() -> Self {
        debug!("AgentDirectory::new: called");
        Self::default()
    }

    /// Register an agent, fully replacing any entry with the same ID
    pub fn register(&self, agent: Agent) {
        debug!(agent_id = %agent.agent_id, cluster_id = %agent.cluster_id, "AgentDirectory::register: called");
        self.lock().insert(agent.clone());
        self.listeners.notify(&DirectoryEvent::Registered(agent));
    }

    /// Remove an agent; absent IDs are a no-op
    pub fn unregister(&self, agent_id: &str) -> bool {
        debug!(%agent_id, "AgentDirectory::unregister: called");
        let removed = self.lock().remove(agent_id);
        match removed {
            Some(agent) => {
                info!(%agent_id, cluster_id = %agent.cluster_id, "Agent unregistered");
                self.listeners.notify(&DirectoryEvent::Unregistered {
                    agent_id: agent.agent_id,
                    cluster_id: agent.cluster_id,
                });
                true
            }
            None => {
                debug!(%agent_id, "unregister: agent not present");
                false
            }
        }
    }

    pub fn find(&self, agent_id: &str) -> Option<Agent> {
        debug!(%agent_id, "AgentDirectory::find: called");
        self.lock().agents.get(agent_id).cloned()
    }

    /// All agents whose `cluster_id` equals `cluster_id`, in unspecified order
    pub fn list_by_cluster(&self, cluster_id: &str) -> Vec<Agent> {
        debug!(%cluster_id, "AgentDirectory::list_by_cluster: called");
        let entries = self.lock();
        match entries.by_cluster.get(cluster_id) {
            Some(members) => members
                .iter()
                .filter_map(|agent_id| entries.agents.get(agent_id))
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    /// Point-in-time copy of every agent, in unspecified order
    pub fn list(&self) -> Vec<Agent> {
        debug!("AgentDirectory::list: called");
        self.lock().agents.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Subscribe to change notifications
    ///
    /// Listeners run after the directory lock has been released.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&DirectoryEvent) -> Result<()> + Send + Sync + 'static,
    {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn ids(agents: &[Agent]) -> BTreeSet<String> {
        agents.iter().map(|a| a.agent_id.clone()).collect()
    }

    #[test]
    fn test_register_and_find() {
        let directory = AgentDirectory::new();
        let agent = Agent::new("a1", "c1").with_meta("role", "planner");
        directory.register(agent.clone());

        assert_eq!(directory.find("a1"), Some(agent));
        assert_eq!(directory.find("a2"), None);
    }

    #[test]
    fn test_register_replaces_without_merging() {
        let directory = AgentDirectory::new();
        directory.register(Agent::new("a1", "c1").with_meta("role", "planner"));
        directory.register(Agent::new("a1", "c2"));

        let stored = directory.find("a1").unwrap();
        assert_eq!(stored.cluster_id, "c2");
        assert!(stored.meta.is_empty());
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn test_unregister_absent_is_noop() {
        let directory = AgentDirectory::new();
        assert!(!directory.unregister("ghost"));

        directory.register(Agent::new("a1", "c1"));
        assert!(directory.unregister("a1"));
        assert!(directory.find("a1").is_none());
        assert!(directory.is_empty());
    }

    #[test]
    fn test_dangling_cluster_reference_is_allowed() {
        let directory = AgentDirectory::new();
        directory.register(Agent::new("a1", "not-yet-known"));
        assert_eq!(directory.list_by_cluster("not-yet-known").len(), 1);
    }

    #[test]
    fn test_list_by_cluster() {
        let directory = AgentDirectory::new();
        directory.register(Agent::new("a1", "c1"));
        directory.register(Agent::new("a2", "c1"));
        directory.register(Agent::new("a3", "c2"));

        assert_eq!(
            ids(&directory.list_by_cluster("c1")),
            BTreeSet::from(["a1".to_string(), "a2".to_string()])
        );
        assert_eq!(ids(&directory.list_by_cluster("c2")), BTreeSet::from(["a3".to_string()]));
        assert!(directory.list_by_cluster("c3").is_empty());
    }

    #[test]
    fn test_reregister_moves_between_clusters() {
        let directory = AgentDirectory::new();
        directory.register(Agent::new("a1", "c1"));
        directory.register(Agent::new("a1", "c2"));

        assert!(directory.list_by_cluster("c1").is_empty());
        assert_eq!(ids(&directory.list_by_cluster("c2")), BTreeSet::from(["a1".to_string()]));
    }

    #[test]
    fn test_list_is_a_snapshot() {
        let directory = AgentDirectory::new();
        directory.register(Agent::new("a1", "c1"));

        let snapshot = directory.list();
        directory.register(Agent::new("a2", "c1"));
        directory.unregister("a1");

        assert_eq!(ids(&snapshot), BTreeSet::from(["a1".to_string()]));
    }

    #[test]
    fn test_listeners_receive_events() {
        let directory = AgentDirectory::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        directory.subscribe(move |event| {
            sink.lock().unwrap().push(event.clone());
            Ok(())
        });

        directory.register(Agent::new("a1", "c1"));
        directory.unregister("a1");
        directory.unregister("a1");

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                DirectoryEvent::Registered(Agent::new("a1", "c1")),
                DirectoryEvent::Unregistered {
                    agent_id: "a1".to_string(),
                    cluster_id: "c1".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_listener_can_mutate_directory() {
        let directory = Arc::new(AgentDirectory::new());
        let inner = Arc::downgrade(&directory);
        directory.subscribe(move |event| {
            // Mirror every registration under a shadow ID
            if let DirectoryEvent::Registered(agent) = event
                && !agent.agent_id.starts_with("shadow-")
                && let Some(directory) = inner.upgrade()
            {
                directory.register(Agent::new(format!("shadow-{}", agent.agent_id), agent.cluster_id.clone()));
            }
            Ok(())
        });

        directory.register(Agent::new("a1", "c1"));
        assert!(directory.find("shadow-a1").is_some());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Register(u8, u8),
        Unregister(u8),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..16, 0u8..4).prop_map(|(a, c)| Op::Register(a, c)),
            (0u8..16).prop_map(Op::Unregister),
        ]
    }

    proptest! {
        #[test]
        fn test_cluster_index_matches_linear_scan(ops in proptest::collection::vec(op_strategy(), 0..64)) {
            let directory = AgentDirectory::new();
            for op in &ops {
                match op {
                    Op::Register(a, c) => directory.register(Agent::new(format!("a{}", a), format!("c{}", c))),
                    Op::Unregister(a) => {
                        directory.unregister(&format!("a{}", a));
                    }
                }
            }

            let all = directory.list();
            for c in 0..4u8 {
                let cluster_id = format!("c{}", c);
                let scanned: Vec<Agent> = all.iter().filter(|a| a.cluster_id == cluster_id).cloned().collect();
                prop_assert_eq!(ids(&directory.list_by_cluster(&cluster_id)), ids(&scanned));
            }
        }
    }
}
