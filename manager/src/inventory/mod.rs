//! In-memory host inventory
//!
//! Agents and cloud pools come from the group config files. Agents report
//! their busy executors through the admin API; dispatching reported work
//! goes through the same dispatch lock the retention controller holds while
//! disconnecting.

mod agent;
mod policy;

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::host::{CapacityPool, DispatchLock, HostResource, RetentionPolicy, TargetDirectory};
use crate::target::{Disambiguators, Target, TargetKind};

pub use agent::{AgentSnapshot, InventoryAgent, InventoryExecutor};
pub use policy::AlwaysOnline;

pub struct InventoryCloud {
    pool_id: String,
    target: Target,
    labels: Vec<String>,
}

impl InventoryCloud {
    pub fn new(pool_id: impl Into<String>, target: Target, labels: Vec<String>) -> Self {
        Self {
            pool_id: pool_id.into(),
            target,
            labels,
        }
    }

    pub fn pool_id(&self) -> &str {
        &self.pool_id
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

impl CapacityPool for InventoryCloud {
    fn target(&self) -> Target {
        self.target.clone()
    }

    fn can_provision(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

/// Result of reporting work on an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Accepted { busy: usize },
    Refused { reason: String },
}

pub struct Inventory {
    agents: HashMap<String, Arc<InventoryAgent>>,
    clouds: Vec<Arc<InventoryCloud>>,
    dispatch: Arc<DispatchLock>,
}

impl Inventory {
    pub fn new(agents: Vec<InventoryAgent>, clouds: Vec<InventoryCloud>) -> Self {
        Self {
            agents: agents
                .into_iter()
                .map(|agent| (agent.name().to_string(), Arc::new(agent)))
                .collect(),
            clouds: clouds.into_iter().map(Arc::new).collect(),
            dispatch: Arc::new(DispatchLock::new()),
        }
    }

    /// Build from config, resolving disambiguators for shared cloud names.
    pub fn from_config(config: &Config, disambiguators: &mut Disambiguators) -> Self {
        let agents = config
            .agents
            .iter()
            .map(|(name, agent)| InventoryAgent::new(name, agent.labels.clone(), agent.executors))
            .collect();

        let mut pools: Vec<(String, String)> = config
            .clouds
            .iter()
            .map(|(pool_id, cloud)| (pool_id.clone(), cloud.name.clone()))
            .collect();
        pools.sort();

        let clouds = disambiguators
            .resolve(&pools)
            .into_iter()
            .filter_map(|(pool_id, target)| {
                let labels = config.clouds.get(&pool_id)?.labels.clone();
                debug!("Cloud pool {} registered as {}", pool_id, target);
                Some(InventoryCloud::new(pool_id, target, labels))
            })
            .collect();

        let inventory = Self::new(agents, clouds);
        info!(
            "Inventory holds {} agents and {} cloud pools",
            inventory.agents.len(),
            inventory.clouds.len()
        );
        inventory
    }

    pub fn dispatch_lock(&self) -> Arc<DispatchLock> {
        self.dispatch.clone()
    }

    pub fn agent(&self, name: &str) -> Option<Arc<InventoryAgent>> {
        self.agents.get(name).cloned()
    }

    /// Agents sorted by name
    pub fn agents(&self) -> Vec<Arc<InventoryAgent>> {
        let mut agents: Vec<_> = self.agents.values().cloned().collect();
        agents.sort_by(|a, b| a.name().cmp(b.name()));
        agents
    }

    pub fn agents_with_label(&self, label: &str) -> Vec<Arc<InventoryAgent>> {
        self.agents()
            .into_iter()
            .filter(|agent| agent.has_label(label))
            .collect()
    }

    pub fn clouds(&self) -> &[Arc<InventoryCloud>] {
        &self.clouds
    }

    pub fn pools(&self) -> Vec<Arc<dyn CapacityPool>> {
        self.clouds
            .iter()
            .map(|cloud| cloud.clone() as Arc<dyn CapacityPool>)
            .collect()
    }

    /// Every agent and cloud target, agents first.
    pub fn targets(&self) -> Vec<Target> {
        let mut targets: Vec<Target> = self
            .agents()
            .iter()
            .map(|agent| Target::agent(agent.name()))
            .collect();
        let mut clouds: Vec<Target> = self.clouds.iter().map(|c| c.target()).collect();
        clouds.sort();
        targets.extend(clouds);
        targets
    }

    /// Report how many executors of `name` run work.
    ///
    /// New work is only dispatched while the agent accepts tasks; finishing
    /// work is always accepted.
    pub async fn report_busy(
        &self,
        name: &str,
        busy: usize,
        retention: &dyn RetentionPolicy,
    ) -> Option<DispatchOutcome> {
        let agent = self.agent(name)?;
        let _guard = self.dispatch.lock().await;

        let capacity = agent.executors().len();
        if busy > capacity {
            return Some(DispatchOutcome::Refused {
                reason: format!("Agent '{}' has only {} executors", name, capacity),
            });
        }
        if busy > agent.busy_count() && !retention.is_accepting_tasks(&*agent).await {
            return Some(DispatchOutcome::Refused {
                reason: format!("Agent '{}' is not accepting tasks", name),
            });
        }

        agent.set_busy_count(busy);
        debug!("Agent {} now runs {} of {} executors", name, busy, capacity);
        Some(DispatchOutcome::Accepted { busy })
    }
}

impl TargetDirectory for Inventory {
    fn exists(&self, target: &Target) -> bool {
        match target.kind() {
            TargetKind::Agent => self.agents.contains_key(target.name()),
            TargetKind::Cloud => self.clouds.iter().any(|c| &c.target == target),
        }
    }
}
