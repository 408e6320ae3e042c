//! Agents and executors held by the inventory.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::host::{AbortResult, ExecutorHandle, HostResource, InterruptionCause, OfflineCause};

pub struct InventoryExecutor {
    index: usize,
    busy: AtomicBool,
    last_interruption: Mutex<Option<InterruptionCause>>,
}

impl InventoryExecutor {
    fn new(index: usize) -> Self {
        Self {
            index,
            busy: AtomicBool::new(false),
            last_interruption: Mutex::new(None),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn set_busy(&self, busy: bool) {
        self.busy.store(busy, Ordering::SeqCst);
    }

    pub fn last_interruption(&self) -> Option<InterruptionCause> {
        self.last_interruption
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl ExecutorHandle for InventoryExecutor {
    fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    // Reported work has no process behind it, so interrupting frees the executor
    fn interrupt(&self, result: AbortResult, cause: &InterruptionCause) {
        info!(
            "Executor #{} interrupted ({:?}): {}",
            self.index, result, cause.description
        );
        *self
            .last_interruption
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(cause.clone());
        self.busy.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentSnapshot {
    pub name: String,
    pub labels: Vec<String>,
    pub online: bool,
    pub executors: usize,
    pub busy_executors: usize,
    pub offline_cause: Option<OfflineCause>,
    pub next_check: DateTime<Utc>,
}

pub struct InventoryAgent {
    name: String,
    labels: Vec<String>,
    executors: Vec<Arc<InventoryExecutor>>,
    online: AtomicBool,
    offline_cause: Mutex<Option<OfflineCause>>,
    next_check: Mutex<DateTime<Utc>>,
}

impl InventoryAgent {
    pub fn new(name: impl Into<String>, labels: Vec<String>, executors: usize) -> Self {
        Self {
            name: name.into(),
            labels,
            executors: (0..executors)
                .map(|index| Arc::new(InventoryExecutor::new(index)))
                .collect(),
            online: AtomicBool::new(true),
            offline_cause: Mutex::new(None),
            next_check: Mutex::new(DateTime::<Utc>::MIN_UTC),
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn executors(&self) -> &[Arc<InventoryExecutor>] {
        &self.executors
    }

    pub fn busy_count(&self) -> usize {
        self.executors.iter().filter(|e| e.is_busy()).count()
    }

    /// Mark the first `busy` executors busy and the rest idle.
    pub fn set_busy_count(&self, busy: usize) {
        for (index, executor) in self.executors.iter().enumerate() {
            executor.set_busy(index < busy);
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        *self.next_check.lock().unwrap_or_else(|e| e.into_inner()) <= now
    }

    pub fn schedule_next_check(&self, at: DateTime<Utc>) {
        *self.next_check.lock().unwrap_or_else(|e| e.into_inner()) = at;
    }

    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            name: self.name.clone(),
            labels: self.labels.clone(),
            online: self.is_online(),
            executors: self.executors.len(),
            busy_executors: self.busy_count(),
            offline_cause: self.offline_cause(),
            next_check: *self.next_check.lock().unwrap_or_else(|e| e.into_inner()),
        }
    }
}

#[async_trait]
impl HostResource for InventoryAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn is_idle(&self) -> bool {
        self.busy_count() == 0
    }

    fn busy_executors(&self) -> Vec<Arc<dyn ExecutorHandle>> {
        self.executors
            .iter()
            .filter(|e| e.is_busy())
            .map(|e| e.clone() as Arc<dyn ExecutorHandle>)
            .collect()
    }

    fn offline_cause(&self) -> Option<OfflineCause> {
        self.offline_cause
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    async fn disconnect(&self, cause: OfflineCause) {
        info!("Agent {} going offline: {:?}", self.name, cause);
        *self.offline_cause.lock().unwrap_or_else(|e| e.into_inner()) = Some(cause);
        self.online.store(false, Ordering::SeqCst);
    }

    async fn connect(&self) {
        info!("Agent {} coming online", self.name);
        *self.offline_cause.lock().unwrap_or_else(|e| e.into_inner()) = None;
        self.online.store(true, Ordering::SeqCst);
    }
}
