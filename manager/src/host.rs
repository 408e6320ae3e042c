//! Interfaces to the host cluster manager
//!
//! The maintenance engine never owns agents, executors or cloud pools. It
//! reaches them through the narrow capabilities below, which the daemon's
//! inventory implements and tests fake.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};

use crate::constants::windows::{DISPLAY_FORMAT, INTERRUPTION_DESCRIPTION};
use crate::target::Target;
use crate::window::MaintenanceWindow;

/// Outcome recorded on work interrupted for maintenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AbortResult {
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterruptionCause {
    pub description: String,
}

impl InterruptionCause {
    pub fn maintenance() -> Self {
        Self {
            description: INTERRUPTION_DESCRIPTION.to_string(),
        }
    }
}

/// Why an agent was taken offline by maintenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaintenanceOfflineCause {
    pub window_id: String,
    pub target: String,
    pub reason: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub take_online: bool,
}

impl MaintenanceOfflineCause {
    pub fn from_window(target: &str, window: &MaintenanceWindow) -> Self {
        Self {
            window_id: window.id().to_string(),
            target: target.to_string(),
            reason: window.reason().to_string(),
            start: window.start(),
            end: window.end(),
            take_online: window.take_online(),
        }
    }

    pub fn description(&self) -> String {
        format!(
            "Maintenance from {} until {}: {}",
            self.start.format(DISPLAY_FORMAT),
            self.end.format(DISPLAY_FORMAT),
            self.reason
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OfflineCause {
    Maintenance(MaintenanceOfflineCause),
    Manual { message: String },
    Disconnected { message: String },
}

impl OfflineCause {
    pub fn as_maintenance(&self) -> Option<&MaintenanceOfflineCause> {
        match self {
            OfflineCause::Maintenance(cause) => Some(cause),
            _ => None,
        }
    }
}

/// A unit of execution on an agent.
pub trait ExecutorHandle: Send + Sync {
    fn is_busy(&self) -> bool;

    fn interrupt(&self, result: AbortResult, cause: &InterruptionCause);
}

/// A compute agent as seen by the retention controller.
#[async_trait]
pub trait HostResource: Send + Sync {
    fn name(&self) -> &str;

    fn is_online(&self) -> bool;

    /// No executor is running work
    fn is_idle(&self) -> bool;

    fn busy_executors(&self) -> Vec<Arc<dyn ExecutorHandle>>;

    fn offline_cause(&self) -> Option<OfflineCause>;

    async fn disconnect(&self, cause: OfflineCause);

    async fn connect(&self);
}

/// Per-agent policy deciding whether an agent should be online.
#[async_trait]
pub trait RetentionPolicy: Send + Sync {
    async fn is_accepting_tasks(&self, resource: &dyn HostResource) -> bool;

    async fn is_manual_launch_allowed(&self, resource: &dyn HostResource) -> bool;

    /// Apply the policy and return when the agent should be checked again.
    async fn check(&self, resource: &dyn HostResource) -> Duration;
}

/// An elastic pool able to provision capacity for labels.
pub trait CapacityPool: Send + Sync {
    fn target(&self) -> Target;

    fn can_provision(&self, label: &str) -> bool;
}

/// Whether a target currently exists in the host.
pub trait TargetDirectory: Send + Sync {
    fn exists(&self, target: &Target) -> bool;
}

/// Host-wide lock serializing work dispatch against disconnects.
#[derive(Debug, Default)]
pub struct DispatchLock {
    inner: Mutex<()>,
}

impl DispatchLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.inner.lock().await
    }

    /// Run `f` while holding the lock.
    pub async fn with_lock<F, Fut, T>(&self, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _guard = self.inner.lock().await;
        f().await
    }
}
