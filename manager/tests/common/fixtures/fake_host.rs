//! Fake host capabilities recording what the engine did to them

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use maintenance_manager::host::{
    AbortResult, ExecutorHandle, HostResource, InterruptionCause, OfflineCause, RetentionPolicy,
    TargetDirectory,
};
use maintenance_manager::target::Target;

/// Executor whose work keeps running after an interrupt until the test
/// finishes it.
#[derive(Default)]
pub struct FakeExecutor {
    busy: AtomicBool,
    interrupts: Mutex<Vec<(AbortResult, InterruptionCause)>>,
}

impl FakeExecutor {
    pub fn busy() -> Arc<Self> {
        let executor = Self::default();
        executor.busy.store(true, Ordering::SeqCst);
        Arc::new(executor)
    }

    pub fn finish(&self) {
        self.busy.store(false, Ordering::SeqCst);
    }

    pub fn interrupts(&self) -> Vec<(AbortResult, InterruptionCause)> {
        self.interrupts.lock().unwrap().clone()
    }
}

impl ExecutorHandle for FakeExecutor {
    fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    fn interrupt(&self, result: AbortResult, cause: &InterruptionCause) {
        self.interrupts.lock().unwrap().push((result, cause.clone()));
    }
}

pub struct FakeResource {
    name: String,
    online: AtomicBool,
    offline_cause: Mutex<Option<OfflineCause>>,
    executors: Mutex<Vec<Arc<FakeExecutor>>>,
    disconnects: AtomicUsize,
    connects: AtomicUsize,
}

impl FakeResource {
    pub fn online(name: &str) -> Self {
        Self {
            name: name.to_string(),
            online: AtomicBool::new(true),
            offline_cause: Mutex::new(None),
            executors: Mutex::new(Vec::new()),
            disconnects: AtomicUsize::new(0),
            connects: AtomicUsize::new(0),
        }
    }

    pub fn offline(name: &str, cause: OfflineCause) -> Self {
        let resource = Self::online(name);
        resource.online.store(false, Ordering::SeqCst);
        *resource.offline_cause.lock().unwrap() = Some(cause);
        resource
    }

    /// Start a busy executor and return it.
    pub fn run_work(&self) -> Arc<FakeExecutor> {
        let executor = FakeExecutor::busy();
        self.executors.lock().unwrap().push(executor.clone());
        executor
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HostResource for FakeResource {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn is_idle(&self) -> bool {
        !self.executors.lock().unwrap().iter().any(|e| e.is_busy())
    }

    fn busy_executors(&self) -> Vec<Arc<dyn ExecutorHandle>> {
        self.executors
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.is_busy())
            .map(|e| e.clone() as Arc<dyn ExecutorHandle>)
            .collect()
    }

    fn offline_cause(&self) -> Option<OfflineCause> {
        self.offline_cause.lock().unwrap().clone()
    }

    async fn disconnect(&self, cause: OfflineCause) {
        self.online.store(false, Ordering::SeqCst);
        *self.offline_cause.lock().unwrap() = Some(cause);
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }

    async fn connect(&self) {
        self.online.store(true, Ordering::SeqCst);
        *self.offline_cause.lock().unwrap() = None;
        self.connects.fetch_add(1, Ordering::SeqCst);
    }
}

/// Regular policy that counts how often it was consulted.
pub struct FakePolicy {
    recheck: Duration,
    checks: AtomicUsize,
    reconnect: bool,
}

impl FakePolicy {
    pub fn new(recheck: Duration) -> Self {
        Self {
            recheck,
            checks: AtomicUsize::new(0),
            reconnect: false,
        }
    }

    /// Bring offline agents back on every check.
    pub fn reconnecting(recheck: Duration) -> Self {
        Self {
            reconnect: true,
            ..Self::new(recheck)
        }
    }

    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RetentionPolicy for FakePolicy {
    async fn is_accepting_tasks(&self, resource: &dyn HostResource) -> bool {
        resource.is_online()
    }

    async fn is_manual_launch_allowed(&self, _resource: &dyn HostResource) -> bool {
        true
    }

    async fn check(&self, resource: &dyn HostResource) -> Duration {
        self.checks.fetch_add(1, Ordering::SeqCst);
        if self.reconnect && !resource.is_online() {
            resource.connect().await;
        }
        self.recheck
    }
}

/// Directory backed by a mutable set of keys.
#[derive(Default)]
pub struct FakeDirectory {
    keys: Mutex<HashSet<String>>,
}

impl FakeDirectory {
    pub fn with(targets: &[Target]) -> Self {
        let directory = Self::default();
        for target in targets {
            directory.add(target);
        }
        directory
    }

    pub fn add(&self, target: &Target) {
        self.keys.lock().unwrap().insert(target.key());
    }

    pub fn remove(&self, target: &Target) {
        self.keys.lock().unwrap().remove(&target.key());
    }
}

impl TargetDirectory for FakeDirectory {
    fn exists(&self, target: &Target) -> bool {
        self.keys.lock().unwrap().contains(&target.key())
    }
}
