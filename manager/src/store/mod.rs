//! Per-target maintenance definitions with an in-memory cache
//!
//! Every target's [`Definitions`] live behind their own mutex, so edits on
//! one target never wait for another. The map lock is only held to look up
//! or insert a handle, never across storage I/O. Only targets that exist in
//! the host directory are cached; definitions of unknown targets are served
//! straight from storage.

pub mod definitions;
pub mod storage;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::errors::Result;
use crate::host::TargetDirectory;
use crate::target::Target;
use crate::window::{MaintenanceWindow, RecurrenceSettings, RecurringWindowSpec};

pub use definitions::{Definitions, StoredDefinitions};
pub use storage::{DefinitionsStorage, MemoryStorage};

type Handle = Arc<Mutex<Definitions>>;

pub struct WindowStore {
    cache: RwLock<HashMap<String, Handle>>,
    storage: Arc<dyn DefinitionsStorage>,
    directory: Arc<dyn TargetDirectory>,
    clock: Arc<dyn Clock>,
    settings: RecurrenceSettings,
}

impl WindowStore {
    pub fn new(
        storage: Arc<dyn DefinitionsStorage>,
        directory: Arc<dyn TargetDirectory>,
        clock: Arc<dyn Clock>,
        settings: RecurrenceSettings,
    ) -> Self {
        Self {
            cache: RwLock::new(HashMap::with_capacity(32)),
            storage,
            directory,
            clock,
            settings,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn settings(&self) -> &RecurrenceSettings {
        &self.settings
    }

    pub fn target_exists(&self, target: &Target) -> bool {
        self.directory.exists(target)
    }

    async fn handle(&self, target: &Target) -> Result<Handle> {
        let key = target.key();
        if let Some(handle) = self.cache.read().await.get(&key) {
            return Ok(handle.clone());
        }

        let handle = Arc::new(Mutex::new(self.load(&key).await?));
        if !self.directory.exists(target) {
            debug!("Serving maintenance definitions of unknown target {} uncached", key);
            return Ok(handle);
        }

        let mut cache = self.cache.write().await;
        Ok(cache.entry(key).or_insert(handle).clone())
    }

    async fn load(&self, key: &str) -> Result<Definitions> {
        match self.storage.read(key).await? {
            Some(StoredDefinitions::Current(definitions)) => {
                debug!("Loaded maintenance definitions for {}", key);
                Ok(definitions.normalized())
            }
            Some(StoredDefinitions::Legacy(windows)) => {
                info!(
                    "Migrating {} legacy maintenance windows for {}",
                    windows.len(),
                    key
                );
                let definitions = Definitions::from_windows(windows);
                self.storage.write(key, &definitions).await?;
                Ok(definitions)
            }
            None => Ok(Definitions::default()),
        }
    }

    async fn persist(&self, key: &str, definitions: &Definitions) -> Result<()> {
        self.storage.write(key, definitions).await?;
        debug!("Persisted maintenance definitions for {}", key);
        Ok(())
    }

    pub async fn definitions(&self, target: &Target) -> Result<Definitions> {
        let handle = self.handle(target).await?;
        let definitions = handle.lock().await;
        Ok(definitions.clone())
    }

    pub async fn windows(&self, target: &Target) -> Result<Vec<MaintenanceWindow>> {
        Ok(self.definitions(target).await?.scheduled().to_vec())
    }

    pub async fn recurring_windows(&self, target: &Target) -> Result<Vec<RecurringWindowSpec>> {
        Ok(self.definitions(target).await?.recurring().to_vec())
    }

    pub async fn window(&self, target: &Target, id: &str) -> Result<Option<MaintenanceWindow>> {
        Ok(self.definitions(target).await?.window(id).cloned())
    }

    pub async fn has_windows(&self, target: &Target) -> bool {
        match self.handle(target).await {
            Ok(handle) => !handle.lock().await.scheduled().is_empty(),
            Err(e) => {
                warn!("Failed to read maintenance windows for {}: {}", target, e);
                false
            }
        }
    }

    /// The window governing `target` now, if any.
    ///
    /// Finished windows are removed on the way and the removal is persisted.
    /// Storage failures read as "no active window".
    pub async fn active_window(&self, target: &Target) -> Option<MaintenanceWindow> {
        let handle = match self.handle(target).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Failed to read maintenance windows for {}: {}", target, e);
                return None;
            }
        };

        let now = self.clock.now();
        let mut definitions = handle.lock().await;
        let removed = definitions.prune_over(now);
        let active = definitions.active(now).cloned();

        if removed > 0 {
            debug!("Removed {} finished maintenance windows for {}", removed, target);
            if let Err(e) = self.persist(&target.key(), &definitions).await {
                warn!("Failed to persist pruned windows for {}: {}", target, e);
            }
        }
        active
    }

    pub async fn has_active_windows(&self, target: &Target) -> bool {
        match self.handle(target).await {
            Ok(handle) => {
                let now = self.clock.now();
                handle
                    .lock()
                    .await
                    .scheduled()
                    .iter()
                    .any(|w| w.is_scheduled_at(now))
            }
            Err(e) => {
                warn!("Failed to read maintenance windows for {}: {}", target, e);
                false
            }
        }
    }

    /// Active flag of every window that is not over, keyed by id.
    pub async fn status(&self, target: &Target) -> Result<HashMap<String, bool>> {
        let now = self.clock.now();
        let definitions = self.definitions(target).await?;
        Ok(definitions
            .scheduled()
            .iter()
            .filter(|w| !w.is_over_at(now))
            .map(|w| (w.id().to_string(), w.is_scheduled_at(now)))
            .collect())
    }

    /// Returns false when an equal window already exists.
    #[instrument(skip_all, fields(target = %target, window = window.id()))]
    pub async fn add_window(&self, target: &Target, window: MaintenanceWindow) -> Result<bool> {
        let handle = self.handle(target).await?;
        let mut definitions = handle.lock().await;
        let id = window.id().to_string();
        if !definitions.insert_window(window) {
            debug!("Equal maintenance window already scheduled");
            return Ok(false);
        }
        if let Err(e) = self.persist(&target.key(), &definitions).await {
            definitions.remove_window(&id);
            return Err(e);
        }
        info!("Scheduled maintenance window");
        Ok(true)
    }

    #[instrument(skip_all, fields(target = %target, spec = spec.id()))]
    pub async fn add_recurring(&self, target: &Target, spec: RecurringWindowSpec) -> Result<bool> {
        let handle = self.handle(target).await?;
        let mut definitions = handle.lock().await;
        let id = spec.id().to_string();
        if !definitions.insert_recurring(spec) {
            debug!("Equal recurring maintenance window already defined");
            return Ok(false);
        }
        if let Err(e) = self.persist(&target.key(), &definitions).await {
            definitions.remove_recurring(&id);
            return Err(e);
        }
        info!("Added recurring maintenance window");
        Ok(true)
    }

    /// Remove a scheduled window. Unknown or malformed ids are a no-op.
    #[instrument(skip_all, fields(target = %target, id = %id))]
    pub async fn delete_window(&self, target: &Target, id: &str) -> Result<bool> {
        if !self.deletable(target, id) {
            return Ok(false);
        }
        let handle = self.handle(target).await?;
        let mut definitions = handle.lock().await;
        if !definitions.remove_window(id) {
            return Ok(false);
        }
        self.persist(&target.key(), &definitions).await?;
        info!("Deleted maintenance window {}", id);
        Ok(true)
    }

    #[instrument(skip_all, fields(target = %target, id = %id))]
    pub async fn delete_recurring(&self, target: &Target, id: &str) -> Result<bool> {
        if !self.deletable(target, id) {
            return Ok(false);
        }
        let handle = self.handle(target).await?;
        let mut definitions = handle.lock().await;
        if !definitions.remove_recurring(id) {
            return Ok(false);
        }
        self.persist(&target.key(), &definitions).await?;
        info!("Deleted recurring maintenance window {}", id);
        Ok(true)
    }

    fn deletable(&self, target: &Target, id: &str) -> bool {
        if Uuid::parse_str(id).is_err() {
            debug!("Ignoring delete of malformed window id '{}'", id);
            return false;
        }
        if !self.directory.exists(target) {
            debug!("Ignoring delete on unknown target {}", target);
            return false;
        }
        true
    }

    /// Delete several windows, returning the ids whose delete did not fail.
    pub async fn delete_windows(&self, target: &Target, ids: &[String]) -> Vec<String> {
        let mut deleted = Vec::with_capacity(ids.len());
        for id in ids {
            match self.delete_window(target, id).await {
                Ok(_) => deleted.push(id.clone()),
                Err(e) => warn!("Failed to delete maintenance window {} of {}: {}", id, target, e),
            }
        }
        deleted
    }

    /// Flag the cached window as having had its work aborted.
    pub async fn mark_aborted(&self, target: &Target, id: &str) -> bool {
        let handle = match self.handle(target).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Failed to read maintenance windows for {}: {}", target, e);
                return false;
            }
        };
        let mut definitions = handle.lock().await;
        match definitions.window_mut(id) {
            Some(window) => {
                window.mark_aborted();
                true
            }
            None => false,
        }
    }

    /// Materialize due recurring occurrences. Returns how many windows were added.
    #[instrument(skip_all, fields(target = %target))]
    pub async fn apply_recurrence(&self, target: &Target) -> Result<usize> {
        let handle = self.handle(target).await?;
        let now = self.clock.now();
        let mut definitions = handle.lock().await;

        let mut advanced = false;
        let mut pending = Vec::new();
        for spec in definitions.recurring_mut() {
            let before = spec.next_check_epoch();
            pending.extend(spec.expand_pending(now, &self.settings));
            advanced |= spec.next_check_epoch() != before;
        }

        let added = pending
            .into_iter()
            .filter(|window| definitions.insert_window(window.clone()))
            .count();

        if added > 0 || advanced {
            self.persist(&target.key(), &definitions).await?;
        }
        if added > 0 {
            info!("Materialized {} recurring maintenance windows", added);
        }
        Ok(added)
    }

    /// A target was registered with the host.
    pub async fn on_target_created(&self, target: &Target) {
        let mut cache = self.cache.write().await;
        cache
            .entry(target.key())
            .or_insert_with(|| Arc::new(Mutex::new(Definitions::default())));
        debug!("Registered maintenance definitions for {}", target);
    }

    /// A target was removed from the host. Its durable record is kept.
    pub async fn on_target_deleted(&self, target: &Target) {
        if self.cache.write().await.remove(&target.key()).is_some() {
            debug!("Dropped cached maintenance definitions for {}", target);
        }
    }

    /// Move the definitions to the new key and persist them there.
    ///
    /// Definitions that were never loaded are read from storage first.
    #[instrument(skip_all, fields(old = %old, new = %new))]
    pub async fn on_target_renamed(&self, old: &Target, new: &Target) -> Result<()> {
        let cached = {
            let mut cache = self.cache.write().await;
            let handle = cache.remove(&old.key());
            if let Some(handle) = &handle {
                cache.insert(new.key(), handle.clone());
            }
            handle
        };

        let handle = match cached {
            Some(handle) => handle,
            None => {
                if self.storage.read(&old.key()).await?.is_none() {
                    debug!("No maintenance definitions to move");
                    return Ok(());
                }
                let handle = Arc::new(Mutex::new(self.load(&old.key()).await?));
                if self.directory.exists(new) {
                    self.cache
                        .write()
                        .await
                        .entry(new.key())
                        .or_insert_with(|| handle.clone());
                }
                handle
            }
        };

        let definitions = handle.lock().await;
        self.persist(&new.key(), &definitions).await?;
        self.storage.remove(&old.key()).await?;
        info!("Moved maintenance definitions to renamed target");
        Ok(())
    }

    /// Keys of every durable record, including those of targets the host
    /// no longer knows.
    pub async fn stored_keys(&self) -> Result<Vec<String>> {
        Ok(self.storage.keys().await?)
    }

    /// Drop a target's cached and durable definitions.
    pub async fn forget_target(&self, target: &Target) -> Result<()> {
        self.cache.write().await.remove(&target.key());
        self.storage.remove(&target.key()).await?;
        info!("Removed maintenance definitions of {}", target);
        Ok(())
    }

    pub async fn clear_cache(&self) {
        let mut cache = self.cache.write().await;
        let count = cache.len();
        cache.clear();
        if count > 0 {
            debug!("Cleared {} cached maintenance definitions", count);
        }
    }

    pub async fn cached_targets(&self) -> usize {
        self.cache.read().await.len()
    }
}
