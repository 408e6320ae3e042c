//! Per-target maintenance definitions and their stored shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::window::{MaintenanceWindow, RecurringWindowSpec};

/// Scheduled windows (sorted, unique) and recurring specs of one target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Definitions {
    #[serde(default)]
    scheduled: Vec<MaintenanceWindow>,
    #[serde(default)]
    recurring: Vec<RecurringWindowSpec>,
}

/// Shapes a durable record may take. Older records are a bare window list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StoredDefinitions {
    Current(Definitions),
    Legacy(Vec<MaintenanceWindow>),
}

impl Definitions {
    pub fn from_windows(windows: Vec<MaintenanceWindow>) -> Self {
        Definitions {
            scheduled: windows,
            recurring: Vec::new(),
        }
        .normalized()
    }

    /// Restore the sorted-unique invariant after deserialization.
    pub fn normalized(mut self) -> Self {
        self.scheduled.sort();
        self.scheduled.dedup();
        let mut recurring: Vec<RecurringWindowSpec> = Vec::with_capacity(self.recurring.len());
        for spec in self.recurring {
            if !recurring.contains(&spec) {
                recurring.push(spec);
            }
        }
        self.recurring = recurring;
        self
    }

    pub fn scheduled(&self) -> &[MaintenanceWindow] {
        &self.scheduled
    }

    pub fn recurring(&self) -> &[RecurringWindowSpec] {
        &self.recurring
    }

    pub(crate) fn recurring_mut(&mut self) -> &mut [RecurringWindowSpec] {
        &mut self.recurring
    }

    pub fn is_empty(&self) -> bool {
        self.scheduled.is_empty() && self.recurring.is_empty()
    }

    pub fn window(&self, id: &str) -> Option<&MaintenanceWindow> {
        self.scheduled.iter().find(|w| w.id() == id)
    }

    pub(crate) fn window_mut(&mut self, id: &str) -> Option<&mut MaintenanceWindow> {
        self.scheduled.iter_mut().find(|w| w.id() == id)
    }

    /// Insert keeping sort order. Returns false for an equal window.
    pub fn insert_window(&mut self, window: MaintenanceWindow) -> bool {
        match self.scheduled.binary_search(&window) {
            Ok(_) => false,
            Err(position) => {
                self.scheduled.insert(position, window);
                true
            }
        }
    }

    pub fn insert_recurring(&mut self, spec: RecurringWindowSpec) -> bool {
        if self.recurring.contains(&spec) {
            return false;
        }
        self.recurring.push(spec);
        true
    }

    pub fn remove_window(&mut self, id: &str) -> bool {
        let before = self.scheduled.len();
        self.scheduled.retain(|w| w.id() != id);
        before != self.scheduled.len()
    }

    pub fn remove_recurring(&mut self, id: &str) -> bool {
        let before = self.recurring.len();
        self.recurring.retain(|s| s.id() != id);
        before != self.recurring.len()
    }

    /// Drop windows that are over. Returns how many were removed.
    pub fn prune_over(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.scheduled.len();
        self.scheduled.retain(|w| !w.is_over_at(now));
        before - self.scheduled.len()
    }

    /// Earliest-sorting window that is in effect at `now`.
    pub fn active(&self, now: DateTime<Utc>) -> Option<&MaintenanceWindow> {
        self.scheduled.iter().find(|w| w.is_scheduled_at(now))
    }
}
