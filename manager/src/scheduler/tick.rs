use chrono::Duration;
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, error};

use crate::host::{CapacityPool, RetentionPolicy};
use crate::inventory::Inventory;
use crate::retention::MaintenanceRetention;
use crate::store::WindowStore;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickSummary {
    pub agents_checked: usize,
    pub agents_skipped: usize,
    pub clouds_checked: usize,
    pub cloud_windows_materialized: usize,
}

/// Run one evaluation round over the whole inventory.
pub async fn run_tick(
    inventory: &Inventory,
    retention: &MaintenanceRetention,
    store: &WindowStore,
) -> TickSummary {
    let now = store.now();
    let (due, waiting): (Vec<_>, Vec<_>) = inventory
        .agents()
        .into_iter()
        .partition(|agent| agent.is_due(now));

    let checks = due.iter().map(|agent| async move {
        let delay = retention.check(&**agent).await;
        let delay = Duration::from_std(delay).unwrap_or_else(|_| Duration::minutes(1));
        agent.schedule_next_check(now + delay);
    });
    join_all(checks).await;

    let mut summary = TickSummary {
        agents_checked: due.len(),
        agents_skipped: waiting.len(),
        ..TickSummary::default()
    };

    for cloud in inventory.clouds() {
        let target = cloud.target();
        match store.apply_recurrence(&target).await {
            Ok(added) => summary.cloud_windows_materialized += added,
            Err(e) => error!("Failed to apply recurring windows for {}: {}", target, e),
        }
        // resolving the active window prunes finished ones
        store.active_window(&target).await;
        summary.clouds_checked += 1;
    }

    debug!(
        "Evaluation tick: {} agents checked, {} waiting, {} clouds",
        summary.agents_checked, summary.agents_skipped, summary.clouds_checked
    );
    summary
}
