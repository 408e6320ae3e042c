// File: manager/src/scheduler/operations.rs
use crate::inventory::Inventory;
use crate::retention::MaintenanceRetention;
use crate::store::WindowStore;
use anyhow::{anyhow, Result};
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{info, instrument};

use super::tick::run_tick;

pub struct EvaluationScheduler {
    inventory: Arc<Inventory>,
    retention: Arc<MaintenanceRetention>,
    store: Arc<WindowStore>,
    schedule: String,
    scheduler: JobScheduler,
}

impl EvaluationScheduler {
    pub async fn new(
        inventory: Arc<Inventory>,
        retention: Arc<MaintenanceRetention>,
        store: Arc<WindowStore>,
        schedule: String,
    ) -> Result<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| anyhow!("Failed to create JobScheduler: {}", e))?;

        Ok(Self {
            inventory,
            retention,
            store,
            schedule,
            scheduler,
        })
    }

    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<()> {
        validate_6_field_cron(&self.schedule)
            .map_err(|e| anyhow!("Invalid 6-field cron schedule '{}': {}", self.schedule, e))?;

        let inventory = self.inventory.clone();
        let retention = self.retention.clone();
        let store = self.store.clone();

        let job = Job::new_async(self.schedule.as_str(), move |_uuid, _scheduler| {
            let inventory = inventory.clone();
            let retention = retention.clone();
            let store = store.clone();

            Box::pin(async move {
                run_tick(&inventory, &retention, &store).await;
            })
        })
        .map_err(|e| anyhow!("Failed to create evaluation job for '{}': {}", self.schedule, e))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| anyhow!("Failed to add evaluation job to scheduler: {}", e))?;

        self.scheduler
            .start()
            .await
            .map_err(|e| anyhow!("Failed to start scheduler: {}", e))?;

        info!("Evaluation scheduler started: '{}'", self.schedule);
        Ok(())
    }
}

/// Check a tokio-cron-scheduler expression: sec min hour day month dayofweek.
pub fn validate_6_field_cron(schedule: &str) -> Result<()> {
    let parts: Vec<&str> = schedule.split_whitespace().collect();

    if parts.len() != 6 {
        return Err(anyhow!(
            "tokio-cron-scheduler requires exactly 6 fields: second minute hour day month dayofweek. Got {} fields: '{}'",
            parts.len(),
            schedule
        ));
    }

    validate_cron_field(parts[0], "second", 0, 59)?;
    validate_cron_field(parts[1], "minute", 0, 59)?;
    validate_cron_field(parts[2], "hour", 0, 23)?;
    validate_cron_field(parts[3], "day", 1, 31)?;
    validate_cron_field(parts[4], "month", 1, 12)?;
    validate_cron_field(parts[5], "dayofweek", 0, 7)?;
    Ok(())
}

fn validate_cron_field(field: &str, name: &str, min: u32, max: u32) -> Result<()> {
    if field == "*" || field == "?" {
        return Ok(());
    }

    if let Some(step) = field.strip_prefix("*/") {
        let step = step
            .parse::<u32>()
            .map_err(|_| anyhow!("Invalid {} step value: {}", name, step))?;
        if step == 0 {
            return Err(anyhow!("{} step value cannot be 0", name));
        }
        return Ok(());
    }

    for part in field.split(',') {
        let (start, end) = part.split_once('-').unwrap_or((part, part));
        for value in [start, end] {
            let value = value
                .parse::<u32>()
                .map_err(|_| anyhow!("Invalid {} value: {}", name, part))?;
            if value < min || value > max {
                return Err(anyhow!(
                    "{} value {} is outside valid range {}-{}",
                    name,
                    value,
                    min,
                    max
                ));
            }
        }
    }
    Ok(())
}
