// File: manager/src/main.rs
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use maintenance_manager::config::ConfigManager;
use maintenance_manager::database::SqliteStorage;
use maintenance_manager::inventory::{AlwaysOnline, Inventory};
use maintenance_manager::target::Disambiguators;
use maintenance_manager::web::{start_web_server, AppState};
use maintenance_manager::{
    EvaluationScheduler, MaintenanceRetention, ProvisioningGate, SystemClock, WindowStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::from_default_env()
        .add_directive("maintenance_manager=info".parse()?)
        .add_directive("tower_http=warn".parse()?)
        .add_directive("tokio_cron_scheduler=warn".parse()?)
        .add_directive("sqlx=warn".parse()?);

    fmt().with_env_filter(env_filter).init();

    info!("Starting Maintenance Window Manager");

    // Load configuration
    let config_manager = ConfigManager::new("config".to_string()).await?;
    let config = config_manager.get_current_config();
    info!(
        "Configuration loaded: {} agents, {} cloud pools, timezone {}",
        config.agents.len(),
        config.clouds.len(),
        config.timezone
    );

    let storage = Arc::new(SqliteStorage::new(&config.database_path).await?);
    info!("Database initialized at {}", config.database_path);

    // Cloud pools sharing a name keep the tokens they were given before
    let mut disambiguators = Disambiguators::new(storage.load_disambiguators().await?);
    let inventory = Arc::new(Inventory::from_config(&config, &mut disambiguators));
    if let Err(e) = storage.save_disambiguators(disambiguators.tokens()).await {
        warn!("Failed to save cloud disambiguators: {}", e);
    }

    let store = Arc::new(WindowStore::new(
        storage.clone(),
        inventory.clone(),
        Arc::new(SystemClock),
        config.recurrence_settings()?,
    ));

    let retention = Arc::new(MaintenanceRetention::new(
        store.clone(),
        inventory.dispatch_lock(),
        Arc::new(AlwaysOnline),
    ));
    let gate = Arc::new(ProvisioningGate::new(store.clone()));
    info!("Maintenance services initialized");

    let scheduler = EvaluationScheduler::new(
        inventory.clone(),
        retention.clone(),
        store.clone(),
        config.evaluation_schedule.clone(),
    )
    .await?;
    scheduler.start().await?;

    start_web_server(AppState::new(config, store, gate, inventory, retention)).await?;

    Ok(())
}
