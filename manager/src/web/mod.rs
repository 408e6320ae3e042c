// File: manager/src/web/mod.rs
pub mod handlers;
pub mod server;

pub use server::{create_router, start_web_server};

use chrono_tz::Tz;
use std::sync::Arc;

use crate::config::Config;
use crate::inventory::Inventory;
use crate::provisioning::ProvisioningGate;
use crate::retention::MaintenanceRetention;
use crate::store::WindowStore;

// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<WindowStore>,
    pub gate: Arc<ProvisioningGate>,
    pub inventory: Arc<Inventory>,
    pub retention: Arc<MaintenanceRetention>,
    // Zone that window input and display strings are read in
    pub timezone: Tz,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        store: Arc<WindowStore>,
        gate: Arc<ProvisioningGate>,
        inventory: Arc<Inventory>,
        retention: Arc<MaintenanceRetention>,
    ) -> Self {
        let timezone = store.settings().timezone;
        Self {
            config,
            store,
            gate,
            inventory,
            retention,
            timezone,
        }
    }
}
