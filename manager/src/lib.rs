pub mod clock;
pub mod config;
pub mod constants;
pub mod database;
pub mod errors;
pub mod host;
pub mod inventory;
pub mod provisioning;
pub mod retention;
pub mod scheduler;
pub mod store;
pub mod target;
pub mod web;
pub mod window;

// Re-export commonly used types
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{Config, ConfigManager};
pub use database::SqliteStorage;
pub use errors::{ConfigError, MaintenanceError, StorageError};
pub use inventory::Inventory;
pub use provisioning::{ProvisionDecision, ProvisioningGate};
pub use retention::MaintenanceRetention;
pub use scheduler::EvaluationScheduler;
pub use store::WindowStore;
pub use target::{Target, TargetKind};
pub use window::{MaintenanceWindow, RecurringWindowSpec};
