//! Evaluation tick for the maintenance daemon
//!
//! A `tokio-cron-scheduler` job runs every minute by default (6-field cron,
//! sec min hour day month dow). Each tick:
//!
//! - checks every agent whose previous re-check delay has elapsed, all
//!   concurrently, through the maintenance-aware retention policy
//! - materializes due recurring windows of every cloud pool and prunes
//!   finished ones
//!
//! ```toml
//! # main.toml
//! evaluation_schedule = "0 * * * * *"
//! ```

pub mod operations;
mod tick;

pub use operations::{validate_6_field_cron, EvaluationScheduler};
pub use tick::{run_tick, TickSummary};
