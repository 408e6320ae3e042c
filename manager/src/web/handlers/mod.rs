//! HTTP request handlers for the maintenance API.
//!
//! - `agents` - in-memory agent inventory and work reports
//! - `common` - envelope, error mapping and request bodies
//! - `provisioning` - cloud capacity checks
//! - `targets` - target listing, status overviews and stored definitions
//! - `windows` - one-off and recurring window management

pub mod agents;
pub mod common;
pub mod provisioning;
pub mod targets;
pub mod windows;

pub use agents::*;
pub use provisioning::*;
pub use targets::*;
pub use windows::*;
