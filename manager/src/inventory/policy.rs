//! Regular retention policy of inventory agents.

use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::constants::retention::REGULAR_RECHECK;
use crate::host::{HostResource, RetentionPolicy};

/// Keep every agent online.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOnline;

#[async_trait]
impl RetentionPolicy for AlwaysOnline {
    async fn is_accepting_tasks(&self, resource: &dyn HostResource) -> bool {
        resource.is_online()
    }

    async fn is_manual_launch_allowed(&self, _resource: &dyn HostResource) -> bool {
        true
    }

    async fn check(&self, resource: &dyn HostResource) -> Duration {
        if !resource.is_online() {
            info!("Bringing agent {} back online", resource.name());
            resource.connect().await;
        }
        REGULAR_RECHECK
    }
}
