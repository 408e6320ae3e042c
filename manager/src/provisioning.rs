//! Capacity checks for elastic pools
//!
//! Read-only: a pool with an active window must not provision new capacity,
//! and a request that such a pool could have served waits as well.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::host::CapacityPool;
use crate::store::WindowStore;
use crate::target::{Target, TargetKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ProvisionDecision {
    Allowed,
    Blocked { reason: String },
}

impl ProvisionDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, ProvisionDecision::Allowed)
    }
}

pub struct ProvisioningGate {
    store: Arc<WindowStore>,
}

impl ProvisioningGate {
    pub fn new(store: Arc<WindowStore>) -> Self {
        Self { store }
    }

    pub async fn allow_provision(&self, target: &Target) -> ProvisionDecision {
        if self.store.has_active_windows(target).await {
            debug!("Provisioning blocked for {}", target);
            return ProvisionDecision::Blocked {
                reason: blocked_reason(target),
            };
        }
        ProvisionDecision::Allowed
    }

    /// Block a labelled request if any pool in maintenance could serve it.
    /// Requests without a label are never blocked.
    pub async fn allow_request(
        &self,
        label: Option<&str>,
        pools: &[Arc<dyn CapacityPool>],
    ) -> ProvisionDecision {
        let Some(label) = label else {
            return ProvisionDecision::Allowed;
        };

        for pool in pools {
            if !pool.can_provision(label) {
                continue;
            }
            let target = pool.target();
            if self.store.has_active_windows(&target).await {
                debug!("Request for label '{}' blocked by {}", label, target);
                return ProvisionDecision::Blocked {
                    reason: blocked_reason(&target),
                };
            }
        }
        ProvisionDecision::Allowed
    }
}

fn blocked_reason(target: &Target) -> String {
    let kind = match target.kind() {
        TargetKind::Agent => "Agent",
        TargetKind::Cloud => "Cloud",
    };
    format!("{} '{}' in maintenance", kind, target.name())
}
