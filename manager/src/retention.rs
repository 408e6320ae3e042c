//! Maintenance-aware retention for agents
//!
//! [`MaintenanceRetention`] wraps the agent's regular retention policy. While
//! a window is active it takes over: idle agents are disconnected, busy ones
//! either get a grace period or have their work aborted, and the disconnect
//! follows once the work has drained. Without an active window the regular
//! policy decides, except that an agent taken offline by a window that does
//! not bring it back stays offline.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::constants::retention::{ACTIVE_WINDOW_RECHECK, HOLD_OFFLINE_RECHECK};
use crate::host::{
    AbortResult, DispatchLock, HostResource, InterruptionCause, MaintenanceOfflineCause,
    OfflineCause, RetentionPolicy,
};
use crate::store::WindowStore;
use crate::target::Target;
use crate::window::MaintenanceWindow;

/// What the agent looks like at the time of a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceState {
    pub online: bool,
    pub idle: bool,
    /// Offline because of a window that does not take it back online
    pub held_by_maintenance: bool,
}

impl ResourceState {
    pub fn of(resource: &dyn HostResource) -> Self {
        let online = resource.is_online();
        let held_by_maintenance = !online
            && resource
                .offline_cause()
                .as_ref()
                .and_then(OfflineCause::as_maintenance)
                .is_some_and(|cause| !cause.take_online);

        Self {
            online,
            idle: resource.is_idle(),
            held_by_maintenance,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// No window governs the agent
    Delegate,
    /// Stay offline after a window that does not take the agent back online
    HoldOffline,
    /// A window governs but nothing needs doing this round
    Wait,
    Disconnect,
    /// Interrupt running work; the disconnect follows on a later check
    AbortRunning,
}

pub fn decide(
    window: Option<&MaintenanceWindow>,
    state: &ResourceState,
    now: DateTime<Utc>,
) -> Decision {
    let Some(window) = window else {
        return if state.held_by_maintenance {
            Decision::HoldOffline
        } else {
            Decision::Delegate
        };
    };

    if !state.online {
        return Decision::Wait;
    }

    if window.keep_up_when_active() && !window.is_wait_expired_at(now) {
        return if state.idle {
            Decision::Disconnect
        } else {
            Decision::Wait
        };
    }

    if window.is_aborted() {
        Decision::Disconnect
    } else {
        Decision::AbortRunning
    }
}

pub struct MaintenanceRetention {
    store: Arc<WindowStore>,
    dispatch: Arc<DispatchLock>,
    regular: Arc<dyn RetentionPolicy>,
}

impl MaintenanceRetention {
    pub fn new(
        store: Arc<WindowStore>,
        dispatch: Arc<DispatchLock>,
        regular: Arc<dyn RetentionPolicy>,
    ) -> Self {
        Self {
            store,
            dispatch,
            regular,
        }
    }

    pub fn regular(&self) -> &Arc<dyn RetentionPolicy> {
        &self.regular
    }

    async fn governed(&self, resource: &dyn HostResource) -> bool {
        self.store
            .active_window(&Target::agent(resource.name()))
            .await
            .is_some()
    }

    async fn disconnect(&self, resource: &dyn HostResource, window: &MaintenanceWindow) {
        let cause = OfflineCause::Maintenance(MaintenanceOfflineCause::from_window(
            resource.name(),
            window,
        ));
        self.dispatch
            .with_lock(|| resource.disconnect(cause))
            .await;
    }

    async fn abort_running(
        &self,
        target: &Target,
        resource: &dyn HostResource,
        window: &MaintenanceWindow,
    ) {
        let cause = InterruptionCause::maintenance();
        let mut interrupted = 0;
        for executor in resource.busy_executors() {
            if executor.is_busy() {
                executor.interrupt(AbortResult::Aborted, &cause);
                interrupted += 1;
            }
        }
        if !self.store.mark_aborted(target, window.id()).await {
            warn!(
                "Maintenance window {} vanished before it could be marked aborted",
                window.id()
            );
        }
        debug!("Interrupted {} busy executors", interrupted);
    }
}

#[async_trait]
impl RetentionPolicy for MaintenanceRetention {
    async fn is_accepting_tasks(&self, resource: &dyn HostResource) -> bool {
        if self.governed(resource).await {
            return false;
        }
        self.regular.is_accepting_tasks(resource).await
    }

    async fn is_manual_launch_allowed(&self, resource: &dyn HostResource) -> bool {
        if self.governed(resource).await {
            return false;
        }
        self.regular.is_manual_launch_allowed(resource).await
    }

    #[instrument(skip_all, fields(agent = resource.name()))]
    async fn check(&self, resource: &dyn HostResource) -> Duration {
        let target = Target::agent(resource.name());
        if let Err(e) = self.store.apply_recurrence(&target).await {
            warn!("Failed to apply recurring maintenance windows: {}", e);
        }

        let window = self.store.active_window(&target).await;
        let state = ResourceState::of(resource);
        let decision = decide(window.as_ref(), &state, self.store.now());
        debug!(
            "Checked agent: online = {}, idle = {}, decision = {:?}",
            state.online, state.idle, decision
        );

        let Some(window) = window else {
            if decision == Decision::HoldOffline {
                info!("Agent stays offline after maintenance without automatic reconnect");
                return HOLD_OFFLINE_RECHECK;
            }
            return self.regular.check(resource).await;
        };

        match decision {
            Decision::Disconnect if window.keep_up_when_active() && !window.is_aborted() => {
                info!("Disconnecting agent as it was idle when maintenance window started");
                self.disconnect(resource, &window).await;
            }
            Decision::Disconnect => {
                info!("Disconnecting agent after running work was aborted for maintenance");
                self.disconnect(resource, &window).await;
            }
            Decision::AbortRunning => {
                if window.keep_up_when_active() {
                    info!("Aborting running work as the maximum wait for maintenance is over");
                } else {
                    info!("Aborting running work for maintenance");
                }
                self.abort_running(&target, resource, &window).await;
            }
            Decision::Wait | Decision::Delegate | Decision::HoldOffline => {}
        }
        ACTIVE_WINDOW_RECHECK
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use rstest::rstest;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
    }

    fn governing(keep_up: bool, max_wait: i64, aborted: bool) -> MaintenanceWindow {
        let mut w = MaintenanceWindow::builder(start(), start() + ChronoDuration::hours(2))
            .keep_up_when_active(keep_up)
            .max_wait_minutes(max_wait)
            .build();
        if aborted {
            w.mark_aborted();
        }
        w
    }

    fn agent(online: bool, idle: bool) -> ResourceState {
        ResourceState {
            online,
            idle,
            held_by_maintenance: false,
        }
    }

    fn during() -> DateTime<Utc> {
        start() + ChronoDuration::minutes(30)
    }

    #[test]
    fn without_window_the_regular_policy_decides() {
        assert_eq!(decide(None, &agent(true, true), during()), Decision::Delegate);
        assert_eq!(decide(None, &agent(false, true), during()), Decision::Delegate);

        let held = ResourceState {
            online: false,
            idle: true,
            held_by_maintenance: true,
        };
        assert_eq!(decide(None, &held, during()), Decision::HoldOffline);
    }

    #[rstest]
    // keep up, still waiting
    #[case(governing(true, -1, false), agent(true, true), Decision::Disconnect)]
    #[case(governing(true, -1, false), agent(true, false), Decision::Wait)]
    // keep up, wait expired
    #[case(governing(true, 10, false), agent(true, false), Decision::AbortRunning)]
    #[case(governing(true, 10, true), agent(true, false), Decision::Disconnect)]
    // no grace period
    #[case(governing(false, -1, false), agent(true, false), Decision::AbortRunning)]
    #[case(governing(false, -1, false), agent(true, true), Decision::AbortRunning)]
    #[case(governing(false, -1, true), agent(true, false), Decision::Disconnect)]
    // already offline
    #[case(governing(false, -1, false), agent(false, true), Decision::Wait)]
    #[case(governing(true, -1, true), agent(false, true), Decision::Wait)]
    fn active_window_decisions(
        #[case] window: MaintenanceWindow,
        #[case] state: ResourceState,
        #[case] expected: Decision,
    ) {
        assert_eq!(decide(Some(&window), &state, during()), expected);
    }
}
