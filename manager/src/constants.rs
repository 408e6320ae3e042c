//! Central repository for intervals, formats and defaults
//!
//! Constants are grouped by the component that owns them.

use std::time::Duration;

/// Recurring window expansion
pub mod recurrence {
    /// Minutes between two expansions of the same recurring spec
    pub const CHECK_INTERVAL_MINUTES: i64 = 15;

    /// How far ahead of an occurrence its concrete window is created
    pub const LEAD_TIME_DAYS: i64 = 7;
}

/// Retention controller re-check hints
pub mod retention {
    use super::Duration;

    /// Delay returned while an active window governs an agent
    pub const ACTIVE_WINDOW_RECHECK: Duration = Duration::from_secs(60);

    /// Delay returned while an agent is held offline after its window ended
    pub const HOLD_OFFLINE_RECHECK: Duration = Duration::from_secs(5 * 60);

    /// Delay returned by the always-online policy
    pub const REGULAR_RECHECK: Duration = Duration::from_secs(60);
}

/// Window formatting and defaults
pub mod windows {
    /// Accepted input format, single-digit fields allowed
    pub const INPUT_FORMAT: &str = "%Y-%m-%d %H:%M";

    pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";

    /// Creator recorded when none is given
    pub const DEFAULT_CREATED_BY: &str = "System";

    /// Interruption description handed to aborted executors
    pub const INTERRUPTION_DESCRIPTION: &str = "Agent is going down for scheduled maintenance";
}

/// Defaults for `main.toml` knobs
pub mod defaults {
    pub const HOST: &str = "0.0.0.0";
    pub const PORT: u16 = 8095;
    pub const DATABASE_PATH: &str = "data/maintenance.db";
    pub const TIMEZONE: &str = "UTC";

    /// 6-field schedule driving the evaluation tick (every minute)
    pub const EVALUATION_SCHEDULE: &str = "0 * * * * *";

    pub const EXECUTORS_PER_AGENT: usize = 1;
}
