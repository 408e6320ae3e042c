//! Recurring window specs
//!
//! A spec is expanded ahead of time into concrete windows. Each call to
//! [`RecurringWindowSpec::expand_pending`] covers the next check-interval
//! slice shifted by the lead time, so occurrences appear about a week before
//! they start and each occurrence is materialized once.

use chrono::{DateTime, Duration, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::recurrence::{CHECK_INTERVAL_MINUTES, LEAD_TIME_DAYS};
use crate::constants::windows::DEFAULT_CREATED_BY;
use crate::errors::MaintenanceError;

use super::cron::CronExpr;
use super::duration::parse_duration;
use super::{normalize_id, MaintenanceWindow};

/// Expansion knobs shared by every spec.
#[derive(Debug, Clone, Copy)]
pub struct RecurrenceSettings {
    pub check_interval_minutes: i64,
    pub lead_time_days: i64,
    pub timezone: Tz,
}

impl Default for RecurrenceSettings {
    fn default() -> Self {
        Self {
            check_interval_minutes: CHECK_INTERVAL_MINUTES,
            lead_time_days: LEAD_TIME_DAYS,
            timezone: Tz::UTC,
        }
    }
}

impl RecurrenceSettings {
    pub fn check_interval(&self) -> Duration {
        Duration::minutes(self.check_interval_minutes)
    }

    pub fn lead_time(&self) -> Duration {
        Duration::days(self.lead_time_days)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringWindowSpec {
    id: String,
    schedule: CronExpr,
    reason: String,
    take_online: bool,
    keep_up_when_active: bool,
    max_wait_minutes: i64,
    duration_minutes: i64,
    created_by: String,
    #[serde(default)]
    next_check_epoch: i64,
}

impl RecurringWindowSpec {
    /// Validate the schedule and duration of a new spec.
    ///
    /// `duration` and `max_wait` accept integer minutes or duration strings.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cron_expression: &str,
        duration: &str,
        reason: impl Into<String>,
        take_online: bool,
        keep_up_when_active: bool,
        max_wait: &str,
        created_by: impl Into<String>,
        id: Option<&str>,
    ) -> Result<Self, MaintenanceError> {
        let invalid = |reason: String| MaintenanceError::InvalidRecurrence {
            expression: cron_expression.to_string(),
            reason,
        };

        let schedule = CronExpr::parse(cron_expression).map_err(|e| invalid(e.to_string()))?;
        let duration_minutes = parse_duration(duration);
        if duration_minutes <= 0 {
            return Err(invalid(format!("duration '{}' must be positive", duration)));
        }
        if window_length(duration_minutes).is_none() {
            return Err(invalid(format!("duration '{}' is too long", duration)));
        }

        let created_by = created_by.into();
        Ok(Self {
            id: normalize_id(id),
            schedule,
            reason: reason.into(),
            take_online,
            keep_up_when_active,
            max_wait_minutes: parse_duration(max_wait),
            duration_minutes,
            created_by: if created_by.trim().is_empty() {
                DEFAULT_CREATED_BY.to_string()
            } else {
                created_by
            },
            next_check_epoch: 0,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn cron_expression(&self) -> &str {
        self.schedule.as_str()
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn take_online(&self) -> bool {
        self.take_online
    }

    pub fn keep_up_when_active(&self) -> bool {
        self.keep_up_when_active
    }

    pub fn max_wait_minutes(&self) -> i64 {
        self.max_wait_minutes
    }

    pub fn duration_minutes(&self) -> i64 {
        self.duration_minutes
    }

    pub fn created_by(&self) -> &str {
        &self.created_by
    }

    pub fn next_check_epoch(&self) -> i64 {
        self.next_check_epoch
    }

    /// Materialize the occurrences that became due since the last call.
    ///
    /// Returns nothing until `now` passes the stored next-check instant, then
    /// scans one slice and advances the next-check instant past it.
    pub fn expand_pending(
        &mut self,
        now: DateTime<Utc>,
        settings: &RecurrenceSettings,
    ) -> Vec<MaintenanceWindow> {
        let now = truncate_to_minute(now);
        if now.timestamp() <= self.next_check_epoch {
            return Vec::new();
        }

        let check_interval = settings.check_interval();
        let lead_time = settings.lead_time();

        let slice_start = DateTime::from_timestamp(self.next_check_epoch, 0)
            .map(truncate_to_minute)
            .unwrap_or(now);
        let mut slice_end = slice_start + check_interval;
        if slice_end < now {
            slice_end = now + check_interval;
        }

        let mut cursor = (slice_start + lead_time).max(now);
        let scan_end = slice_end + lead_time;
        let mut windows = Vec::new();
        while cursor < scan_end {
            if self.schedule.matches(&cursor.with_timezone(&settings.timezone)) {
                match self.materialize(cursor) {
                    Some(window) => windows.push(window),
                    None => warn!(
                        "Recurring window {} lasts {} minutes, which cannot be scheduled",
                        self.id, self.duration_minutes
                    ),
                }
            }
            cursor += Duration::minutes(1);
        }

        self.next_check_epoch = slice_end.timestamp();
        windows
    }

    /// None when the end of the occurrence is not representable.
    fn materialize(&self, start: DateTime<Utc>) -> Option<MaintenanceWindow> {
        let end = start.checked_add_signed(window_length(self.duration_minutes)?)?;
        Some(
            MaintenanceWindow::builder(start, end)
                .reason(self.reason.clone())
                .take_online(self.take_online)
                .keep_up_when_active(self.keep_up_when_active)
                .max_wait_minutes(self.max_wait_minutes)
                .created_by(self.created_by.clone())
                .build(),
        )
    }
}

impl PartialEq for RecurringWindowSpec {
    fn eq(&self, other: &Self) -> bool {
        self.schedule.as_str() == other.schedule.as_str()
            && self.reason == other.reason
            && self.take_online == other.take_online
            && self.keep_up_when_active == other.keep_up_when_active
            && self.max_wait_minutes == other.max_wait_minutes
            && self.duration_minutes == other.duration_minutes
            && self.created_by == other.created_by
    }
}

impl Eq for RecurringWindowSpec {}

/// Occurrence length, if it fits the range of representable instants.
fn window_length(minutes: i64) -> Option<Duration> {
    let length = Duration::try_minutes(minutes)?;
    DateTime::<Utc>::UNIX_EPOCH.checked_add_signed(length).map(|_| length)
}

fn truncate_to_minute(at: DateTime<Utc>) -> DateTime<Utc> {
    at.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(at)
}
