//! Maintenance windows
//!
//! A [`MaintenanceWindow`] is an immutable interval of planned downtime plus
//! the policy flags that decide how running work is treated. The only
//! mutable part is the transient aborted marker set once running work has
//! been interrupted; it is never persisted.

pub mod cron;
pub mod duration;
pub mod recurring;

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::windows::{DEFAULT_CREATED_BY, DISPLAY_FORMAT, INPUT_FORMAT};
use crate::errors::MaintenanceError;

pub use cron::{CronExpr, CronParseError};
pub use duration::parse_duration;
pub use recurring::{RecurrenceSettings, RecurringWindowSpec};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceWindow {
    #[serde(default = "new_window_id")]
    id: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    take_online: bool,
    #[serde(default)]
    keep_up_when_active: bool,
    #[serde(default = "no_wait_limit")]
    max_wait_minutes: i64,
    #[serde(default = "default_created_by")]
    created_by: String,
    #[serde(skip)]
    aborted: bool,
}

fn new_window_id() -> String {
    Uuid::new_v4().to_string()
}

fn no_wait_limit() -> i64 {
    -1
}

fn default_created_by() -> String {
    DEFAULT_CREATED_BY.to_string()
}

/// Keep a well-formed id, replace anything else with a fresh one.
pub(crate) fn normalize_id(id: Option<&str>) -> String {
    id.and_then(|id| Uuid::parse_str(id.trim()).ok())
        .map(|uuid| uuid.to_string())
        .unwrap_or_else(new_window_id)
}

/// Parse `yyyy-M-d H:m` in `tz` into a UTC instant.
pub fn parse_local_time(input: &str, tz: &Tz) -> Result<DateTime<Utc>, MaintenanceError> {
    let invalid = |reason: String| MaintenanceError::InvalidTime {
        input: input.to_string(),
        reason,
    };

    let naive = NaiveDateTime::parse_from_str(input.trim(), INPUT_FORMAT)
        .map_err(|e| invalid(e.to_string()))?;
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| invalid(format!("local time does not exist in {}", tz.name())))
}

impl MaintenanceWindow {
    pub fn builder(start: DateTime<Utc>, end: DateTime<Utc>) -> WindowBuilder {
        WindowBuilder::new(start, end)
    }

    /// Builder from user-entered start and end strings in `tz`.
    pub fn parse_input(start: &str, end: &str, tz: &Tz) -> Result<WindowBuilder, MaintenanceError> {
        Ok(WindowBuilder::new(
            parse_local_time(start, tz)?,
            parse_local_time(end, tz)?,
        ))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
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

    /// Negative means no limit
    pub fn max_wait_minutes(&self) -> i64 {
        self.max_wait_minutes
    }

    pub fn created_by(&self) -> &str {
        &self.created_by
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    pub fn mark_aborted(&mut self) {
        self.aborted = true;
    }

    pub fn is_scheduled_at(&self, now: DateTime<Utc>) -> bool {
        self.start <= now && now < self.end
    }

    pub fn is_over_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.end
    }

    /// A limit too large to represent never expires.
    pub fn is_wait_expired_at(&self, now: DateTime<Utc>) -> bool {
        if self.max_wait_minutes < 0 {
            return false;
        }
        Duration::try_minutes(self.max_wait_minutes)
            .and_then(|wait| self.start.checked_add_signed(wait))
            .is_some_and(|deadline| now >= deadline)
    }

    pub fn is_scheduled(&self) -> bool {
        self.is_scheduled_at(Utc::now())
    }

    pub fn is_over(&self) -> bool {
        self.is_over_at(Utc::now())
    }

    pub fn is_wait_expired(&self) -> bool {
        self.is_wait_expired_at(Utc::now())
    }

    pub fn display_start(&self, tz: &Tz) -> String {
        self.start.with_timezone(tz).format(DISPLAY_FORMAT).to_string()
    }

    pub fn display_end(&self, tz: &Tz) -> String {
        self.end.with_timezone(tz).format(DISPLAY_FORMAT).to_string()
    }

    fn sort_key(&self) -> (DateTime<Utc>, DateTime<Utc>, &str, i64, bool, bool, &str) {
        (
            self.start,
            self.end,
            &self.reason,
            self.max_wait_minutes,
            self.keep_up_when_active,
            self.take_online,
            &self.created_by,
        )
    }
}

impl PartialEq for MaintenanceWindow {
    fn eq(&self, other: &Self) -> bool {
        self.sort_key() == other.sort_key()
    }
}

impl Eq for MaintenanceWindow {}

impl Hash for MaintenanceWindow {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.sort_key().hash(state);
    }
}

impl PartialOrd for MaintenanceWindow {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MaintenanceWindow {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

#[derive(Debug, Clone)]
pub struct WindowBuilder {
    id: Option<String>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    reason: String,
    take_online: bool,
    keep_up_when_active: bool,
    max_wait_minutes: i64,
    created_by: Option<String>,
}

impl WindowBuilder {
    fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            id: None,
            start,
            end,
            reason: String::new(),
            take_online: false,
            keep_up_when_active: false,
            max_wait_minutes: -1,
            created_by: None,
        }
    }

    /// Malformed ids are replaced when the window is built.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn take_online(mut self, take_online: bool) -> Self {
        self.take_online = take_online;
        self
    }

    pub fn keep_up_when_active(mut self, keep_up: bool) -> Self {
        self.keep_up_when_active = keep_up;
        self
    }

    pub fn max_wait_minutes(mut self, minutes: i64) -> Self {
        self.max_wait_minutes = minutes;
        self
    }

    /// Integer minutes or a duration string such as `"1h30m"`.
    pub fn max_wait(self, max_wait: &str) -> Self {
        self.max_wait_minutes(parse_duration(max_wait))
    }

    pub fn created_by(mut self, created_by: impl Into<String>) -> Self {
        self.created_by = Some(created_by.into());
        self
    }

    pub fn build(self) -> MaintenanceWindow {
        let created_by = self
            .created_by
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(default_created_by);

        MaintenanceWindow {
            id: normalize_id(self.id.as_deref()),
            start: self.start,
            end: self.end,
            reason: self.reason,
            take_online: self.take_online,
            keep_up_when_active: self.keep_up_when_active,
            max_wait_minutes: self.max_wait_minutes,
            created_by,
            aborted: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, minute, 0).unwrap()
    }

    fn window(start: DateTime<Utc>, end: DateTime<Utc>) -> MaintenanceWindow {
        MaintenanceWindow::builder(start, end).reason("patching").build()
    }

    #[test]
    fn scheduled_is_half_open() {
        let w = window(utc(1, 10, 0), utc(1, 11, 0));
        assert!(!w.is_scheduled_at(utc(1, 9, 59)));
        assert!(w.is_scheduled_at(utc(1, 10, 0)));
        assert!(w.is_scheduled_at(utc(1, 10, 59)));
        assert!(!w.is_scheduled_at(utc(1, 11, 0)));
        assert!(w.is_over_at(utc(1, 11, 0)));
        assert!(!w.is_over_at(utc(1, 10, 30)));
    }

    #[test]
    fn wait_expiry_respects_limit() {
        let unlimited = window(utc(1, 10, 0), utc(1, 12, 0));
        assert!(!unlimited.is_wait_expired_at(utc(1, 11, 59)));

        let limited = MaintenanceWindow::builder(utc(1, 10, 0), utc(1, 12, 0))
            .max_wait("30m")
            .build();
        assert!(!limited.is_wait_expired_at(utc(1, 10, 29)));
        assert!(limited.is_wait_expired_at(utc(1, 10, 30)));

        let immediate = MaintenanceWindow::builder(utc(1, 10, 0), utc(1, 12, 0))
            .max_wait_minutes(0)
            .build();
        assert!(immediate.is_wait_expired_at(utc(1, 10, 0)));
    }

    #[test]
    fn oversized_wait_limit_never_expires() {
        let w = MaintenanceWindow::builder(utc(1, 10, 0), utc(1, 12, 0))
            .keep_up_when_active(true)
            .max_wait("1000000000000")
            .build();
        assert_eq!(w.max_wait_minutes(), 1_000_000_000_000);
        assert!(!w.is_wait_expired_at(utc(1, 10, 0)));
        assert!(!w.is_wait_expired_at(utc(1, 11, 59)));

        let max = MaintenanceWindow::builder(utc(1, 10, 0), utc(1, 12, 0))
            .max_wait_minutes(i64::MAX)
            .build();
        assert!(!max.is_wait_expired_at(utc(1, 11, 0)));
    }

    #[test]
    fn end_before_start_is_immediately_over() {
        let w = window(utc(1, 11, 0), utc(1, 10, 0));
        assert!(!w.is_scheduled_at(utc(1, 10, 30)));
        assert!(w.is_over_at(utc(1, 10, 30)));
    }

    #[test]
    fn equality_ignores_id_and_aborted() {
        let a = window(utc(1, 10, 0), utc(1, 11, 0));
        let mut b = window(utc(1, 10, 0), utc(1, 11, 0));
        b.mark_aborted();

        assert_ne!(a.id(), b.id());
        assert_eq!(a, b);
        assert_eq!(a.cmp(&b), Ordering::Equal);
    }

    #[test]
    fn ordering_follows_start_then_end_then_reason() {
        let early = window(utc(1, 9, 0), utc(1, 12, 0));
        let short = window(utc(1, 10, 0), utc(1, 11, 0));
        let long = window(utc(1, 10, 0), utc(1, 13, 0));
        let other_reason = MaintenanceWindow::builder(utc(1, 10, 0), utc(1, 11, 0))
            .reason("upgrade")
            .build();

        let mut all = vec![long.clone(), other_reason.clone(), short.clone(), early.clone()];
        all.sort();
        assert_eq!(all, vec![early, short, other_reason, long]);
    }

    #[test]
    fn ids_are_normalized() {
        let kept = MaintenanceWindow::builder(utc(1, 10, 0), utc(1, 11, 0))
            .id("6F9619FF-8B86-D011-B42D-00C04FC964FF")
            .build();
        assert_eq!(kept.id(), "6f9619ff-8b86-d011-b42d-00c04fc964ff");

        let replaced = MaintenanceWindow::builder(utc(1, 10, 0), utc(1, 11, 0))
            .id("not-a-uuid")
            .build();
        assert!(Uuid::parse_str(replaced.id()).is_ok());
    }

    #[test]
    fn empty_creator_defaults_to_system() {
        let w = MaintenanceWindow::builder(utc(1, 10, 0), utc(1, 11, 0))
            .created_by("  ")
            .build();
        assert_eq!(w.created_by(), "System");
    }

    #[test]
    fn parses_input_in_zone() {
        let tz: Tz = "Europe/Berlin".parse().unwrap();
        let w = MaintenanceWindow::parse_input("2024-1-5 9:5", "2024-01-05 10:00", &tz)
            .unwrap()
            .build();
        assert_eq!(w.start(), Utc.with_ymd_and_hms(2024, 1, 5, 8, 5, 0).unwrap());
        assert_eq!(w.display_start(&tz), "2024-01-05 09:05");
        assert_eq!(w.display_end(&Tz::UTC), "2024-01-05 09:00");
    }

    #[test]
    fn malformed_or_missing_local_time_is_rejected() {
        assert!(matches!(
            MaintenanceWindow::parse_input("tomorrow", "2024-01-05 10:00", &Tz::UTC),
            Err(MaintenanceError::InvalidTime { .. })
        ));

        // spring-forward gap
        let tz: Tz = "Europe/Berlin".parse().unwrap();
        assert!(matches!(
            parse_local_time("2024-03-31 02:30", &tz),
            Err(MaintenanceError::InvalidTime { .. })
        ));
    }

    #[test]
    fn aborted_is_not_persisted() {
        let mut w = window(utc(1, 10, 0), utc(1, 11, 0));
        w.mark_aborted();

        let json = serde_json::to_string(&w).unwrap();
        assert!(!json.contains("aborted"));
        let back: MaintenanceWindow = serde_json::from_str(&json).unwrap();
        assert!(!back.is_aborted());
        assert_eq!(back.id(), w.id());
    }
}
