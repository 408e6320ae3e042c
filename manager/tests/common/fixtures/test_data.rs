//! Common test data and constants

use chrono::{DateTime, Duration, TimeZone, Utc};

/// Instant every pinned-clock test starts at: Friday 2024-03-01 10:00 UTC
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
}

pub fn minutes(n: i64) -> Duration {
    Duration::minutes(n)
}

/// Common test agent names
pub mod agents {
    pub const BUILD_1: &str = "build-01";
    pub const BUILD_2: &str = "build-02";
    pub const DEPLOY: &str = "deploy-01";
}

/// Common test cloud names
pub mod clouds {
    pub const AWS: &str = "aws";
    pub const GCP: &str = "gcp";
}

pub mod labels {
    pub const LINUX: &str = "linux";
    pub const DOCKER: &str = "docker";
    pub const WINDOWS: &str = "windows";
}

pub mod reasons {
    pub const KERNEL: &str = "kernel upgrade";
    pub const NIGHTLY: &str = "nightly reboot";
}
