// File: manager/src/config/mod.rs
pub mod manager;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::constants::{defaults, recurrence};
use crate::errors::ConfigError;
use crate::window::RecurrenceSettings;

pub use manager::ConfigManager;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// Zone used to read window input and to match recurring schedules
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_check_interval_minutes")]
    pub check_interval_minutes: i64,
    #[serde(default = "default_lead_time_days")]
    pub lead_time_days: i64,
    /// 6-field cron schedule of the evaluation tick
    #[serde(default = "default_evaluation_schedule")]
    pub evaluation_schedule: String,
    // Populated from individual group config files
    #[serde(skip)]
    pub agents: HashMap<String, AgentConfig>,
    /// Keyed by pool id (`group/name`)
    #[serde(skip)]
    pub clouds: HashMap<String, CloudConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default = "default_executors")]
    pub executors: usize,
    #[serde(skip)]
    pub group: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudConfig {
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(skip)]
    pub name: String,
    #[serde(skip)]
    pub group: String,
}

/// Contents of a `<group>.toml` file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryFile {
    #[serde(default)]
    pub agents: HashMap<String, AgentConfig>,
    #[serde(default)]
    pub clouds: HashMap<String, CloudConfig>,
}

fn default_host() -> String {
    defaults::HOST.to_string()
}

fn default_port() -> u16 {
    defaults::PORT
}

fn default_database_path() -> String {
    defaults::DATABASE_PATH.to_string()
}

fn default_timezone() -> String {
    defaults::TIMEZONE.to_string()
}

fn default_check_interval_minutes() -> i64 {
    recurrence::CHECK_INTERVAL_MINUTES
}

fn default_lead_time_days() -> i64 {
    recurrence::LEAD_TIME_DAYS
}

fn default_evaluation_schedule() -> String {
    defaults::EVALUATION_SCHEDULE.to_string()
}

fn default_executors() -> usize {
    defaults::EXECUTORS_PER_AGENT
}

impl Config {
    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| ConfigError::InvalidValue {
                field: "timezone".to_string(),
                reason: e.to_string(),
            })
    }

    pub fn recurrence_settings(&self) -> Result<RecurrenceSettings, ConfigError> {
        Ok(RecurrenceSettings {
            check_interval_minutes: self.check_interval_minutes,
            lead_time_days: self.lead_time_days,
            timezone: self.timezone()?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timezone()?;

        if self.check_interval_minutes <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "check_interval_minutes".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.lead_time_days < 0 {
            return Err(ConfigError::InvalidValue {
                field: "lead_time_days".to_string(),
                reason: "must not be negative".to_string(),
            });
        }
        if self.evaluation_schedule.split_whitespace().count() != 6 {
            return Err(ConfigError::InvalidValue {
                field: "evaluation_schedule".to_string(),
                reason: "expected 6 fields (sec min hour day month weekday)".to_string(),
            });
        }
        for (name, agent) in &self.agents {
            if agent.executors == 0 {
                return Err(ConfigError::InvalidValue {
                    field: format!("agents.{}.executors", name),
                    reason: "must be at least 1".to_string(),
                });
            }
        }
        // the key of a cloud uses ':' to separate its disambiguator
        for (name, cloud) in &self.clouds {
            if cloud.name.contains(':') {
                return Err(ConfigError::InvalidValue {
                    field: format!("clouds.{}", name),
                    reason: "cloud names must not contain ':'".to_string(),
                });
            }
        }
        Ok(())
    }
}
