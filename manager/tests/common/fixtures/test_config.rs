//! Test configuration builder for creating test configs programmatically

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Builder for creating test configurations
pub struct TestConfigBuilder {
    temp_dir: TempDir,
    main_config: MainConfigBuilder,
    groups: BTreeMap<String, GroupConfigBuilder>,
}

impl TestConfigBuilder {
    /// Create a new test config builder
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        Self {
            temp_dir,
            main_config: MainConfigBuilder::default(),
            groups: BTreeMap::new(),
        }
    }

    /// Configure main settings
    pub fn with_main_config<F>(mut self, f: F) -> Self
    where
        F: FnOnce(MainConfigBuilder) -> MainConfigBuilder,
    {
        self.main_config = f(self.main_config);
        self
    }

    /// Add a group inventory file
    pub fn with_group<F>(mut self, group: &str, f: F) -> Self
    where
        F: FnOnce(GroupConfigBuilder) -> GroupConfigBuilder,
    {
        self.groups
            .insert(group.to_string(), f(GroupConfigBuilder::default()));
        self
    }

    /// Build and write config files to temp directory
    pub fn build(self) -> TestConfig {
        let config_dir = self.temp_dir.path().join("config");
        fs::create_dir_all(&config_dir).expect("Failed to create config dir");

        fs::write(config_dir.join("main.toml"), self.main_config.to_toml())
            .expect("Failed to write main.toml");

        for (group, builder) in self.groups {
            fs::write(config_dir.join(format!("{}.toml", group)), builder.to_toml())
                .expect("Failed to write group config");
        }

        TestConfig {
            database_path: self.temp_dir.path().join("data").join("maintenance.db"),
            _temp_dir: self.temp_dir,
            config_dir,
        }
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Main configuration builder
#[derive(Clone, Default)]
pub struct MainConfigBuilder {
    entries: BTreeMap<String, String>,
}

impl MainConfigBuilder {
    pub fn port(self, port: u16) -> Self {
        self.raw("port", &port.to_string())
    }

    pub fn timezone(self, timezone: &str) -> Self {
        self.raw("timezone", &format!("\"{}\"", timezone))
    }

    pub fn check_interval_minutes(self, minutes: i64) -> Self {
        self.raw("check_interval_minutes", &minutes.to_string())
    }

    pub fn lead_time_days(self, days: i64) -> Self {
        self.raw("lead_time_days", &days.to_string())
    }

    pub fn evaluation_schedule(self, schedule: &str) -> Self {
        self.raw("evaluation_schedule", &format!("\"{}\"", schedule))
    }

    /// Set a key to an already TOML-encoded value
    pub fn raw(mut self, key: &str, value: &str) -> Self {
        self.entries.insert(key.to_string(), value.to_string());
        self
    }

    fn to_toml(&self) -> String {
        self.entries
            .iter()
            .map(|(key, value)| format!("{} = {}\n", key, value))
            .collect()
    }
}

/// Group inventory file builder
#[derive(Clone, Default)]
pub struct GroupConfigBuilder {
    agents: Vec<(String, Vec<String>, usize)>,
    clouds: Vec<(String, Vec<String>)>,
}

impl GroupConfigBuilder {
    pub fn agent(mut self, name: &str, labels: &[&str], executors: usize) -> Self {
        self.agents.push((
            name.to_string(),
            labels.iter().map(|l| l.to_string()).collect(),
            executors,
        ));
        self
    }

    pub fn cloud(mut self, name: &str, labels: &[&str]) -> Self {
        self.clouds.push((
            name.to_string(),
            labels.iter().map(|l| l.to_string()).collect(),
        ));
        self
    }

    fn to_toml(&self) -> String {
        let mut toml = String::new();
        for (name, labels, executors) in &self.agents {
            toml.push_str(&format!(
                "[agents.{}]\nlabels = {:?}\nexecutors = {}\n\n",
                name, labels, executors
            ));
        }
        for (name, labels) in &self.clouds {
            toml.push_str(&format!("[clouds.{:?}]\nlabels = {:?}\n\n", name, labels));
        }
        toml
    }
}

/// Built test configuration
pub struct TestConfig {
    _temp_dir: TempDir,
    pub config_dir: PathBuf,
    pub database_path: PathBuf,
}

impl TestConfig {
    pub fn config_dir_string(&self) -> String {
        self.config_dir.to_string_lossy().to_string()
    }

    pub fn database_path_string(&self) -> String {
        self.database_path.to_string_lossy().to_string()
    }
}
