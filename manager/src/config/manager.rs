// File: manager/src/config/manager.rs
use super::{Config, InventoryFile};
use anyhow::{anyhow, Result};
use glob::glob;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info};

pub struct ConfigManager {
    current_config: Arc<Config>,
}

impl ConfigManager {
    pub async fn new(config_dir: String) -> Result<Self> {
        let config = Self::load_configuration(&config_dir).await?;
        Ok(Self {
            current_config: Arc::new(config),
        })
    }

    pub fn get_current_config(&self) -> Arc<Config> {
        self.current_config.clone()
    }

    async fn load_configuration(config_dir: &str) -> Result<Config> {
        let main_config_path = format!("{}/main.toml", config_dir);
        let main_config_content = fs::read_to_string(&main_config_path)
            .await
            .map_err(|e| anyhow!("Failed to read main config {}: {}", main_config_path, e))?;

        let mut config: Config = toml::from_str(&main_config_content)
            .map_err(|e| anyhow!("Failed to parse main config: {}", e))?;

        // Every other *.toml is a group inventory file
        let pattern = format!("{}/*.toml", config_dir);
        let mut all_agents = HashMap::new();
        let mut all_clouds = HashMap::new();

        for entry in glob(&pattern).map_err(|e| anyhow!("Glob pattern error: {}", e))? {
            let path = entry.map_err(|e| anyhow!("Glob entry error: {}", e))?;
            let filename = path
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| anyhow!("Invalid filename"))?;

            if filename == "main.toml" {
                continue;
            }

            let group = filename
                .strip_suffix(".toml")
                .ok_or_else(|| anyhow!("Invalid config filename: {}", filename))?;

            debug!("Loading inventory config: {}", path.display());

            let content = fs::read_to_string(&path)
                .await
                .map_err(|e| anyhow!("Failed to read {}: {}", path.display(), e))?;

            let inventory: InventoryFile = toml::from_str(&content)
                .map_err(|e| anyhow!("Failed to parse {}: {}", path.display(), e))?;

            for (agent_name, mut agent_config) in inventory.agents {
                agent_config.group = group.to_string();

                // Don't double-prefix names that already carry the group
                let final_agent_name = if agent_name.starts_with(&format!("{}-", group)) {
                    agent_name
                } else {
                    format!("{}-{}", group, agent_name)
                };

                all_agents.insert(final_agent_name, agent_config);
            }

            // Cloud names are kept as written; duplicates across groups are
            // told apart by disambiguators
            for (cloud_name, mut cloud_config) in inventory.clouds {
                cloud_config.group = group.to_string();
                cloud_config.name = cloud_name.clone();
                all_clouds.insert(format!("{}/{}", group, cloud_name), cloud_config);
            }
        }

        config.agents = all_agents;
        config.clouds = all_clouds;
        config.validate()?;

        info!(
            "Loaded {} agents and {} clouds (timezone {})",
            config.agents.len(),
            config.clouds.len(),
            config.timezone
        );

        Ok(config)
    }
}
