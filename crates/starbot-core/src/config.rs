//! Controller configuration
//!
//! Everything is optional in the JSON form; missing fields take the
//! defaults below, which build one factory per galaxy on an iron-bearing
//! planet and nothing else.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::{resources, structures};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Seed for task ids; `None` draws from OS entropy
    pub seed: Option<u64>,
    /// Clear `ShipMemory.task_id` of a finished task's ships when it is reaped.
    /// With `false` ships stay claimed by the dead task forever.
    pub release_ships_on_completion: bool,
    pub strategy: StrategyConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            seed: None,
            release_ships_on_completion: true,
            strategy: StrategyConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub build_rules: Vec<BuildRule>,
    pub stockpile_rules: Vec<StockpileRule>,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            build_rules: vec![BuildRule::default()],
            stockpile_rules: Vec::new(),
        }
    }
}

/// Keep one structure of a type in every galaxy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRule {
    pub structure_type: String,
    /// The site goes on a planet with a positive quantity of this
    pub required_resource: String,
    pub ship_count: usize,
}

impl Default for BuildRule {
    fn default() -> Self {
        Self {
            structure_type: structures::FACTORY.to_string(),
            required_resource: resources::IRON_ORE.to_string(),
            ship_count: 1,
        }
    }
}

/// Keep a harvest task running that fills a storage structure with a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockpileRule {
    pub resource: String,
    /// Amount each ship collects before hauling
    pub amount: u32,
    pub ship_count: usize,
    #[serde(default = "default_storage_type")]
    pub storage_type: String,
}

fn default_storage_type() -> String {
    structures::STORAGE.to_string()
}

impl ControllerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

/// Errors that can occur while loading configuration
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Json(e)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Json(e) => write!(f, "Config parse error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}
