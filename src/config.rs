use std::path::{Path, PathBuf};
use serde_derive::{Serialize, Deserialize};

use super::error::ConfigError;
use super::event::TruncationPolicy;

/// # Config
/// Structure representing the processor configuration. Contains the raw data path and how strictly
/// events should be handled. Configs are serializable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub raw_path: PathBuf,
    #[serde(default)]
    pub truncation_policy: TruncationPolicy,
    #[serde(default)]
    pub max_events: Option<u64>,
    #[serde(default)]
    pub stop_on_error: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self { raw_path: PathBuf::from("None"), truncation_policy: TruncationPolicy::default(), max_events: None, stop_on_error: false }
    }
}

impl Config {

    /// Read the configuration in a YAML file
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        Self::from_yaml_str(&yaml_str)
    }

    pub fn from_yaml_str(yaml_str: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str::<Self>(yaml_str)?)
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}
