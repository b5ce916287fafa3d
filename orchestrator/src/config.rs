//! `taskctl` configuration types and loading.

use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

/// Top-level `taskctl` configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sla: SlaConfig,
    pub protocol: ProtocolConfig,
    pub concurrency: ConcurrencyConfig,
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration with fallback chain: explicit path, then
    /// project-local `.taskctl.yml`, then `~/.config/taskctl/taskctl.yml`,
    /// then defaults.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let local_config = PathBuf::from(".taskctl.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("taskctl").join("taskctl.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Default SLA tier and per-tier overrides applied when a task request
/// omits an explicit `slaPolicy`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlaConfig {
    pub default_tier: String,
}

impl Default for SlaConfig {
    fn default() -> Self {
        Self {
            default_tier: "standard".to_string(),
        }
    }
}

/// Defaults for a `TaskProtocolConfig` not otherwise specified by the
/// caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    pub max_retries: u32,
    pub fail_fast: bool,
    pub self_correction_enabled: bool,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            fail_fast: false,
            self_correction_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    #[serde(rename = "max-concurrent-pipelines")]
    pub max_concurrent_pipelines: u32,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_concurrent_pipelines: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    #[serde(rename = "taskstore-dir")]
    pub taskstore_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            taskstore_dir: ".taskctl/store".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_standard_sla() {
        let config = Config::default();
        assert_eq!(config.sla.default_tier, "standard");
        assert_eq!(config.protocol.max_retries, 3);
    }

    #[test]
    fn partial_yaml_falls_back_to_defaults() {
        let yaml = r#"
sla:
  default_tier: strict
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.sla.default_tier, "strict");
        assert_eq!(config.concurrency.max_concurrent_pipelines, 8);
    }
}
