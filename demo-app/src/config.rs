//! Demo configuration loading.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use bgm_ipc::{EngineConfig, SceneConfig};

/// Environment variable naming a JSON configuration file.
pub const CONFIG_ENV_VAR: &str = "BGM_DEMO_CONFIG";

/// Everything the demo reads from its configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub engine: EngineConfig,
    pub scene: SceneConfig,
}

impl DemoConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("Invalid demo configuration")
    }

    /// Load a configuration file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_json(&json)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load from `path` if given, otherwise use the defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                debug!("No configuration file, using defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Config path from the environment, falling back to the first CLI argument.
pub fn config_path() -> Option<PathBuf> {
    env::var_os(CONFIG_ENV_VAR)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or_else(|| env::args_os().nth(1).map(PathBuf::from))
}

#[cfg(test)]
mod tests {
    use bgm_ipc::DEFAULT_LISTENER_ID;

    use super::*;

    #[test]
    fn test_empty_object_gives_defaults() {
        let config = DemoConfig::from_json("{}").unwrap();
        assert_eq!(config, DemoConfig::default());
    }

    #[test]
    fn test_nested_overrides() {
        let config = DemoConfig::from_json(
            r#"{
                "engine": { "frame_interval_ms": 33, "capabilities": { "secondary_output": true } },
                "scene": { "stop_label": "Halt" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.engine.frame_interval_ms, 33);
        assert!(config.engine.capabilities.secondary_output);
        assert_eq!(config.engine.default_listener, DEFAULT_LISTENER_ID);
        assert_eq!(config.scene.stop_label, "Halt");
        assert_eq!(config.scene.bank, "BGM.bnk");
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(DemoConfig::from_json("{ engine: ").is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let path = Path::new("/nonexistent/bgm-demo.json");
        let err = DemoConfig::load(Some(path)).unwrap_err();
        assert!(err.to_string().contains("bgm-demo.json"));
    }

    #[test]
    fn test_no_path_uses_defaults() {
        assert_eq!(DemoConfig::load(None).unwrap(), DemoConfig::default());
    }
}
