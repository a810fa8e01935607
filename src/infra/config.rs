//! Infrastructure implementation of the `ConfigStore` port.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::ports::ConfigStore;
use crate::domain::config::{TunnelConfig, validate_config};

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "DOSOCKS_CONFIG";

/// Production implementation of `ConfigStore` backed by a YAML file.
pub struct YamlConfigStore {
    path: PathBuf,
}

impl YamlConfigStore {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Resolve the path from an explicit override, `DOSOCKS_CONFIG`, or the
    /// user config dir, in that order.
    ///
    /// # Errors
    ///
    /// Returns an error if no override is given and the config dir cannot be
    /// determined.
    pub fn locate(explicit: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = explicit {
            return Ok(Self::new(path));
        }
        if let Ok(val) = std::env::var(CONFIG_ENV)
            && !val.is_empty()
        {
            return Ok(Self::new(PathBuf::from(val)));
        }
        let dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("cannot determine config directory"))?;
        Ok(Self::new(dir.join("dosockstunnel").join("config.yaml")))
    }
}

impl ConfigStore for YamlConfigStore {
    fn load(&self) -> Result<TunnelConfig> {
        let path = &self.path;
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(TunnelConfig::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        let config: TunnelConfig = if content.trim().is_empty() {
            TunnelConfig::default()
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("cannot parse {}", path.display()))?
        };
        validate_config(&config).with_context(|| format!("in {}", path.display()))?;
        Ok(config)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}
