//! Configuration file discovery and loading.

use atrium_core::config::AtriumConfig;
use atrium_core::error::{AtriumError, Result};
use std::path::{Path, PathBuf};

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV_VAR: &str = "ATRIUM_CONFIG";

/// Resolves and parses `config.toml`.
///
/// Lookup order: explicit path, `$ATRIUM_CONFIG`, `<config_dir>/atrium/config.toml`.
pub struct ConfigLoader {
    path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new(explicit: Option<PathBuf>) -> Self {
        let path = explicit
            .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from))
            .or_else(Self::default_path);
        Self { path }
    }

    /// Creates a loader bound to exactly `path`.
    pub fn with_path(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    /// `<config_dir>/atrium/config.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("atrium").join("config.toml"))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Loads the config; a missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<AtriumConfig> {
        let Some(path) = &self.path else {
            tracing::debug!("[ConfigLoader] no config directory, using defaults");
            return Ok(AtriumConfig::default());
        };
        if !path.exists() {
            tracing::debug!("[ConfigLoader] {} not found, using defaults", path.display());
            return Ok(AtriumConfig::default());
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(AtriumConfig::default());
        }
        let config: AtriumConfig = toml::from_str(&content).map_err(|e| {
            AtriumError::config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        tracing::info!("[ConfigLoader] loaded {}", path.display());
        Ok(config)
    }

    /// Writes `config` to the bound path, creating parent directories.
    pub fn save(&self, config: &AtriumConfig) -> Result<()> {
        let path = self
            .path
            .as_ref()
            .ok_or_else(|| AtriumError::config("no config path available"))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(config)?)?;
        Ok(())
    }
}
