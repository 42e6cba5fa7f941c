//! Configuration system for the achievement engine

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Achievement settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AchievementsConfig {
    pub enabled: bool,
    /// Evaluate triggers locally without ever submitting unlocks
    pub test_mode: bool,
    /// Also load unofficial and local achievements
    pub unofficial_test_mode: bool,
    pub rich_presence: bool,
    /// Hardcore mode; required for leaderboard submission
    pub challenge_mode: bool,
    pub notifications: bool,
    pub unlock_notification_secs: f32,
    pub summary_notification_secs: f32,
    pub error_notification_secs: f32,
    pub integration: IntegrationMode,
    /// Directory for downloaded badge and icon images
    pub cache_dir: Option<PathBuf>,
    pub network: NetworkConfig,
    pub log_level: LogLevel,
}

/// Which achievements client drives the per-frame work
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum IntegrationMode {
    #[default]
    Native,
    External,
}

/// Server endpoints and worker pool sizing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NetworkConfig {
    pub base_url: String,
    pub media_url: String,
    pub worker_threads: u32,
    pub user_agent: String,
}

/// Logging level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Filter directive understood by `tracing_subscriber::EnvFilter`
    pub fn as_directive(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl Default for AchievementsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            test_mode: false,
            unofficial_test_mode: false,
            rich_presence: true,
            challenge_mode: false,
            notifications: true,
            unlock_notification_secs: 15.0,
            summary_notification_secs: 10.0,
            error_notification_secs: 10.0,
            integration: IntegrationMode::default(),
            cache_dir: None,
            network: NetworkConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            base_url: "https://retroachievements.org".to_string(),
            media_url: "https://media.retroachievements.org".to_string(),
            worker_threads: 2,
            user_agent: format!("oxidized-cheevos/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl AchievementsConfig {
    /// Load configuration from the default path, or create it if it doesn't exist
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a specific file, creating a default one if missing
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|e| ConfigError::Load(e.to_string()))?;
            toml::from_str(&content).map_err(|e| ConfigError::Load(e.to_string()))
        } else {
            let config = Self::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Save(e.to_string()))?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Save(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::Save(e.to_string()))
    }

    /// Get the path to the configuration file
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("achievements.toml")
    }

    /// Directory holding the configuration and settings files
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("oxidized-cheevos")
    }

    /// Whether a change from `old` to `self` needs a full engine restart
    pub fn requires_restart(&self, old: &AchievementsConfig) -> bool {
        self.test_mode != old.test_mode
            || self.unofficial_test_mode != old.unofficial_test_mode
            || self.rich_presence != old.rich_presence
            || self.challenge_mode != old.challenge_mode
            || self.integration != old.integration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AchievementsConfig::default();
        assert!(!config.enabled);
        assert!(!config.test_mode);
        assert!(config.rich_presence);
        assert!(!config.challenge_mode);
        assert_eq!(config.network.worker_threads, 2);
        assert_eq!(config.integration, IntegrationMode::Native);
    }

    #[test]
    fn test_config_serialization() {
        let mut config = AchievementsConfig::default();
        config.challenge_mode = true;
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AchievementsConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: AchievementsConfig = toml::from_str("enabled = true\n").unwrap();
        assert!(parsed.enabled);
        assert!(parsed.rich_presence);
        assert_eq!(parsed.network.base_url, "https://retroachievements.org");
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("achievements.toml");

        let config = AchievementsConfig::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config, AchievementsConfig::default());
    }

    #[test]
    fn test_requires_restart() {
        let old = AchievementsConfig::default();
        let mut new = old.clone();
        new.notifications = false;
        assert!(!new.requires_restart(&old));

        new.challenge_mode = true;
        assert!(new.requires_restart(&old));
    }
}
