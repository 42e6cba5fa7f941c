//! Persisted key/value settings
//!
//! Stores the login session (username, token, login timestamp) under
//! namespaced `(section, key)` pairs. Writes become durable on `commit`.

use crate::error::ConfigError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Settings section used by the achievement engine
pub const SECTION: &str = "Achievements";
pub const KEY_USERNAME: &str = "Username";
pub const KEY_TOKEN: &str = "Token";
pub const KEY_LOGIN_TIMESTAMP: &str = "LoginTimestamp";

/// A single stored value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Int(i64),
    Str(String),
}

type SectionMap = BTreeMap<String, BTreeMap<String, SettingValue>>;

/// Namespaced persistent settings
pub trait SettingsStore: Send + Sync {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn set_string(&self, section: &str, key: &str, value: &str);
    fn get_int(&self, section: &str, key: &str) -> Option<i64>;
    fn set_int(&self, section: &str, key: &str, value: i64);
    fn delete(&self, section: &str, key: &str);
    fn commit(&self) -> Result<(), ConfigError>;
}

fn lookup_string(map: &SectionMap, section: &str, key: &str) -> Option<String> {
    match map.get(section)?.get(key)? {
        SettingValue::Str(s) => Some(s.clone()),
        SettingValue::Int(v) => Some(v.to_string()),
    }
}

fn lookup_int(map: &SectionMap, section: &str, key: &str) -> Option<i64> {
    match map.get(section)?.get(key)? {
        SettingValue::Int(v) => Some(*v),
        SettingValue::Str(s) => s.trim().parse().ok(),
    }
}

fn insert(map: &mut SectionMap, section: &str, key: &str, value: SettingValue) {
    map.entry(section.to_string())
        .or_default()
        .insert(key.to_string(), value);
}

fn remove(map: &mut SectionMap, section: &str, key: &str) {
    if let Some(entries) = map.get_mut(section) {
        entries.remove(key);
        if entries.is_empty() {
            map.remove(section);
        }
    }
}

/// In-memory settings, used when embedding without a settings file
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: RwLock<SectionMap>,
    commits: RwLock<u32>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times `commit` has been called
    pub fn commit_count(&self) -> u32 {
        *self.commits.read()
    }
}

impl SettingsStore for MemorySettings {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        lookup_string(&self.values.read(), section, key)
    }

    fn set_string(&self, section: &str, key: &str, value: &str) {
        insert(&mut self.values.write(), section, key, SettingValue::Str(value.to_string()));
    }

    fn get_int(&self, section: &str, key: &str) -> Option<i64> {
        lookup_int(&self.values.read(), section, key)
    }

    fn set_int(&self, section: &str, key: &str, value: i64) {
        insert(&mut self.values.write(), section, key, SettingValue::Int(value));
    }

    fn delete(&self, section: &str, key: &str) {
        remove(&mut self.values.write(), section, key);
    }

    fn commit(&self) -> Result<(), ConfigError> {
        *self.commits.write() += 1;
        Ok(())
    }
}

/// TOML file backed settings
pub struct TomlSettings {
    path: PathBuf,
    values: RwLock<SectionMap>,
}

impl TomlSettings {
    /// Open a settings file; a missing file yields empty settings
    pub fn open(path: PathBuf) -> Result<Self, ConfigError> {
        let values = if path.exists() {
            let content =
                std::fs::read_to_string(&path).map_err(|e| ConfigError::Load(e.to_string()))?;
            toml::from_str(&content).map_err(|e| ConfigError::Load(e.to_string()))?
        } else {
            SectionMap::new()
        };

        tracing::debug!("Opened settings file {:?}", path);

        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl SettingsStore for TomlSettings {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        lookup_string(&self.values.read(), section, key)
    }

    fn set_string(&self, section: &str, key: &str, value: &str) {
        insert(&mut self.values.write(), section, key, SettingValue::Str(value.to_string()));
    }

    fn get_int(&self, section: &str, key: &str) -> Option<i64> {
        lookup_int(&self.values.read(), section, key)
    }

    fn set_int(&self, section: &str, key: &str, value: i64) {
        insert(&mut self.values.write(), section, key, SettingValue::Int(value));
    }

    fn delete(&self, section: &str, key: &str) {
        remove(&mut self.values.write(), section, key);
    }

    fn commit(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Save(e.to_string()))?;
        }

        let content = toml::to_string_pretty(&*self.values.read())
            .map_err(|e| ConfigError::Save(e.to_string()))?;
        std::fs::write(&self.path, content).map_err(|e| ConfigError::Save(e.to_string()))?;

        tracing::debug!("Committed settings to {:?}", self.path);
        Ok(())
    }
}
