//! Core types for the oxidized-cheevos achievement engine
//!
//! This crate provides the error taxonomy, configuration, persisted
//! settings and logging infrastructure shared by the other crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod settings;

pub use config::{AchievementsConfig, IntegrationMode, LogLevel, NetworkConfig};
pub use error::{
    AchievementsError, ConfigError, EngineError, IdentityError, ProtocolError, Result,
};
pub use settings::{MemorySettings, SettingsStore, TomlSettings};
