//! Error types for the oxidized-cheevos engine

use thiserror::Error;

/// Main error type for the achievement engine
#[derive(Error, Debug)]
pub enum AchievementsError {
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures while deriving the identity hash of the running game
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("No executable is loaded")]
    NoExecutable,

    #[error("Executable path has no usable name: {0:?}")]
    InvalidName(String),

    #[error("Failed to read executable '{path}': {message}")]
    ReadFailed { path: String, message: String },

    #[error("Only read {actual} of {expected} bytes of executable '{path}'")]
    ShortRead {
        path: String,
        expected: usize,
        actual: usize,
    },
}

/// Malformed or unsuccessful server responses
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("{request} failed: HTTP status {status}")]
    Status { request: &'static str, status: i32 },

    #[error("{request} failed: empty response")]
    EmptyResponse { request: &'static str },

    #[error("{request} failed: parse error: {message}")]
    Malformed {
        request: &'static str,
        message: String,
    },

    #[error("{request} failed: server returned an error: {message}")]
    Server {
        request: &'static str,
        message: String,
    },

    #[error("{request} failed: missing field '{field}'")]
    MissingField {
        request: &'static str,
        field: &'static str,
    },

    #[error("GameID from user unlocks doesn't match (got {actual} expected {expected})")]
    GameIdMismatch { expected: u32, actual: u32 },
}

/// Rejections reported by the trigger evaluation engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Trigger {id} rejected: {reason}")]
    Rejected { id: u32, reason: String },

    #[error("Rich presence script rejected: {0}")]
    RichPresence(String),

    #[error("Failed to serialize runtime progress: {0}")]
    Serialize(String),

    #[error("Failed to deserialize runtime progress: {0}")]
    Deserialize(String),
}

/// Local configuration and credential problems
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Username and password are required")]
    MissingCredentials,

    #[error("Already logged in")]
    AlreadyLoggedIn,

    #[error("A login request is already pending")]
    LoginPending,

    #[error("Achievements are not active")]
    NotActive,

    #[error("External achievements integration selected but no client was provided")]
    IntegrationUnavailable,

    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Failed to save configuration: {0}")]
    Save(String),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, AchievementsError>;
