use thiserror::Error;

/// Error types for the sleeping TA simulation
#[derive(Debug, Error)]
pub enum SimError {
    /// Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigurationParseFailed(String),

    #[error("Failed to serialize configuration: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    /// Startup errors, raised before any actor runs
    #[error("Failed to initialize simulation: {0}")]
    Initialization(String),

    /// Synchronization errors
    #[error("Signal {0} was closed while an actor was waiting on it")]
    SignalClosed(&'static str),

    #[error("Waiting room is closed")]
    RoomClosed,

    #[error("Actor {actor} failed: {reason}")]
    ActorFailed { actor: String, reason: String },

    /// Generic errors
    #[error("Internal simulation error: {0}")]
    Internal(String),
}

/// Convenience type alias for Results using SimError
pub type Result<T> = std::result::Result<T, SimError>;

impl SimError {
    /// Helper to create InvalidConfiguration errors
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        SimError::InvalidConfiguration(msg.into())
    }

    /// Helper to create parse errors for a named setting
    pub fn parse(key: &str, value: &str) -> Self {
        SimError::ConfigurationParseFailed(format!("{}={:?}", key, value))
    }

    /// Helper to create Internal errors with context
    pub fn internal(msg: impl Into<String>) -> Self {
        SimError::Internal(msg.into())
    }

    pub fn actor_failed(actor: impl Into<String>, reason: impl ToString) -> Self {
        SimError::ActorFailed {
            actor: actor.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<std::io::Error> for SimError {
    fn from(err: std::io::Error) -> Self {
        SimError::Initialization(err.to_string())
    }
}
