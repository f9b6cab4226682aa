//! Error types for Drishti

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Drishti error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Fatal misconfiguration detected while constructing a component
    #[error("Configuration error: {0}")]
    Config(String),

    /// Sensor input that cannot be used this cycle (bad segment, bad notification,
    /// unreadable channel). Callers drop the cycle and move on.
    #[error("Transient input error: {0}")]
    TransientInput(String),

    /// Wire encode/decode failure
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Pipeline used before setup completed
    #[error("Pipeline not initialized")]
    NotInitialized,

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
