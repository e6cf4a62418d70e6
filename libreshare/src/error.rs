//! Error types for Reshare

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReshareError>;

#[derive(Error, Debug)]
pub enum ReshareError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Settings store error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ReshareError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            ReshareError::InvalidInput(_) => 3,
            ReshareError::Selection(_) => 3,
            ReshareError::Provider(ProviderError::Exchange(_)) => 2,
            ReshareError::Provider(_) => 1,
            ReshareError::Config(_) => 1,
            ReshareError::Settings(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(String),
}

#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// Requested provider name has no registered client. Fails fast,
    /// never partially constructs state.
    #[error("Unknown provider: {0}")]
    Unknown(String),

    /// The remote endpoint rejected the supplied credentials. Expected
    /// outcome (user declined, token expired); flows surface it as a
    /// negative result, not a failure.
    #[error("Credential exchange failed: {0}")]
    Exchange(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Error, Debug, Clone)]
pub enum SelectionError {
    /// Taxonomy value could not be split into a `{taxonomy, term}` pair.
    #[error("Malformed taxonomy filter: {0}")]
    MalformedFilter(String),

    #[error("Term lookup failed for taxonomy '{taxonomy}': {reason}")]
    TermLookup { taxonomy: String, reason: String },
}
