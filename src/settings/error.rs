use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, SettingsError>;
