use thiserror::Error;

/// Errors raised while reading configuration files
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration files are UTF-8 text
    #[error("config is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// A value expected to hold hex keys does not
    #[error("invalid key in '{field}': {value}")]
    InvalidKey {
        /// Config key holding the value
        field: String,
        /// Offending token
        value: String,
    },

    /// A key/value pair with too few tokens
    #[error("'{field}' is empty")]
    EmptyValue {
        /// Config key holding the value
        field: String,
    },
}

/// Result type for config operations
pub type Result<T> = std::result::Result<T, ConfigError>;
