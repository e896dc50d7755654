//! Configuration error types.

use std::path::PathBuf;

/// Configuration errors. All of them abort startup.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// I/O operation failed.
    #[error(transparent)]
    IO(#[from] std::io::Error),

    /// TOML deserialization failed.
    #[error(transparent)]
    Deserialization(#[from] toml::de::Error),

    #[error("Configuration file {0} not found")]
    NotFound(PathBuf),

    /// A token lifetime that is not a positive number of minutes.
    #[error("Invalid {name} '{value}': expected a positive number of minutes")]
    InvalidTtl { name: &'static str, value: String },

    #[error("No JWT secret configured, set jwt.secret or VIGIA_JWT_SECRET")]
    MissingSecret,

    #[error("Invalid bind address '{0}'")]
    InvalidBind(String),

    #[error("The authorization server needs RSA signing (jwt.algorithm = \"rs256\")")]
    AuthorizationServerNeedsRsa,

    #[error("Invalid access rule: {0}")]
    InvalidRule(String),

    #[error("Invalid seed {0}: exactly one of secret or secret hash must be set")]
    InvalidSeed(String),

    #[error(transparent)]
    Auth(#[from] vigia_auth::error::Error),
}
