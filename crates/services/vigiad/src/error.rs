//! Error types for the Vigia identity service.
//!
//! Only startup can fail at this level: requests report their own errors
//! through the web crate.

/// Errors that stop the Vigia identity service.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    IO(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] vigia_config::error::Error),

    #[error(transparent)]
    Web(#[from] vigia_web::error::Error),
}
