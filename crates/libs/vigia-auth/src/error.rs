//! Authentication error types.

/// Reasons a presented token is refused.
///
/// The web layer never surfaces these individually: any of them simply means
/// no identity gets attached to the request.
#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid token signature")]
    BadSignature,
    #[error("Token expired")]
    Expired,
    #[error("Malformed token")]
    Malformed,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Credential not found")]
    CredentialNotFound,
    #[error("Wrong secret")]
    BadSecret,
    #[error("Unknown client")]
    UnknownClient,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    TokenCreation(#[from] jsonwebtoken::errors::Error),
    #[error("Token expiration out of range")]
    ExpirationOverflow,

    #[error("Error hashing password {0}")]
    PasswordHash(argon2::password_hash::Error),
    #[error("Invalid password hashing parameters {0}")]
    HashParams(argon2::Error),

    #[error("Invalid signing key: {0}")]
    InvalidSigningKey(String),
    #[error(transparent)]
    Rsa(#[from] rsa::Error),

    #[error("Invalid client registration: {0}")]
    InvalidClient(String),
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("Login already taken")]
    LoginTaken,
    #[error("Email already taken")]
    EmailTaken,
    #[error("Credential store unavailable")]
    StoreUnavailable,
}

impl Error {
    /// True for the failures a login attempt may produce because of what the
    /// caller submitted. Both collapse to the same user-visible answer.
    pub fn is_invalid_credentials(&self) -> bool {
        matches!(self, Error::CredentialNotFound | Error::BadSecret)
    }
}
