//! Request and response bodies of the credential submission flow.

use serde::{Deserialize, Serialize};

use super::CONNECTION_TOKEN_TYPE;

/// Credentials submitted to the login endpoint.
#[derive(Clone, Deserialize, Serialize)]
pub struct LoginRequest {
    pub login: String,
    pub secret: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("login", &self.login)
            .finish_non_exhaustive()
    }
}

/// Successful login: who logged in and the token they now hold.
///
/// # JSON Format
///
/// ```json
/// {
///   "login": "fulano",
///   "token": "eyJ0eXAiOiJKV1QiLCJhbGciOiJIUzUxMiJ9..."
/// }
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoginResponse {
    pub login: String,
    pub token: String,
}

/// Authentication response with access token.
///
/// # JSON Format
///
/// ```json
/// {
///   "access_token": "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...",
///   "token_type": "Bearer"
/// }
/// ```
#[derive(Debug, Deserialize, Serialize)]
pub struct AuthBody {
    /// The access token.
    pub access_token: String,
    /// The token type (always "Bearer").
    pub token_type: String,
}

impl AuthBody {
    /// Creates a new authentication response.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use vigia_auth::auth_body::AuthBody;
    ///
    /// let response = AuthBody::new("some_token".to_string());
    /// assert_eq!(response.token_type, "Bearer");
    /// ```
    pub fn new(access_token: String) -> Self {
        Self {
            access_token,
            token_type: String::from(CONNECTION_TOKEN_TYPE),
        }
    }
}
