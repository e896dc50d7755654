//! Main Crate Error

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;
use tracing::{error, info};
use vigia_auth::error::Error as AuthError;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    IO(#[from] std::io::Error),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Config(#[from] vigia_config::error::Error),

    #[error("Account not found")]
    AccountNotFound,

    /* Api Errors */
    #[error("API Forbidden")]
    ApiForbidden,

    #[error("Context Missing")]
    CtxMissing,
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            Error::Auth(err) if err.is_invalid_credentials() => {
                info!("Rejected credentials: {err}");
                (StatusCode::UNAUTHORIZED, "Invalid credentials")
            }
            Error::Auth(AuthError::Validation(_)) => {
                (StatusCode::UNAUTHORIZED, "Invalid authentication token")
            }
            Error::Auth(AuthError::LoginTaken) => (StatusCode::CONFLICT, "Login already taken"),
            Error::Auth(AuthError::EmailTaken) => (StatusCode::CONFLICT, "Email already taken"),
            Error::Auth(AuthError::InvalidEmail) => (StatusCode::BAD_REQUEST, "Invalid email"),
            Error::CtxMissing => (StatusCode::UNAUTHORIZED, "Authentication required"),
            Error::ApiForbidden => (StatusCode::FORBIDDEN, "Access forbidden"),
            Error::AccountNotFound => (StatusCode::NOT_FOUND, "Account not found"),
            Error::Auth(_) | Error::IO(_) | Error::Config(_) => {
                error!("Creating API error response for error: {self:?}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = Json(json!({
            "error": {
                "message": message,
                "status": status.as_u16()
            }
        }));
        (status, body).into_response()
    }
}
