//! RFC 6749 error responses.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OAuthErrorCode {
    InvalidRequest,
    InvalidClient,
    InvalidGrant,
    UnauthorizedClient,
    UnsupportedGrantType,
    InvalidScope,
    AccessDenied,
    ServerError,
}

impl OAuthErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            OAuthErrorCode::InvalidClient | OAuthErrorCode::AccessDenied => {
                StatusCode::UNAUTHORIZED
            }
            OAuthErrorCode::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("OAuth2 error {error:?}")]
pub struct OAuthError {
    pub error: OAuthErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl OAuthError {
    pub fn new(error: OAuthErrorCode, description: impl Into<String>) -> Self {
        Self {
            error,
            error_description: Some(description.into()),
        }
    }

    pub fn invalid_request(description: impl Into<String>) -> Self {
        Self::new(OAuthErrorCode::InvalidRequest, description)
    }

    pub fn invalid_client() -> Self {
        Self::new(OAuthErrorCode::InvalidClient, "Client authentication failed")
    }

    pub fn invalid_grant(description: impl Into<String>) -> Self {
        Self::new(OAuthErrorCode::InvalidGrant, description)
    }

    pub fn unauthorized_client(description: impl Into<String>) -> Self {
        Self::new(OAuthErrorCode::UnauthorizedClient, description)
    }

    pub fn invalid_scope() -> Self {
        Self::new(OAuthErrorCode::InvalidScope, "Requested scope is not registered")
    }

    pub fn access_denied() -> Self {
        Self::new(OAuthErrorCode::AccessDenied, "Invalid credentials")
    }

    pub fn unsupported_grant_type(grant_type: &str) -> Self {
        Self::new(
            OAuthErrorCode::UnsupportedGrantType,
            format!("Unsupported grant type {grant_type}"),
        )
    }

    pub fn server_error() -> Self {
        Self {
            error: OAuthErrorCode::ServerError,
            error_description: None,
        }
    }
}

/// Client authentication failures all read `invalid_client`; anything else
/// coming out of the core is a server error.
impl From<vigia_auth::error::Error> for OAuthError {
    fn from(err: vigia_auth::error::Error) -> Self {
        use vigia_auth::error::Error as AuthError;
        match err {
            AuthError::UnknownClient | AuthError::BadSecret => {
                debug!("Client authentication failed: {err}");
                OAuthError::invalid_client()
            }
            AuthError::CredentialNotFound => OAuthError::invalid_grant("Unknown subject"),
            err => {
                error!("Authorization server failure: {err}");
                OAuthError::server_error()
            }
        }
    }
}

impl IntoResponse for OAuthError {
    fn into_response(self) -> Response {
        let status = self.error.status();
        let mut response = (status, Json(self)).into_response();
        let headers = response.headers_mut();
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        if status == StatusCode::UNAUTHORIZED {
            headers.insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"vigia\""),
            );
        }
        response
    }
}
