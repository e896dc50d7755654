//! RFC 7662 token introspection.

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;
use vigia_auth::jwt::{Identity, TokenKind};

use super::error::OAuthError;
use super::{client_auth, format_scope};
use crate::state::AppState;

/// Form body of `POST /oauth2/introspect`.
#[derive(Default, Deserialize)]
pub struct IntrospectRequest {
    pub token: String,
    #[serde(default)]
    pub token_type_hint: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
}

/// Introspection answer. Inactive tokens only report `active: false`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Introspection {
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_use: Option<TokenKind>,
    #[serde(flatten)]
    pub claims: Map<String, Value>,
}

impl From<Identity> for Introspection {
    fn from(identity: Identity) -> Self {
        Self {
            active: true,
            sub: Some(identity.subject),
            exp: Some(identity.expires_at.timestamp()),
            iat: Some(identity.issued_at.timestamp()),
            scope: format_scope(&identity.scopes),
            client_id: identity.client_id,
            token_use: Some(identity.token_use),
            claims: identity.claims,
        }
    }
}

/// Describes `request.token` to an authenticated client.
pub fn introspect(
    request: &IntrospectRequest,
    headers: &HeaderMap,
    state: &AppState,
) -> Result<Introspection, OAuthError> {
    let server = super::server(state)?;
    let client = client_auth::authenticate(
        state,
        headers,
        request.client_id.as_deref(),
        request.client_secret.as_deref(),
    )?;

    match server.validator.validate(&request.token) {
        Ok(identity) => Ok(identity.into()),
        Err(err) => {
            debug!("Client {} introspected an unusable token: {err}", client.client_id);
            Ok(Introspection::default())
        }
    }
}
