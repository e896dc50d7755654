//! Token endpoint: `client_credentials`, `authorization_code` and
//! `refresh_token` grants.

use std::collections::BTreeSet;

use axum::http::HeaderMap;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use vigia_auth::{
    auth_body::AuthBody,
    client_registry::{GrantType, RegisteredClient},
    credential_store::CredentialStore,
    jwt::{Grant, IssuedToken, TokenKind},
    principal::Principal,
};

use super::error::OAuthError;
use super::{client_auth, format_scope, parse_scope};
use crate::state::{AppState, AuthorizationServer};

/// Form body of `POST /oauth2/token`.
#[derive(Default, Deserialize)]
pub struct TokenRequest {
    pub grant_type: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
}

impl std::fmt::Debug for TokenRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRequest")
            .field("grant_type", &self.grant_type)
            .field("redirect_uri", &self.redirect_uri)
            .field("scope", &self.scope)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

/// Successful token response.
///
/// # JSON Format
///
/// ```json
/// {
///   "access_token": "eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9...",
///   "token_type": "Bearer",
///   "expires_in": 3600,
///   "scope": "read write",
///   "refresh_token": "eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9..."
/// }
/// ```
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    #[serde(flatten)]
    pub body: AuthBody,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl TokenResponse {
    fn new(access: IssuedToken, scopes: &BTreeSet<String>, refresh_token: Option<String>) -> Self {
        Self {
            expires_in: access.expires_in(),
            body: AuthBody::new(access.token),
            scope: format_scope(scopes),
            refresh_token,
        }
    }
}

/// Runs a token request to completion.
///
/// The client is authenticated before anything else, so unknown clients never
/// reach the signing key.
pub fn exchange(
    request: &TokenRequest,
    headers: &HeaderMap,
    state: &AppState,
) -> Result<TokenResponse, OAuthError> {
    let server = super::server(state)?;
    let client = client_auth::authenticate(
        state,
        headers,
        request.client_id.as_deref(),
        request.client_secret.as_deref(),
    )?;

    let grant: GrantType = request
        .grant_type
        .parse()
        .map_err(|_| OAuthError::unsupported_grant_type(&request.grant_type))?;
    if !client.allows(grant) {
        return Err(OAuthError::unauthorized_client(format!(
            "Client may not use {grant}"
        )));
    }

    let response = match grant {
        GrantType::ClientCredentials => client_credentials(request, server, &client),
        GrantType::AuthorizationCode => authorization_code(request, server, &client),
        GrantType::RefreshToken => refresh(request, state, server, &client),
    }?;
    info!("Issued {grant} token to client {}", client.client_id);
    Ok(response)
}

fn client_credentials(
    request: &TokenRequest,
    server: &AuthorizationServer,
    client: &RegisteredClient,
) -> Result<TokenResponse, OAuthError> {
    let scopes = client
        .grant_scopes(&parse_scope(request.scope.as_deref()))
        .ok_or_else(OAuthError::invalid_scope)?;
    let principal = Principal::Basic {
        login: client.client_id.clone(),
        authorities: scopes.clone(),
    };
    let grant = Grant::client(client.client_id.clone(), scopes);
    let access = server.issuer.issue(
        &principal,
        TokenKind::Access,
        client.token_settings.access_token_ttl,
        &grant,
    )?;
    Ok(TokenResponse::new(access, &grant.scopes, None))
}

fn authorization_code(
    request: &TokenRequest,
    server: &AuthorizationServer,
    client: &RegisteredClient,
) -> Result<TokenResponse, OAuthError> {
    let code = request
        .code
        .as_deref()
        .ok_or_else(|| OAuthError::invalid_request("Missing code"))?;
    let pending = server
        .codes
        .take(code, Utc::now())
        .ok_or_else(|| OAuthError::invalid_grant("Invalid or expired authorization code"))?;

    if pending.client_id != client.client_id {
        debug!(
            "Code for {} presented by {}",
            pending.client_id, client.client_id
        );
        return Err(OAuthError::invalid_grant(
            "Authorization code was issued to another client",
        ));
    }
    if let Some(redirect_uri) = &request.redirect_uri {
        if *redirect_uri != pending.redirect_uri {
            return Err(OAuthError::invalid_grant("redirect_uri does not match"));
        }
    }

    issue_pair(server, client, &pending.principal, pending.scopes)
}

fn refresh(
    request: &TokenRequest,
    state: &AppState,
    server: &AuthorizationServer,
    client: &RegisteredClient,
) -> Result<TokenResponse, OAuthError> {
    if !client.supports_refresh() {
        return Err(OAuthError::invalid_grant("Refresh tokens are disabled"));
    }
    let token = request
        .refresh_token
        .as_deref()
        .ok_or_else(|| OAuthError::invalid_request("Missing refresh_token"))?;
    let identity = server.validator.validate(token).map_err(|err| {
        debug!("Refusing refresh token: {err}");
        OAuthError::invalid_grant("Invalid refresh token")
    })?;
    if identity.token_use != TokenKind::Refresh
        || identity.client_id.as_deref() != Some(client.client_id.as_str())
    {
        return Err(OAuthError::invalid_grant("Invalid refresh token"));
    }

    let account = state
        .store
        .find_by_login(&identity.subject)?
        .ok_or_else(|| OAuthError::invalid_grant("Unknown subject"))?;

    let requested = parse_scope(request.scope.as_deref());
    let scopes = if requested.is_empty() {
        identity.scopes
    } else if requested.is_subset(&identity.scopes) {
        requested
    } else {
        return Err(OAuthError::invalid_scope());
    };

    issue_pair(server, client, &account.principal(), scopes)
}

/// Access token plus, when the client supports it, a fresh refresh token.
fn issue_pair(
    server: &AuthorizationServer,
    client: &RegisteredClient,
    principal: &Principal,
    scopes: BTreeSet<String>,
) -> Result<TokenResponse, OAuthError> {
    let grant = Grant::client(client.client_id.clone(), scopes);
    let access = server.issuer.issue(
        principal,
        TokenKind::Access,
        client.token_settings.access_token_ttl,
        &grant,
    )?;
    let refresh_token = match client.token_settings.refresh_token_ttl {
        Some(ttl) if client.supports_refresh() => Some(
            server
                .issuer
                .issue(principal, TokenKind::Refresh, ttl, &grant)?
                .token,
        ),
        _ => None,
    };
    Ok(TokenResponse::new(access, &grant.scopes, refresh_token))
}
