//! Authorization endpoint of the authorization code flow.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use url::Url;
use vigia_auth::{
    auth_body::LoginRequest,
    authenticator::authenticate,
    client_registry::GrantType,
};

use super::code_store::{PendingAuthorization, code_expiry};
use super::error::OAuthError;
use super::parse_scope;
use crate::state::AppState;

/// Body of `POST /oauth2/authorize`: the client's request plus the user's
/// credentials.
#[derive(Debug, Deserialize)]
pub struct AuthorizeRequest {
    pub client_id: String,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(flatten)]
    pub credentials: LoginRequest,
}

/// Where the user agent goes next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizeResponse {
    /// Registered redirect target with `code` and `state` appended.
    pub redirect_uri: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// Authenticates the user and hands out a one-time authorization code.
pub fn authorize(
    request: &AuthorizeRequest,
    state: &AppState,
) -> Result<AuthorizeResponse, OAuthError> {
    let server = super::server(state)?;
    let client = server
        .clients
        .find_by_client_id(&request.client_id)
        .ok_or_else(OAuthError::invalid_client)?;
    if !client.allows(GrantType::AuthorizationCode) {
        return Err(OAuthError::unauthorized_client(
            "Client may not use authorization_code",
        ));
    }

    let registered = client
        .redirect_uri
        .as_deref()
        .ok_or_else(|| OAuthError::invalid_request("Client has no redirect_uri"))?;
    if request
        .redirect_uri
        .as_deref()
        .is_some_and(|redirect_uri| redirect_uri != registered)
    {
        return Err(OAuthError::invalid_request("redirect_uri does not match"));
    }
    let scopes = client
        .grant_scopes(&parse_scope(request.scope.as_deref()))
        .ok_or_else(OAuthError::invalid_scope)?;

    let account = authenticate(&request.credentials, state.store.as_ref(), &state.hasher)
        .map_err(|err| {
            if err.is_invalid_credentials() {
                OAuthError::access_denied()
            } else {
                OAuthError::from(err)
            }
        })?;

    let mut redirect = Url::parse(registered).map_err(|err| {
        error!("Registered redirect_uri of {} is invalid: {err}", client.client_id);
        OAuthError::server_error()
    })?;

    let code = server.codes.insert(PendingAuthorization {
        client_id: client.client_id.clone(),
        redirect_uri: registered.to_string(),
        principal: account.principal(),
        scopes,
        expires_at: code_expiry(Utc::now()),
    });

    {
        let mut query = redirect.query_pairs_mut();
        query.append_pair("code", &code);
        if let Some(state) = &request.state {
            query.append_pair("state", state);
        }
    }
    info!("Authorized {} for client {}", account.login, client.client_id);

    Ok(AuthorizeResponse {
        redirect_uri: redirect.into(),
        code,
        state: request.state.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth2::error::OAuthErrorCode;
    use crate::oauth2::tests::{CLIENT_ID, REDIRECT_URI, SERVICE_ID, state};

    fn request(client_id: &str, secret: &str) -> AuthorizeRequest {
        AuthorizeRequest {
            client_id: String::from(client_id),
            redirect_uri: None,
            scope: None,
            state: Some(String::from("xyz")),
            credentials: LoginRequest {
                login: String::from("fulano"),
                secret: String::from(secret),
            },
        }
    }

    #[test]
    fn redirect_carries_code_and_state() {
        let state = state();
        let response = authorize(&request(CLIENT_ID, "1234"), &state).unwrap();
        assert!(response.redirect_uri.starts_with(REDIRECT_URI));
        assert!(response.redirect_uri.contains(&format!("code={}", response.code)));
        assert!(response.redirect_uri.ends_with("state=xyz"));
        assert_eq!(response.state.as_deref(), Some("xyz"));
    }

    #[test]
    fn user_credentials_are_checked() {
        let err = authorize(&request(CLIENT_ID, "4321"), &state()).unwrap_err();
        assert_eq!(err.error, OAuthErrorCode::AccessDenied);
    }

    #[test]
    fn client_checks() {
        let state = state();
        let err = authorize(&request("unknown", "1234"), &state).unwrap_err();
        assert_eq!(err.error, OAuthErrorCode::InvalidClient);

        let err = authorize(&request(SERVICE_ID, "1234"), &state).unwrap_err();
        assert_eq!(err.error, OAuthErrorCode::UnauthorizedClient);

        let mut other_redirect = request(CLIENT_ID, "1234");
        other_redirect.redirect_uri = Some(String::from("http://evil.example/cb"));
        let err = authorize(&other_redirect, &state).unwrap_err();
        assert_eq!(err.error, OAuthErrorCode::InvalidRequest);

        let mut bad_scope = request(CLIENT_ID, "1234");
        bad_scope.scope = Some(String::from("admin"));
        let err = authorize(&bad_scope, &state).unwrap_err();
        assert_eq!(err.error, OAuthErrorCode::InvalidScope);
    }
}
