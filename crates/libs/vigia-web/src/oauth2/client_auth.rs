//! Client authentication at the token and introspection endpoints.

use axum::http::HeaderMap;
use headers::{Authorization, HeaderMapExt, authorization::Basic};
use tracing::debug;
use vigia_auth::client_registry::{
    ClientAuthenticationMethod, RegisteredClient, authenticate_client,
};

use super::error::OAuthError;
use crate::state::AppState;

/// Credentials a client presented, and how.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub method: ClientAuthenticationMethod,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

impl ClientCredentials {
    /// Reads client credentials from `Authorization: Basic` or from the form
    /// fields. Presenting both is refused.
    pub fn extract(
        headers: &HeaderMap,
        client_id: Option<&str>,
        client_secret: Option<&str>,
    ) -> Result<Self, OAuthError> {
        let basic = headers.typed_get::<Authorization<Basic>>();
        match (basic, client_id, client_secret) {
            (Some(_), _, Some(_)) => Err(OAuthError::invalid_request(
                "Use exactly one client authentication method",
            )),
            (Some(basic), _, None) => Ok(Self {
                client_id: basic.username().to_string(),
                client_secret: basic.password().to_string(),
                method: ClientAuthenticationMethod::ClientSecretBasic,
            }),
            (None, Some(client_id), Some(client_secret)) => Ok(Self {
                client_id: client_id.to_string(),
                client_secret: client_secret.to_string(),
                method: ClientAuthenticationMethod::ClientSecretPost,
            }),
            (None, _, _) => Err(OAuthError::invalid_client()),
        }
    }
}

/// Authenticates the calling client against the registry.
///
/// Unknown clients, wrong secrets and methods the client is not registered
/// for all come back as `invalid_client`.
pub fn authenticate(
    state: &AppState,
    headers: &HeaderMap,
    client_id: Option<&str>,
    client_secret: Option<&str>,
) -> Result<RegisteredClient, OAuthError> {
    let server = super::server(state)?;
    let credentials = ClientCredentials::extract(headers, client_id, client_secret)?;
    let client = authenticate_client(
        server.clients.as_ref(),
        &state.hasher,
        &credentials.client_id,
        &credentials.client_secret,
    )?;
    if !client.accepts(credentials.method) {
        debug!(
            "Client {} may not authenticate with {:?}",
            client.client_id, credentials.method
        );
        return Err(OAuthError::invalid_client());
    }
    Ok(client)
}
