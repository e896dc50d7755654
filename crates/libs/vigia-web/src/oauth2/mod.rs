//! OAuth2 authorization server endpoints.
//!
//! Only mounted when the service signs with an RSA key. Every function here
//! answers with RFC 6749 style errors through [`error::OAuthError`].

use std::collections::BTreeSet;

use tracing::error;
use vigia_auth::signing::JwkSet;

use crate::state::{AppState, AuthorizationServer};
use error::OAuthError;

pub mod authorize;
pub mod client_auth;
pub mod code_store;
pub mod error;
pub mod introspect;
pub mod token;

/// Splits a space separated `scope` parameter.
///
/// ```rust
/// use vigia_web::oauth2::parse_scope;
///
/// assert_eq!(parse_scope(Some("read  write")).len(), 2);
/// assert!(parse_scope(None).is_empty());
/// ```
pub fn parse_scope(scope: Option<&str>) -> BTreeSet<String> {
    scope
        .map(|scope| scope.split_whitespace().map(String::from).collect())
        .unwrap_or_default()
}

/// Joins scopes back into their wire form. Empty sets give nothing.
pub fn format_scope(scopes: &BTreeSet<String>) -> Option<String> {
    (!scopes.is_empty()).then(|| scopes.iter().cloned().collect::<Vec<_>>().join(" "))
}

pub(crate) fn server(state: &AppState) -> Result<&AuthorizationServer, OAuthError> {
    state.authorization_server.as_ref().ok_or_else(|| {
        error!("OAuth2 endpoint reached without an authorization server");
        OAuthError::server_error()
    })
}

/// The published verification keys.
pub fn jwks(state: &AppState) -> Result<JwkSet, OAuthError> {
    Ok(server(state)?.key.jwks())
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use chrono::TimeDelta;
    use vigia_auth::client_registry::{
        ClientAuthenticationMethod, ClientRecord, GrantType, InMemoryClientRegistry,
        TokenSettings,
    };
    use vigia_auth::credential_store::InMemoryCredentialStore;
    use vigia_auth::principal::Account;
    use vigia_auth::secret_hash::{HashCost, SecretHasher};
    use vigia_auth::signing::SigningKey;
    use vigia_config::access::AccessConfig;

    use super::*;

    pub const CLIENT_ID: &str = "app";
    pub const CLIENT_SECRET: &str = "app-secret";
    pub const SERVICE_ID: &str = "svc";
    pub const SERVICE_SECRET: &str = "svc-secret";
    pub const REDIRECT_URI: &str = "http://localhost:8080/authorized";
    const TEST_RSA_PEM: &str = include_str!("../../../vigia-auth/testdata/rsa-2048.pem");

    /// Authorization server with `fulano`/`1234`, an interactive client and a
    /// machine client.
    pub fn state() -> AppState {
        let hasher = SecretHasher::new(HashCost::minimal()).unwrap();
        let key = Arc::new(SigningKey::rsa_from_pem(TEST_RSA_PEM).unwrap());
        let fulano = Account {
            login: String::from("fulano"),
            secret_hash: hasher.generate_secret_hash("1234").unwrap(),
            email: Some(String::from("fulano@mail.com")),
            email_verified: true,
            roles: BTreeSet::new(),
            admin: false,
        };
        let scopes = BTreeSet::from([String::from("read"), String::from("write")]);
        let app = ClientRecord {
            id: Default::default(),
            client_id: String::from(CLIENT_ID),
            client_secret_hash: hasher.generate_secret_hash(CLIENT_SECRET).unwrap(),
            redirect_uri: Some(String::from(REDIRECT_URI)),
            scopes,
            grant_types: BTreeSet::from(GrantType::ALL),
            authentication_methods: BTreeSet::from([
                ClientAuthenticationMethod::ClientSecretBasic,
                ClientAuthenticationMethod::ClientSecretPost,
            ]),
        };
        let svc = ClientRecord {
            client_id: String::from(SERVICE_ID),
            client_secret_hash: hasher.generate_secret_hash(SERVICE_SECRET).unwrap(),
            redirect_uri: None,
            grant_types: BTreeSet::from([GrantType::ClientCredentials]),
            ..app.clone()
        };
        let clients = InMemoryClientRegistry::new([app, svc], TokenSettings::default()).unwrap();

        AppState::new(
            key.clone(),
            vigia_auth::ISS,
            TimeDelta::minutes(30),
            Arc::new(InMemoryCredentialStore::with_accounts([fulano]).unwrap()),
            hasher,
            AccessConfig::default(),
        )
        .with_authorization_server(key, vigia_auth::ISS, Arc::new(clients))
        .unwrap()
    }

    #[test]
    fn scope_round_trip() {
        let scopes = parse_scope(Some(" write read "));
        assert_eq!(format_scope(&scopes).as_deref(), Some("read write"));
        assert_eq!(format_scope(&BTreeSet::new()), None);
    }

    #[test]
    fn jwks_publishes_the_rsa_key() {
        let set = jwks(&state()).unwrap();
        assert_eq!(set.keys.len(), 1);
        assert_eq!(set.keys[0].kty, "RSA");
        assert_eq!(set.keys[0].alg, "RS256");
    }
}
