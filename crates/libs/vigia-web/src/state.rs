//! Shared application state.
//!
//! Everything in here is built once at startup and read concurrently by every
//! request. The only mutable parts are the credential store, behind its own
//! lock, and the authorization code store.

use std::sync::Arc;

use chrono::TimeDelta;
use tracing::info;
use vigia_auth::claims::principal_claims;
use vigia_auth::client_registry::{ClientRegistry, InMemoryClientRegistry};
use vigia_auth::credential_store::{CredentialStore, InMemoryCredentialStore};
use vigia_auth::jwt::{TokenIssuer, TokenValidator};
use vigia_auth::secret_hash::SecretHasher;
use vigia_auth::signing::SigningKey;
use vigia_config::VigiaConfig;
use vigia_config::access::AccessConfig;

use crate::ctx::resolver::RequestAuthenticator;
use crate::oauth2::code_store::CodeStore;
use crate::prelude::*;

/// OAuth2 authorization server pieces. Only present with RSA signing.
#[derive(Clone)]
pub struct AuthorizationServer {
    pub key: Arc<SigningKey>,
    /// Issuer with the claims customizer installed.
    pub issuer: TokenIssuer,
    pub validator: TokenValidator,
    pub clients: Arc<dyn ClientRegistry>,
    pub codes: Arc<CodeStore>,
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CredentialStore>,
    pub hasher: Arc<SecretHasher>,
    pub authenticator: RequestAuthenticator,
    /// Issuer of `/v1/login` tokens.
    pub login_issuer: TokenIssuer,
    pub login_ttl: TimeDelta,
    pub access: Arc<AccessConfig>,
    pub authorization_server: Option<AuthorizationServer>,
}

impl AppState {
    pub fn new(
        key: Arc<SigningKey>,
        issuer: &str,
        login_ttl: TimeDelta,
        store: Arc<dyn CredentialStore>,
        hasher: SecretHasher,
        access: AccessConfig,
    ) -> Self {
        let validator = TokenValidator::new(key.clone(), issuer);
        Self {
            authenticator: RequestAuthenticator::new(validator, store.clone()),
            login_issuer: TokenIssuer::new(key, issuer),
            login_ttl,
            store,
            hasher: Arc::new(hasher),
            access: Arc::new(access),
            authorization_server: None,
        }
    }

    /// Mounts the authorization server. Fails unless the key is asymmetric.
    pub fn with_authorization_server(
        mut self,
        key: Arc<SigningKey>,
        issuer: &str,
        clients: Arc<dyn ClientRegistry>,
    ) -> Result<Self> {
        if !key.is_asymmetric() {
            return Err(vigia_config::error::Error::AuthorizationServerNeedsRsa.into());
        }
        self.authorization_server = Some(AuthorizationServer {
            issuer: TokenIssuer::new(key.clone(), issuer).with_claims_customizer(principal_claims),
            validator: TokenValidator::new(key.clone(), issuer),
            key,
            clients,
            codes: Arc::new(CodeStore::new()),
        });
        Ok(self)
    }

    /// Builds the whole state from validated configuration.
    pub fn from_config(config: &VigiaConfig) -> Result<Self> {
        let key = Arc::new(config.jwt.signing.signing_key()?);
        let hasher = SecretHasher::new(config.hash_cost)?;
        let store = Arc::new(InMemoryCredentialStore::with_accounts(
            config.accounts.iter().cloned(),
        )?);
        info!("Seeded {} accounts", config.accounts.len());

        let state = Self::new(
            key.clone(),
            &config.jwt.issuer,
            config.jwt.expiration,
            store,
            hasher,
            config.access.clone(),
        );

        match &config.authorization_server {
            Some(server) => {
                let clients = InMemoryClientRegistry::new(
                    server.clients.iter().cloned(),
                    server.token_settings,
                )?;
                info!("Authorization server enabled with {} clients", clients.len());
                state.with_authorization_server(key, &config.jwt.issuer, Arc::new(clients))
            }
            None => Ok(state),
        }
    }
}
