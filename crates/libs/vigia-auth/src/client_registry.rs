//! OAuth2 client registry.
//!
//! Registered clients come from configuration as [`ClientRecord`]s. The
//! registry validates them once, merges in the server wide token settings and
//! from then on only answers lookups. Clients are never created on demand.

use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::prelude::*;
use crate::secret_hash::SecretHasher;

/// Default access token lifetime of the authorization server.
pub const DEFAULT_ACCESS_TOKEN_TTL_MINUTES: u32 = 60;
/// Default refresh token lifetime of the authorization server.
pub const DEFAULT_REFRESH_TOKEN_TTL_MINUTES: u32 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    AuthorizationCode,
    ClientCredentials,
    RefreshToken,
}

impl GrantType {
    pub const ALL: [GrantType; 3] = [
        GrantType::AuthorizationCode,
        GrantType::ClientCredentials,
        GrantType::RefreshToken,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GrantType::AuthorizationCode => "authorization_code",
            GrantType::ClientCredentials => "client_credentials",
            GrantType::RefreshToken => "refresh_token",
        }
    }
}

impl std::fmt::Display for GrantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GrantType {
    type Err = String;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        GrantType::ALL
            .into_iter()
            .find(|grant| grant.as_str() == s)
            .ok_or_else(|| format!("Unsupported grant type {s}"))
    }
}

/// How a client proves who it is at the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthenticationMethod {
    /// `Authorization: Basic` header.
    ClientSecretBasic,
    /// `client_id` and `client_secret` form fields.
    ClientSecretPost,
}

/// Token lifetimes applied to a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSettings {
    pub access_token_ttl: TimeDelta,
    /// `None` disables refresh tokens.
    pub refresh_token_ttl: Option<TimeDelta>,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            access_token_ttl: TimeDelta::minutes(DEFAULT_ACCESS_TOKEN_TTL_MINUTES.into()),
            refresh_token_ttl: Some(TimeDelta::minutes(
                DEFAULT_REFRESH_TOKEN_TTL_MINUTES.into(),
            )),
        }
    }
}

fn all_grant_types() -> BTreeSet<GrantType> {
    BTreeSet::from(GrantType::ALL)
}

fn default_authentication_methods() -> BTreeSet<ClientAuthenticationMethod> {
    BTreeSet::from([
        ClientAuthenticationMethod::ClientSecretBasic,
        ClientAuthenticationMethod::ClientSecretPost,
    ])
}

/// A client as stored in configuration.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub client_id: String,
    /// PHC formatted hash of the client secret.
    pub client_secret_hash: String,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub scopes: BTreeSet<String>,
    #[serde(default = "all_grant_types")]
    pub grant_types: BTreeSet<GrantType>,
    #[serde(default = "default_authentication_methods")]
    pub authentication_methods: BTreeSet<ClientAuthenticationMethod>,
}

impl std::fmt::Debug for ClientRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRecord")
            .field("id", &self.id)
            .field("client_id", &self.client_id)
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .field("grant_types", &self.grant_types)
            .finish_non_exhaustive()
    }
}

/// Descriptor handed out by [`ClientRegistry::find_by_client_id`].
#[derive(Clone, PartialEq, Eq)]
pub struct RegisteredClient {
    pub id: Uuid,
    pub client_id: String,
    pub client_secret_hash: String,
    pub authentication_methods: BTreeSet<ClientAuthenticationMethod>,
    pub redirect_uri: Option<String>,
    pub scopes: BTreeSet<String>,
    pub grant_types: BTreeSet<GrantType>,
    pub token_settings: TokenSettings,
}

impl std::fmt::Debug for RegisteredClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredClient")
            .field("id", &self.id)
            .field("client_id", &self.client_id)
            .field("authentication_methods", &self.authentication_methods)
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .field("grant_types", &self.grant_types)
            .field("token_settings", &self.token_settings)
            .finish_non_exhaustive()
    }
}

impl RegisteredClient {
    /// Builds a descriptor from a stored record.
    ///
    /// Grant types must be non-empty, and the authorization code grant needs
    /// a redirect target.
    pub fn from_record(record: ClientRecord, token_settings: TokenSettings) -> Result<Self> {
        if record.client_id.is_empty() {
            return Err(Error::InvalidClient(String::from("empty client_id")));
        }
        if record.grant_types.is_empty() {
            return Err(Error::InvalidClient(format!(
                "{} has no grant types",
                record.client_id
            )));
        }
        if record.authentication_methods.is_empty() {
            return Err(Error::InvalidClient(format!(
                "{} has no authentication method",
                record.client_id
            )));
        }
        if record.grant_types.contains(&GrantType::AuthorizationCode)
            && record.redirect_uri.is_none()
        {
            return Err(Error::InvalidClient(format!(
                "{} uses authorization_code without a redirect_uri",
                record.client_id
            )));
        }

        Ok(Self {
            id: record.id,
            client_id: record.client_id,
            client_secret_hash: record.client_secret_hash,
            authentication_methods: record.authentication_methods,
            redirect_uri: record.redirect_uri,
            scopes: record.scopes,
            grant_types: record.grant_types,
            token_settings,
        })
    }

    pub fn allows(&self, grant: GrantType) -> bool {
        self.grant_types.contains(&grant)
    }

    pub fn accepts(&self, method: ClientAuthenticationMethod) -> bool {
        self.authentication_methods.contains(&method)
    }

    /// Refresh tokens need both the grant and a refresh lifetime.
    pub fn supports_refresh(&self) -> bool {
        self.allows(GrantType::RefreshToken) && self.token_settings.refresh_token_ttl.is_some()
    }

    /// Intersects requested scopes with the registered ones.
    ///
    /// An empty request means every registered scope. Returns `None` when a
    /// requested scope is not registered.
    pub fn grant_scopes(&self, requested: &BTreeSet<String>) -> Option<BTreeSet<String>> {
        if requested.is_empty() {
            return Some(self.scopes.clone());
        }
        requested
            .is_subset(&self.scopes)
            .then(|| requested.clone())
    }
}

/// Lookup of registered clients by their public identifier.
pub trait ClientRegistry: Send + Sync {
    fn find_by_client_id(&self, client_id: &str) -> Option<RegisteredClient>;
}

/// Clients loaded once at startup.
#[derive(Debug, Default)]
pub struct InMemoryClientRegistry {
    clients: HashMap<String, RegisteredClient>,
}

impl InMemoryClientRegistry {
    pub fn new(
        records: impl IntoIterator<Item = ClientRecord>,
        token_settings: TokenSettings,
    ) -> Result<Self> {
        let mut clients = HashMap::new();
        for record in records {
            let client = RegisteredClient::from_record(record, token_settings)?;
            if clients.contains_key(&client.client_id) {
                return Err(Error::InvalidClient(format!(
                    "{} registered twice",
                    client.client_id
                )));
            }
            tracing::debug!("Registered client {}", client.client_id);
            clients.insert(client.client_id.clone(), client);
        }
        Ok(Self { clients })
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl ClientRegistry for InMemoryClientRegistry {
    fn find_by_client_id(&self, client_id: &str) -> Option<RegisteredClient> {
        self.clients.get(client_id).cloned()
    }
}

/// Looks a client up and checks its secret.
///
/// An unknown client pays for one decoy verification, like an unknown login.
pub fn authenticate_client(
    registry: &dyn ClientRegistry,
    hasher: &SecretHasher,
    client_id: &str,
    client_secret: &str,
) -> Result<RegisteredClient> {
    let Some(client) = registry.find_by_client_id(client_id) else {
        hasher.verify_decoy(client_secret);
        return Err(Error::UnknownClient);
    };
    if !hasher.is_secret_valid(client_secret, &client.client_secret_hash) {
        return Err(Error::BadSecret);
    }
    Ok(client)
}
