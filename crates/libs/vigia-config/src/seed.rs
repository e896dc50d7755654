//! Accounts and clients seeded from configuration.
//!
//! Seeds carry either a plaintext secret, hashed at startup, or an already
//! hashed one. Plaintext is convenient in development files; production files
//! should only carry hashes.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vigia_auth::client_registry::{ClientAuthenticationMethod, ClientRecord, GrantType};
use vigia_auth::principal::Account;
use vigia_auth::secret_hash::SecretHasher;

use crate::prelude::*;

fn resolve_secret(
    name: &str,
    secret: Option<String>,
    secret_hash: Option<String>,
    hasher: &SecretHasher,
) -> Result<String> {
    match (secret, secret_hash) {
        (Some(secret), None) => Ok(hasher.generate_secret_hash(&secret)?),
        (None, Some(hash)) => Ok(hash),
        _ => Err(Error::InvalidSeed(String::from(name))),
    }
}

/// `[[accounts]]` entry.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSeed {
    pub login: String,
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub secret_hash: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: BTreeSet<String>,
    #[serde(default)]
    pub admin: bool,
}

impl std::fmt::Debug for AccountSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountSeed")
            .field("login", &self.login)
            .field("email", &self.email)
            .field("roles", &self.roles)
            .field("admin", &self.admin)
            .finish_non_exhaustive()
    }
}

impl AccountSeed {
    /// Emails written by the operator count as verified.
    pub fn into_account(self, hasher: &SecretHasher) -> Result<Account> {
        let secret_hash = resolve_secret(&self.login, self.secret, self.secret_hash, hasher)?;
        Ok(Account {
            login: self.login,
            secret_hash,
            email_verified: self.email.is_some(),
            email: self.email,
            roles: self.roles,
            admin: self.admin,
        })
    }
}

/// `[[authorization_server.clients]]` entry.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSeed {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub client_secret_hash: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub scopes: BTreeSet<String>,
    /// Defaults to every supported grant.
    #[serde(default)]
    pub grant_types: Option<BTreeSet<GrantType>>,
    #[serde(default)]
    pub authentication_methods: Option<BTreeSet<ClientAuthenticationMethod>>,
}

impl std::fmt::Debug for ClientSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSeed")
            .field("client_id", &self.client_id)
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .field("grant_types", &self.grant_types)
            .finish_non_exhaustive()
    }
}

impl ClientSeed {
    pub fn into_record(self, hasher: &SecretHasher) -> Result<ClientRecord> {
        let client_secret_hash = resolve_secret(
            &self.client_id,
            self.client_secret,
            self.client_secret_hash,
            hasher,
        )?;
        Ok(ClientRecord {
            id: Uuid::new_v4(),
            client_id: self.client_id,
            client_secret_hash,
            redirect_uri: self.redirect_uri,
            scopes: self.scopes,
            grant_types: self
                .grant_types
                .unwrap_or_else(|| BTreeSet::from(GrantType::ALL)),
            authentication_methods: self.authentication_methods.unwrap_or_else(|| {
                BTreeSet::from([
                    ClientAuthenticationMethod::ClientSecretBasic,
                    ClientAuthenticationMethod::ClientSecretPost,
                ])
            }),
        })
    }
}
