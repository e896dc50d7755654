//! Top level configuration.

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;
use vigia_auth::client_registry::{
    ClientRecord, DEFAULT_ACCESS_TOKEN_TTL_MINUTES, DEFAULT_REFRESH_TOKEN_TTL_MINUTES,
    TokenSettings,
};
use vigia_auth::principal::Account;
use vigia_auth::secret_hash::{HashCost, SecretHasher};

use crate::access::AccessConfig;
use crate::jwt_config::{JwtConfig, JwtUserConfig, parse_ttl_minutes, ttl_from_minutes};
use crate::prelude::*;
use crate::seed::{AccountSeed, ClientSeed};

/// Path of the configuration file.
pub const CONFIG_PATH_ENV: &str = "VIGIA_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "vigia.toml";
/// Overrides `jwt.secret`.
pub const JWT_SECRET_ENV: &str = "VIGIA_JWT_SECRET";
/// Overrides `jwt.expiration_minutes`.
pub const JWT_EXPIRATION_ENV: &str = "VIGIA_JWT_EXPIRATION";
/// Overrides `server.bind`.
pub const BIND_ENV: &str = "VIGIA_BIND";
pub const DEFAULT_BIND: &str = "0.0.0.0:3000";

fn default_bind() -> String {
    String::from(DEFAULT_BIND)
}

fn default_access_ttl() -> u32 {
    DEFAULT_ACCESS_TOKEN_TTL_MINUTES
}

fn default_refresh_ttl() -> u32 {
    DEFAULT_REFRESH_TOKEN_TTL_MINUTES
}

fn enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerUserConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerUserConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// `[authorization_server]` table. The server is only mounted when present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationServerUserConfig {
    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_minutes: u32,
    #[serde(default = "default_refresh_ttl")]
    pub refresh_token_ttl_minutes: u32,
    /// Turns refresh tokens off for every client.
    #[serde(default = "enabled")]
    pub refresh_tokens: bool,
    #[serde(default)]
    pub clients: Vec<ClientSeed>,
}

/// User-provided configuration from TOML files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VigiaUserConfig {
    #[serde(default)]
    pub server: ServerUserConfig,
    #[serde(default)]
    pub jwt: JwtUserConfig,
    /// Argon2 cost of stored secrets.
    #[serde(default)]
    pub hash: HashCost,
    #[serde(default)]
    pub accounts: Vec<AccountSeed>,
    #[serde(default)]
    pub authorization_server: Option<AuthorizationServerUserConfig>,
    #[serde(default)]
    pub access: AccessConfig,
}

impl VigiaUserConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(file_path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(file_path)?;
        Self::from_toml(&contents)
    }

    /// Parse configuration from TOML string.
    pub fn from_toml(value: &str) -> Result<Self> {
        Ok(toml::from_str(value)?)
    }

    /// Applies the `VIGIA_*` environment overrides.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Applies overrides from any variable source.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(secret) = lookup(JWT_SECRET_ENV) {
            self.jwt.secret = Some(secret);
        }
        if let Some(expiration) = lookup(JWT_EXPIRATION_ENV) {
            self.jwt.expiration_minutes = parse_ttl_minutes(JWT_EXPIRATION_ENV, &expiration)?;
        }
        if let Some(bind) = lookup(BIND_ENV) {
            self.server.bind = bind;
        }
        Ok(())
    }
}

/// Validated authorization server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationServerConfig {
    pub token_settings: TokenSettings,
    pub clients: Vec<ClientRecord>,
}

/// Internal configuration: parsed, validated, secrets hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VigiaConfig {
    pub bind: SocketAddr,
    pub jwt: JwtConfig,
    pub hash_cost: HashCost,
    pub accounts: Vec<Account>,
    pub authorization_server: Option<AuthorizationServerConfig>,
    pub access: AccessConfig,
}

impl VigiaConfig {
    /// Convert user configuration to internal configuration.
    ///
    /// Every misconfiguration is reported here, before anything is served.
    pub fn from_user_config(config: VigiaUserConfig) -> Result<Self> {
        let bind = config
            .server
            .bind
            .parse()
            .map_err(|_| Error::InvalidBind(config.server.bind.clone()))?;
        let jwt = JwtConfig::from_user_config(config.jwt)?;
        config.access.validate()?;

        let hasher = SecretHasher::new(config.hash)?;
        let accounts = config
            .accounts
            .into_iter()
            .map(|seed| seed.into_account(&hasher))
            .collect::<Result<Vec<_>>>()?;

        let authorization_server = match config.authorization_server {
            Some(server) => {
                if !jwt.signing.is_rsa() {
                    return Err(Error::AuthorizationServerNeedsRsa);
                }
                let refresh_token_ttl = if server.refresh_tokens {
                    Some(ttl_from_minutes(
                        "authorization_server.refresh_token_ttl_minutes",
                        server.refresh_token_ttl_minutes,
                    )?)
                } else {
                    None
                };
                let token_settings = TokenSettings {
                    access_token_ttl: ttl_from_minutes(
                        "authorization_server.access_token_ttl_minutes",
                        server.access_token_ttl_minutes,
                    )?,
                    refresh_token_ttl,
                };
                let clients = server
                    .clients
                    .into_iter()
                    .map(|seed| seed.into_record(&hasher))
                    .collect::<Result<Vec<_>>>()?;
                Some(AuthorizationServerConfig {
                    token_settings,
                    clients,
                })
            }
            None => None,
        };

        Ok(Self {
            bind,
            jwt,
            hash_cost: config.hash,
            accounts,
            authorization_server,
            access: config.access,
        })
    }

    /// Loads the file named by `VIGIA_CONFIG`, applies environment overrides
    /// and validates the result.
    ///
    /// A missing default file is not an error; everything then comes from
    /// defaults and the environment.
    pub fn load() -> Result<Self> {
        let explicit = std::env::var(CONFIG_PATH_ENV).ok();
        let path = PathBuf::from(explicit.as_deref().unwrap_or(DEFAULT_CONFIG_PATH));

        let mut user_config = if path.exists() {
            info!("Loading configuration from {}", path.display());
            VigiaUserConfig::from_file(&path)?
        } else if explicit.is_some() {
            return Err(Error::NotFound(path));
        } else {
            info!("No configuration file, using defaults");
            VigiaUserConfig::default()
        };
        user_config.apply_env()?;
        Self::from_user_config(user_config)
    }
}

impl fmt::Display for VigiaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bind={} issuer={} expiration={}m rsa={} accounts={} clients={}",
            self.bind,
            self.jwt.issuer,
            self.jwt.expiration.num_minutes(),
            self.jwt.signing.is_rsa(),
            self.accounts.len(),
            self.authorization_server
                .as_ref()
                .map_or(0, |server| server.clients.len())
        )
    }
}
