//! Token signing and lifetime configuration.

use std::path::PathBuf;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use tracing::info;
use vigia_auth::signing::SigningKey;

use crate::prelude::*;

/// Login token lifetime when nothing is configured.
pub const DEFAULT_EXPIRATION_MINUTES: u32 = 30;

/// Signature algorithm family of the process signing key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigningAlgorithm {
    /// HMAC with a shared secret.
    #[default]
    Hs512,
    /// RSA key pair, published through JWKS.
    Rs256,
}

fn default_issuer() -> String {
    String::from(vigia_auth::ISS)
}

fn default_expiration() -> u32 {
    DEFAULT_EXPIRATION_MINUTES
}

/// `[jwt]` table as written by the user.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtUserConfig {
    #[serde(default = "default_issuer")]
    pub issuer: String,
    /// Login token lifetime in minutes.
    #[serde(default = "default_expiration")]
    pub expiration_minutes: u32,
    #[serde(default)]
    pub algorithm: SigningAlgorithm,
    /// Shared secret for `hs512`.
    #[serde(default)]
    pub secret: Option<String>,
    /// PKCS#8 or PKCS#1 PEM for `rs256`. A key is generated when absent.
    #[serde(default)]
    pub rsa_pem_path: Option<PathBuf>,
}

impl Default for JwtUserConfig {
    fn default() -> Self {
        Self {
            issuer: default_issuer(),
            expiration_minutes: default_expiration(),
            algorithm: SigningAlgorithm::default(),
            secret: None,
            rsa_pem_path: None,
        }
    }
}

impl std::fmt::Debug for JwtUserConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtUserConfig")
            .field("issuer", &self.issuer)
            .field("expiration_minutes", &self.expiration_minutes)
            .field("algorithm", &self.algorithm)
            .field("secret", &self.secret.as_ref().map(|_| "REDACTED"))
            .field("rsa_pem_path", &self.rsa_pem_path)
            .finish()
    }
}

/// Where the signing key comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum SigningConfig {
    SharedSecret(String),
    Rsa { pem_path: Option<PathBuf> },
}

impl std::fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SigningConfig::SharedSecret(_) => f.write_str("SharedSecret(REDACTED)"),
            SigningConfig::Rsa { pem_path } => {
                f.debug_struct("Rsa").field("pem_path", pem_path).finish()
            }
        }
    }
}

impl SigningConfig {
    /// Builds the signing key. Fails on short secrets and unreadable keys.
    pub fn signing_key(&self) -> Result<SigningKey> {
        let key = match self {
            SigningConfig::SharedSecret(secret) => SigningKey::shared_secret(secret.as_bytes())?,
            SigningConfig::Rsa {
                pem_path: Some(path),
            } => {
                info!("Loading RSA signing key from {}", path.display());
                SigningKey::rsa_from_pem(&std::fs::read_to_string(path)?)?
            }
            SigningConfig::Rsa { pem_path: None } => {
                info!("Generating RSA signing key");
                SigningKey::generate_rsa()?
            }
        };
        Ok(key)
    }

    pub fn is_rsa(&self) -> bool {
        matches!(self, SigningConfig::Rsa { .. })
    }
}

/// Validated `[jwt]` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JwtConfig {
    pub issuer: String,
    pub expiration: TimeDelta,
    pub signing: SigningConfig,
}

impl JwtConfig {
    pub fn from_user_config(config: JwtUserConfig) -> Result<Self> {
        let expiration = ttl_from_minutes("jwt.expiration_minutes", config.expiration_minutes)?;
        let signing = match config.algorithm {
            SigningAlgorithm::Hs512 => {
                SigningConfig::SharedSecret(config.secret.ok_or(Error::MissingSecret)?)
            }
            SigningAlgorithm::Rs256 => SigningConfig::Rsa {
                pem_path: config.rsa_pem_path,
            },
        };
        Ok(Self {
            issuer: config.issuer,
            expiration,
            signing,
        })
    }
}

/// Converts a configured number of minutes into a lifetime. Zero is refused.
pub fn ttl_from_minutes(name: &'static str, minutes: u32) -> Result<TimeDelta> {
    if minutes == 0 {
        return Err(Error::InvalidTtl {
            name,
            value: minutes.to_string(),
        });
    }
    Ok(TimeDelta::minutes(minutes.into()))
}

/// Parses a lifetime given as text, e.g. from the environment.
pub fn parse_ttl_minutes(name: &'static str, value: &str) -> Result<u32> {
    match value.trim().parse::<u32>() {
        Ok(minutes) if minutes > 0 => Ok(minutes),
        _ => Err(Error::InvalidTtl {
            name,
            value: String::from(value),
        }),
    }
}
