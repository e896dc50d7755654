//! JWT issuance and validation.
//!
//! [`TokenIssuer`] turns a principal into a signed, time bounded token and
//! [`TokenValidator`] checks a presented token and extracts its [`Identity`].
//! Both share the process [`SigningKey`] behind an `Arc` and keep no per call
//! state, so they can be used from any number of requests at once.
//!
//! Validation order is fixed: structure, then signature, then expiration. A
//! token with a bad signature is refused before any of its claims is looked at.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use chrono::TimeDelta;
//! use vigia_auth::jwt::{Grant, TokenIssuer, TokenKind, TokenValidator};
//! use vigia_auth::principal::Principal;
//! use vigia_auth::signing::SigningKey;
//!
//! let key = Arc::new(SigningKey::shared_secret(&[7u8; 64]).unwrap());
//! let issuer = TokenIssuer::new(key.clone(), "vigia");
//! let validator = TokenValidator::new(key, "vigia");
//!
//! let principal = Principal::Basic { login: "fulano".into(), authorities: Default::default() };
//! let issued = issuer
//!     .issue(&principal, TokenKind::Access, TimeDelta::minutes(30), &Grant::default())
//!     .unwrap();
//!
//! let identity = validator.validate(&issued.token).unwrap();
//! assert_eq!(identity.subject, "fulano");
//! assert!(!validator.is_valid("not a token"));
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{Header, Validation, decode, decode_header, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::claims::{AUTHORITIES_CLAIM, ClaimsCustomizer};
use crate::prelude::*;
use crate::principal::Principal;
use crate::signing::SigningKey;

/// Claim names a customizer is not allowed to set.
pub const RESERVED_CLAIMS: [&str; 10] = [
    "sub",
    "iss",
    "aud",
    "iat",
    "nbf",
    "exp",
    "jti",
    "token_use",
    "client_id",
    "scope",
];

/// What a token may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Presented as a bearer credential on requests.
    Access,
    /// Only exchanged at the token endpoint for a new access token.
    Refresh,
}

/// OAuth2 grant data bound into a token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grant {
    pub client_id: Option<String>,
    pub scopes: BTreeSet<String>,
}

impl Grant {
    pub fn client(client_id: impl Into<String>, scopes: BTreeSet<String>) -> Self {
        Self {
            client_id: Some(client_id.into()),
            scopes,
        }
    }
}

/// The signed claim set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (login identifier).
    pub sub: String,
    /// Issuer.
    pub iss: String,
    /// Issued at time.
    pub iat: i64,
    /// Expiration time.
    pub exp: i64,
    /// JWT ID.
    pub jti: Uuid,
    pub token_use: TokenKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Space separated scopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Claims contributed by the customizer.
    #[serde(flatten)]
    pub custom: Map<String, Value>,
}

/// A freshly signed token with the claims that went into it.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

impl IssuedToken {
    /// Lifetime in seconds.
    pub fn expires_in(&self) -> i64 {
        self.claims.exp - self.claims.iat
    }
}

/// Signs claim sets with the process signing key.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    key: Arc<SigningKey>,
    issuer: String,
    customizer: Option<ClaimsCustomizer>,
}

impl TokenIssuer {
    pub fn new(key: Arc<SigningKey>, issuer: impl Into<String>) -> Self {
        Self {
            key,
            issuer: issuer.into(),
            customizer: None,
        }
    }

    /// Installs a claims customizer, run on every issued token.
    pub fn with_claims_customizer(mut self, customizer: ClaimsCustomizer) -> Self {
        self.customizer = Some(customizer);
        self
    }

    /// Issues a token valid for `ttl` from now.
    pub fn issue(
        &self,
        principal: &Principal,
        kind: TokenKind,
        ttl: TimeDelta,
        grant: &Grant,
    ) -> Result<IssuedToken> {
        self.issue_at(principal, kind, ttl, grant, Utc::now())
    }

    /// Issues a token as if the current time were `now`.
    pub fn issue_at(
        &self,
        principal: &Principal,
        kind: TokenKind,
        ttl: TimeDelta,
        grant: &Grant,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken> {
        let expiration = now
            .checked_add_signed(ttl)
            .ok_or(Error::ExpirationOverflow)?;

        let mut custom = self
            .customizer
            .map(|customize| customize(principal, kind))
            .unwrap_or_default();
        custom.retain(|name, _| !RESERVED_CLAIMS.contains(&name.as_str()));

        let scope = (!grant.scopes.is_empty())
            .then(|| grant.scopes.iter().cloned().collect::<Vec<_>>().join(" "));

        let claims = Claims {
            sub: principal.login().to_string(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            jti: Uuid::new_v4(),
            token_use: kind,
            client_id: grant.client_id.clone(),
            scope,
            custom,
        };

        let mut header = Header::new(self.key.algorithm());
        header.kid = self.key.kid().map(String::from);

        let token = encode(&header, &claims, self.key.encoding_key()).map_err(|err| {
            tracing::error!("Failed to encode JWT {err}");
            err
        })?;

        Ok(IssuedToken { token, claims })
    }
}

/// What a valid token says about its holder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identity {
    pub subject: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub token_id: Uuid,
    pub token_use: TokenKind,
    pub client_id: Option<String>,
    pub scopes: BTreeSet<String>,
    /// Custom claims.
    pub claims: Map<String, Value>,
}

impl Identity {
    /// Authorities carried in the token itself, if any.
    pub fn authorities(&self) -> Option<BTreeSet<String>> {
        let values = self.claims.get(AUTHORITIES_CLAIM)?.as_array()?;
        Some(
            values
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect(),
        )
    }

    /// True when a client holds a token issued to itself.
    pub fn is_client_self(&self) -> bool {
        self.client_id.as_deref() == Some(self.subject.as_str())
    }
}

impl TryFrom<Claims> for Identity {
    type Error = ValidationError;

    fn try_from(claims: Claims) -> core::result::Result<Self, Self::Error> {
        let issued_at =
            DateTime::from_timestamp(claims.iat, 0).ok_or(ValidationError::Malformed)?;
        let expires_at =
            DateTime::from_timestamp(claims.exp, 0).ok_or(ValidationError::Malformed)?;
        let scopes = claims
            .scope
            .as_deref()
            .map(|scope| scope.split_whitespace().map(String::from).collect())
            .unwrap_or_default();

        Ok(Self {
            subject: claims.sub,
            issued_at,
            expires_at,
            token_id: claims.jti,
            token_use: claims.token_use,
            client_id: claims.client_id,
            scopes,
            claims: claims.custom,
        })
    }
}

/// Verifies tokens signed with the process signing key.
#[derive(Debug, Clone)]
pub struct TokenValidator {
    key: Arc<SigningKey>,
    validation: Validation,
}

impl TokenValidator {
    pub fn new(key: Arc<SigningKey>, issuer: &str) -> Self {
        let mut validation = Validation::new(key.algorithm());
        // Expiration is checked here, against an explicit clock, once the
        // signature is known to be good.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "exp"]);
        validation.set_issuer(&[issuer]);
        Self { key, validation }
    }

    /// Validates a token against the current time.
    pub fn validate(&self, token: &str) -> core::result::Result<Identity, ValidationError> {
        self.validate_at(token, Utc::now())
    }

    /// Validates a token as if the current time were `now`.
    pub fn validate_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> core::result::Result<Identity, ValidationError> {
        if token.split('.').count() != 3 || decode_header(token).is_err() {
            return Err(ValidationError::Malformed);
        }

        let claims = decode::<Claims>(token, self.key.decoding_key(), &self.validation)
            .map_err(|err| {
                tracing::debug!("Rejected token: {err}");
                classify(&err)
            })?
            .claims;

        if now.timestamp() > claims.exp {
            return Err(ValidationError::Expired);
        }

        Identity::try_from(claims)
    }

    /// `validate` collapsed to a boolean. Never panics, whatever the input.
    pub fn is_valid(&self, token: &str) -> bool {
        self.validate(token).is_ok()
    }

    pub fn is_valid_at(&self, token: &str, now: DateTime<Utc>) -> bool {
        self.validate_at(token, now).is_ok()
    }
}

/// Maps a decoding failure to the validation taxonomy.
///
/// Only called once the header parsed, so base64 failures can only come from
/// the signature segment.
fn classify(err: &jsonwebtoken::errors::Error) -> ValidationError {
    match err.kind() {
        ErrorKind::InvalidSignature | ErrorKind::Base64(_) | ErrorKind::Crypto(_) => {
            ValidationError::BadSignature
        }
        _ => ValidationError::Malformed,
    }
}
