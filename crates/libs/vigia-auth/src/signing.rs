//! Signing key material for Vigia tokens.
//!
//! A process holds exactly one [`SigningKey`], built once at startup and only
//! read afterwards. Two deployments exist:
//!
//! - a shared secret, signing with HS512;
//! - an RSA key pair, signing with RS256. Its public half is published as a
//!   JWKS so external resource servers can verify tokens on their own.
//!
//! The algorithm is fixed by the key kind and never taken from a token.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use rand::rngs::OsRng;
use rsa::{
    RsaPrivateKey,
    pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey},
    pkcs8::DecodePrivateKey,
    traits::PublicKeyParts,
};
use serde::{Deserialize, Serialize};

use crate::prelude::*;
use crate::sha256::generate_hash;

/// Shortest accepted shared secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;
/// Modulus size of generated RSA keys.
pub const RSA_KEY_BITS: usize = 2048;

/// Cryptographic key pair for JWT signing and verification.
pub struct SigningKey {
    algorithm: Algorithm,
    /// Key used for signing new tokens.
    encoding: EncodingKey,
    /// Key used for verifying presented tokens.
    decoding: DecodingKey,
    /// Public half, only for asymmetric keys.
    public: Option<Jwk>,
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("algorithm", &self.algorithm)
            .field("kid", &self.kid())
            .finish_non_exhaustive()
    }
}

impl SigningKey {
    /// Creates an HS512 key from a shared secret.
    ///
    /// Secrets shorter than [`MIN_SECRET_LEN`] bytes are refused.
    pub fn shared_secret(secret: &[u8]) -> Result<Self> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(Error::InvalidSigningKey(format!(
                "shared secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }
        Ok(Self {
            algorithm: Algorithm::HS512,
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            public: None,
        })
    }

    /// Generates a fresh RS256 key pair.
    pub fn generate_rsa() -> Result<Self> {
        tracing::info!("Generating {RSA_KEY_BITS} bit RSA signing key");
        let key = RsaPrivateKey::new(&mut OsRng, RSA_KEY_BITS)?;
        Self::from_rsa(&key)
    }

    /// Loads an RS256 key pair from a PKCS#8 or PKCS#1 PEM private key.
    pub fn rsa_from_pem(pem: &str) -> Result<Self> {
        let key = match RsaPrivateKey::from_pkcs8_pem(pem) {
            Ok(key) => key,
            Err(_) => RsaPrivateKey::from_pkcs1_pem(pem)
                .map_err(|err| Error::InvalidSigningKey(err.to_string()))?,
        };
        Self::from_rsa(&key)
    }

    fn from_rsa(key: &RsaPrivateKey) -> Result<Self> {
        key.validate()?;
        let der = key
            .to_pkcs1_der()
            .map_err(|err| Error::InvalidSigningKey(err.to_string()))?;

        let n = URL_SAFE_NO_PAD.encode(key.n().to_bytes_be());
        let e = URL_SAFE_NO_PAD.encode(key.e().to_bytes_be());
        // RFC 7638 thumbprint: required members only, lexicographic order.
        let kid = generate_hash(&format!(r#"{{"e":"{e}","kty":"RSA","n":"{n}"}}"#));
        let decoding = DecodingKey::from_rsa_components(&n, &e)?;

        Ok(Self {
            algorithm: Algorithm::RS256,
            encoding: EncodingKey::from_rsa_der(der.as_bytes()),
            decoding,
            public: Some(Jwk {
                kty: String::from("RSA"),
                kid,
                alg: String::from("RS256"),
                use_field: String::from("sig"),
                n,
                e,
            }),
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Key id attached to signed token headers, asymmetric keys only.
    pub fn kid(&self) -> Option<&str> {
        self.public.as_ref().map(|jwk| jwk.kid.as_str())
    }

    pub fn is_asymmetric(&self) -> bool {
        self.public.is_some()
    }

    /// Public verification material. Empty for shared secrets.
    pub fn jwks(&self) -> JwkSet {
        JwkSet {
            keys: self.public.iter().cloned().collect(),
        }
    }

    pub(crate) fn encoding_key(&self) -> &EncodingKey {
        &self.encoding
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.decoding
    }
}

/// A single RSA public key in JWK form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    pub kid: String,
    pub alg: String,
    #[serde(rename = "use")]
    pub use_field: String,
    /// Base64url modulus.
    pub n: String,
    /// Base64url public exponent.
    pub e: String,
}

/// A JWKS document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}
