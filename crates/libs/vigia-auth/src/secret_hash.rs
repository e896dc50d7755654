//! Secure password hashing and verification using Argon2.
//!
//! [`SecretHasher`] fixes its cost parameters when it is built and then hashes
//! secrets with a fresh random salt on every call, so hashing the same secret
//! twice yields two different strings that both verify. Verification never
//! errors: a stored hash that cannot be parsed simply does not match.
//!
//! # Examples
//!
//! ```rust
//! use vigia_auth::secret_hash::{HashCost, SecretHasher};
//!
//! let hasher = SecretHasher::new(HashCost::minimal()).unwrap();
//! let hash = hasher.generate_secret_hash("user_password_123").unwrap();
//!
//! assert!(hasher.is_secret_valid("user_password_123", &hash));
//! assert!(!hasher.is_secret_valid("wrong_password", &hash));
//! assert!(!hasher.is_secret_valid("user_password_123", "not a hash"));
//! ```

use argon2::{
    Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version,
    password_hash::{self, PasswordHash, SaltString},
};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::prelude::*;

/// Argon2id cost parameters.
///
/// The defaults are the argon2 crate defaults (19 MiB, 2 passes, 1 lane),
/// which sit in the same work range as bcrypt with cost 10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashCost {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Number of passes.
    pub iterations: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
}

impl Default for HashCost {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl HashCost {
    /// Smallest parameters argon2 accepts. Only meant for tests.
    pub fn minimal() -> Self {
        Self {
            memory_kib: Params::MIN_M_COST,
            iterations: Params::MIN_T_COST,
            parallelism: Params::MIN_P_COST,
        }
    }
}

/// Salted, adaptive one-way hashing of secrets.
#[derive(Clone)]
pub struct SecretHasher {
    argon2: Argon2<'static>,
    /// Hash of a random secret, verified against when the real hash is absent.
    decoy: String,
}

impl std::fmt::Debug for SecretHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretHasher")
            .field("params", self.argon2.params())
            .finish_non_exhaustive()
    }
}

impl SecretHasher {
    /// Builds a hasher with fixed cost parameters.
    ///
    /// Fails when argon2 rejects the parameters, which callers treat as a
    /// startup error.
    pub fn new(cost: HashCost) -> Result<Self> {
        let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
            .map_err(Error::HashParams)?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let salt = SaltString::generate(&mut OsRng);
        let decoy = argon2
            .hash_password(salt.as_str().as_bytes(), &salt)?
            .to_string();
        Ok(Self { argon2, decoy })
    }

    /// Generates a PHC formatted hash for the provided secret.
    ///
    /// A new random salt is drawn for every call.
    pub fn generate_secret_hash(&self, pw: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        Ok(self.argon2.hash_password(pw.as_bytes(), &salt)?.to_string())
    }

    /// Verifies a secret against a stored hash.
    ///
    /// The digest comparison is constant time. A malformed hash returns
    /// `false` instead of an error.
    pub fn is_secret_valid(&self, pw: &str, hash: &str) -> bool {
        let Ok(hash) = PasswordHash::new(hash) else {
            tracing::warn!("Stored secret hash could not be parsed");
            return false;
        };
        self.argon2.verify_password(pw.as_bytes(), &hash).is_ok()
    }

    /// Runs a full verification that can never succeed.
    ///
    /// Called when there is no stored hash to check against, so an unknown
    /// login costs as much as a wrong secret.
    pub fn verify_decoy(&self, pw: &str) {
        let _ = self.is_secret_valid(pw, &self.decoy);
    }
}

impl From<password_hash::Error> for Error {
    fn from(value: password_hash::Error) -> Self {
        Self::PasswordHash(value)
    }
}
