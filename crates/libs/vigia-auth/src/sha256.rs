//! SHA-256 digests used for key identifiers.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};

/// Generates the unpadded base64url SHA-256 digest of the provided string.
///
/// Returns a 43 character string.
///
/// # Examples
///
/// ```rust
/// use vigia_auth::sha256::generate_hash;
///
/// let hash = generate_hash("Hello, world!");
/// assert_eq!(hash.len(), 43);
/// ```
pub fn generate_hash(payload: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}
