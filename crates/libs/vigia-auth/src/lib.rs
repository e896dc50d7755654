//! Authentication core for Vigia.
//!
//! Everything in here is synchronous and free of transport concerns: password
//! hashing, signing keys, token issuance and validation, principals, the
//! credential store contract, the OAuth2 client registry and the claims
//! customizer. The web layer lives in `vigia-web`.

pub mod auth_body;
pub mod authenticator;
pub mod claims;
pub mod client_registry;
pub mod credential_store;
pub mod error;
pub mod jwt;
pub mod prelude;
pub mod principal;
pub mod secret_hash;
pub mod sha256;
pub mod signing;
pub mod social;

pub const CONNECTION_TOKEN_TYPE: &str = "Bearer";
pub const ISS: &str = "vigia";
