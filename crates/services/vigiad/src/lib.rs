//! Vigia identity service (vigiad)
//!
//! Serves the HTTP surface of Vigia:
//!
//! - **Login**: verifies account credentials and issues access tokens
//! - **Accounts**: self service registration and administrative lookup
//! - **Authorization server**: OAuth2 token, authorize, introspection and
//!   JWKS endpoints when an RSA signing key is configured
//!
//! Every request passes through the bearer token resolver and the configured
//! access rules before reaching its handler.

pub mod api;
pub mod error;
pub mod prelude;
