//! Web layer of the Vigia identity service.
//!
//! This library provides request authentication, the request context, route
//! access rules and the logic behind the login and OAuth2 endpoints.

pub mod ctx;
pub mod error;
pub mod login;
pub mod mw_auth;
pub mod oauth2;
pub mod prelude;
pub mod state;
