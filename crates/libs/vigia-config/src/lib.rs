//! Configuration management for Vigia.
//!
//! A TOML file (path in `VIGIA_CONFIG`, `vigia.toml` by default) describes the
//! bind address, token signing, seeded accounts, OAuth2 clients and route
//! access rules. A few `VIGIA_*` environment variables override the file.
//! [`VigiaConfig::from_user_config`] validates everything up front, so a bad
//! lifetime or key stops the process before it serves anything.
//!
//! # Usage
//!
//! ```rust
//! use vigia_config::{VigiaConfig, VigiaUserConfig};
//! use std::path::Path;
//!
//! // Load user configuration from TOML file
//! let user_config = VigiaUserConfig::from_file(Path::new("../../../vigia.example.toml")).unwrap();
//!
//! // Validate it and hash seeded secrets
//! let config = VigiaConfig::from_user_config(user_config).unwrap();
//! assert!(config.authorization_server.is_some());
//! ```

pub mod access;
pub mod error;
pub mod jwt_config;
pub mod prelude;
pub mod seed;
pub mod vigia_config;

pub use vigia_config::{VigiaConfig, VigiaUserConfig};
