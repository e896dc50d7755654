//! Request context management for web handlers.
//!
//! A [`Ctx`] is built by the [`resolver`] for every request that carries a
//! valid bearer token and lives in the request extensions until the request
//! is dropped. Requests without one are anonymous.

use std::collections::BTreeSet;
use std::convert::Infallible;

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;
use serde::Serialize;
use vigia_auth::principal::Principal;

use crate::prelude::*;

pub mod resolver;

/// Request context containing authentication and authorization information.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Ctx {
    /// Who the request acts for.
    pub principal: Principal,
    /// Authorities granted to this context.
    pub authorities: BTreeSet<String>,
    /// Client the token was issued to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

impl Ctx {
    /// Creates a new request context carrying the principal's authorities.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::collections::BTreeSet;
    /// use vigia_auth::principal::Principal;
    /// use vigia_web::ctx::Ctx;
    ///
    /// let principal = Principal::Basic {
    ///     login: "fulano".to_string(),
    ///     authorities: BTreeSet::from(["USER".to_string()]),
    /// };
    /// let ctx = Ctx::new(principal, None);
    /// assert_eq!(ctx.login(), "fulano");
    /// assert!(ctx.has_role("USER"));
    /// ```
    pub fn new(principal: Principal, client_id: Option<String>) -> Self {
        Self {
            authorities: principal.authorities().clone(),
            principal,
            client_id,
        }
    }

    pub fn login(&self) -> &str {
        self.principal.login()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.authorities.contains(role)
    }

    /// True when any of `roles` is granted. An empty set asks for nothing.
    pub fn has_any_role(&self, roles: &BTreeSet<String>) -> bool {
        roles.is_empty() || !self.authorities.is_disjoint(roles)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Ctx {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<Ctx>()
            .cloned()
            .ok_or(Error::CtxMissing)
    }
}

impl<S: Send + Sync> OptionalFromRequestParts<S> for Ctx {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> core::result::Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<Ctx>().cloned())
    }
}
