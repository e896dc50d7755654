//! Authentication middleware for protecting routes.
//!
//! This module provides middleware functions and macros for protecting routes
//! that require authentication and specific roles, plus the middleware that
//! enforces the configured access rules on every route.

use crate::prelude::*;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::debug;
use vigia_config::access::DefaultPolicy;

use super::ctx::Ctx;
use crate::state::AppState;

/// Middleware that requires authentication for a route.
///
/// This middleware checks if a valid authentication context exists.
/// If no valid context is found, the request is rejected.
///
/// # Examples
///
/// ```rust,no_run
/// use axum::{Router, routing::get};
/// use vigia_web::mw_auth::mw_require_auth;
///
/// let app: Router<()> = Router::new()
///     .route("/protected", get(protected_handler))
///     .layer(axum::middleware::from_fn(mw_require_auth));
///
/// async fn protected_handler() -> &'static str {
///     "This requires authentication"
/// }
/// ```
pub async fn mw_require_auth(ctx: Result<Ctx>, req: Request, next: Next) -> Result<Response> {
    ctx?;
    Ok(next.run(req).await)
}

/// Middleware that requires a specific role for a route.
///
/// Anonymous requests get `401`, authenticated ones without the role `403`.
///
/// # Examples
///
/// ```rust
/// use axum::{Router, routing::get};
/// use vigia_web::mw_auth::mw_require_role;
///
/// let app: Router<()> = Router::new()
///     .route("/admin", get(admin_handler))
///     .layer(axum::middleware::from_fn_with_state("ADMIN", mw_require_role));
///
/// async fn admin_handler() -> &'static str {
///     "This requires the admin role"
/// }
/// ```
pub async fn mw_require_role(
    State(role): State<&'static str>,
    ctx: Result<Ctx>,
    req: Request,
    next: Next,
) -> Result<Response> {
    if !ctx?.has_role(role) {
        return Err(Error::ApiForbidden);
    }
    Ok(next.run(req).await)
}

/// Enforces the configured access rules.
///
/// The first rule matching the request path decides; unmatched paths follow
/// the default policy.
pub async fn mw_access_rules(
    State(state): State<AppState>,
    ctx: Option<Ctx>,
    req: Request,
    next: Next,
) -> Result<Response> {
    let path = req.uri().path();
    match state.access.rule_for(path) {
        Some(rule) if rule.public => {}
        Some(rule) => {
            let ctx = ctx.ok_or(Error::CtxMissing)?;
            if !ctx.has_any_role(&rule.roles) {
                debug!("{} lacks {:?} for {path}", ctx.login(), rule.roles);
                return Err(Error::ApiForbidden);
            }
        }
        None => {
            if state.access.default == DefaultPolicy::Authenticated && ctx.is_none() {
                return Err(Error::CtxMissing);
            }
        }
    }
    Ok(next.run(req).await)
}

/// A macro for creating role-required middleware.
///
/// This macro simplifies the creation of middleware that requires specific roles.
/// It automatically imports the necessary dependencies and creates the middleware layer.
///
/// # Examples
///
/// ```rust
/// use axum::{Router, routing::get};
/// use vigia_web::require_role;
///
/// let app: Router<()> = Router::new()
///     .route("/admin", get(admin_handler))
///     .layer(require_role!("ADMIN"))
///     .route("/user", get(user_handler))
///     .layer(require_role!("USER"));
///
/// async fn admin_handler() -> &'static str {
///     "Admin only"
/// }
///
/// async fn user_handler() -> &'static str {
///     "User role required"
/// }
/// ```
#[macro_export]
macro_rules! require_role {
    ($role:expr) => {{
        use vigia_web::mw_auth::mw_require_role;
        axum::middleware::from_fn_with_state($role, mw_require_role)
    }};
}
