use axum::{
    Form, Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use tokio::{
    net::TcpListener,
    task::{JoinError, JoinHandle, spawn_blocking},
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use vigia_auth::{
    auth_body::{LoginRequest, LoginResponse},
    authenticator::NewAccount,
    principal::ROLE_ADMIN,
    signing::JwkSet,
};
use vigia_web::{
    ctx::{Ctx, resolver::mw_ctx_resolver},
    login::{AccountView, find_account, login, register_account},
    mw_auth::mw_access_rules,
    oauth2::{
        self,
        authorize::{AuthorizeRequest, AuthorizeResponse, authorize},
        error::OAuthError,
        introspect::{IntrospectRequest, Introspection, introspect},
        token::{TokenRequest, exchange},
    },
    require_role,
    state::AppState,
};

use crate::prelude::*;
use vigia_web::error::Error as WebError;
use vigia_web::prelude::Result as WebResult;

fn v1(path: &str) -> String {
    format!("/v1/{path}")
}

fn oauth(path: &str) -> String {
    format!("/oauth2/{path}")
}

/// Builds the full router for `state`.
///
/// The authorization server routes are only mounted when the state carries
/// one.
pub fn build_app(state: AppState) -> Router {
    let account_routes = Router::new()
        .route(&v1("login"), post(login_api))
        .route(&v1("users"), post(register_api))
        .route(&v1("me"), get(me));

    let admin_routes = Router::new()
        .route(&v1("admin/accounts/{login}"), get(find_account_api))
        .route_layer(require_role!(ROLE_ADMIN));

    let mut app = Router::new().merge(account_routes).merge(admin_routes);

    if state.authorization_server.is_some() {
        let oauth2_routes = Router::new()
            .route(&oauth("jwks"), get(jwks))
            .route(&oauth("authorize"), post(authorize_api))
            .route(&oauth("token"), post(token))
            .route(&oauth("introspect"), post(introspect_api))
            .route(&oauth("revoke"), post(revoke));
        app = app.merge(oauth2_routes);
    }

    app.layer(middleware::from_fn_with_state(
        state.clone(),
        mw_access_rules,
    ))
    .layer(
        TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default().include_headers(true)),
    )
    .layer(CorsLayer::permissive())
    .layer(middleware::from_fn_with_state(state.clone(), mw_ctx_resolver))
    .with_state(state)
}

/// Serves the API on `listener` in the background.
pub async fn setup_api(state: AppState, listener: TcpListener) -> Result<JoinHandle<Result<()>>> {
    let app = build_app(state);
    tracing::debug!("listening on {}", listener.local_addr()?);
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await?;
        Ok(())
    });

    Ok(handle)
}

/// Runs `task` on the blocking pool. Secret hashing must not stall the
/// worker threads that serve other requests.
async fn blocking<T, E>(
    state: AppState,
    on_join_error: fn(JoinError) -> E,
    task: impl FnOnce(&AppState) -> core::result::Result<T, E> + Send + 'static,
) -> core::result::Result<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    spawn_blocking(move || task(&state))
        .await
        .unwrap_or_else(|err| {
            tracing::error!("Blocking request task failed: {err}");
            Err(on_join_error(err))
        })
}

fn web_join_error(err: JoinError) -> WebError {
    WebError::IO(err.into())
}

fn oauth_join_error(_: JoinError) -> OAuthError {
    OAuthError::server_error()
}

async fn login_api(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> WebResult<Json<LoginResponse>> {
    let response = blocking(state, web_join_error, move |state| login(&payload, state)).await?;
    Ok(Json(response))
}

async fn register_api(
    State(state): State<AppState>,
    Json(payload): Json<NewAccount>,
) -> WebResult<(StatusCode, Json<AccountView>)> {
    let view = blocking(state, web_join_error, move |state| {
        register_account(payload, state)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn me(ctx: Ctx) -> Json<Ctx> {
    Json(ctx)
}

async fn find_account_api(
    State(state): State<AppState>,
    Path(login): Path<String>,
) -> WebResult<Json<AccountView>> {
    Ok(Json(find_account(&login, &state)?))
}

async fn jwks(State(state): State<AppState>) -> core::result::Result<Json<JwkSet>, OAuthError> {
    Ok(Json(oauth2::jwks(&state)?))
}

async fn authorize_api(
    State(state): State<AppState>,
    Json(payload): Json<AuthorizeRequest>,
) -> core::result::Result<Json<AuthorizeResponse>, OAuthError> {
    let response = blocking(state, oauth_join_error, move |state| {
        authorize(&payload, state)
    })
    .await?;
    Ok(Json(response))
}

async fn token(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(payload): Form<TokenRequest>,
) -> core::result::Result<impl IntoResponse, OAuthError> {
    let response = blocking(state, oauth_join_error, move |state| {
        exchange(&payload, &headers, state)
    })
    .await?;
    Ok(([(header::CACHE_CONTROL, "no-store")], Json(response)))
}

async fn introspect_api(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(payload): Form<IntrospectRequest>,
) -> core::result::Result<Json<Introspection>, OAuthError> {
    let answer = blocking(state, oauth_join_error, move |state| {
        introspect(&payload, &headers, state)
    })
    .await?;
    Ok(Json(answer))
}

/// Tokens are self-contained, there is nothing to revoke.
async fn revoke() -> StatusCode {
    StatusCode::OK
}
