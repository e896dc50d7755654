//! Context resolver for extracting the principal from HTTP requests.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error};
use vigia_auth::{
    CONNECTION_TOKEN_TYPE,
    credential_store::CredentialStore,
    jwt::{Identity, TokenKind, TokenValidator},
    principal::Principal,
};

use crate::ctx::Ctx;
use crate::state::AppState;

/// Turns the bearer token of a request into a [`Ctx`].
///
/// Never fails: a missing, invalid or expired token, a refresh token, or a
/// subject that no longer resolves all leave the request anonymous.
#[derive(Clone)]
pub struct RequestAuthenticator {
    validator: TokenValidator,
    store: Arc<dyn CredentialStore>,
}

impl RequestAuthenticator {
    pub fn new(validator: TokenValidator, store: Arc<dyn CredentialStore>) -> Self {
        Self { validator, store }
    }

    /// Extracts the token of an `Authorization: Bearer <token>` header.
    ///
    /// The scheme is matched case-insensitively. Any other scheme, or a
    /// header that is not valid ASCII, yields nothing.
    ///
    /// ```rust
    /// use axum::http::{HeaderMap, HeaderValue, header::AUTHORIZATION};
    /// use vigia_web::ctx::resolver::RequestAuthenticator;
    ///
    /// let mut headers = HeaderMap::new();
    /// headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer abc.def.ghi"));
    /// assert_eq!(RequestAuthenticator::bearer_token(&headers), Some("abc.def.ghi"));
    ///
    /// headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic Zm9vOmJhcg=="));
    /// assert_eq!(RequestAuthenticator::bearer_token(&headers), None);
    /// ```
    pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
        let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
        let (scheme, token) = value.split_once(' ')?;
        if !scheme.eq_ignore_ascii_case(CONNECTION_TOKEN_TYPE) {
            return None;
        }
        let token = token.trim();
        (!token.is_empty()).then_some(token)
    }

    /// Resolves the request context, if the request carries a usable token.
    pub fn authenticate(&self, headers: &HeaderMap) -> Option<Ctx> {
        let token = Self::bearer_token(headers)?;
        match self.validator.validate(token) {
            Ok(identity) => self.resolve(identity),
            Err(err) => {
                debug!("Ignoring bearer token: {err}");
                None
            }
        }
    }

    /// Maps a validated identity onto a principal.
    ///
    /// A client holding a token issued to itself acts with its scopes and
    /// never touches the credential store. Accounts are looked up again so
    /// that their current authorities apply.
    pub fn resolve(&self, identity: Identity) -> Option<Ctx> {
        if identity.token_use != TokenKind::Access {
            debug!("Ignoring {:?} token presented as bearer", identity.token_use);
            return None;
        }

        if identity.is_client_self() {
            let principal = Principal::Basic {
                login: identity.subject,
                authorities: identity.scopes,
            };
            return Some(Ctx::new(principal, identity.client_id));
        }

        match self.store.find_by_login(&identity.subject) {
            Ok(Some(account)) => Some(Ctx::new(account.principal(), identity.client_id)),
            Ok(None) => {
                debug!("Token subject {} no longer exists", identity.subject);
                None
            }
            Err(err) => {
                error!("Failed to resolve token subject: {err}");
                None
            }
        }
    }
}

/// Middleware for resolving request context from bearer tokens.
///
/// Adds the context to the request extensions on success and leaves them
/// untouched otherwise.
pub async fn mw_ctx_resolver(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(ctx) = state.authenticator.authenticate(req.headers()) {
        debug!("Request authenticated as {}", ctx.login());
        req.extensions_mut().insert(ctx);
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use axum::http::HeaderValue;
    use chrono::{TimeDelta, Utc};
    use vigia_auth::credential_store::InMemoryCredentialStore;
    use vigia_auth::jwt::{Grant, TokenIssuer};
    use vigia_auth::principal::Account;
    use vigia_auth::signing::SigningKey;

    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef0123456789abcdef";

    fn setup() -> (TokenIssuer, RequestAuthenticator) {
        let key = Arc::new(SigningKey::shared_secret(SECRET).unwrap());
        let store = InMemoryCredentialStore::with_accounts([Account {
            login: String::from("fulano"),
            secret_hash: String::new(),
            email: None,
            email_verified: false,
            roles: BTreeSet::new(),
            admin: true,
        }])
        .unwrap();
        (
            TokenIssuer::new(key.clone(), vigia_auth::ISS),
            RequestAuthenticator::new(
                TokenValidator::new(key, vigia_auth::ISS),
                Arc::new(store),
            ),
        )
    }

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn token(issuer: &TokenIssuer, login: &str, kind: TokenKind, grant: &Grant) -> String {
        let principal = Principal::Basic {
            login: String::from(login),
            authorities: BTreeSet::new(),
        };
        issuer
            .issue(&principal, kind, TimeDelta::minutes(5), grant)
            .unwrap()
            .token
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        for scheme in ["Bearer", "bearer", "BEARER"] {
            assert_eq!(
                RequestAuthenticator::bearer_token(&headers(&format!("{scheme} tok"))),
                Some("tok")
            );
        }
        assert_eq!(RequestAuthenticator::bearer_token(&headers("Bearer")), None);
        assert_eq!(RequestAuthenticator::bearer_token(&headers("Bearer   ")), None);
        assert_eq!(RequestAuthenticator::bearer_token(&headers("Token tok")), None);
        assert_eq!(RequestAuthenticator::bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn valid_token_resolves_stored_authorities() {
        let (issuer, authenticator) = setup();
        let token = token(&issuer, "fulano", TokenKind::Access, &Grant::default());
        let ctx = authenticator
            .authenticate(&headers(&format!("Bearer {token}")))
            .unwrap();
        assert_eq!(ctx.login(), "fulano");
        assert_eq!(
            ctx.authorities,
            BTreeSet::from([String::from("ADMIN"), String::from("USER")])
        );
    }

    #[test]
    fn expired_token_is_anonymous() {
        let (issuer, authenticator) = setup();
        let principal = Principal::Basic {
            login: String::from("fulano"),
            authorities: BTreeSet::new(),
        };
        let expired = issuer
            .issue_at(
                &principal,
                TokenKind::Access,
                TimeDelta::minutes(5),
                &Grant::default(),
                Utc::now() - TimeDelta::hours(1),
            )
            .unwrap()
            .token;
        assert!(
            authenticator
                .authenticate(&headers(&format!("Bearer {expired}")))
                .is_none()
        );
    }

    #[test]
    fn refresh_tokens_and_unknown_subjects_are_anonymous() {
        let (issuer, authenticator) = setup();
        let refresh = token(&issuer, "fulano", TokenKind::Refresh, &Grant::default());
        assert!(
            authenticator
                .authenticate(&headers(&format!("Bearer {refresh}")))
                .is_none()
        );

        let ghost = token(&issuer, "ghost", TokenKind::Access, &Grant::default());
        assert!(
            authenticator
                .authenticate(&headers(&format!("Bearer {ghost}")))
                .is_none()
        );
    }

    #[test]
    fn client_self_tokens_act_with_their_scopes() {
        let (issuer, authenticator) = setup();
        let grant = Grant::client("svc", BTreeSet::from([String::from("read")]));
        let token = token(&issuer, "svc", TokenKind::Access, &grant);
        let ctx = authenticator
            .authenticate(&headers(&format!("Bearer {token}")))
            .unwrap();
        assert_eq!(ctx.login(), "svc");
        assert_eq!(ctx.client_id.as_deref(), Some("svc"));
        assert!(ctx.has_role("read"));
    }

    #[test]
    fn client_self_tokens_ignore_a_same_named_account() {
        let key = Arc::new(SigningKey::shared_secret(SECRET).unwrap());
        let store = InMemoryCredentialStore::with_accounts([Account {
            login: String::from("svc"),
            secret_hash: String::new(),
            email: None,
            email_verified: false,
            roles: BTreeSet::new(),
            admin: false,
        }])
        .unwrap();
        let issuer = TokenIssuer::new(key.clone(), vigia_auth::ISS);
        let authenticator = RequestAuthenticator::new(
            TokenValidator::new(key, vigia_auth::ISS),
            Arc::new(store),
        );

        let grant = Grant::client("svc", BTreeSet::from([String::from("read")]));
        let token = token(&issuer, "svc", TokenKind::Access, &grant);
        let ctx = authenticator
            .authenticate(&headers(&format!("Bearer {token}")))
            .unwrap();
        assert!(ctx.has_role("read"));
        assert!(!ctx.has_role("USER"));
    }

    #[test]
    fn garbage_is_anonymous() {
        let (_, authenticator) = setup();
        for value in ["Bearer ", "Bearer a.b.c", "Bearer \u{7f}", "Basic Zm9vOmJhcg=="] {
            if let Ok(value) = HeaderValue::from_str(value) {
                let mut map = HeaderMap::new();
                map.insert(AUTHORIZATION, value);
                assert!(authenticator.authenticate(&map).is_none());
            }
        }
    }
}
