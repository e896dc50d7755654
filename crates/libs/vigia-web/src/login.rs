//! Login and account registration.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::info;
use vigia_auth::{
    auth_body::{LoginRequest, LoginResponse},
    authenticator::{NewAccount, authenticate, register},
    credential_store::CredentialStore,
    error::Error as AuthError,
    jwt::{Grant, TokenKind},
    principal::Account,
};

use crate::prelude::*;
use crate::state::AppState;

/// What the API shows of an account. Never carries the secret hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountView {
    pub login: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub authorities: BTreeSet<String>,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            login: account.login.clone(),
            email: account.email.clone(),
            authorities: account.authorities(),
        }
    }
}

/// Verifies the submitted credentials and issues a login token.
///
/// Unknown logins and wrong secrets come back as the same error response.
pub fn login(request: &LoginRequest, state: &AppState) -> Result<LoginResponse> {
    let account = authenticate(request, state.store.as_ref(), &state.hasher)?;
    let issued = state.login_issuer.issue(
        &account.principal(),
        TokenKind::Access,
        state.login_ttl,
        &Grant::default(),
    )?;
    info!("Login {} authenticated", account.login);

    Ok(LoginResponse {
        login: account.login,
        token: issued.token,
    })
}

/// Registers a new account with a hashed secret.
///
/// Logins share a namespace with OAuth2 client ids, so a registered client id
/// is refused as taken.
pub fn register_account(new_account: NewAccount, state: &AppState) -> Result<AccountView> {
    let is_client_id = state.authorization_server.as_ref().is_some_and(|server| {
        server
            .clients
            .find_by_client_id(&new_account.login)
            .is_some()
    });
    if is_client_id {
        info!("Refused registration of client id {}", new_account.login);
        return Err(AuthError::LoginTaken.into());
    }

    let account = register(new_account, state.store.as_ref(), &state.hasher)?;
    info!("Registered account {}", account.login);
    Ok(AccountView::from(&account))
}

pub fn find_account(login: &str, state: &AppState) -> Result<AccountView> {
    state
        .store
        .find_by_login(login)?
        .as_ref()
        .map(AccountView::from)
        .ok_or(Error::AccountNotFound)
}
