//! Stored accounts and the principals built from them.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub const ROLE_ADMIN: &str = "ADMIN";
pub const ROLE_USER: &str = "USER";
/// Role given to accounts provisioned through social login.
pub const ROLE_OPERATOR: &str = "OPERADOR";

/// A principal record as held by a credential store.
///
/// The secret hash never leaves the process: it is skipped by `Debug` and
/// the web layer only ever serializes an account through its own view type.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique login identifier.
    pub login: String,
    /// PHC formatted secret hash.
    pub secret_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Set once someone other than the account holder vouched for `email`.
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub roles: BTreeSet<String>,
    /// Expands into `ADMIN` and `USER`.
    #[serde(default)]
    pub admin: bool,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("login", &self.login)
            .field("email", &self.email)
            .field("email_verified", &self.email_verified)
            .field("roles", &self.roles)
            .field("admin", &self.admin)
            .finish_non_exhaustive()
    }
}

impl Account {
    /// Granted authorities of this account.
    ///
    /// Explicit roles are kept, the admin flag adds `ADMIN` and `USER`, and an
    /// account left with nothing is a plain `USER`.
    ///
    /// ```rust
    /// use vigia_auth::principal::Account;
    ///
    /// let account = Account {
    ///     login: "fulano".into(),
    ///     secret_hash: String::new(),
    ///     email: None,
    ///     email_verified: false,
    ///     roles: Default::default(),
    ///     admin: true,
    /// };
    /// let authorities: Vec<_> = account.authorities().into_iter().collect();
    /// assert_eq!(authorities, ["ADMIN", "USER"]);
    /// ```
    pub fn authorities(&self) -> BTreeSet<String> {
        let mut authorities = self.roles.clone();
        if self.admin {
            authorities.insert(String::from(ROLE_ADMIN));
            authorities.insert(String::from(ROLE_USER));
        }
        if authorities.is_empty() {
            authorities.insert(String::from(ROLE_USER));
        }
        authorities
    }

    pub fn verified_email(&self) -> Option<&str> {
        self.email.as_deref().filter(|_| self.email_verified)
    }

    /// Builds the principal for this account.
    ///
    /// Accounts carrying a verified email get the extended variant, the
    /// others stay basic.
    pub fn principal(&self) -> Principal {
        let authorities = self.authorities();
        match self.verified_email() {
            Some(email) => Principal::Social {
                login: self.login.clone(),
                extra: PrincipalExtra {
                    email: String::from(email),
                    authorities,
                },
            },
            None => Principal::Basic {
                login: self.login.clone(),
                authorities,
            },
        }
    }
}

/// Extended attributes only some principals carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalExtra {
    pub email: String,
    pub authorities: BTreeSet<String>,
}

/// The identity a request or a token acts for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Principal {
    /// Login identifier and authorities only.
    Basic {
        login: String,
        authorities: BTreeSet<String>,
    },
    /// A principal with extended attributes, e.g. from social login.
    Social { login: String, extra: PrincipalExtra },
}

impl Principal {
    pub fn login(&self) -> &str {
        match self {
            Principal::Basic { login, .. } | Principal::Social { login, .. } => login,
        }
    }

    pub fn authorities(&self) -> &BTreeSet<String> {
        match self {
            Principal::Basic { authorities, .. } => authorities,
            Principal::Social { extra, .. } => &extra.authorities,
        }
    }

    pub fn email(&self) -> Option<&str> {
        match self {
            Principal::Basic { .. } => None,
            Principal::Social { extra, .. } => Some(&extra.email),
        }
    }
}
