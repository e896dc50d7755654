//! Credential store contract and the in-memory implementation.
//!
//! The core only ever looks accounts up; [`CredentialStore::save`] exists for
//! the registration and social provisioning paths.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::prelude::*;
use crate::principal::Account;

/// Lookup contract the core needs from wherever accounts live.
///
/// Implementations may block (e.g. a database round trip) but must not hold
/// any lock shared with other requests while doing so.
pub trait CredentialStore: Send + Sync {
    /// Finds an account by its login identifier.
    fn find_by_login(&self, login: &str) -> Result<Option<Account>>;

    /// Finds an account by email. Emails compare ASCII case-insensitively.
    fn find_by_email(&self, email: &str) -> Result<Option<Account>>;

    /// Stores a new account.
    ///
    /// Fails with [`Error::LoginTaken`] or [`Error::EmailTaken`] when another
    /// account already holds the login or the email.
    fn save(&self, account: Account) -> Result<Account>;
}

/// Accounts kept in a process local map.
///
/// Lookups share a read lock; only `save` takes the write side.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    accounts: RwLock<HashMap<String, Account>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store seeded with the given accounts.
    ///
    /// Later duplicates of a login are rejected like in [`CredentialStore::save`].
    pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Result<Self> {
        let store = Self::new();
        for account in accounts {
            store.save(account)?;
        }
        Ok(store)
    }
}

fn same_email(account: &Account, email: &str) -> bool {
    account
        .email
        .as_deref()
        .is_some_and(|stored| stored.eq_ignore_ascii_case(email))
}

impl CredentialStore for InMemoryCredentialStore {
    fn find_by_login(&self, login: &str) -> Result<Option<Account>> {
        let accounts = self.accounts.read().map_err(|_| Error::StoreUnavailable)?;
        Ok(accounts.get(login).cloned())
    }

    fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let accounts = self.accounts.read().map_err(|_| Error::StoreUnavailable)?;
        Ok(accounts
            .values()
            .find(|account| same_email(account, email))
            .cloned())
    }

    fn save(&self, account: Account) -> Result<Account> {
        let mut accounts = self.accounts.write().map_err(|_| Error::StoreUnavailable)?;
        if accounts.contains_key(&account.login) {
            return Err(Error::LoginTaken);
        }
        let email_taken = account
            .email
            .as_deref()
            .is_some_and(|email| accounts.values().any(|other| same_email(other, email)));
        if email_taken {
            return Err(Error::EmailTaken);
        }
        tracing::debug!("Storing account {}", account.login);
        accounts.insert(account.login.clone(), account.clone());
        Ok(account)
    }
}
