//! Credential verification and account registration.

use serde::{Deserialize, Serialize};

use crate::auth_body::LoginRequest;
use crate::credential_store::CredentialStore;
use crate::prelude::*;
use crate::principal::Account;
use crate::secret_hash::SecretHasher;
use crate::social::login_from_email;

/// Authenticates submitted credentials against the credential store.
///
/// Returns [`Error::CredentialNotFound`] or [`Error::BadSecret`]; callers must
/// present both the same way. An unknown login still pays for one full hash
/// verification.
///
/// # Examples
///
/// ```rust
/// use vigia_auth::auth_body::LoginRequest;
/// use vigia_auth::authenticator::{NewAccount, authenticate, register};
/// use vigia_auth::credential_store::InMemoryCredentialStore;
/// use vigia_auth::secret_hash::{HashCost, SecretHasher};
///
/// let store = InMemoryCredentialStore::new();
/// let hasher = SecretHasher::new(HashCost::minimal()).unwrap();
/// register(NewAccount::new("fulano", "1234"), &store, &hasher).unwrap();
///
/// let request = LoginRequest { login: "fulano".into(), secret: "1234".into() };
/// let account = authenticate(&request, &store, &hasher).unwrap();
/// assert_eq!(account.login, "fulano");
/// ```
pub fn authenticate(
    credentials: &LoginRequest,
    store: &dyn CredentialStore,
    hasher: &SecretHasher,
) -> Result<Account> {
    let Some(account) = store.find_by_login(&credentials.login)? else {
        hasher.verify_decoy(&credentials.secret);
        return Err(Error::CredentialNotFound);
    };
    if !hasher.is_secret_valid(&credentials.secret, &account.secret_hash) {
        return Err(Error::BadSecret);
    }
    Ok(account)
}

/// Self service registration data.
#[derive(Clone, Deserialize, Serialize)]
pub struct NewAccount {
    pub login: String,
    pub secret: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl std::fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewAccount")
            .field("login", &self.login)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl NewAccount {
    pub fn new(login: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            secret: secret.into(),
            email: None,
        }
    }
}

/// Hashes the submitted secret and stores a plain user account.
///
/// Roles are never taken from the caller, and the submitted email is kept
/// unverified. A malformed email fails with [`Error::InvalidEmail`].
pub fn register(
    new_account: NewAccount,
    store: &dyn CredentialStore,
    hasher: &SecretHasher,
) -> Result<Account> {
    if let Some(email) = &new_account.email {
        login_from_email(email)?;
    }
    let account = Account {
        secret_hash: hasher.generate_secret_hash(&new_account.secret)?,
        login: new_account.login,
        email: new_account.email,
        email_verified: false,
        roles: Default::default(),
        admin: false,
    };
    store.save(account)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential_store::InMemoryCredentialStore;
    use crate::secret_hash::HashCost;

    fn setup() -> (InMemoryCredentialStore, SecretHasher) {
        let store = InMemoryCredentialStore::new();
        let hasher = SecretHasher::new(HashCost::minimal()).unwrap();
        register(NewAccount::new("fulano", "1234"), &store, &hasher).unwrap();
        (store, hasher)
    }

    fn request(login: &str, secret: &str) -> LoginRequest {
        LoginRequest {
            login: login.to_string(),
            secret: secret.to_string(),
        }
    }

    #[test]
    fn matching_secret_authenticates() {
        let (store, hasher) = setup();
        let account = authenticate(&request("fulano", "1234"), &store, &hasher).unwrap();
        assert_eq!(account.login, "fulano");
        assert_ne!(account.secret_hash, "1234");
    }

    #[test]
    fn failures_are_distinguished_internally_only() {
        let (store, hasher) = setup();

        let wrong = authenticate(&request("fulano", "4321"), &store, &hasher).unwrap_err();
        assert!(matches!(wrong, Error::BadSecret));
        assert!(wrong.is_invalid_credentials());

        let unknown = authenticate(&request("beltrano", "1234"), &store, &hasher).unwrap_err();
        assert!(matches!(unknown, Error::CredentialNotFound));
        assert!(unknown.is_invalid_credentials());
    }

    #[test]
    fn registration_never_grants_roles() {
        let (store, _) = setup();
        let account = store.find_by_login("fulano").unwrap().unwrap();
        assert!(account.roles.is_empty());
        assert!(!account.admin);
    }

    #[test]
    fn duplicate_registration_fails() {
        let (store, hasher) = setup();
        let result = register(NewAccount::new("fulano", "other"), &store, &hasher);
        assert!(matches!(result, Err(Error::LoginTaken)));
    }

    fn with_email(login: &str, email: &str) -> NewAccount {
        NewAccount {
            email: Some(String::from(email)),
            ..NewAccount::new(login, "1234")
        }
    }

    #[test]
    fn registered_email_is_checked_and_unverified() {
        let (store, hasher) = setup();
        for email in ["beltrano", "@mail.com", "beltrano@"] {
            assert!(matches!(
                register(with_email("beltrano", email), &store, &hasher),
                Err(Error::InvalidEmail)
            ));
        }

        let account = register(with_email("beltrano", "b@mail.com"), &store, &hasher).unwrap();
        assert!(!account.email_verified);
        assert_eq!(account.verified_email(), None);
    }

    #[test]
    fn email_can_only_be_registered_once() {
        let (store, hasher) = setup();
        register(with_email("beltrano", "b@mail.com"), &store, &hasher).unwrap();
        let result = register(with_email("mallory", "b@mail.com"), &store, &hasher);
        assert!(matches!(result, Err(Error::EmailTaken)));
    }
}
