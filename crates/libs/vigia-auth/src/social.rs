//! Minimal social login hook.
//!
//! Called once an upstream identity provider has vouched for an email
//! address. The account behind that email is reused, or provisioned on first
//! sight, and handed back as a principal with extended attributes. Accounts
//! that merely claim the email are never linked.

use std::collections::BTreeSet;

use rand::{Rng, distributions::Alphanumeric};

use crate::credential_store::CredentialStore;
use crate::prelude::*;
use crate::principal::{Account, Principal, PrincipalExtra, ROLE_OPERATOR};
use crate::secret_hash::SecretHasher;

const GENERATED_SECRET_LEN: usize = 32;

/// Resolves an upstream verified email into a social principal.
pub fn on_social_login(
    email: &str,
    store: &dyn CredentialStore,
    hasher: &SecretHasher,
) -> Result<Principal> {
    let account = match store.find_by_email(email)? {
        Some(account) if account.email_verified => account,
        Some(account) => {
            tracing::warn!(
                "Social login for {email} refused: account {} holds it unverified",
                account.login
            );
            return Err(Error::EmailTaken);
        }
        None => provision(email, store, hasher)?,
    };

    Ok(Principal::Social {
        login: account.login.clone(),
        extra: PrincipalExtra {
            email: String::from(email),
            authorities: account.authorities(),
        },
    })
}

fn provision(email: &str, store: &dyn CredentialStore, hasher: &SecretHasher) -> Result<Account> {
    let login = login_from_email(email)?;
    // Nobody knows this secret; password login stays impossible until reset.
    let secret: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_SECRET_LEN)
        .map(char::from)
        .collect();

    tracing::info!("Provisioning account {login} from social login");
    store.save(Account {
        login,
        secret_hash: hasher.generate_secret_hash(&secret)?,
        email: Some(String::from(email)),
        email_verified: true,
        roles: BTreeSet::from([String::from(ROLE_OPERATOR)]),
        admin: false,
    })
}

/// Local part of `email`. Refuses anything without both sides of the `@`.
pub(crate) fn login_from_email(email: &str) -> Result<String> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(local.to_string()),
        _ => Err(Error::InvalidEmail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authenticator::{NewAccount, register};
    use crate::credential_store::InMemoryCredentialStore;
    use crate::secret_hash::HashCost;

    fn hasher() -> SecretHasher {
        SecretHasher::new(HashCost::minimal()).unwrap()
    }

    #[test]
    fn first_login_provisions_an_operator() -> Result<()> {
        let store = InMemoryCredentialStore::new();
        let principal = on_social_login("fulano@gmail.com", &store, &hasher())?;

        assert_eq!(principal.login(), "fulano");
        assert_eq!(principal.email(), Some("fulano@gmail.com"));
        assert_eq!(
            principal.authorities(),
            &BTreeSet::from([String::from(ROLE_OPERATOR)])
        );

        let stored = store.find_by_login("fulano")?.unwrap();
        assert_eq!(stored.email.as_deref(), Some("fulano@gmail.com"));
        Ok(())
    }

    #[test]
    fn existing_account_is_reused() -> Result<()> {
        let store = InMemoryCredentialStore::with_accounts([Account {
            login: String::from("ciclano"),
            secret_hash: String::new(),
            email: Some(String::from("c@mail.com")),
            email_verified: true,
            roles: Default::default(),
            admin: true,
        }])?;
        let principal = on_social_login("c@mail.com", &store, &hasher())?;
        assert_eq!(principal.login(), "ciclano");
        assert!(principal.authorities().contains("ADMIN"));
        Ok(())
    }

    #[test]
    fn self_claimed_email_is_not_linked() -> Result<()> {
        let store = InMemoryCredentialStore::new();
        let hasher = hasher();
        register(
            NewAccount {
                email: Some(String::from("victim@gmail.com")),
                ..NewAccount::new("mallory", "1234")
            },
            &store,
            &hasher,
        )?;

        assert!(matches!(
            on_social_login("victim@gmail.com", &store, &hasher),
            Err(Error::EmailTaken)
        ));
        assert!(store.find_by_login("victim")?.is_none());
        Ok(())
    }

    #[test]
    fn email_without_local_part_is_refused() {
        let store = InMemoryCredentialStore::new();
        for email in ["", "fulano", "@mail.com", "fulano@"] {
            assert!(matches!(
                on_social_login(email, &store, &hasher()),
                Err(Error::InvalidEmail)
            ));
        }
    }
}
