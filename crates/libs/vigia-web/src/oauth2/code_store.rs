//! One-time authorization codes.

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use chrono::{DateTime, TimeDelta, Utc};
use rand::{Rng, distributions::Alphanumeric};
use vigia_auth::principal::Principal;

/// Lifetime of an authorization code, in minutes.
pub const CODE_TTL_MINUTES: i64 = 5;
const CODE_LEN: usize = 32;

/// Expiry of a code issued at `now`.
pub fn code_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    now + TimeDelta::minutes(CODE_TTL_MINUTES)
}

/// What a code stands for until it is exchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAuthorization {
    pub client_id: String,
    pub redirect_uri: String,
    pub principal: Principal,
    pub scopes: BTreeSet<String>,
    pub expires_at: DateTime<Utc>,
}

/// Codes held in process memory. Each code can be taken exactly once.
#[derive(Debug, Default)]
pub struct CodeStore {
    codes: Mutex<HashMap<String, PendingAuthorization>>,
}

impl CodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a pending authorization and returns its fresh code.
    ///
    /// Expired codes are dropped on the way.
    pub fn insert(&self, pending: PendingAuthorization) -> String {
        let code: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(CODE_LEN)
            .map(char::from)
            .collect();
        let now = Utc::now();
        let mut codes = self.codes.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        codes.retain(|_, pending| pending.expires_at >= now);
        codes.insert(code.clone(), pending);
        code
    }

    /// Removes and returns the authorization behind `code` unless it expired.
    ///
    /// Expired codes are dropped here too.
    pub fn take(&self, code: &str, now: DateTime<Utc>) -> Option<PendingAuthorization> {
        let mut codes = self.codes.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let pending = codes
            .remove(code)
            .filter(|pending| pending.expires_at >= now);
        codes.retain(|_, pending| pending.expires_at >= now);
        pending
    }
}
