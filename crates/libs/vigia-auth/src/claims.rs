//! Principal specific claims added to access tokens.

use serde_json::{Map, Value};

use crate::jwt::TokenKind;
use crate::principal::Principal;

pub const AUTHORITIES_CLAIM: &str = "authorities";
pub const EMAIL_CLAIM: &str = "email";

/// Contributes extra claims for a principal and token kind.
///
/// Must be deterministic and side effect free: the output is signed together
/// with the rest of the token.
pub type ClaimsCustomizer = fn(&Principal, TokenKind) -> Map<String, Value>;

/// Default customizer of the authorization server.
///
/// Access tokens for principals with extended attributes get their
/// `authorities` (sorted) and `email`. Everything else gets nothing.
///
/// ```rust
/// use std::collections::BTreeSet;
/// use vigia_auth::claims::principal_claims;
/// use vigia_auth::jwt::TokenKind;
/// use vigia_auth::principal::{Principal, PrincipalExtra};
///
/// let principal = Principal::Social {
///     login: "fulano".into(),
///     extra: PrincipalExtra {
///         email: "fulano@mail.com".into(),
///         authorities: BTreeSet::from(["USER".to_string()]),
///     },
/// };
/// let claims = principal_claims(&principal, TokenKind::Access);
/// assert_eq!(claims["email"], "fulano@mail.com");
/// assert!(principal_claims(&principal, TokenKind::Refresh).is_empty());
/// ```
pub fn principal_claims(principal: &Principal, kind: TokenKind) -> Map<String, Value> {
    let mut claims = Map::new();
    match (principal, kind) {
        (Principal::Social { extra, .. }, TokenKind::Access) => {
            claims.insert(
                String::from(AUTHORITIES_CLAIM),
                Value::from_iter(extra.authorities.iter().cloned()),
            );
            claims.insert(String::from(EMAIL_CLAIM), Value::from(extra.email.clone()));
        }
        (Principal::Social { .. }, TokenKind::Refresh) | (Principal::Basic { .. }, _) => {}
    }
    claims
}
