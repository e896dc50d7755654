//! Route access rules.
//!
//! Rules are checked in order and the first matching pattern wins. A pattern
//! is either an exact path or a `/prefix/**` wildcard that matches the prefix
//! itself and everything below it.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::prelude::*;

/// What happens to a route no rule matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultPolicy {
    #[default]
    Authenticated,
    Permit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRule {
    pub pattern: String,
    /// Any of these grants access. Empty means any authenticated principal.
    #[serde(default)]
    pub roles: BTreeSet<String>,
    /// Reachable without a principal.
    #[serde(default)]
    pub public: bool,
}

impl AccessRule {
    pub fn public(pattern: &str) -> Self {
        Self {
            pattern: String::from(pattern),
            roles: BTreeSet::new(),
            public: true,
        }
    }

    pub fn roles<'a>(pattern: &str, roles: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            pattern: String::from(pattern),
            roles: roles.into_iter().map(String::from).collect(),
            public: false,
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self.pattern.strip_suffix("/**") {
            Some(prefix) => {
                path == prefix
                    || path
                        .strip_prefix(prefix)
                        .is_some_and(|rest| rest.starts_with('/'))
            }
            None => path == self.pattern,
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.pattern.starts_with('/') {
            return Err(Error::InvalidRule(format!(
                "pattern '{}' must start with '/'",
                self.pattern
            )));
        }
        if self.pattern.trim_end_matches("/**").contains('*') {
            return Err(Error::InvalidRule(format!(
                "pattern '{}' may only end in '/**'",
                self.pattern
            )));
        }
        if self.public && !self.roles.is_empty() {
            return Err(Error::InvalidRule(format!(
                "pattern '{}' is public and role gated",
                self.pattern
            )));
        }
        Ok(())
    }
}

/// `[access]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessConfig {
    #[serde(default)]
    pub default: DefaultPolicy,
    #[serde(default)]
    pub rules: Vec<AccessRule>,
}

impl Default for AccessConfig {
    /// Login, registration and the authorization server endpoints are open,
    /// everything else needs a principal.
    fn default() -> Self {
        Self {
            default: DefaultPolicy::Authenticated,
            rules: vec![
                AccessRule::public("/v1/login"),
                AccessRule::public("/v1/users"),
                AccessRule::public("/oauth2/**"),
            ],
        }
    }
}

impl AccessConfig {
    pub fn validate(&self) -> Result<()> {
        self.rules.iter().try_for_each(AccessRule::validate)
    }

    /// First rule matching `path`.
    pub fn rule_for(&self, path: &str) -> Option<&AccessRule> {
        self.rules.iter().find(|rule| rule.matches(path))
    }
}
