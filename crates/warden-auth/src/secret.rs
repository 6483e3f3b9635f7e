//! Password alias resolution
//!
//! Configuration may reference a secret as `${ALIAS=name}` instead of
//! storing it inline.

use std::collections::BTreeMap;
use warden_core::{Error, Result};

const ALIAS_PREFIX: &str = "${ALIAS=";
const ALIAS_SUFFIX: &str = "}";
const ALIAS_ENV_PREFIX: &str = "WARDEN_ALIAS_";

/// Turns a configured password value into the real password
pub trait PasswordResolver: Send + Sync {
    fn resolve(&self, value: &str) -> Result<String>;
}

/// Alias name of `${ALIAS=name}`, if `value` has that form
pub fn alias_name(value: &str) -> Option<&str> {
    value
        .trim()
        .strip_prefix(ALIAS_PREFIX)
        .and_then(|rest| rest.strip_suffix(ALIAS_SUFFIX))
        .map(str::trim)
        .filter(|name| !name.is_empty())
}

/// Alias table with environment fallback
#[derive(Debug, Clone, Default)]
pub struct AliasStore {
    aliases: BTreeMap<String, String>,
    use_env: bool,
}

impl AliasStore {
    pub fn new(aliases: BTreeMap<String, String>) -> Self {
        Self {
            aliases,
            use_env: true,
        }
    }

    /// Table lookups only
    pub fn without_env(aliases: BTreeMap<String, String>) -> Self {
        Self {
            aliases,
            use_env: false,
        }
    }

    /// `ldap-bind.pw` -> `WARDEN_ALIAS_LDAP_BIND_PW`
    pub fn env_var_name(alias: &str) -> String {
        let name: String = alias
            .chars()
            .map(|c| match c {
                '-' | '.' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect();
        format!("{}{}", ALIAS_ENV_PREFIX, name)
    }
}

impl PasswordResolver for AliasStore {
    fn resolve(&self, value: &str) -> Result<String> {
        let alias = match alias_name(value) {
            Some(alias) => alias,
            None => return Ok(value.to_string()),
        };

        if let Some(password) = self.aliases.get(alias) {
            return Ok(password.clone());
        }

        if self.use_env {
            if let Ok(password) = std::env::var(Self::env_var_name(alias)) {
                return Ok(password);
            }
        }

        Err(Error::Config(format!("Unknown password alias: {}", alias)))
    }
}
