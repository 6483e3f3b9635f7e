//! Realm property bag
//!
//! Realms receive their configuration as flat string properties
//! (`directory`, `base-dn`, `group-mapping`, ...). Each realm reads what it
//! understands and records the effective values it ends up using.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered string properties for a single realm
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RealmProperties {
    entries: BTreeMap<String, String>,
}

impl RealmProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(|s| s.as_str())
    }

    pub fn get_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.get(name).unwrap_or(default)
    }

    /// Boolean property; accepts `true`/`false` in any case, anything else
    /// yields `default`.
    pub fn get_bool(&self, name: &str, default: bool) -> bool {
        match self.get(name).map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "true" => true,
            Some(v) if v == "false" => false,
            _ => default,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RealmProperties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_with_default() {
        let props = RealmProperties::new().with("base-dn", "dc=example,dc=com");

        assert_eq!(props.get("base-dn"), Some("dc=example,dc=com"));
        assert_eq!(props.get_or("group-target", "cn"), "cn");
        assert!(props.get("directory").is_none());
    }

    #[test]
    fn test_get_bool() {
        let props: RealmProperties = [("a", "TRUE"), ("b", "false"), ("c", "yes")]
            .into_iter()
            .collect();

        assert!(props.get_bool("a", false));
        assert!(!props.get_bool("b", true));
        assert!(props.get_bool("c", true));
        assert!(!props.get_bool("missing", false));
    }

    #[test]
    fn test_toml_table_roundtrip() {
        let props: RealmProperties =
            toml::from_str("directory = \"ldap://localhost:389\"\n\"base-dn\" = \"dc=x\"\n").unwrap();

        assert_eq!(props.len(), 2);
        assert_eq!(props.get("directory"), Some("ldap://localhost:389"));
    }
}
