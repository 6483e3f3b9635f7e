//! Configuration for Warden

use crate::properties::RealmProperties;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WardenConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Realm used when a caller does not name one
    #[serde(default)]
    pub default_realm: Option<String>,

    #[serde(default)]
    pub realms: Vec<RealmSection>,

    /// Password alias table, referenced as `${ALIAS=name}`
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

impl WardenConfig {
    pub fn from_file(path: &str) -> crate::Result<Self> {
        debug!("Reading configuration from {}", path);
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> crate::Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        debug!("Configured realms: {}", config.realms.len());
        Ok(config)
    }

    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(level) = std::env::var("WARDEN_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(realm) = std::env::var("WARDEN_DEFAULT_REALM") {
            config.default_realm = Some(realm);
        }

        config
    }

    /// Realm names must be unique and the default realm, when set, must exist.
    pub fn validate(&self) -> crate::Result<()> {
        let mut seen = Vec::with_capacity(self.realms.len());
        for realm in &self.realms {
            if realm.name.is_empty() {
                return Err(crate::Error::Config("Realm name is required".to_string()));
            }
            if seen.contains(&realm.name.as_str()) {
                return Err(crate::Error::Config(format!(
                    "Duplicate realm name: {}",
                    realm.name
                )));
            }
            seen.push(realm.name.as_str());
        }

        if let Some(default) = &self.default_realm {
            if !self.realms.is_empty() && !seen.contains(&default.as_str()) {
                return Err(crate::Error::Config(format!(
                    "Default realm {} is not configured",
                    default
                )));
            }
        }

        Ok(())
    }

    pub fn realm(&self, name: &str) -> Option<&RealmSection> {
        self.realms.iter().find(|r| r.name == name)
    }
}

/// One `[[realms]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealmSection {
    pub name: String,

    /// Realm implementation, e.g. `ldap`
    #[serde(default = "default_realm_class")]
    pub class: String,

    #[serde(default)]
    pub properties: RealmProperties,
}

fn default_realm_class() -> String {
    "ldap".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
