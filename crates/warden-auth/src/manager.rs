//! Realm registry
//!
//! Realms are instantiated by class from their properties and looked up by
//! name. Instantiating a name that is already loaded returns the loaded
//! realm untouched.

use crate::ldap::LdapRealm;
use crate::realm::Realm;
use crate::secret::{AliasStore, PasswordResolver};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use warden_core::{Error, RealmProperties, Result, WardenConfig};

/// Builds a realm of one class
pub type RealmFactory =
    fn(&str, &RealmProperties, &dyn PasswordResolver) -> Result<Arc<dyn Realm>>;

/// Class name of the LDAP realm
pub const LDAP_REALM_CLASS: &str = "ldap";

/// Fully qualified class name accepted as an alias of [`LDAP_REALM_CLASS`]
pub const LDAP_REALM_CLASS_ALIAS: &str = "com.sun.enterprise.security.auth.realm.ldap.LDAPRealm";

fn ldap_factory(
    name: &str,
    props: &RealmProperties,
    passwords: &dyn PasswordResolver,
) -> Result<Arc<dyn Realm>> {
    Ok(Arc::new(LdapRealm::init(name, props, passwords)?))
}

pub struct RealmsManager {
    passwords: Arc<dyn PasswordResolver>,
    factories: HashMap<String, RealmFactory>,
    realms: RwLock<HashMap<String, Arc<dyn Realm>>>,
    default_realm: RwLock<Option<String>>,
}

impl RealmsManager {
    pub fn new(passwords: Arc<dyn PasswordResolver>) -> Self {
        let mut factories: HashMap<String, RealmFactory> = HashMap::new();
        factories.insert(LDAP_REALM_CLASS.to_string(), ldap_factory);
        factories.insert(LDAP_REALM_CLASS_ALIAS.to_string(), ldap_factory);

        Self {
            passwords,
            factories,
            realms: RwLock::new(HashMap::new()),
            default_realm: RwLock::new(None),
        }
    }

    /// Load every configured realm. Any realm failing to configure fails
    /// the whole load.
    pub fn from_config(config: &WardenConfig) -> Result<Self> {
        let manager = Self::new(Arc::new(AliasStore::new(config.aliases.clone())));

        for section in &config.realms {
            manager.instantiate(&section.name, &section.class, &section.properties)?;
        }

        let default = config
            .default_realm
            .clone()
            .or_else(|| config.realms.first().map(|r| r.name.clone()));
        if let Some(default) = default {
            manager.set_default_realm(&default)?;
        }

        Ok(manager)
    }

    /// Make `class` available to [`RealmsManager::instantiate`].
    pub fn register_factory(&mut self, class: impl Into<String>, factory: RealmFactory) {
        self.factories.insert(class.into(), factory);
    }

    pub fn instantiate(
        &self,
        name: &str,
        class: &str,
        props: &RealmProperties,
    ) -> Result<Arc<dyn Realm>> {
        if let Some(existing) = self.realms.read().get(name) {
            debug!("Realm {} already loaded", name);
            return Ok(Arc::clone(existing));
        }

        let factory = self
            .factories
            .get(class)
            .ok_or_else(|| Error::BadRealm(format!("Unknown realm class {} for {}", class, name)))?;
        let realm = factory(name, props, self.passwords.as_ref())?;

        // Another caller may have loaded the same name meanwhile; keep theirs.
        let mut realms = self.realms.write();
        let realm = Arc::clone(realms.entry(name.to_string()).or_insert(realm));
        info!("Realm {} of type {} loaded", name, realm.auth_type());
        Ok(realm)
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Realm>> {
        self.realms
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NoSuchRealm(name.to_string()))
    }

    /// The realm named by `name`, or the default realm when `name` is `None`.
    pub fn get_or_default(&self, name: Option<&str>) -> Result<Arc<dyn Realm>> {
        match name {
            Some(name) => self.get(name),
            None => match self.default_realm() {
                Some(default) => self.get(&default),
                None => Err(Error::NoSuchRealm("default".to_string())),
            },
        }
    }

    pub fn unload(&self, name: &str) -> Result<()> {
        self.realms
            .write()
            .remove(name)
            .ok_or_else(|| Error::NoSuchRealm(name.to_string()))?;

        let mut default = self.default_realm.write();
        if default.as_deref() == Some(name) {
            *default = None;
        }

        info!("Realm {} unloaded", name);
        Ok(())
    }

    pub fn realm_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.realms.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_valid_realm(&self, name: &str) -> bool {
        self.realms.read().contains_key(name)
    }

    pub fn default_realm(&self) -> Option<String> {
        self.default_realm.read().clone()
    }

    pub fn set_default_realm(&self, name: &str) -> Result<()> {
        if !self.is_valid_realm(name) {
            return Err(Error::NoSuchRealm(name.to_string()));
        }
        *self.default_realm.write() = Some(name.to_string());
        Ok(())
    }
}
