//! LDAP realm
//!
//! find-bind authentication: search the user's DN with the search identity,
//! bind as that DN to check the password, then collect group memberships over
//! the search session. Groups of successful logins are cached per user.

use crate::groups::GroupPolicy;
use crate::ldap::cache::GroupCache;
use crate::ldap::config::LdapRealmConfig;
use crate::ldap::connection::LdapConnector;
use crate::ldap::directory::{DirectoryConnector, DirectorySession};
use crate::ldap::dn;
use crate::ldap::filter::rfc2254_encode;
use crate::ldap::groups::GroupResolver;
use crate::ldap::resolver::{resolve_user, verify, BindOutcome, UserLookup};
use crate::realm::Realm;
use crate::secret::PasswordResolver;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use warden_core::{LoginFailure, RealmProperties, Result, PARAM_ASSIGN_GROUPS, PARAM_GROUP_MAPPING};

/// Authentication type reported by LDAP realms
pub const AUTH_TYPE: &str = "ldap";

/// Directory reachability and cache figures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealmStatus {
    pub name: String,
    pub auth_type: String,
    pub directory: String,
    pub connected: bool,
    pub vendor: Option<String>,
    pub naming_contexts: Vec<String>,
    pub pooled: bool,
    pub pool_size: u32,
    pub cached_users: usize,
    pub checked_at: String,
    pub error: Option<String>,
}

pub struct LdapRealm {
    name: String,
    config: LdapRealmConfig,
    effective: RealmProperties,
    policy: GroupPolicy,
    connector: Arc<dyn DirectoryConnector>,
    cache: GroupCache,
}

impl LdapRealm {
    /// Configure a realm backed by the `ldap3` connector.
    ///
    /// Configuration problems fail here, before any connection exists.
    pub fn init(
        name: impl Into<String>,
        props: &RealmProperties,
        passwords: &dyn PasswordResolver,
    ) -> Result<Self> {
        let config = LdapRealmConfig::from_properties(props, passwords)?;
        let connector = Arc::new(LdapConnector::new(&config));
        Self::build(name.into(), props, config, connector)
    }

    /// Configure a realm over a caller-supplied connector.
    pub fn init_with_connector(
        name: impl Into<String>,
        props: &RealmProperties,
        passwords: &dyn PasswordResolver,
        connector: Arc<dyn DirectoryConnector>,
    ) -> Result<Self> {
        let config = LdapRealmConfig::from_properties(props, passwords)?;
        Self::build(name.into(), props, config, connector)
    }

    fn build(
        name: String,
        props: &RealmProperties,
        config: LdapRealmConfig,
        connector: Arc<dyn DirectoryConnector>,
    ) -> Result<Self> {
        let policy = GroupPolicy::from_properties(props)?;

        let mut effective = config.effective_properties();
        for param in [PARAM_ASSIGN_GROUPS, PARAM_GROUP_MAPPING] {
            if let Some(value) = props.get(param) {
                effective.set(param, value);
            }
        }

        info!("LDAP realm {} configured for {}", name, config.directory);

        Ok(Self {
            name,
            config,
            effective,
            policy,
            connector,
            cache: GroupCache::new(),
        })
    }

    pub fn config(&self) -> &LdapRealmConfig {
        &self.config
    }

    pub fn cached_users(&self) -> usize {
        self.cache.len()
    }

    /// Authenticate `username` and return its groups, assigned and mapped
    /// groups included. The result is cached for [`LdapRealm::group_names`].
    pub async fn find_and_bind(&self, username: &str, password: &str) -> Result<Vec<String>> {
        let name = rfc2254_encode(username).into_owned();

        let mut session = match self.connector.search_session().await {
            Ok(session) => session,
            Err(e) => {
                error!("LDAP login for {} failed: {}", name, e);
                return Err(LoginFailure::Directory(e.to_string()).into());
            }
        };

        let result = self.find_and_bind_in(session.as_mut(), &name, password).await;
        session.close().await;

        let groups = match result {
            Ok(groups) => groups,
            Err(failure) => {
                error!("LDAP login for {} failed: {}", name, failure);
                return Err(failure.into());
            }
        };

        let groups = self.policy.apply(groups);
        self.cache.record(&name, groups.clone());

        debug!("LDAP: login succeeded for: {}", name);
        Ok(groups)
    }

    async fn find_and_bind_in(
        &self,
        session: &mut dyn DirectorySession,
        name: &str,
        password: &str,
    ) -> std::result::Result<Vec<String>, LoginFailure> {
        let filter = self.config.search_filter.expand(name, None);

        let user_dn = match resolve_user(session, &self.config.base_dn, &filter).await {
            UserLookup::Found(dn) => dn,
            UserLookup::NotFound => return Err(LoginFailure::UserNotFound(name.to_string())),
            // Search errors were logged by the resolver and count as not found.
            UserLookup::DirectoryError(_) => {
                return Err(LoginFailure::UserNotFound(name.to_string()))
            }
        };

        match verify(self.connector.as_ref(), &user_dn, password).await {
            BindOutcome::Bound => {}
            BindOutcome::Rejected(_) | BindOutcome::DirectoryError(_) => {
                return Err(LoginFailure::BindFailed(user_dn))
            }
        }

        Ok(GroupResolver::new(&self.config)
            .resolve(session, name, &user_dn)
            .await)
    }

    /// Groups of `username` without credentials.
    ///
    /// Cached groups of the last successful login are returned as they are.
    /// Otherwise `username` is taken as a user DN and the group searches run
    /// for it; nothing is cached and no mapping is applied. Any directory
    /// trouble yields an empty list.
    pub async fn group_names(&self, username: &str) -> Vec<String> {
        let key = rfc2254_encode(username);
        if let Some(groups) = self.cache.lookup(&key) {
            return groups;
        }

        match self.groups_for_dn(username).await {
            Some(groups) => groups,
            None => {
                debug!("No groups available for: {}", username);
                Vec::new()
            }
        }
    }

    async fn groups_for_dn(&self, user_dn: &str) -> Option<Vec<String>> {
        let short_name = short_name(user_dn);
        let name = rfc2254_encode(&short_name);

        let mut session = match self.connector.search_session().await {
            Ok(session) => session,
            Err(e) => {
                warn!("LDAP group search for {} failed: {}", user_dn, e);
                return None;
            }
        };

        let groups = GroupResolver::new(&self.config)
            .resolve(session.as_mut(), &name, user_dn)
            .await;
        session.close().await;

        Some(groups)
    }

    /// Probe the directory with a root DSE read.
    pub async fn status(&self) -> RealmStatus {
        let (connected, vendor, naming_contexts, error) = match self.connector.root_dse().await {
            Ok(entry) => (
                true,
                entry.first_value("vendorName").map(str::to_string),
                entry.values("namingContexts").to_vec(),
                None,
            ),
            Err(e) => (false, None, Vec::new(), Some(e.to_string())),
        };

        RealmStatus {
            name: self.name.clone(),
            auth_type: AUTH_TYPE.to_string(),
            directory: self.config.directory.clone(),
            connected,
            vendor,
            naming_contexts,
            pooled: self.config.pool.enabled,
            pool_size: self.config.pool.max_size,
            cached_users: self.cache.len(),
            checked_at: chrono::Utc::now().to_rfc3339(),
            error,
        }
    }
}

/// Login name hidden in a user DN: the `cn`, else the `uid`, else the input
/// itself when it is no DN at all.
fn short_name(user_dn: &str) -> String {
    match dn::first_rdn_value(user_dn, "cn") {
        Ok(Some(cn)) => cn,
        Ok(None) => dn::first_rdn_value(user_dn, "uid")
            .ok()
            .flatten()
            .unwrap_or_else(|| user_dn.to_string()),
        Err(_) => user_dn.to_string(),
    }
}

#[async_trait]
impl Realm for LdapRealm {
    fn name(&self) -> &str {
        &self.name
    }

    fn auth_type(&self) -> &'static str {
        AUTH_TYPE
    }

    fn property(&self, name: &str) -> Option<String> {
        self.effective.get(name).map(str::to_string)
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<Vec<String>> {
        self.find_and_bind(username, password).await
    }

    async fn group_names(&self, username: &str) -> Result<Vec<String>> {
        Ok(LdapRealm::group_names(self, username).await)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
