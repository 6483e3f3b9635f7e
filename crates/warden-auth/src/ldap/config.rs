//! LDAP realm configuration
//!
//! Built once from realm properties and frozen afterwards. Supports:
//! - find-bind mode (the only mode)
//! - anonymous or service-account search binds
//! - static and dynamic group searches
//! - per-realm connection pooling
//! - LDAPS / STARTTLS transport

use crate::ldap::filter::FilterTemplate;
use crate::secret::PasswordResolver;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;
use warden_core::{Error, RealmProperties, Result, JAAS_CONTEXT_PARAM};

// ============================================================================
// Property names
// ============================================================================

pub const PARAM_DIRURL: &str = "directory";
pub const PARAM_USERDN: &str = "base-dn";
pub const PARAM_SEARCH_FILTER: &str = "search-filter";
pub const PARAM_GRPDN: &str = "group-base-dn";
pub const PARAM_GRP_SEARCH_FILTER: &str = "group-search-filter";
pub const PARAM_GRP_TARGET: &str = "group-target";
pub const PARAM_DYNAMIC_GRP_FILTER: &str = "dynamic-group-search-filter";
pub const PARAM_DYNAMIC_GRP_TARGET: &str = "dynamic-group-target";
pub const PARAM_MODE: &str = "mode";
pub const PARAM_JNDICF: &str = "jndiCtxFactory";
pub const PARAM_POOLSIZE: &str = "pool-size";
pub const PARAM_POOL: &str = "connect-pool";
pub const PARAM_BINDDN: &str = "search-bind-dn";
pub const PARAM_BINDPWD: &str = "search-bind-password";
pub const PARAM_START_TLS: &str = "start-tls";
pub const PARAM_SKIP_TLS_VERIFY: &str = "skip-tls-verify";
pub const PARAM_CONNECT_TIMEOUT: &str = "connect-timeout";

pub const MODE_FIND_BIND: &str = "find-bind";

const SEARCH_FILTER_DEFAULT: &str = "uid=%s";
const GRP_SEARCH_FILTER_DEFAULT: &str = "uniquemember=%d";
const GRP_TARGET_DEFAULT: &str = "cn";
const DYNAMIC_GRP_TARGET_DEFAULT: &str = "ismemberof";
const JNDICF_DEFAULT: &str = "com.sun.jndi.ldap.LdapCtxFactory";
const POOLSIZE_DEFAULT: u32 = 5;

const LDAPS_SCHEME: &str = "ldaps";
const LDAP_SCHEME: &str = "ldap";

// ============================================================================
// Configuration
// ============================================================================

/// Connection pooling for the realm's search sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub enabled: bool,
    pub max_size: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size: POOLSIZE_DEFAULT,
        }
    }
}

/// Transport security
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TlsSettings {
    /// `ldaps://` URL
    pub secure: bool,
    pub start_tls: bool,
    pub skip_verify: bool,
}

/// Frozen configuration of one LDAP realm
#[derive(Clone)]
pub struct LdapRealmConfig {
    pub directory: String,
    pub base_dn: String,
    pub jaas_context: String,
    pub search_filter: FilterTemplate,
    pub group_base_dn: String,
    pub group_search_filter: FilterTemplate,
    pub group_target: String,
    pub dynamic_group_search_filter: FilterTemplate,
    pub dynamic_group_target: String,
    pub mode: String,
    pub context_factory: String,
    pub search_bind_dn: Option<String>,
    pub search_bind_password: Option<String>,
    pub pool: PoolConfig,
    pub tls: TlsSettings,
    pub connect_timeout: Option<Duration>,
}

impl fmt::Debug for LdapRealmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LdapRealmConfig")
            .field("directory", &self.directory)
            .field("base_dn", &self.base_dn)
            .field("jaas_context", &self.jaas_context)
            .field("search_filter", &self.search_filter.as_str())
            .field("group_base_dn", &self.group_base_dn)
            .field("group_search_filter", &self.group_search_filter.as_str())
            .field("group_target", &self.group_target)
            .field(
                "dynamic_group_search_filter",
                &self.dynamic_group_search_filter.as_str(),
            )
            .field("dynamic_group_target", &self.dynamic_group_target)
            .field("mode", &self.mode)
            .field("context_factory", &self.context_factory)
            .field("search_bind_dn", &self.search_bind_dn)
            .field(
                "search_bind_password",
                &self.search_bind_password.as_ref().map(|_| "<redacted>"),
            )
            .field("pool", &self.pool)
            .field("tls", &self.tls)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl LdapRealmConfig {
    /// Validate `props` and apply defaults.
    ///
    /// Fails with [`Error::BadRealm`] when `directory`, `base-dn` or
    /// `jaas-ctx` is missing or the mode is not `find-bind`.
    pub fn from_properties(
        props: &RealmProperties,
        passwords: &dyn PasswordResolver,
    ) -> Result<Self> {
        let url = props.get(PARAM_DIRURL);
        let dn = props.get(PARAM_USERDN);
        let jaas_ctx = props.get(JAAS_CONTEXT_PARAM);

        let (directory, base_dn, jaas_context) = match (url, dn, jaas_ctx) {
            (Some(url), Some(dn), Some(ctx)) => (url.to_string(), dn.to_string(), ctx.to_string()),
            _ => {
                return Err(Error::BadRealm(format!(
                    "Incomplete configuration of ldap realm: url: {} baseDN: {} login module: {}",
                    url.unwrap_or("null"),
                    dn.unwrap_or("null"),
                    jaas_ctx.unwrap_or("null")
                )))
            }
        };

        let mode = props.get_or(PARAM_MODE, MODE_FIND_BIND).to_string();
        if mode != MODE_FIND_BIND {
            return Err(Error::BadRealm(format!("Unsupported mode {}.", mode)));
        }

        let tls = Self::tls_settings(&directory, props)?;

        let search_bind_password = props.get(PARAM_BINDPWD).map(|raw| {
            passwords.resolve(raw).unwrap_or_else(|e| {
                warn!("De-aliasing of {} failed: {}", PARAM_BINDPWD, e);
                raw.to_string()
            })
        });

        let pool = PoolConfig {
            enabled: props.get_bool(PARAM_POOL, true),
            max_size: Self::pool_size(props),
        };

        let connect_timeout = match props.get(PARAM_CONNECT_TIMEOUT) {
            Some(v) => Some(Duration::from_secs(v.trim().parse().map_err(|_| {
                Error::BadRealm(format!("Invalid {}: {}", PARAM_CONNECT_TIMEOUT, v))
            })?)),
            None => None,
        };

        let config = Self {
            group_base_dn: props.get_or(PARAM_GRPDN, &base_dn).to_string(),
            directory,
            base_dn,
            jaas_context,
            search_filter: FilterTemplate::new(props.get_or(PARAM_SEARCH_FILTER, SEARCH_FILTER_DEFAULT)),
            group_search_filter: FilterTemplate::new(
                props.get_or(PARAM_GRP_SEARCH_FILTER, GRP_SEARCH_FILTER_DEFAULT),
            ),
            group_target: props.get_or(PARAM_GRP_TARGET, GRP_TARGET_DEFAULT).to_string(),
            dynamic_group_search_filter: FilterTemplate::new(
                props.get_or(PARAM_DYNAMIC_GRP_FILTER, SEARCH_FILTER_DEFAULT),
            ),
            dynamic_group_target: props
                .get_or(PARAM_DYNAMIC_GRP_TARGET, DYNAMIC_GRP_TARGET_DEFAULT)
                .to_string(),
            mode,
            context_factory: props.get_or(PARAM_JNDICF, JNDICF_DEFAULT).to_string(),
            search_bind_dn: props.get(PARAM_BINDDN).map(str::to_string),
            search_bind_password,
            pool,
            tls,
            connect_timeout,
        };

        debug!("LDAPRealm : {:?}", config);
        Ok(config)
    }

    fn tls_settings(directory: &str, props: &RealmProperties) -> Result<TlsSettings> {
        let url = Url::parse(directory)
            .map_err(|e| Error::BadRealm(format!("Invalid directory URL {}: {}", directory, e)))?;

        let secure = match url.scheme() {
            LDAPS_SCHEME => true,
            LDAP_SCHEME => false,
            other => {
                return Err(Error::BadRealm(format!(
                    "Directory URL must start with ldap:// or ldaps://, got {}://",
                    other
                )))
            }
        };

        if secure {
            debug!("LDAPRealm : Using TLS transport for {}", directory);
        }

        Ok(TlsSettings {
            secure,
            start_tls: props.get_bool(PARAM_START_TLS, false),
            skip_verify: props.get_bool(PARAM_SKIP_TLS_VERIFY, false),
        })
    }

    /// Positive integer or the default
    fn pool_size(props: &RealmProperties) -> u32 {
        match props.get(PARAM_POOLSIZE) {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(size) if size > 0 => size,
                _ => {
                    warn!(
                        "Ignoring invalid {} {:?}, using {}",
                        PARAM_POOLSIZE, raw, POOLSIZE_DEFAULT
                    );
                    POOLSIZE_DEFAULT
                }
            },
            None => POOLSIZE_DEFAULT,
        }
    }

    /// Effective values of every property this realm understands.
    /// The bind password is never included.
    pub fn effective_properties(&self) -> RealmProperties {
        let mut props = RealmProperties::new()
            .with(PARAM_DIRURL, &self.directory)
            .with(PARAM_USERDN, &self.base_dn)
            .with(JAAS_CONTEXT_PARAM, &self.jaas_context)
            .with(PARAM_MODE, &self.mode)
            .with(PARAM_JNDICF, &self.context_factory)
            .with(PARAM_SEARCH_FILTER, self.search_filter.as_str())
            .with(PARAM_GRPDN, &self.group_base_dn)
            .with(PARAM_GRP_SEARCH_FILTER, self.group_search_filter.as_str())
            .with(PARAM_DYNAMIC_GRP_FILTER, self.dynamic_group_search_filter.as_str())
            .with(PARAM_GRP_TARGET, &self.group_target)
            .with(PARAM_DYNAMIC_GRP_TARGET, &self.dynamic_group_target)
            .with(PARAM_POOLSIZE, self.pool.max_size.to_string())
            .with(PARAM_POOL, self.pool.enabled.to_string())
            .with(PARAM_START_TLS, self.tls.start_tls.to_string())
            .with(PARAM_SKIP_TLS_VERIFY, self.tls.skip_verify.to_string());

        if let Some(bind_dn) = &self.search_bind_dn {
            props.set(PARAM_BINDDN, bind_dn);
        }
        if let Some(timeout) = self.connect_timeout {
            props.set(PARAM_CONNECT_TIMEOUT, timeout.as_secs().to_string());
        }
        props
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::AliasStore;
    use std::collections::BTreeMap;

    fn minimal() -> RealmProperties {
        RealmProperties::new()
            .with(PARAM_DIRURL, "ldap://ldap.example.com:389")
            .with(PARAM_USERDN, "ou=people,dc=example,dc=com")
            .with(JAAS_CONTEXT_PARAM, "ldapRealm")
    }

    #[test]
    fn test_defaults_applied() {
        let config = LdapRealmConfig::from_properties(&minimal(), &AliasStore::default()).unwrap();

        assert_eq!(config.search_filter.as_str(), "uid=%s");
        assert_eq!(config.group_base_dn, "ou=people,dc=example,dc=com");
        assert_eq!(config.group_search_filter.as_str(), "uniquemember=%d");
        assert_eq!(config.dynamic_group_search_filter.as_str(), "uid=%s");
        assert_eq!(config.group_target, "cn");
        assert_eq!(config.dynamic_group_target, "ismemberof");
        assert_eq!(config.mode, MODE_FIND_BIND);
        assert_eq!(config.pool, PoolConfig::default());
        assert!(!config.tls.secure);
        assert!(config.search_bind_dn.is_none());
    }

    #[test]
    fn test_missing_required_property() {
        for missing in [PARAM_DIRURL, PARAM_USERDN, JAAS_CONTEXT_PARAM] {
            let mut props = minimal();
            props.remove(missing);

            let err = LdapRealmConfig::from_properties(&props, &AliasStore::default()).unwrap_err();
            assert!(matches!(err, Error::BadRealm(_)), "missing {}", missing);
            assert!(err.to_string().contains("Incomplete configuration"));
        }
    }

    #[test]
    fn test_unsupported_mode() {
        let props = minimal().with(PARAM_MODE, "bind-only");
        let err = LdapRealmConfig::from_properties(&props, &AliasStore::default()).unwrap_err();

        assert!(matches!(err, Error::BadRealm(ref m) if m == "Unsupported mode bind-only."));
    }

    #[test]
    fn test_invalid_scheme() {
        let props = minimal().with(PARAM_DIRURL, "http://ldap.example.com");
        assert!(LdapRealmConfig::from_properties(&props, &AliasStore::default()).is_err());
    }

    #[test]
    fn test_ldaps_and_pool_settings() {
        let props = minimal()
            .with(PARAM_DIRURL, "ldaps://ldap.example.com:636")
            .with(PARAM_POOLSIZE, "12")
            .with(PARAM_POOL, "false");
        let config = LdapRealmConfig::from_properties(&props, &AliasStore::default()).unwrap();

        assert!(config.tls.secure);
        assert_eq!(
            config.pool,
            PoolConfig {
                enabled: false,
                max_size: 12
            }
        );
    }

    #[test]
    fn test_invalid_pool_size_falls_back() {
        for raw in ["zero", "0", "-3"] {
            let props = minimal().with(PARAM_POOLSIZE, raw);
            let config = LdapRealmConfig::from_properties(&props, &AliasStore::default()).unwrap();
            assert_eq!(config.pool.max_size, POOLSIZE_DEFAULT);
        }
    }

    #[test]
    fn test_bind_password_dealiased() {
        let mut aliases = BTreeMap::new();
        aliases.insert("ldap-bind".to_string(), "s3cret".to_string());
        let props = minimal()
            .with(PARAM_BINDDN, "cn=search,dc=example,dc=com")
            .with(PARAM_BINDPWD, "${ALIAS=ldap-bind}");

        let config =
            LdapRealmConfig::from_properties(&props, &AliasStore::without_env(aliases)).unwrap();

        assert_eq!(config.search_bind_password.as_deref(), Some("s3cret"));
        assert!(!format!("{:?}", config).contains("s3cret"));
    }

    #[test]
    fn test_unknown_alias_kept_verbatim() {
        let props = minimal().with(PARAM_BINDPWD, "${ALIAS=missing}");
        let config = LdapRealmConfig::from_properties(
            &props,
            &AliasStore::without_env(BTreeMap::new()),
        )
        .unwrap();

        assert_eq!(config.search_bind_password.as_deref(), Some("${ALIAS=missing}"));
    }

    #[test]
    fn test_effective_properties_hide_password() {
        let props = minimal().with(PARAM_BINDPWD, "s3cret");
        let config = LdapRealmConfig::from_properties(&props, &AliasStore::default()).unwrap();
        let effective = config.effective_properties();

        assert_eq!(effective.get(PARAM_GRP_TARGET), Some("cn"));
        assert_eq!(effective.get(PARAM_POOLSIZE), Some("5"));
        assert!(effective.get(PARAM_BINDPWD).is_none());
    }
}
