//! LDAP connections over `ldap3`
//!
//! Search sessions are bound as the realm's search identity and, when pooling
//! is enabled, reused through a per-realm `bb8` pool. Credential binds always
//! use a dedicated connection that is unbound right away.

use crate::ldap::config::LdapRealmConfig;
use crate::ldap::directory::{
    DirectoryConnector, DirectoryEntry, DirectoryError, DirectorySession, SearchRequest,
    RC_SIZE_LIMIT_EXCEEDED,
};
use async_trait::async_trait;
use bb8::{ErrorSink, ManageConnection, Pool, PooledConnection};
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapResult, Scope, SearchEntry, SearchOptions};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, trace};

const ROOT_DSE_ATTRS: [&str; 4] = [
    "vendorName",
    "vendorVersion",
    "namingContexts",
    "supportedLDAPVersion",
];

/// Where and how to connect
#[derive(Clone)]
struct Endpoint {
    url: String,
    start_tls: bool,
    skip_verify: bool,
    connect_timeout: Option<Duration>,
}

impl Endpoint {
    fn settings(&self) -> LdapConnSettings {
        let mut settings = LdapConnSettings::new()
            .set_starttls(self.start_tls)
            .set_no_tls_verify(self.skip_verify);
        if let Some(timeout) = self.connect_timeout {
            settings = settings.set_conn_timeout(timeout);
        }
        settings
    }

    async fn connect(&self) -> Result<Ldap, DirectoryError> {
        debug!("Connecting to LDAP server: {}", self.url);

        let (conn, ldap) = LdapConnAsync::with_settings(self.settings(), &self.url)
            .await
            .map_err(|e| DirectoryError::Connect(e.to_string()))?;
        ldap3::drive!(conn);
        Ok(ldap)
    }
}

/// Search identity; `None` binds anonymously
#[derive(Clone)]
struct SearchBind {
    dn: String,
    password: String,
}

fn check_bind(result: LdapResult) -> Result<(), DirectoryError> {
    if result.rc != 0 {
        return Err(DirectoryError::BindRejected {
            rc: result.rc,
            message: result.text,
        });
    }
    Ok(())
}

async fn bind_search_identity(
    endpoint: &Endpoint,
    bind: Option<&SearchBind>,
) -> Result<Ldap, DirectoryError> {
    let mut ldap = endpoint.connect().await?;

    if let Some(bind) = bind {
        let result = ldap
            .simple_bind(&bind.dn, &bind.password)
            .await
            .map_err(|e| DirectoryError::Connect(format!("Service bind failed: {}", e)))?;

        if let Err(e) = check_bind(result) {
            let _ = ldap.unbind().await;
            return Err(e);
        }
    }

    Ok(ldap)
}

async fn run_search(
    ldap: &mut Ldap,
    request: SearchRequest<'_>,
) -> Result<Vec<DirectoryEntry>, DirectoryError> {
    let result = ldap
        .with_search_options(SearchOptions::new().sizelimit(request.size_limit))
        .search(
            request.base,
            Scope::Subtree,
            request.filter,
            request.attrs.to_vec(),
        )
        .await
        .map_err(|e| DirectoryError::Search(e.to_string()))?;

    let ldap3::SearchResult(entries, res) = result;
    // A truncated search still delivers the entries it found.
    if res.rc != 0 && res.rc != RC_SIZE_LIMIT_EXCEEDED {
        return Err(DirectoryError::Search(format!(
            "rc={} {}",
            res.rc, res.text
        )));
    }

    Ok(entries
        .into_iter()
        .map(|entry| {
            let entry = SearchEntry::construct(entry);
            DirectoryEntry {
                dn: entry.dn,
                attrs: entry.attrs,
            }
        })
        .collect())
}

// ============================================================================
// Pool
// ============================================================================

/// `bb8` manager handing out connections bound as the search identity
struct LdapConnectionManager {
    endpoint: Endpoint,
    bind: Option<SearchBind>,
}

#[async_trait]
impl ManageConnection for LdapConnectionManager {
    type Connection = Ldap;
    type Error = DirectoryError;

    async fn connect(&self) -> Result<Self::Connection, Self::Error> {
        bind_search_identity(&self.endpoint, self.bind.as_ref()).await
    }

    async fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        if conn.is_closed() {
            return Err(DirectoryError::Closed);
        }
        Ok(())
    }

    fn has_broken(&self, conn: &mut Self::Connection) -> bool {
        conn.is_closed()
    }
}

/// Keeps the last connect failure of the pool. bb8 only reports a timeout to
/// waiters; the cause is recovered from here.
#[derive(Debug, Clone, Default)]
struct LastConnectError {
    error: Arc<Mutex<Option<DirectoryError>>>,
}

impl LastConnectError {
    fn take(&self) -> Option<DirectoryError> {
        self.error.lock().take()
    }
}

impl ErrorSink<DirectoryError> for LastConnectError {
    fn sink(&self, error: DirectoryError) {
        debug!("LDAP pool connection failed: {}", error);
        *self.error.lock() = Some(error);
    }

    fn boxed_clone(&self) -> Box<dyn ErrorSink<DirectoryError>> {
        Box::new(self.clone())
    }
}

// ============================================================================
// Sessions
// ============================================================================

/// Pooled search session; dropping it returns the connection to the pool.
struct PooledSession {
    conn: PooledConnection<'static, LdapConnectionManager>,
}

#[async_trait]
impl DirectorySession for PooledSession {
    async fn search(
        &mut self,
        request: SearchRequest<'_>,
    ) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        run_search(&mut self.conn, request).await
    }

    async fn close(self: Box<Self>) {}
}

/// Unpooled search session, unbound on close
struct DedicatedSession {
    ldap: Ldap,
}

#[async_trait]
impl DirectorySession for DedicatedSession {
    async fn search(
        &mut self,
        request: SearchRequest<'_>,
    ) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        run_search(&mut self.ldap, request).await
    }

    async fn close(self: Box<Self>) {
        let mut session = self;
        let _ = session.ldap.unbind().await;
    }
}

// ============================================================================
// Connector
// ============================================================================

/// Directory session factory for one realm
pub struct LdapConnector {
    endpoint: Endpoint,
    bind: Option<SearchBind>,
    pool_size: Option<u32>,
    pool: OnceCell<Pool<LdapConnectionManager>>,
    last_error: LastConnectError,
}

impl LdapConnector {
    /// No connection is opened here; the pool is built on first use.
    pub fn new(config: &LdapRealmConfig) -> Self {
        let bind = config.search_bind_dn.as_ref().map(|dn| SearchBind {
            dn: dn.clone(),
            password: config.search_bind_password.clone().unwrap_or_default(),
        });

        Self {
            endpoint: Endpoint {
                url: config.directory.clone(),
                start_tls: config.tls.start_tls,
                skip_verify: config.tls.skip_verify,
                connect_timeout: config.connect_timeout,
            },
            bind,
            pool_size: config.pool.enabled.then_some(config.pool.max_size),
            pool: OnceCell::new(),
            last_error: LastConnectError::default(),
        }
    }

    pub fn is_pooled(&self) -> bool {
        self.pool_size.is_some()
    }

    async fn pool(&self, max_size: u32) -> &Pool<LdapConnectionManager> {
        self.pool
            .get_or_init(|| async {
                debug!(
                    "Creating LDAP connection pool for {} (max size {})",
                    self.endpoint.url, max_size
                );
                // Failed connects are not retried; connect-timeout bounds the
                // wait for a pooled session.
                let mut builder = Pool::<LdapConnectionManager>::builder()
                    .max_size(max_size)
                    .retry_connection(false)
                    .error_sink(Box::new(self.last_error.clone()));
                if let Some(timeout) = self.endpoint.connect_timeout.filter(|t| !t.is_zero()) {
                    builder = builder.connection_timeout(timeout);
                }
                builder.build_unchecked(LdapConnectionManager {
                    endpoint: self.endpoint.clone(),
                    bind: self.bind.clone(),
                })
            })
            .await
    }
}

#[async_trait]
impl DirectoryConnector for LdapConnector {
    async fn search_session(&self) -> Result<Box<dyn DirectorySession>, DirectoryError> {
        match self.pool_size {
            Some(max_size) => {
                let conn = self
                    .pool(max_size)
                    .await
                    .get_owned()
                    .await
                    .map_err(|e| match e {
                        bb8::RunError::User(e) => e,
                        bb8::RunError::TimedOut => self.last_error.take().unwrap_or_else(|| {
                            DirectoryError::Pool("timed out waiting for a connection".to_string())
                        }),
                    })?;
                Ok(Box::new(PooledSession { conn }))
            }
            None => {
                let ldap = bind_search_identity(&self.endpoint, self.bind.as_ref()).await?;
                Ok(Box::new(DedicatedSession { ldap }))
            }
        }
    }

    async fn bind(&self, dn: &str, password: &str) -> Result<(), DirectoryError> {
        let mut ldap = self.endpoint.connect().await?;

        let outcome = match ldap.simple_bind(dn, password).await {
            Ok(result) => check_bind(result),
            Err(e) => Err(DirectoryError::Connect(e.to_string())),
        };

        trace!("Bind as {} finished: {:?}", dn, outcome.as_ref().map(|_| ()));
        let _ = ldap.unbind().await;
        outcome
    }

    async fn root_dse(&self) -> Result<DirectoryEntry, DirectoryError> {
        let mut ldap = bind_search_identity(&self.endpoint, self.bind.as_ref()).await?;

        let result = ldap
            .search("", Scope::Base, "(objectClass=*)", ROOT_DSE_ATTRS.to_vec())
            .await
            .map_err(|e| DirectoryError::Search(format!("Root DSE query failed: {}", e)))
            .and_then(|r| {
                r.success()
                    .map_err(|e| DirectoryError::Search(format!("Root DSE error: {}", e)))
            });
        let _ = ldap.unbind().await;

        let (entries, _res) = result?;
        Ok(entries
            .into_iter()
            .next()
            .map(|entry| {
                let entry = SearchEntry::construct(entry);
                DirectoryEntry {
                    dn: entry.dn,
                    attrs: entry.attrs,
                }
            })
            .unwrap_or_default())
    }
}
