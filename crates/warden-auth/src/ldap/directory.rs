//! Directory access seam
//!
//! The realm talks to the directory only through [`DirectoryConnector`] and
//! [`DirectorySession`], so the find-bind logic does not depend on a live
//! server.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

/// Result code for invalid credentials
pub const RC_INVALID_CREDENTIALS: u32 = 49;

/// Result code for an unwilling server (disabled or locked accounts)
pub const RC_UNWILLING_TO_PERFORM: u32 = 53;

/// Result code for a search truncated by its size limit
pub const RC_SIZE_LIMIT_EXCEEDED: u32 = 4;

/// Directory access errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("Failed to connect to directory: {0}")]
    Connect(String),

    #[error("Bind rejected with code {rc}: {message}")]
    BindRejected { rc: u32, message: String },

    #[error("Search failed: {0}")]
    Search(String),

    #[error("Connection closed")]
    Closed,

    #[error("Connection pool error: {0}")]
    Pool(String),
}

/// One search hit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub dn: String,
    pub attrs: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attrs: HashMap::new(),
        }
    }

    pub fn with_attr(mut self, name: &str, values: &[&str]) -> Self {
        self.attrs
            .entry(name.to_string())
            .or_default()
            .extend(values.iter().map(|v| v.to_string()));
        self
    }

    /// Attribute values; attribute names compare ASCII case-insensitively.
    pub fn values(&self, name: &str) -> &[String] {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn first_value(&self, name: &str) -> Option<&str> {
        self.values(name).first().map(|s| s.as_str())
    }
}

/// Subtree search parameters
#[derive(Debug, Clone, Copy)]
pub struct SearchRequest<'a> {
    pub base: &'a str,
    pub filter: &'a str,
    pub attrs: &'a [&'a str],
    /// 0 means unlimited
    pub size_limit: i32,
}

impl<'a> SearchRequest<'a> {
    pub fn subtree(base: &'a str, filter: &'a str, attrs: &'a [&'a str]) -> Self {
        Self {
            base,
            filter,
            attrs,
            size_limit: 0,
        }
    }

    pub fn size_limit(mut self, limit: i32) -> Self {
        self.size_limit = limit;
        self
    }
}

/// A connection bound as the search identity
#[async_trait]
pub trait DirectorySession: Send {
    async fn search(
        &mut self,
        request: SearchRequest<'_>,
    ) -> Result<Vec<DirectoryEntry>, DirectoryError>;

    /// Release the session. Errors while closing are not reported.
    async fn close(self: Box<Self>);
}

/// Opens directory sessions and performs credential binds
#[async_trait]
pub trait DirectoryConnector: Send + Sync {
    /// Session bound as the service account, or anonymous if none is set
    async fn search_session(&self) -> Result<Box<dyn DirectorySession>, DirectoryError>;

    /// Bind as `dn` on a fresh connection, then release it.
    async fn bind(&self, dn: &str, password: &str) -> Result<(), DirectoryError>;

    /// Root DSE of the directory, read over a search session.
    async fn root_dse(&self) -> Result<DirectoryEntry, DirectoryError>;
}
