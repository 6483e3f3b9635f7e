//! In-memory directory for tests
//!
//! Search results are keyed by exact `(base, filter)`; filters listed with
//! [`MemoryDirectory::failing_search`] fail under any base. Every connection
//! and search is counted.

use crate::ldap::directory::{
    DirectoryConnector, DirectoryEntry, DirectoryError, DirectorySession, SearchRequest,
    RC_INVALID_CREDENTIALS,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Default)]
struct State {
    entries: HashMap<(String, String), Vec<DirectoryEntry>>,
    failing: HashSet<String>,
    passwords: HashMap<String, String>,
    unreachable: bool,
    sessions_opened: usize,
    sessions_closed: usize,
    binds: usize,
    searches: Vec<String>,
    last_size_limit: Option<i32>,
    last_attrs: Vec<String>,
}

#[derive(Clone, Default)]
pub struct MemoryDirectory {
    state: Arc<Mutex<State>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(self, base: &str, filter: &str, entries: Vec<DirectoryEntry>) -> Self {
        self.set_entries(base, filter, entries);
        self
    }

    /// Replace the results of `(base, filter)` on a directory already in use
    pub fn set_entries(&self, base: &str, filter: &str, entries: Vec<DirectoryEntry>) {
        self.state
            .lock()
            .entries
            .insert((base.to_string(), filter.to_string()), entries);
    }

    pub fn failing_search(self, filter: &str) -> Self {
        self.state.lock().failing.insert(filter.to_string());
        self
    }

    pub fn with_password(self, dn: &str, password: &str) -> Self {
        self.state
            .lock()
            .passwords
            .insert(dn.to_string(), password.to_string());
        self
    }

    pub fn unreachable(self) -> Self {
        self.state.lock().unreachable = true;
        self
    }

    /// A session opened directly, counted like any other
    pub fn session(&self) -> MemorySession {
        self.state.lock().sessions_opened += 1;
        MemorySession {
            state: Arc::clone(&self.state),
        }
    }

    pub fn sessions_opened(&self) -> usize {
        self.state.lock().sessions_opened
    }

    pub fn sessions_closed(&self) -> usize {
        self.state.lock().sessions_closed
    }

    pub fn bind_count(&self) -> usize {
        self.state.lock().binds
    }

    /// Connections of any kind: search sessions plus credential binds
    pub fn connection_count(&self) -> usize {
        let state = self.state.lock();
        state.sessions_opened + state.binds
    }

    pub fn searches(&self) -> Vec<String> {
        self.state.lock().searches.clone()
    }

    pub fn last_size_limit(&self) -> Option<i32> {
        self.state.lock().last_size_limit
    }

    pub fn last_attrs(&self) -> Vec<String> {
        self.state.lock().last_attrs.clone()
    }
}

pub struct MemorySession {
    state: Arc<Mutex<State>>,
}

#[async_trait]
impl DirectorySession for MemorySession {
    async fn search(
        &mut self,
        request: SearchRequest<'_>,
    ) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        // Let concurrent logins interleave.
        tokio::task::yield_now().await;

        let mut state = self.state.lock();
        state.searches.push(request.filter.to_string());
        state.last_size_limit = Some(request.size_limit);
        state.last_attrs = request.attrs.iter().map(|a| a.to_string()).collect();

        if state.failing.contains(request.filter) {
            return Err(DirectoryError::Search(format!(
                "injected failure for {}",
                request.filter
            )));
        }

        let mut entries = state
            .entries
            .get(&(request.base.to_string(), request.filter.to_string()))
            .cloned()
            .unwrap_or_default();
        if request.size_limit > 0 {
            entries.truncate(request.size_limit as usize);
        }
        Ok(entries)
    }

    async fn close(self: Box<Self>) {
        self.state.lock().sessions_closed += 1;
    }
}

#[async_trait]
impl DirectoryConnector for MemoryDirectory {
    async fn search_session(&self) -> Result<Box<dyn DirectorySession>, DirectoryError> {
        if self.state.lock().unreachable {
            return Err(DirectoryError::Connect("connection refused".to_string()));
        }
        Ok(Box::new(self.session()))
    }

    async fn bind(&self, dn: &str, password: &str) -> Result<(), DirectoryError> {
        tokio::task::yield_now().await;

        let mut state = self.state.lock();
        if state.unreachable {
            return Err(DirectoryError::Connect("connection refused".to_string()));
        }
        state.binds += 1;

        match state.passwords.get(dn) {
            Some(expected) if expected == password => Ok(()),
            _ => Err(DirectoryError::BindRejected {
                rc: RC_INVALID_CREDENTIALS,
                message: "Invalid Credentials".to_string(),
            }),
        }
    }

    async fn root_dse(&self) -> Result<DirectoryEntry, DirectoryError> {
        if self.state.lock().unreachable {
            return Err(DirectoryError::Connect("connection refused".to_string()));
        }
        Ok(DirectoryEntry::new("")
            .with_attr("vendorName", &["Memory Directory"])
            .with_attr("namingContexts", &["dc=example,dc=com"]))
    }
}
