//! User lookup and credential verification for find-bind

use crate::ldap::directory::{
    DirectoryConnector, DirectoryError, DirectorySession, SearchRequest, RC_UNWILLING_TO_PERFORM,
};
use crate::ldap::dn;
use tracing::{debug, trace, warn};

const DN_ONLY: [&str; 1] = ["dn"];

/// Outcome of the user search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserLookup {
    Found(String),
    NotFound,
    DirectoryError(DirectoryError),
}

impl UserLookup {
    pub fn dn(&self) -> Option<&str> {
        match self {
            UserLookup::Found(dn) => Some(dn),
            _ => None,
        }
    }
}

/// Outcome of binding as the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindOutcome {
    Bound,
    Rejected(String),
    DirectoryError(DirectoryError),
}

impl BindOutcome {
    pub fn is_bound(&self) -> bool {
        matches!(self, BindOutcome::Bound)
    }
}

/// Find the DN of the entry matching `filter` under `base_dn`.
///
/// The search is limited to one entry. When several entries match, the first
/// one the directory returns wins.
pub async fn resolve_user(
    session: &mut dyn DirectorySession,
    base_dn: &str,
    filter: &str,
) -> UserLookup {
    debug!("search: baseDN: {}  filter: {}", base_dn, filter);

    let request = SearchRequest::subtree(base_dn, filter, &DN_ONLY).size_limit(1);
    match session.search(request).await {
        Ok(entries) => match entries.into_iter().next() {
            Some(entry) => {
                let found = dn::qualify(&entry.dn, base_dn);
                debug!("Found user DN: {}", found);
                UserLookup::Found(found)
            }
            None => UserLookup::NotFound,
        },
        Err(e) => {
            warn!("LDAP user search failed for filter {}: {}", filter, e);
            UserLookup::DirectoryError(e)
        }
    }
}

/// Bind as `dn` with `password`.
///
/// An empty password is rejected up front: LDAP would treat it as an
/// unauthenticated bind and report success.
pub async fn verify(connector: &dyn DirectoryConnector, dn: &str, password: &str) -> BindOutcome {
    if password.is_empty() {
        trace!("Refusing empty password for {}", dn);
        return BindOutcome::Rejected("empty password".to_string());
    }

    match connector.bind(dn, password).await {
        Ok(()) => BindOutcome::Bound,
        Err(DirectoryError::BindRejected { rc, message }) => {
            if rc == RC_UNWILLING_TO_PERFORM {
                trace!("Directory refused to bind {}, account may be locked", dn);
            }
            trace!("Error binding to directory as: {} (rc={} {})", dn, rc, message);
            BindOutcome::Rejected(format!("rc={} {}", rc, message))
        }
        Err(e) => {
            trace!("Error binding to directory as: {}: {}", dn, e);
            BindOutcome::DirectoryError(e)
        }
    }
}
