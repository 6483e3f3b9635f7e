//! LDAP realm
//!
//! Authenticates users against an LDAP directory (OpenLDAP, 389 Directory
//! Server, Oracle/Sun DS, Active Directory) in find-bind mode.
//!
//! Features:
//! - User DN search with an RFC 2254 escaped filter
//! - Credential check by binding as the user
//! - Static and dynamic group membership
//! - Per-user group cache for credential-less authorization
//! - Pooled search connections, StartTLS and LDAPS

pub mod cache;
pub mod config;
pub mod connection;
pub mod directory;
pub mod dn;
pub mod filter;
pub mod groups;
pub mod realm;
pub mod resolver;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::GroupCache;
pub use config::{LdapRealmConfig, PoolConfig, TlsSettings};
pub use connection::LdapConnector;
pub use directory::{
    DirectoryConnector, DirectoryEntry, DirectoryError, DirectorySession, SearchRequest,
};
pub use filter::{rfc2254_encode, FilterTemplate};
pub use groups::GroupResolver;
pub use realm::{LdapRealm, RealmStatus, AUTH_TYPE};
pub use resolver::{BindOutcome, UserLookup};
