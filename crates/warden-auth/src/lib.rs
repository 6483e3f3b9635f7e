//! Authentication realms for Warden

pub mod groups;
pub mod ldap;
pub mod manager;
pub mod realm;
pub mod secret;

pub use groups::{GroupMapper, GroupPolicy};
pub use ldap::{LdapRealm, LdapRealmConfig, RealmStatus};
pub use manager::{RealmFactory, RealmsManager};
pub use realm::Realm;
pub use secret::{AliasStore, PasswordResolver};
