//! Pluggable authentication realms

use async_trait::async_trait;
use std::any::Any;
use warden_core::Result;

/// An authentication mechanism with its own configuration lifecycle.
///
/// Realms are fully configured on construction; there is no separate,
/// repeatable init step.
#[async_trait]
pub trait Realm: Send + Sync {
    /// Name the realm was registered under
    fn name(&self) -> &str;

    /// Short description of the authentication kind, e.g. `ldap`
    fn auth_type(&self) -> &'static str;

    /// Effective value of a configuration property, defaults applied
    fn property(&self, name: &str) -> Option<String>;

    fn jaas_context(&self) -> Option<String> {
        self.property(warden_core::JAAS_CONTEXT_PARAM)
    }

    /// Verify the credentials and return the user's groups.
    async fn authenticate(&self, username: &str, password: &str) -> Result<Vec<String>>;

    /// Groups of a user, as far as the realm knows them without credentials.
    async fn group_names(&self, username: &str) -> Result<Vec<String>>;

    /// Access to the concrete realm type
    fn as_any(&self) -> &dyn Any;
}
