//! Group membership searches
//!
//! Two independent strategies, both run over the search session:
//! - static: group entries matching a filter, named by their `group-target`
//!   attribute
//! - dynamic: the user's "member of" attribute, each value a group DN named
//!   by its `group-target` RDN
//!
//! Either strategy may fail without affecting the other.

use crate::ldap::config::LdapRealmConfig;
use crate::ldap::directory::{DirectoryError, DirectorySession, SearchRequest};
use crate::ldap::dn;
use tracing::{debug, warn};

/// Runs both group strategies for one user
pub struct GroupResolver<'a> {
    config: &'a LdapRealmConfig,
}

impl<'a> GroupResolver<'a> {
    pub fn new(config: &'a LdapRealmConfig) -> Self {
        Self { config }
    }

    /// Static groups followed by dynamic groups, duplicates kept.
    ///
    /// `name` is the escaped login name, `user_dn` the DN found for it.
    pub async fn resolve(
        &self,
        session: &mut dyn DirectorySession,
        name: &str,
        user_dn: &str,
    ) -> Vec<String> {
        let static_filter = self.config.group_search_filter.expand(name, Some(user_dn));
        let dynamic_filter = self
            .config
            .dynamic_group_search_filter
            .expand(name, Some(user_dn));

        debug!("LDAP:Group search filter: {}", static_filter);

        let mut groups = match self.static_groups(session, &static_filter).await {
            Ok(groups) => groups,
            Err(e) => {
                warn!("LDAP group search failed for filter {}: {}", static_filter, e);
                Vec::new()
            }
        };

        match self.dynamic_groups(session, &dynamic_filter).await {
            Ok(dynamic) => groups.extend(dynamic),
            Err(e) => {
                warn!(
                    "LDAP dynamic group search failed for filter {}: {}",
                    dynamic_filter, e
                );
            }
        }

        if groups.is_empty() {
            debug!("LDAP: Group memberships found: (null)");
        } else {
            debug!("LDAP: Group memberships found: {}", groups.join(" "));
        }
        groups
    }

    /// Every value of the group-target attribute of every matching entry
    pub async fn static_groups(
        &self,
        session: &mut dyn DirectorySession,
        filter: &str,
    ) -> Result<Vec<String>, DirectoryError> {
        let target = self.config.group_target.as_str();
        let attrs = [target];
        let entries = session
            .search(SearchRequest::subtree(&self.config.group_base_dn, filter, &attrs))
            .await?;

        Ok(entries
            .iter()
            .flat_map(|entry| entry.values(target).iter().cloned())
            .collect())
    }

    /// Group names taken from the member-of DNs of matching entries
    pub async fn dynamic_groups(
        &self,
        session: &mut dyn DirectorySession,
        filter: &str,
    ) -> Result<Vec<String>, DirectoryError> {
        let member_of = self.config.dynamic_group_target.as_str();
        let attrs = [member_of];
        let entries = session
            .search(SearchRequest::subtree(&self.config.group_base_dn, filter, &attrs))
            .await?;

        let mut groups = Vec::new();
        for entry in &entries {
            for group_dn in entry.values(member_of) {
                match dn::first_rdn_value(group_dn, &self.config.group_target) {
                    Ok(Some(name)) => groups.push(name),
                    Ok(None) => {}
                    Err(e) => debug!("Skipping {} value: {}", member_of, e),
                }
            }
        }
        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ldap::config::{
        PARAM_DIRURL, PARAM_DYNAMIC_GRP_FILTER, PARAM_GRPDN, PARAM_GRP_SEARCH_FILTER,
        PARAM_USERDN,
    };
    use crate::ldap::directory::DirectoryEntry;
    use crate::ldap::testing::MemoryDirectory;
    use crate::secret::AliasStore;
    use warden_core::{RealmProperties, JAAS_CONTEXT_PARAM};

    const GROUPS: &str = "ou=groups,dc=example,dc=com";
    const ALICE: &str = "uid=alice,ou=people,dc=example,dc=com";

    fn config() -> LdapRealmConfig {
        let props = RealmProperties::new()
            .with(PARAM_DIRURL, "ldap://localhost:389")
            .with(PARAM_USERDN, "ou=people,dc=example,dc=com")
            .with(JAAS_CONTEXT_PARAM, "ldapRealm")
            .with(PARAM_GRPDN, GROUPS)
            .with(PARAM_GRP_SEARCH_FILTER, "(uniquemember=%d)")
            .with(PARAM_DYNAMIC_GRP_FILTER, "(uid=%s)");
        LdapRealmConfig::from_properties(&props, &AliasStore::default()).unwrap()
    }

    fn static_filter() -> String {
        format!("(uniquemember={})", ALICE)
    }

    #[tokio::test]
    async fn test_static_and_dynamic_concatenated() {
        let directory = MemoryDirectory::new()
            .with_entries(
                GROUPS,
                &static_filter(),
                vec![
                    DirectoryEntry::new("cn=eng,ou=groups,dc=example,dc=com").with_attr("cn", &["eng"]),
                    DirectoryEntry::new("cn=ops,ou=groups,dc=example,dc=com")
                        .with_attr("cn", &["ops", "operations"]),
                ],
            )
            .with_entries(
                GROUPS,
                "(uid=alice)",
                vec![DirectoryEntry::new(ALICE).with_attr(
                    "isMemberOf",
                    &["cn=eng,ou=groups,dc=example,dc=com", "cn=staff,ou=groups,dc=example,dc=com"],
                )],
            );
        let config = config();
        let mut session = directory.session();

        let groups = GroupResolver::new(&config)
            .resolve(&mut session, "alice", ALICE)
            .await;

        assert_eq!(groups, vec!["eng", "ops", "operations", "eng", "staff"]);
    }

    #[tokio::test]
    async fn test_dynamic_failure_keeps_static_groups() {
        let directory = MemoryDirectory::new()
            .with_entries(
                GROUPS,
                &static_filter(),
                vec![DirectoryEntry::new("cn=eng,ou=groups,dc=example,dc=com").with_attr("cn", &["eng"])],
            )
            .failing_search("(uid=alice)");
        let config = config();
        let mut session = directory.session();

        let groups = GroupResolver::new(&config)
            .resolve(&mut session, "alice", ALICE)
            .await;

        assert_eq!(groups, vec!["eng"]);
    }

    #[tokio::test]
    async fn test_static_failure_keeps_dynamic_groups() {
        let directory = MemoryDirectory::new()
            .failing_search(&static_filter())
            .with_entries(
                GROUPS,
                "(uid=alice)",
                vec![DirectoryEntry::new(ALICE)
                    .with_attr("ismemberof", &["cn=staff,ou=groups,dc=example,dc=com"])],
            );
        let config = config();
        let mut session = directory.session();

        let groups = GroupResolver::new(&config)
            .resolve(&mut session, "alice", ALICE)
            .await;

        assert_eq!(groups, vec!["staff"]);
    }

    #[tokio::test]
    async fn test_dynamic_values_without_target_rdn_or_invalid_are_skipped() {
        let directory = MemoryDirectory::new().with_entries(
            GROUPS,
            "(uid=alice)",
            vec![DirectoryEntry::new(ALICE).with_attr(
                "ismemberof",
                &["ou=nocn,dc=example,dc=com", "garbage", "cn=ok,dc=example,dc=com"],
            )],
        );
        let config = config();
        let mut session = directory.session();

        let groups = GroupResolver::new(&config)
            .dynamic_groups(&mut session, "(uid=alice)")
            .await
            .unwrap();

        assert_eq!(groups, vec!["ok"]);
        assert_eq!(directory.last_attrs(), vec!["ismemberof".to_string()]);
    }

    #[tokio::test]
    async fn test_dynamic_nested_group_named_by_leftmost_rdn() {
        let directory = MemoryDirectory::new().with_entries(
            GROUPS,
            "(uid=alice)",
            vec![DirectoryEntry::new(ALICE)
                .with_attr("ismemberof", &["cn=eng,cn=groups,dc=example,dc=com"])],
        );
        let config = config();
        let mut session = directory.session();

        let groups = GroupResolver::new(&config)
            .dynamic_groups(&mut session, "(uid=alice)")
            .await
            .unwrap();

        assert_eq!(groups, vec!["eng"]);
    }
}
