//! Group cache
//!
//! Username to group set, filled by successful logins and read by
//! authorization queries that carry no credentials. Entries never expire;
//! a later login for the same username replaces them.

use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct GroupCache {
    groups: RwLock<HashMap<String, Vec<String>>>,
}

impl GroupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; last write wins.
    pub fn record(&self, username: &str, groups: Vec<String>) {
        self.groups.write().insert(username.to_string(), groups);
    }

    pub fn lookup(&self, username: &str) -> Option<Vec<String>> {
        self.groups.read().get(username).cloned()
    }

    pub fn len(&self) -> usize {
        self.groups.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_record_and_lookup() {
        let cache = GroupCache::new();
        assert!(cache.lookup("alice").is_none());

        cache.record("alice", vec!["eng".to_string()]);
        assert_eq!(cache.lookup("alice"), Some(vec!["eng".to_string()]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_overwrite_replaces_entry() {
        let cache = GroupCache::new();
        cache.record("alice", vec!["eng".to_string()]);
        cache.record("alice", vec!["ops".to_string()]);

        assert_eq!(cache.lookup("alice"), Some(vec!["ops".to_string()]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_concurrent_writers() {
        let cache = Arc::new(GroupCache::new());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        cache.record("shared", vec!["g".to_string()]);
                        cache.record(&format!("user{}", i), vec![format!("g{}", i)]);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 9);
        assert_eq!(cache.lookup("shared"), Some(vec!["g".to_string()]));
        for i in 0..8 {
            assert_eq!(cache.lookup(&format!("user{}", i)), Some(vec![format!("g{}", i)]));
        }
    }
}
