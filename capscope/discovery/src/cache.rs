//! Per-scope capability profile cache.
//!
//! Entries are created at the end of a discovery pass and replaced
//! wholesale — never mutated in place — on refresh or explicit
//! invalidation. Reads are non-blocking; expiry is driven by the
//! injected clock.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use capscope_core::CapabilityProfile;

use crate::clock::Clock;

struct CacheEntry {
    profile: Arc<CapabilityProfile>,
    created_at: DateTime<Utc>,
}

pub struct ProfileCache {
    clock: Arc<dyn Clock>,
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ProfileCache {
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            clock,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Fresh profile for a scope, or `None` when absent or expired.
    pub fn get(&self, scope: &str) -> Option<Arc<CapabilityProfile>> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(scope)?;
        if self.is_fresh(entry) {
            Some(entry.profile.clone())
        } else {
            None
        }
    }

    /// Latest profile for a scope regardless of freshness, with a
    /// freshness flag. Serves the stale-while-refreshing opt-in.
    pub fn get_any(&self, scope: &str) -> Option<(Arc<CapabilityProfile>, bool)> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(scope)?;
        Some((entry.profile.clone(), self.is_fresh(entry)))
    }

    /// Publish a finished profile, replacing any previous entry.
    pub fn insert(&self, scope: &str, profile: CapabilityProfile) -> Arc<CapabilityProfile> {
        let published = Arc::new(profile);
        let entry = CacheEntry {
            profile: published.clone(),
            created_at: self.clock.now(),
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(scope.to_string(), entry);
        debug!(scope, "capability profile published");
        published
    }

    pub fn invalidate(&self, scope: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(scope);
        debug!(scope, "capability cache entry invalidated");
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        self.clock.now() - entry.created_at < self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn profile() -> CapabilityProfile {
        CapabilityProfile::empty(Utc::now())
    }

    #[test]
    fn serves_fresh_entries() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = ProfileCache::new(clock, Duration::minutes(15));

        assert!(cache.get("acct-1").is_none());
        let published = cache.insert("acct-1", profile());
        let hit = cache.get("acct-1").expect("fresh entry");
        assert!(Arc::ptr_eq(&published, &hit));
    }

    #[test]
    fn entries_expire_after_ttl() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = ProfileCache::new(clock.clone(), Duration::minutes(15));
        cache.insert("acct-1", profile());

        clock.advance(Duration::minutes(14));
        assert!(cache.get("acct-1").is_some());

        clock.advance(Duration::minutes(2));
        assert!(cache.get("acct-1").is_none());
        // Stale entry is still reachable for the serve-stale opt-in.
        let (stale, fresh) = cache.get_any("acct-1").expect("stale entry");
        assert!(!fresh);
        assert!(stale.modules.is_empty());
    }

    #[test]
    fn invalidation_removes_the_entry() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = ProfileCache::new(clock, Duration::minutes(15));
        cache.insert("acct-1", profile());

        cache.invalidate("acct-1");
        assert!(cache.get("acct-1").is_none());
        assert!(cache.get_any("acct-1").is_none());
    }

    #[test]
    fn replacement_is_wholesale() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = ProfileCache::new(clock, Duration::minutes(15));
        let first = cache.insert("acct-1", profile());
        let second = cache.insert("acct-1", profile());

        let hit = cache.get("acct-1").expect("entry");
        assert!(Arc::ptr_eq(&second, &hit));
        assert!(!Arc::ptr_eq(&first, &hit));
    }
}
