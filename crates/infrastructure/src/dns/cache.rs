//! TTL-aware LRU cache for resolved record sets.
//!
//! Entries are keyed by (domain, type) and evicted strictly
//! least-recently-used once the cache reaches capacity. Reads filter each
//! entry's records by liveness and hand back copies whose TTLs reflect the
//! time already spent in cache; an entry whose records have all expired is
//! purged on the read that discovers it (or by [`DnsCache::evict_expired`]).

use lru::LruCache;
use rdns_domain::DnsRecord;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::debug;

mod key;

pub use key::CacheKey;

pub const DEFAULT_MAX_ENTRIES: usize = 1000;

/// Last-access recency is the entry's position in the LRU order; only the
/// insertion instant needs to be stored for TTL arithmetic.
struct CacheEntry {
    records: Vec<DnsRecord>,
    inserted_at: Instant,
}

pub struct DnsCache {
    entries: Mutex<LruCache<CacheKey, CacheEntry>>,
}

impl Default for DnsCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl DnsCache {
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Live records under `key`, with decayed TTLs, or `None` on a miss.
    /// A hit moves the key to the recently-used end.
    pub fn get(&self, key: &CacheKey) -> Option<Vec<DnsRecord>> {
        let now = Instant::now();
        let mut entries = self.lock();

        let live = {
            // get_mut refreshes the key's recency in the LRU order.
            let entry = entries.get_mut(key)?;
            let elapsed = now.duration_since(entry.inserted_at).as_secs();
            entry
                .records
                .iter()
                .filter(|record| !record.is_expired(elapsed))
                .map(|record| {
                    let mut decayed = record.clone();
                    decayed.ttl = record.remaining_ttl(elapsed);
                    decayed
                })
                .collect::<Vec<DnsRecord>>()
        };

        if live.is_empty() {
            entries.pop(key);
            debug!(key = %key, "Cache entry fully expired, purged");
            return None;
        }

        Some(live)
    }

    /// Inserts (or replaces) the entry under `key`, evicting from the LRU
    /// back when at capacity. Empty record sets are not cached.
    pub fn put(&self, key: CacheKey, records: Vec<DnsRecord>) {
        if records.is_empty() {
            return;
        }

        self.lock().put(
            key,
            CacheEntry {
                records,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Sweeps out every entry whose records have all expired. Returns the
    /// number of entries removed.
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.lock();

        let expired: Vec<CacheKey> = entries
            .iter()
            .filter(|(_, entry)| {
                let elapsed = now.duration_since(entry.inserted_at).as_secs();
                entry.records.iter().all(|record| record.is_expired(elapsed))
            })
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            entries.pop(key);
        }

        if !expired.is_empty() {
            debug!(removed = expired.len(), "Expired cache entries swept");
        }
        expired.len()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<CacheKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Rewinds an entry's insertion time, simulating time spent in cache.
    #[cfg(test)]
    fn backdate(&self, key: &CacheKey, secs: u64) {
        let mut entries = self.lock();
        if let Some(entry) = entries.peek_mut(key) {
            if let Some(rewound) = entry
                .inserted_at
                .checked_sub(std::time::Duration::from_secs(secs))
            {
                entry.inserted_at = rewound;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdns_domain::RecordType;

    fn record(name: &str, ttl: u32, addr: &str) -> DnsRecord {
        DnsRecord::new(RecordType::A, name.to_string(), ttl, vec![addr.to_string()])
    }

    #[test]
    fn test_get_returns_decayed_ttl() {
        let cache = DnsCache::new(16);
        let key = CacheKey::new("x", RecordType::A);
        cache.put(key.clone(), vec![record("x", 60, "10.0.0.1")]);

        cache.backdate(&key, 20);
        let records = cache.get(&key).expect("entry should still be live");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].ttl, 40);
    }

    #[test]
    fn test_expired_entry_purged_on_get() {
        let cache = DnsCache::new(16);
        let key = CacheKey::new("x", RecordType::A);
        cache.put(key.clone(), vec![record("x", 60, "10.0.0.1")]);

        cache.backdate(&key, 61);
        assert!(cache.get(&key).is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_partial_expiry_keeps_live_records() {
        let cache = DnsCache::new(16);
        let key = CacheKey::new("x", RecordType::A);
        cache.put(
            key.clone(),
            vec![record("x", 30, "10.0.0.1"), record("x", 300, "10.0.0.2")],
        );

        cache.backdate(&key, 60);
        let records = cache.get(&key).expect("one record should survive");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].data, vec!["10.0.0.2".to_string()]);
        assert_eq!(records[0].ttl, 240);
    }

    #[test]
    fn test_empty_put_is_noop() {
        let cache = DnsCache::new(16);
        cache.put(CacheKey::new("x", RecordType::A), vec![]);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_lru_eviction_order() {
        let cache = DnsCache::new(2);
        let key_a = CacheKey::new("a", RecordType::A);
        let key_b = CacheKey::new("b", RecordType::A);
        let key_c = CacheKey::new("c", RecordType::A);

        cache.put(key_a.clone(), vec![record("a", 300, "10.0.0.1")]);
        cache.put(key_b.clone(), vec![record("b", 300, "10.0.0.2")]);
        assert!(cache.get(&key_a).is_some());
        cache.put(key_c.clone(), vec![record("c", 300, "10.0.0.3")]);

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&key_a).is_some());
        assert!(cache.get(&key_b).is_none());
        assert!(cache.get(&key_c).is_some());
    }

    #[test]
    fn test_put_overwrites_existing_entry() {
        let cache = DnsCache::new(4);
        let key = CacheKey::new("x", RecordType::A);
        cache.put(key.clone(), vec![record("x", 300, "10.0.0.1")]);
        cache.put(key.clone(), vec![record("x", 300, "10.0.0.2")]);

        assert_eq!(cache.len(), 1);
        let records = cache.get(&key).unwrap();
        assert_eq!(records[0].data, vec!["10.0.0.2".to_string()]);
    }

    #[test]
    fn test_evict_expired_sweep() {
        let cache = DnsCache::new(16);
        let dead = CacheKey::new("dead", RecordType::A);
        let live = CacheKey::new("live", RecordType::A);
        cache.put(dead.clone(), vec![record("dead", 30, "10.0.0.1")]);
        cache.put(live.clone(), vec![record("live", 3000, "10.0.0.2")]);

        cache.backdate(&dead, 31);
        assert_eq!(cache.evict_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&live).is_some());
    }

    #[test]
    fn test_clear() {
        let cache = DnsCache::new(16);
        cache.put(
            CacheKey::new("x", RecordType::A),
            vec![record("x", 300, "10.0.0.1")],
        );
        cache.clear();
        assert!(cache.is_empty());
    }
}
