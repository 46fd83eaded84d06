//! Small time-to-live map. Entries older than the configured TTL are treated as
//! absent and dropped on access.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, (V, Instant)>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<K, (V, Instant)>> {
        // cached values are plain data, a poisoned map is still consistent
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some((value, inserted)) if inserted.elapsed() < self.ttl => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: K, value: V) {
        if self.ttl.is_zero() {
            return;
        }
        self.lock().insert(key, (value, Instant::now()));
    }

    pub fn invalidate(&self, key: &K) -> Option<V> {
        self.lock().remove(key).map(|(value, _)| value)
    }

    /// Drops every entry whose value matches `pred`.
    pub fn invalidate_where<F>(&self, pred: F) -> usize
    where
        F: Fn(&V) -> bool,
    {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, (value, _)| !pred(value));
        before - entries.len()
    }

    pub fn purge_expired(&self) -> usize {
        let ttl = self.ttl;
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, (_, inserted)| inserted.elapsed() < ttl);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn get_insert_test() {
        let cache = TtlCache::new(Duration::from_secs(60));
        assert!(cache.get(&1).is_none());
        cache.insert(1, "one");
        assert_eq!(cache.get(&1), Some("one"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn expiry_test() {
        let cache = TtlCache::new(Duration::from_millis(20));
        cache.insert("key", 42);
        std::thread::sleep(Duration::from_millis(40));
        assert!(cache.get(&"key").is_none());
        // expired entry is removed on access
        assert!(cache.is_empty());
    }

    #[test]
    fn zero_ttl_never_stores_test() {
        let cache = TtlCache::new(Duration::ZERO);
        cache.insert(1, 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn invalidate_where_test() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert(1, ("alice", 10));
        cache.insert(2, ("bob", 20));
        cache.insert(3, ("alice", 30));

        assert_eq!(cache.invalidate_where(|(name, _)| *name == "alice"), 2);
        assert!(cache.get(&1).is_none());
        assert_eq!(cache.get(&2), Some(("bob", 20)));
        assert_eq!(cache.invalidate(&2), Some(("bob", 20)));
        assert!(cache.is_empty());
    }

    #[test]
    fn purge_expired_test() {
        let cache = TtlCache::new(Duration::from_millis(20));
        cache.insert(1, ());
        cache.insert(2, ());
        std::thread::sleep(Duration::from_millis(40));
        cache.insert(3, ());
        assert_eq!(cache.purge_expired(), 2);
        assert_eq!(cache.len(), 1);
    }
}
