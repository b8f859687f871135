//! Process-local record of recently accepted submission keys. A key marked once
//! is reported as a duplicate until its TTL elapses.

use crate::metrics_defs::{DEDUP_DUPLICATE, DEDUP_FRESH};
use moka::sync::Cache;
use shared::counter;
use std::hash::Hash;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mark {
    /// First sighting inside the window; the caller owns the write.
    Fresh,
    /// Already marked; the caller must not write again.
    Duplicate,
}

pub struct IdempotencyCache<K = String> {
    cache: Cache<K, ()>,
}

impl<K> IdempotencyCache<K>
where
    K: Hash + Eq + Send + Sync + 'static,
{
    pub fn new(ttl: Duration, max_entries: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        IdempotencyCache { cache }
    }

    /// Checks for the key and marks it in one step.
    ///
    /// Concurrent calls with the same key see exactly one `Fresh`.
    pub fn check_and_mark(&self, key: K) -> Mark {
        let entry = self.cache.entry(key).or_insert(());
        if entry.is_fresh() {
            counter!(DEDUP_FRESH).increment(1);
            Mark::Fresh
        } else {
            counter!(DEDUP_DUPLICATE).increment(1);
            Mark::Duplicate
        }
    }

    /// Drops a mark so the next submission with this key is fresh again.
    pub fn forget(&self, key: &K) {
        self.cache.invalidate(key);
    }
}
