//! Keyed async locks
//!
//! One `tokio::sync::Mutex` per key, created on demand. Holding the lock of
//! a room across "persist then publish" makes the publish order on that
//! room follow the commit order of its writes. Several keys are always
//! taken in sorted order so two callers can never wait on each other.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Idle entries are swept once the map grows past this size
const PRUNE_THRESHOLD: usize = 1024;

pub struct KeyedLocks<K> {
    locks: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

/// Guards for every key passed to [`KeyedLocks::lock_many`]; released on drop
#[must_use]
pub struct KeyedGuard {
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl<K> Default for KeyedLocks<K>
where
    K: Eq + Hash + Ord + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Ord + Clone,
{
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn entry(&self, key: &K) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock();
        if locks.len() > PRUNE_THRESHOLD {
            // only the map itself holds idle entries
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    pub async fn lock(&self, key: K) -> KeyedGuard {
        self.lock_many([key]).await
    }

    /// Lock every distinct key, in ascending order
    pub async fn lock_many(&self, keys: impl IntoIterator<Item = K>) -> KeyedGuard {
        let mut keys: Vec<K> = keys.into_iter().collect();
        keys.sort();
        keys.dedup();

        let mut guards = Vec::with_capacity(keys.len());
        for key in &keys {
            guards.push(self.entry(key).lock_owned().await);
        }
        KeyedGuard { _guards: guards }
    }

    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
