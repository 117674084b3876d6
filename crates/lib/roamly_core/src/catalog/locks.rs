//! Per-grouping-key mutual exclusion.
//!
//! Two runs resolving the same key must not both observe a cache miss and
//! both create a collection. The resolver holds the key's lock across the
//! whole find-or-create sequence.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::models::GroupingKey;

/// Lazily created async mutex per grouping key, shared across runs.
#[derive(Default)]
pub struct KeyedLocks {
    locks: DashMap<GroupingKey, Arc<Mutex<()>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`. Released when the guard drops.
    pub async fn acquire(&self, key: &GroupingKey) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the shard lock is not held across the await.
        let lock = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Number of keys that have ever been locked.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn same_key_is_exclusive() {
        let locks = Arc::new(KeyedLocks::new());
        let key = GroupingKey::new("FRA", "music");

        let guard = locks.acquire(&key).await;
        let waiter = tokio::spawn({
            let locks = locks.clone();
            let key = key.clone();
            async move {
                let _g = locks.acquire(&key).await;
            }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter acquires after release")
            .unwrap();
    }

    #[tokio::test]
    async fn different_keys_do_not_block() {
        let locks = KeyedLocks::new();
        let _a = locks.acquire(&GroupingKey::new("FRA", "music")).await;
        let _b = tokio::time::timeout(
            Duration::from_millis(100),
            locks.acquire(&GroupingKey::new("FRA", "food")),
        )
        .await
        .expect("independent key is free");
        assert_eq!(locks.len(), 2);
    }
}
