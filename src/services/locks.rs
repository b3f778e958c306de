use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

/// Per-series mutation locks.
///
/// Every write that touches a series (or a standalone event, keyed by its
/// own id) holds the guard from lookup to commit, so two requests can never
/// interleave on the same member list.
#[derive(Clone, Default)]
pub struct SeriesLocks {
    slots: Arc<Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>>,
}

impl SeriesLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: Uuid) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|p| p.into_inner());
            // Drop slots nobody is holding or waiting on
            slots.retain(|k, m| *k == key || Arc::strong_count(m) > 1);
            slots.entry(key).or_default().clone()
        };
        slot.lock_owned().await
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots.lock().map(|s| s.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_key_is_serialized() {
        let locks = SeriesLocks::new();
        let key = Uuid::new_v4();

        let guard = locks.acquire(key).await;
        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(key).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn different_keys_do_not_block() {
        let locks = SeriesLocks::new();
        let _a = locks.acquire(Uuid::new_v4()).await;
        let _b = locks.acquire(Uuid::new_v4()).await;
    }

    #[tokio::test]
    async fn idle_slots_are_pruned() {
        let locks = SeriesLocks::new();
        for _ in 0..5 {
            let _guard = locks.acquire(Uuid::new_v4()).await;
        }
        let _guard = locks.acquire(Uuid::new_v4()).await;
        assert_eq!(locks.len(), 1);
    }
}
