//! In-process [`ProvinceStore`] backed by a `RwLock`ed map.
//!
//! Used by tests, by the API test suite, and by the engine binary when no
//! database URL is configured. Conditional writes are checked and applied
//! under a single write lock, so they are atomic with respect to each
//! other.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use realm_types::{ProvinceChanged, ProvinceId, ProvinceSnapshot};
use tokio::sync::{RwLock, broadcast};
use tracing::debug;

use crate::store::{
    CHANGE_CHANNEL_CAPACITY, ProvinceStore, ProvinceSubscription, StoreError, next_version,
};

/// A [`ProvinceStore`] that keeps every row in memory.
///
/// Cloning is cheap and clones share the same rows and change channel.
#[derive(Debug, Clone)]
pub struct MemoryProvinceStore {
    rows: Arc<RwLock<BTreeMap<ProvinceId, ProvinceSnapshot>>>,
    changes: broadcast::Sender<ProvinceChanged>,
    offline: Arc<AtomicBool>,
}

impl MemoryProvinceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            rows: Arc::new(RwLock::new(BTreeMap::new())),
            changes,
            offline: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Simulate losing (or regaining) the backing store. While offline
    /// every operation fails with [`StoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of stored provinces.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    /// Whether no provinces are stored.
    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(String::from(
                "in-memory store is offline",
            )));
        }
        Ok(())
    }

    fn publish(&self, snapshot: &ProvinceSnapshot) {
        // No receivers is not an error: nobody is watching this province.
        let receivers = self
            .changes
            .send(ProvinceChanged::from_snapshot(snapshot.clone()))
            .unwrap_or(0);
        debug!(
            province_id = %snapshot.id,
            version = snapshot.version,
            receivers,
            "published province change"
        );
    }
}

impl Default for MemoryProvinceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProvinceStore for MemoryProvinceStore {
    async fn get(&self, province_id: ProvinceId) -> Result<ProvinceSnapshot, StoreError> {
        self.ensure_online()?;
        self.rows
            .read()
            .await
            .get(&province_id)
            .cloned()
            .ok_or(StoreError::NotFound(province_id))
    }

    async fn insert(&self, snapshot: ProvinceSnapshot) -> Result<ProvinceSnapshot, StoreError> {
        self.ensure_online()?;
        {
            let mut rows = self.rows.write().await;
            if rows.contains_key(&snapshot.id) {
                return Err(StoreError::AlreadyExists(snapshot.id));
            }
            rows.insert(snapshot.id, snapshot.clone());
        }
        self.publish(&snapshot);
        Ok(snapshot)
    }

    async fn conditional_update(
        &self,
        expected_version: u64,
        snapshot: ProvinceSnapshot,
    ) -> Result<ProvinceSnapshot, StoreError> {
        self.ensure_online()?;
        let province_id = snapshot.id;
        let stored = {
            let mut rows = self.rows.write().await;
            let row = rows
                .get_mut(&province_id)
                .ok_or(StoreError::NotFound(province_id))?;
            if row.version != expected_version {
                return Err(StoreError::Conflict {
                    province_id,
                    expected: expected_version,
                    actual: row.version,
                });
            }
            *row = next_version(expected_version, snapshot)?;
            row.clone()
        };
        self.publish(&stored);
        Ok(stored)
    }

    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<ProvinceId>, StoreError> {
        self.ensure_online()?;
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|row| row.next_turn_at <= now)
            .map(|row| row.id)
            .collect())
    }

    fn subscribe(&self, province_id: ProvinceId) -> ProvinceSubscription {
        ProvinceSubscription::new(province_id, self.changes.subscribe())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use chrono::TimeDelta;

    use super::*;
    use crate::testing::sample_snapshot;

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let store = MemoryProvinceStore::new();
        let snapshot = sample_snapshot(Utc::now());
        store.insert(snapshot.clone()).await.unwrap();
        assert_eq!(store.get(snapshot.id).await.unwrap(), snapshot);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn duplicate_insert_is_refused() {
        let store = MemoryProvinceStore::new();
        let snapshot = sample_snapshot(Utc::now());
        store.insert(snapshot.clone()).await.unwrap();
        assert_eq!(
            store.insert(snapshot.clone()).await,
            Err(StoreError::AlreadyExists(snapshot.id))
        );
    }

    #[tokio::test]
    async fn conditional_update_bumps_version_once() {
        let store = MemoryProvinceStore::new();
        let snapshot = sample_snapshot(Utc::now());
        store.insert(snapshot.clone()).await.unwrap();

        let mut changed = snapshot.clone();
        changed.resources.gold = 1;
        let stored = store.conditional_update(0, changed).await.unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.resources.gold, 1);
    }

    #[tokio::test]
    async fn stale_version_conflicts_and_leaves_row_untouched() {
        let store = MemoryProvinceStore::new();
        let snapshot = sample_snapshot(Utc::now());
        store.insert(snapshot.clone()).await.unwrap();
        store.conditional_update(0, snapshot.clone()).await.unwrap();

        let mut stale = snapshot.clone();
        stale.resources.gold = 0;
        let err = store.conditional_update(0, stale).await.unwrap_err();
        assert_eq!(
            err,
            StoreError::Conflict {
                province_id: snapshot.id,
                expected: 0,
                actual: 1,
            }
        );
        assert_eq!(
            store.get(snapshot.id).await.unwrap().resources.gold,
            snapshot.resources.gold
        );
    }

    #[tokio::test]
    async fn list_due_filters_on_next_turn_at() {
        let store = MemoryProvinceStore::new();
        let now = Utc::now();
        let mut due = sample_snapshot(now);
        due.next_turn_at = now - TimeDelta::seconds(1);
        let mut later = sample_snapshot(now);
        later.next_turn_at = now + TimeDelta::seconds(60);
        store.insert(due.clone()).await.unwrap();
        store.insert(later).await.unwrap();

        assert_eq!(store.list_due(now).await.unwrap(), vec![due.id]);
    }

    #[tokio::test]
    async fn subscribers_only_see_their_province() {
        let store = MemoryProvinceStore::new();
        let now = Utc::now();
        let watched = sample_snapshot(now);
        let other = sample_snapshot(now);
        store.insert(watched.clone()).await.unwrap();
        store.insert(other.clone()).await.unwrap();

        let mut sub = store.subscribe(watched.id);
        store.conditional_update(0, other).await.unwrap();
        store.conditional_update(0, watched.clone()).await.unwrap();

        let event = sub.recv().await.unwrap();
        assert_eq!(event.province_id, watched.id);
        assert_eq!(event.version, 1);
        assert_eq!(event.snapshot.version, 1);
    }

    #[tokio::test]
    async fn offline_store_is_unavailable() {
        let store = MemoryProvinceStore::new();
        let snapshot = sample_snapshot(Utc::now());
        store.insert(snapshot.clone()).await.unwrap();
        store.set_offline(true);
        assert!(matches!(
            store.get(snapshot.id).await,
            Err(StoreError::Unavailable(_))
        ));
        store.set_offline(false);
        assert!(store.get(snapshot.id).await.is_ok());
    }
}
