//! Province rows in `PostgreSQL`.
//!
//! Each row keeps the whole snapshot in a `jsonb` column next to copies of
//! `version` and `next_turn_at`. Writes are conditioned on `version` in the
//! `WHERE` clause and issue `pg_notify('province_changed', ...)` inside the
//! same transaction, so a notification is sent exactly when a write
//! commits.
//!
//! Every [`PgProvinceStore`] publishes its own commits to its local
//! subscribers directly. A listener task ([`PgProvinceStore::spawn_listener`])
//! picks up commits made by other processes, re-reads those rows, and
//! publishes them too.

use std::time::Duration;

use chrono::{DateTime, Utc};
use realm_core::store::{CHANGE_CHANNEL_CAPACITY, next_version};
use realm_core::{ProvinceStore, ProvinceSubscription, StoreError};
use realm_types::{ProvinceChanged, ProvinceId, ProvinceSnapshot};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use sqlx::postgres::PgListener;
use sqlx::types::Json;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::DbError;

/// `NOTIFY` channel carrying [`ChangeNotice`] payloads.
pub const CHANGE_NOTIFY_CHANNEL: &str = "province_changed";

/// Pause before the listener retries after a failed receive.
const LISTENER_RETRY: Duration = Duration::from_secs(1);

/// Payload of a `province_changed` notification.
///
/// Snapshots can exceed the 8000-byte `NOTIFY` limit, so only the id and
/// version travel; listeners re-read the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeNotice {
    /// The province that changed.
    pub province_id: ProvinceId,
    /// Its version after the write.
    pub version: u64,
    /// The store instance that made the write.
    pub origin: Uuid,
}

/// A [`ProvinceStore`] backed by the `provinces` table.
///
/// Clones share the pool, the change channel, and the origin id.
#[derive(Debug, Clone)]
pub struct PgProvinceStore {
    pool: PgPool,
    changes: broadcast::Sender<ProvinceChanged>,
    origin: Uuid,
}

impl PgProvinceStore {
    /// Create a store over a connected pool.
    pub fn new(pool: PgPool) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            pool,
            changes,
            origin: Uuid::now_v7(),
        }
    }

    /// Identifier this instance stamps on its notifications.
    pub const fn origin(&self) -> Uuid {
        self.origin
    }

    /// Start forwarding commits made by other processes to local
    /// subscribers. The task runs until aborted.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the listener cannot connect or
    /// subscribe.
    pub async fn spawn_listener(&self) -> Result<JoinHandle<()>, DbError> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(CHANGE_NOTIFY_CHANNEL).await?;
        info!(channel = CHANGE_NOTIFY_CHANNEL, "Listening for province changes");

        let store = self.clone();
        Ok(tokio::spawn(async move {
            loop {
                match listener.recv().await {
                    Ok(notification) => store.forward(notification.payload()).await,
                    Err(e) => {
                        warn!(error = %e, "Province change listener failed, retrying");
                        tokio::time::sleep(LISTENER_RETRY).await;
                    }
                }
            }
        }))
    }

    async fn forward(&self, payload: &str) {
        let notice: ChangeNotice = match serde_json::from_str(payload) {
            Ok(notice) => notice,
            Err(e) => {
                warn!(error = %e, payload, "Ignoring malformed change notice");
                return;
            }
        };
        if notice.origin == self.origin {
            return;
        }
        match self.get(notice.province_id).await {
            Ok(snapshot) if snapshot.version >= notice.version => self.publish(&snapshot),
            Ok(snapshot) => {
                debug!(
                    province_id = %notice.province_id,
                    notified = notice.version,
                    stored = snapshot.version,
                    "Change notice ahead of the row, ignoring"
                );
            }
            Err(e) => {
                warn!(province_id = %notice.province_id, error = %e, "Could not re-read changed province");
            }
        }
    }

    fn publish(&self, snapshot: &ProvinceSnapshot) {
        let receivers = self
            .changes
            .send(ProvinceChanged::from_snapshot(snapshot.clone()))
            .unwrap_or(0);
        debug!(
            province_id = %snapshot.id,
            version = snapshot.version,
            receivers,
            "Published province change"
        );
    }

    fn notice_payload(&self, snapshot: &ProvinceSnapshot) -> Result<String, StoreError> {
        serde_json::to_string(&ChangeNotice {
            province_id: snapshot.id,
            version: snapshot.version,
            origin: self.origin,
        })
        .map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

fn unavailable(err: sqlx::Error) -> StoreError {
    StoreError::from(DbError::from(err))
}

/// Convert a snapshot version to the `BIGINT` column.
///
/// # Errors
///
/// Returns [`DbError::CorruptRow`] above `i64::MAX`.
pub fn to_db_version(version: u64) -> Result<i64, DbError> {
    i64::try_from(version)
        .ok()
        .ok_or_else(|| DbError::CorruptRow(format!("version {version} exceeds BIGINT")))
}

/// Convert the `BIGINT` column back to a snapshot version.
///
/// # Errors
///
/// Returns [`DbError::CorruptRow`] for a negative value.
pub fn from_db_version(version: i64) -> Result<u64, DbError> {
    u64::try_from(version)
        .ok()
        .ok_or_else(|| DbError::CorruptRow(format!("negative version {version}")))
}

impl ProvinceStore for PgProvinceStore {
    async fn get(&self, province_id: ProvinceId) -> Result<ProvinceSnapshot, StoreError> {
        let row = sqlx::query_as::<_, (Json<ProvinceSnapshot>, i64)>(
            r"SELECT state, version FROM provinces WHERE id = $1",
        )
        .bind(province_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        let (Json(mut snapshot), version) = row.ok_or(StoreError::NotFound(province_id))?;
        // The column is authoritative for the version.
        snapshot.version = from_db_version(version)?;
        Ok(snapshot)
    }

    async fn insert(&self, snapshot: ProvinceSnapshot) -> Result<ProvinceSnapshot, StoreError> {
        let version = to_db_version(snapshot.version)?;
        let payload = self.notice_payload(&snapshot)?;

        let mut tx = self.pool.begin().await.map_err(unavailable)?;
        let inserted = sqlx::query(
            r"INSERT INTO provinces (id, owner_id, name, version, next_turn_at, state)
              VALUES ($1, $2, $3, $4, $5, $6)
              ON CONFLICT (id) DO NOTHING",
        )
        .bind(snapshot.id.into_inner())
        .bind(snapshot.owner_id.into_inner())
        .bind(&snapshot.name)
        .bind(version)
        .bind(snapshot.next_turn_at)
        .bind(Json(&snapshot))
        .execute(&mut *tx)
        .await
        .map_err(unavailable)?;

        if inserted.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists(snapshot.id));
        }

        sqlx::query(r"SELECT pg_notify($1, $2)")
            .bind(CHANGE_NOTIFY_CHANNEL)
            .bind(&payload)
            .execute(&mut *tx)
            .await
            .map_err(unavailable)?;
        tx.commit().await.map_err(unavailable)?;

        debug!(province_id = %snapshot.id, "Inserted province");
        self.publish(&snapshot);
        Ok(snapshot)
    }

    async fn conditional_update(
        &self,
        expected_version: u64,
        snapshot: ProvinceSnapshot,
    ) -> Result<ProvinceSnapshot, StoreError> {
        let province_id = snapshot.id;
        let snapshot = next_version(expected_version, snapshot)?;
        let expected = to_db_version(expected_version)?;
        let version = to_db_version(snapshot.version)?;
        let payload = self.notice_payload(&snapshot)?;

        let mut tx = self.pool.begin().await.map_err(unavailable)?;
        let updated = sqlx::query(
            r"UPDATE provinces
              SET name = $3, version = $4, next_turn_at = $5, state = $6, updated_at = now()
              WHERE id = $1 AND version = $2",
        )
        .bind(province_id.into_inner())
        .bind(expected)
        .bind(&snapshot.name)
        .bind(version)
        .bind(snapshot.next_turn_at)
        .bind(Json(&snapshot))
        .execute(&mut *tx)
        .await
        .map_err(unavailable)?;

        if updated.rows_affected() == 0 {
            let actual = sqlx::query_scalar::<_, i64>(r"SELECT version FROM provinces WHERE id = $1")
                .bind(province_id.into_inner())
                .fetch_optional(&mut *tx)
                .await
                .map_err(unavailable)?
                .ok_or(StoreError::NotFound(province_id))?;
            return Err(StoreError::Conflict {
                province_id,
                expected: expected_version,
                actual: from_db_version(actual)?,
            });
        }

        sqlx::query(r"SELECT pg_notify($1, $2)")
            .bind(CHANGE_NOTIFY_CHANNEL)
            .bind(&payload)
            .execute(&mut *tx)
            .await
            .map_err(unavailable)?;
        tx.commit().await.map_err(unavailable)?;

        self.publish(&snapshot);
        Ok(snapshot)
    }

    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<ProvinceId>, StoreError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r"SELECT id FROM provinces WHERE next_turn_at <= $1 ORDER BY next_turn_at",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;
        Ok(ids.into_iter().map(ProvinceId::from).collect())
    }

    fn subscribe(&self, province_id: ProvinceId) -> ProvinceSubscription {
        ProvinceSubscription::new(province_id, self.changes.subscribe())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn versions_round_trip_through_bigint() {
        assert_eq!(to_db_version(42).unwrap(), 42);
        assert_eq!(from_db_version(42).unwrap(), 42);
        assert!(to_db_version(u64::MAX).is_err());
        assert!(from_db_version(-1).is_err());
    }

    #[test]
    fn change_notice_fits_a_notify_payload() {
        let notice = ChangeNotice {
            province_id: ProvinceId::new(),
            version: u64::MAX,
            origin: Uuid::now_v7(),
        };
        let payload = serde_json::to_string(&notice).unwrap();
        assert!(payload.len() < 8000);
        assert_eq!(serde_json::from_str::<ChangeNotice>(&payload).unwrap(), notice);
    }
}
