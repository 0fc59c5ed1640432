//! The persistence interface between the engine and durable storage.
//!
//! [`ProvinceStore`] is the only way the validator, the accrual clock, and
//! the reset entry points touch province rows. Writes are conditional on
//! the row's `version`: a store must refuse a write whose expected version
//! does not match the stored one, and must publish a [`ProvinceChanged`]
//! event for every committed write.

use std::future::Future;

use chrono::{DateTime, Utc};
use realm_types::{ProvinceChanged, ProvinceId, ProvinceSnapshot};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

/// Capacity of the change-event broadcast channel.
///
/// A subscriber that falls further behind than this skips ahead to the
/// newest events. That is harmless: every event carries a full snapshot.
pub const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Errors surfaced by a [`ProvinceStore`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No province with this id exists.
    #[error("province {0} not found")]
    NotFound(ProvinceId),

    /// The stored row's version differs from the expected one.
    #[error("version conflict on province {province_id}: expected {expected}, found {actual}")]
    Conflict {
        /// The province whose write was refused.
        province_id: ProvinceId,
        /// The version the writer read.
        expected: u64,
        /// The version currently stored.
        actual: u64,
    },

    /// A province with this id already exists.
    #[error("province {0} already exists")]
    AlreadyExists(ProvinceId),

    /// The backing store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored row could not be encoded or decoded.
    #[error("snapshot serialization failed: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Whether the failure is a lost optimistic-concurrency race.
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Durable storage for province snapshots.
pub trait ProvinceStore: Send + Sync + 'static {
    /// Read the current snapshot of a province.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown id, or
    /// [`StoreError::Unavailable`] if the store cannot be reached.
    fn get(
        &self,
        province_id: ProvinceId,
    ) -> impl Future<Output = Result<ProvinceSnapshot, StoreError>> + Send;

    /// Insert a brand-new province row.
    ///
    /// The row is stored exactly as given, including its version.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`] if the id is taken.
    fn insert(
        &self,
        snapshot: ProvinceSnapshot,
    ) -> impl Future<Output = Result<ProvinceSnapshot, StoreError>> + Send;

    /// Replace a province row if and only if its stored version equals
    /// `expected_version`.
    ///
    /// The stored row receives version `expected_version + 1` regardless
    /// of the version carried in `snapshot`. Returns the stored row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the versions differ, and
    /// [`StoreError::NotFound`] for an unknown id.
    fn conditional_update(
        &self,
        expected_version: u64,
        snapshot: ProvinceSnapshot,
    ) -> impl Future<Output = Result<ProvinceSnapshot, StoreError>> + Send;

    /// Ids of provinces whose `next_turn_at` is at or before `now`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the store cannot be reached.
    fn list_due(
        &self,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<ProvinceId>, StoreError>> + Send;

    /// Subscribe to committed changes of one province.
    fn subscribe(&self, province_id: ProvinceId) -> ProvinceSubscription;
}

/// Stamp a snapshot with the version that follows `expected_version`.
///
/// # Errors
///
/// Returns [`StoreError::Serialization`] if the version counter would
/// overflow.
pub fn next_version(
    expected_version: u64,
    mut snapshot: ProvinceSnapshot,
) -> Result<ProvinceSnapshot, StoreError> {
    snapshot.version = expected_version
        .checked_add(1)
        .ok_or_else(|| StoreError::Serialization(String::from("version counter overflow")))?;
    Ok(snapshot)
}

/// A stream of [`ProvinceChanged`] events for a single province.
///
/// Wraps a receiver on the store's shared change channel and filters out
/// events for other provinces.
#[derive(Debug)]
pub struct ProvinceSubscription {
    province_id: ProvinceId,
    rx: broadcast::Receiver<ProvinceChanged>,
}

impl ProvinceSubscription {
    /// Wrap a receiver on a store's change channel.
    pub const fn new(province_id: ProvinceId, rx: broadcast::Receiver<ProvinceChanged>) -> Self {
        Self { province_id, rx }
    }

    /// The province this subscription follows.
    pub const fn province_id(&self) -> ProvinceId {
        self.province_id
    }

    /// Wait for the next change to this province.
    ///
    /// Returns `None` once the store has shut down its change channel.
    pub async fn recv(&mut self) -> Option<ProvinceChanged> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.province_id == self.province_id => return Some(event),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    debug!(
                        province_id = %self.province_id,
                        skipped,
                        "change subscriber lagged, skipping ahead"
                    );
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
