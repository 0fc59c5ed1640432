//! Client-side reconciliation of a province snapshot.
//!
//! A [`ProvinceMirror`] holds the presentation layer's copy of one
//! province. Action responses are applied optimistically through the same
//! delta code the validator uses, which marks the mirror provisional.
//! Pushed [`ProvinceChanged`] events then settle it:
//!
//! - a push newer than the last authoritative version always wins;
//! - a push at the same version wins only while the mirror is
//!   provisional, restoring the authoritative row over a guess;
//! - anything older is discarded.
//!
//! A manual refresh replaces the mirror unconditionally.

use realm_types::{ActionDeltas, ActionResponse, ProvinceChanged, ProvinceId, ProvinceSnapshot};
use tracing::debug;

use crate::deltas::{DeltaError, apply_deltas};
use crate::store::{ProvinceStore, StoreError};

/// What a mirror did with a pushed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushDisposition {
    /// The event replaced the mirror.
    Applied,
    /// The event was not newer than what the mirror holds.
    Stale,
    /// The event belongs to a different province.
    ForeignProvince,
}

/// The presentation layer's copy of one province.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvinceMirror {
    snapshot: ProvinceSnapshot,
    authoritative_version: u64,
    provisional: bool,
}

impl ProvinceMirror {
    /// Start mirroring an authoritative snapshot.
    pub const fn new(snapshot: ProvinceSnapshot) -> Self {
        let authoritative_version = snapshot.version;
        Self {
            snapshot,
            authoritative_version,
            provisional: false,
        }
    }

    /// The snapshot as currently displayed.
    pub const fn snapshot(&self) -> &ProvinceSnapshot {
        &self.snapshot
    }

    /// The province this mirror follows.
    pub const fn province_id(&self) -> ProvinceId {
        self.snapshot.id
    }

    /// Version of the last authoritative snapshot applied.
    pub const fn authoritative_version(&self) -> u64 {
        self.authoritative_version
    }

    /// Whether optimistic deltas have been applied since the last
    /// authoritative snapshot.
    pub const fn is_provisional(&self) -> bool {
        self.provisional
    }

    /// Apply an action's deltas ahead of the confirming push.
    ///
    /// All or nothing: on error the mirror is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`DeltaError`] if the deltas do not fit the mirrored
    /// snapshot.
    pub fn apply_optimistic(&mut self, deltas: &ActionDeltas) -> Result<(), DeltaError> {
        let mut next = self.snapshot.clone();
        apply_deltas(&mut next, deltas)?;
        self.snapshot = next;
        self.provisional = true;
        Ok(())
    }

    /// Apply a successful action response optimistically. Rejections
    /// change nothing, and neither does a response whose committed row
    /// the mirror has already received by push.
    ///
    /// The deltas were computed against the server's row, which may be
    /// ahead of the mirror (an accrual push still in flight). When they do
    /// not fit the mirrored snapshot, the committed snapshot carried by the
    /// response replaces the mirror instead.
    ///
    /// # Errors
    ///
    /// Returns [`DeltaError`] only if the deltas do not fit and the
    /// response carries no committed snapshot to fall back on.
    pub fn apply_response(&mut self, response: &ActionResponse) -> Result<(), DeltaError> {
        if !response.success {
            return Ok(());
        }
        let already_pushed = response
            .snapshot
            .as_ref()
            .is_some_and(|committed| committed.version <= self.authoritative_version);
        if already_pushed {
            return Ok(());
        }
        let Some(deltas) = &response.deltas else {
            return Ok(());
        };
        if let Err(e) = self.apply_optimistic(deltas) {
            let Some(committed) = &response.snapshot else {
                return Err(e);
            };
            debug!(
                province_id = %committed.id,
                held = self.authoritative_version,
                committed = committed.version,
                error = %e,
                "deltas do not fit the mirror, taking the committed snapshot"
            );
            self.replace(committed.clone());
        }
        Ok(())
    }

    /// Offer a pushed change to the mirror.
    pub fn apply_push(&mut self, event: ProvinceChanged) -> PushDisposition {
        if event.province_id != self.snapshot.id {
            return PushDisposition::ForeignProvince;
        }
        let newer = event.version > self.authoritative_version;
        let restores = event.version == self.authoritative_version && self.provisional;
        if !(newer || restores) {
            debug!(
                province_id = %event.province_id,
                pushed = event.version,
                held = self.authoritative_version,
                "discarding stale push"
            );
            return PushDisposition::Stale;
        }
        self.replace(event.snapshot);
        PushDisposition::Applied
    }

    /// Replace the mirror with an authoritative snapshot, whatever its
    /// version.
    pub fn replace(&mut self, snapshot: ProvinceSnapshot) {
        self.authoritative_version = snapshot.version;
        self.snapshot = snapshot;
        self.provisional = false;
    }

    /// Re-read the province from the store and replace the mirror.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read fails; the mirror is unchanged.
    pub async fn refresh<S: ProvinceStore>(&mut self, store: &S) -> Result<(), StoreError> {
        let snapshot = store.get(self.snapshot.id).await?;
        self.replace(snapshot);
        Ok(())
    }
}
