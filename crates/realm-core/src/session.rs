//! Per-session context for a signed-in user.
//!
//! A [`SessionContext`] is created when a session starts and handed by
//! reference to whatever needs it. It owns one [`ProvinceMirror`] per
//! watched province and a background task per mirror that feeds it pushed
//! changes. Ending (or dropping) the session aborts those tasks.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use realm_types::{ActionRequest, ActionResponse, ProvinceId, SessionId, UserId};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::reconcile::ProvinceMirror;
use crate::store::{ProvinceStore, StoreError};
use crate::validator::{ActionError, ActionValidator};

/// A mirror shared between the session and its push watcher.
pub type SharedMirror = Arc<RwLock<ProvinceMirror>>;

/// Failures of session operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The store failed or the province does not exist.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The action could not be executed.
    #[error(transparent)]
    Action(#[from] ActionError),

    /// The province belongs to someone else.
    #[error("province {province_id} is not owned by user {user_id}")]
    NotOwner {
        /// The province asked for.
        province_id: ProvinceId,
        /// The session's user.
        user_id: UserId,
    },

    /// The session is not watching this province.
    #[error("session is not watching province {0}")]
    NotWatching(ProvinceId),
}

#[derive(Debug)]
struct Watch {
    mirror: SharedMirror,
    task: JoinHandle<()>,
}

/// State scoped to one user session.
#[derive(Debug)]
pub struct SessionContext<S> {
    id: SessionId,
    user_id: UserId,
    started_at: DateTime<Utc>,
    store: Arc<S>,
    watches: BTreeMap<ProvinceId, Watch>,
}

impl<S: ProvinceStore> SessionContext<S> {
    /// Start a session for `user_id`.
    pub fn start(user_id: UserId, store: Arc<S>, now: DateTime<Utc>) -> Self {
        let id = SessionId::new();
        info!(session_id = %id, %user_id, "session started");
        Self {
            id,
            user_id,
            started_at: now,
            store,
            watches: BTreeMap::new(),
        }
    }

    /// Session identifier.
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// The signed-in user.
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// When the session started.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Provinces currently watched.
    pub fn watched(&self) -> Vec<ProvinceId> {
        self.watches.keys().copied().collect()
    }

    /// Start mirroring one of the user's provinces.
    ///
    /// Watching a province twice returns the existing mirror.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotOwner`] for someone else's province, or
    /// [`SessionError::Store`] if it cannot be read.
    pub async fn watch(&mut self, province_id: ProvinceId) -> Result<SharedMirror, SessionError> {
        if let Some(watch) = self.watches.get(&province_id) {
            return Ok(Arc::clone(&watch.mirror));
        }

        // Subscribe before reading so no change between the two is lost.
        let mut subscription = self.store.subscribe(province_id);
        let snapshot = self.store.get(province_id).await?;
        if snapshot.owner_id != self.user_id {
            return Err(SessionError::NotOwner {
                province_id,
                user_id: self.user_id,
            });
        }

        let mirror = Arc::new(RwLock::new(ProvinceMirror::new(snapshot)));
        let feed = Arc::clone(&mirror);
        let session_id = self.id;
        let task = tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                let version = event.version;
                let disposition = feed.write().await.apply_push(event);
                debug!(%session_id, %province_id, version, ?disposition, "push received");
            }
        });

        self.watches.insert(
            province_id,
            Watch {
                mirror: Arc::clone(&mirror),
                task,
            },
        );
        debug!(session_id = %self.id, %province_id, "watching province");
        Ok(mirror)
    }

    /// The mirror for a watched province.
    pub fn mirror(&self, province_id: ProvinceId) -> Option<SharedMirror> {
        self.watches
            .get(&province_id)
            .map(|watch| Arc::clone(&watch.mirror))
    }

    /// Submit an action for a watched province and apply the response to
    /// its mirror optimistically.
    ///
    /// A committed action is always returned as such. If the response
    /// cannot be applied to the mirror, the mirror is re-read from the
    /// store instead.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotWatching`] if the province is not
    /// mirrored, or the validator's error.
    pub async fn submit(
        &self,
        validator: &ActionValidator<S>,
        request: &ActionRequest,
        now: DateTime<Utc>,
    ) -> Result<ActionResponse, SessionError> {
        let watch = self
            .watches
            .get(&request.province_id)
            .ok_or(SessionError::NotWatching(request.province_id))?;
        let response = validator.execute(request, now).await?;
        let mut mirror = watch.mirror.write().await;
        if let Err(e) = mirror.apply_response(&response) {
            warn!(
                province_id = %request.province_id,
                error = %e,
                "response does not fit the mirror, refreshing"
            );
            if let Err(e) = mirror.refresh(self.store.as_ref()).await {
                warn!(province_id = %request.province_id, error = %e, "mirror refresh failed");
            }
        }
        drop(mirror);
        Ok(response)
    }

    /// Replace a watched mirror with a fresh read from the store.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotWatching`] or the store's error.
    pub async fn refresh(&self, province_id: ProvinceId) -> Result<(), SessionError> {
        let watch = self
            .watches
            .get(&province_id)
            .ok_or(SessionError::NotWatching(province_id))?;
        watch.mirror.write().await.refresh(self.store.as_ref()).await?;
        Ok(())
    }

    /// Stop watching one province.
    pub fn unwatch(&mut self, province_id: ProvinceId) {
        if let Some(watch) = self.watches.remove(&province_id) {
            watch.task.abort();
        }
    }

    /// End the session, stopping every push watcher.
    pub fn end(mut self) {
        for watch in std::mem::take(&mut self.watches).into_values() {
            watch.task.abort();
        }
        info!(session_id = %self.id, user_id = %self.user_id, "session ended");
    }
}

impl<S> Drop for SessionContext<S> {
    fn drop(&mut self) {
        for watch in self.watches.values() {
            watch.task.abort();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use realm_economy::Economy;
    use realm_types::{ActionParameters, BuildingType};

    use super::*;
    use crate::config::ValidatorConfig;
    use crate::memory_store::MemoryProvinceStore;
    use crate::testing::sample_snapshot;

    async fn wait_for_version(mirror: &SharedMirror, version: u64) {
        for _ in 0..100 {
            if mirror.read().await.authoritative_version() >= version {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn submitted_action_settles_through_push() {
        let store = Arc::new(MemoryProvinceStore::new());
        let now = Utc::now();
        let snapshot = sample_snapshot(now);
        store.insert(snapshot.clone()).await.unwrap();

        let mut session = SessionContext::start(snapshot.owner_id, Arc::clone(&store), now);
        let mirror = session.watch(snapshot.id).await.unwrap();
        let validator = ActionValidator::new(
            Arc::clone(&store),
            Arc::new(Economy::default()),
            &ValidatorConfig::default(),
        );

        let request = ActionRequest {
            province_id: snapshot.id,
            action: ActionParameters::Construct {
                building: BuildingType::Mine,
                quantity: 2,
            },
        };
        let response = session.submit(&validator, &request, now).await.unwrap();
        assert!(response.success);

        wait_for_version(&mirror, 1).await;
        let mirror = mirror.read().await;
        assert_eq!(mirror.authoritative_version(), 1);
        assert!(!mirror.is_provisional());
        assert_eq!(mirror.snapshot(), &store.get(snapshot.id).await.unwrap());
        assert_eq!(mirror.snapshot().building_count(BuildingType::Mine), 12);
    }

    #[tokio::test]
    async fn committed_action_survives_a_stale_mirror() {
        let store = Arc::new(MemoryProvinceStore::new());
        let now = Utc::now();
        let snapshot = sample_snapshot(now);
        store.insert(snapshot.clone()).await.unwrap();

        let mut session = SessionContext::start(snapshot.owner_id, Arc::clone(&store), now);
        let mirror = session.watch(snapshot.id).await.unwrap();
        let mut stale = snapshot.clone();
        stale.resources.gold = 100;
        mirror.write().await.replace(stale);

        let validator = ActionValidator::new(
            Arc::clone(&store),
            Arc::new(Economy::default()),
            &ValidatorConfig::default(),
        );
        let request = ActionRequest {
            province_id: snapshot.id,
            action: ActionParameters::Construct {
                building: BuildingType::Mine,
                quantity: 2,
            },
        };
        let response = session.submit(&validator, &request, now).await.unwrap();
        assert!(response.success);

        wait_for_version(&mirror, 1).await;
        let mirror = mirror.read().await;
        assert_eq!(mirror.authoritative_version(), 1);
        assert!(!mirror.is_provisional());
        assert_eq!(mirror.snapshot(), &store.get(snapshot.id).await.unwrap());
    }

    #[tokio::test]
    async fn foreign_province_cannot_be_watched() {
        let store = Arc::new(MemoryProvinceStore::new());
        let now = Utc::now();
        let snapshot = sample_snapshot(now);
        store.insert(snapshot.clone()).await.unwrap();

        let stranger = UserId::new();
        let mut session = SessionContext::start(stranger, store, now);
        assert_eq!(
            session.watch(snapshot.id).await.unwrap_err(),
            SessionError::NotOwner {
                province_id: snapshot.id,
                user_id: stranger,
            }
        );
        assert!(session.watched().is_empty());
    }

    #[tokio::test]
    async fn actions_need_a_watched_province() {
        let store = Arc::new(MemoryProvinceStore::new());
        let now = Utc::now();
        let snapshot = sample_snapshot(now);
        store.insert(snapshot.clone()).await.unwrap();

        let session = SessionContext::start(snapshot.owner_id, Arc::clone(&store), now);
        let validator = ActionValidator::new(
            Arc::clone(&store),
            Arc::new(Economy::default()),
            &ValidatorConfig::default(),
        );
        let request = ActionRequest {
            province_id: snapshot.id,
            action: ActionParameters::Explore { turns: 1 },
        };
        assert_eq!(
            session.submit(&validator, &request, now).await.unwrap_err(),
            SessionError::NotWatching(snapshot.id)
        );
        assert_eq!(store.get(snapshot.id).await.unwrap().version, 0);
    }

    #[tokio::test]
    async fn outside_changes_reach_the_mirror() {
        let store = Arc::new(MemoryProvinceStore::new());
        let now = Utc::now();
        let snapshot = sample_snapshot(now);
        store.insert(snapshot.clone()).await.unwrap();

        let mut session = SessionContext::start(snapshot.owner_id, Arc::clone(&store), now);
        let mirror = session.watch(snapshot.id).await.unwrap();

        let mut changed = snapshot.clone();
        changed.resources.gold = 7;
        store.conditional_update(0, changed).await.unwrap();

        wait_for_version(&mirror, 1).await;
        assert_eq!(mirror.read().await.snapshot().resources.gold, 7);
        session.end();
    }

    #[tokio::test]
    async fn refresh_reads_the_store() {
        let store = Arc::new(MemoryProvinceStore::new());
        let now = Utc::now();
        let snapshot = sample_snapshot(now);
        store.insert(snapshot.clone()).await.unwrap();

        let mut session = SessionContext::start(snapshot.owner_id, Arc::clone(&store), now);
        let mirror = session.watch(snapshot.id).await.unwrap();
        session.unwatch(snapshot.id);
        assert!(session.refresh(snapshot.id).await.is_err());

        let mirror_again = session.watch(snapshot.id).await.unwrap();
        assert!(!Arc::ptr_eq(&mirror, &mirror_again));
        session.refresh(snapshot.id).await.unwrap();
        assert_eq!(mirror_again.read().await.snapshot(), &snapshot);
    }
}
