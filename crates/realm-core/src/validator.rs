//! The action validator: the only path by which players mutate a province.
//!
//! One invocation runs a small state machine:
//!
//! ```text
//! validating --(rejected by a formula)--------------> rejected
//!     |
//!     +--> committing --(conditional write ok)------> applied
//!              |
//!              +--(version moved)--> validating      (bounded)
//!              +--(attempts exhausted)-------------> conflict
//! ```
//!
//! Validation always runs against a freshly read snapshot, and the write
//! is conditioned on the version of that snapshot, so two concurrent
//! actions can never both spend the same resources.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use realm_economy::{Economy, FormulaError, InvariantViolation, check_invariants, refresh_derived};
use realm_types::{ActionRequest, ActionResponse, ProvinceId};
use tracing::{debug, info, warn};

use crate::config::ValidatorConfig;
use crate::deltas::{DeltaError, apply_deltas};
use crate::plan::{ActionPlan, plan_action};
use crate::store::{ProvinceStore, StoreError};

/// Phases an action passes through, used for structured logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionPhase {
    /// Reading the snapshot and running the formula.
    Validating,
    /// Issuing the conditional write.
    Committing,
    /// The write landed.
    Applied,
    /// A formula refused the action; nothing was written.
    Rejected,
    /// Every write attempt lost a race.
    Conflict,
}

impl ActionPhase {
    /// Lowercase name used in log fields.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::Committing => "committing",
            Self::Applied => "applied",
            Self::Rejected => "rejected",
            Self::Conflict => "conflict",
        }
    }
}

impl fmt::Display for ActionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fatal failures of an action invocation.
///
/// A rejected action is not an error: it comes back as an
/// [`ActionResponse`] with `success: false`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    /// The store failed or the province does not exist.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Malformed input or arithmetic overflow in a formula.
    #[error(transparent)]
    Formula(#[from] FormulaError),

    /// The planned deltas did not fit the snapshot.
    #[error("action deltas could not be applied: {0}")]
    Delta(#[from] DeltaError),

    /// The resulting snapshot would break a province invariant.
    #[error("action would break a province invariant: {0}")]
    Invariant(#[from] InvariantViolation),

    /// Concurrent writers kept winning the race.
    #[error("province {province_id} changed concurrently; gave up after {attempts} attempts")]
    Conflict {
        /// The contested province.
        province_id: ProvinceId,
        /// Write attempts made.
        attempts: u32,
    },
}

/// Validates actions against the current snapshot and commits their deltas.
#[derive(Debug)]
pub struct ActionValidator<S> {
    store: Arc<S>,
    economy: Arc<Economy>,
    max_attempts: u32,
}

impl<S: ProvinceStore> ActionValidator<S> {
    /// Create a validator over a store.
    pub fn new(store: Arc<S>, economy: Arc<Economy>, config: &ValidatorConfig) -> Self {
        Self {
            store,
            economy,
            max_attempts: config.max_commit_attempts.max(1),
        }
    }

    /// Conditional-write attempts before reporting a conflict.
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Execute one action.
    ///
    /// Returns `Ok` with `success: true` and the committed snapshot when
    /// the action was applied, or `Ok` with `success: false` when a
    /// formula rejected it. In the latter case nothing was written.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError`] for store failures, malformed input,
    /// invariant breaches, or when every write attempt conflicts.
    pub async fn execute(
        &self,
        request: &ActionRequest,
        now: DateTime<Utc>,
    ) -> Result<ActionResponse, ActionError> {
        let province_id = request.province_id;
        let action_type = request.action.action_type();

        for attempt in 1..=self.max_attempts {
            debug!(
                %province_id,
                %action_type,
                attempt,
                phase = %ActionPhase::Validating,
                "action phase"
            );
            let current = self.store.get(province_id).await?;

            let (deltas, message) = match plan_action(&self.economy, &current, &request.action)? {
                ActionPlan::Apply { deltas, message } => (deltas, message),
                ActionPlan::Reject { message } => {
                    info!(
                        %province_id,
                        %action_type,
                        attempt,
                        phase = %ActionPhase::Rejected,
                        reason = %message,
                        "action rejected"
                    );
                    return Ok(ActionResponse::rejected(message));
                }
            };

            let mut next = current.clone();
            apply_deltas(&mut next, &deltas)?;
            next.last_update = now;
            refresh_derived(&self.economy, &mut next)?;
            check_invariants(&self.economy, &next)?;

            debug!(
                %province_id,
                %action_type,
                attempt,
                expected_version = current.version,
                phase = %ActionPhase::Committing,
                "action phase"
            );
            match self.store.conditional_update(current.version, next).await {
                Ok(committed) => {
                    info!(
                        %province_id,
                        %action_type,
                        attempt,
                        version = committed.version,
                        phase = %ActionPhase::Applied,
                        "action applied"
                    );
                    return Ok(ActionResponse::applied(message, deltas, committed));
                }
                Err(StoreError::Conflict { actual, .. }) => {
                    debug!(
                        %province_id,
                        %action_type,
                        attempt,
                        expected_version = current.version,
                        actual_version = actual,
                        "version moved under action, revalidating"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!(
            %province_id,
            %action_type,
            attempts = self.max_attempts,
            phase = %ActionPhase::Conflict,
            "action abandoned after repeated conflicts"
        );
        Err(ActionError::Conflict {
            province_id,
            attempts: self.max_attempts,
        })
    }
}
