//! The turn accrual clock.
//!
//! Turns are not granted by a global tick. Each province carries its own
//! `next_turn_at`; when the wall clock passes it, every elapsed period is
//! consumed at once: up to `max_turns - turns` turns are credited, passive
//! production runs once per credited turn, and `next_turn_at` advances by
//! the full number of periods. A province sitting at its cap therefore
//! builds no backlog.
//!
//! Ticks run from the background scheduler and lazily whenever the API
//! reads a province. Both go through [`TurnClock::tick_province`], whose
//! write is conditioned on the row version. When a write loses the race
//! the clock re-reads the row: a moved `next_turn_at` means another tick
//! already did the work and this one is skipped. Otherwise an action got
//! in between and the tick is recomputed against the fresh row.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use realm_economy::{
    Economy, FormulaError, InvariantViolation, TurnYield, apply_turn_production,
    check_invariants, refresh_derived,
};
use realm_types::{ProvinceId, ProvinceSnapshot};
use tracing::{debug, info, warn};

use crate::config::ClockConfig;
use crate::store::{ProvinceStore, StoreError};

/// Failures of an accrual tick.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccrualError {
    /// The store failed or the province does not exist.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Production could not be computed.
    #[error(transparent)]
    Formula(#[from] FormulaError),

    /// The accrued snapshot would break a province invariant.
    #[error("accrual would break a province invariant: {0}")]
    Invariant(#[from] InvariantViolation),

    /// The configured interval is not positive.
    #[error("turn interval must be positive")]
    InvalidInterval,

    /// Timestamps left the representable range.
    #[error("time arithmetic overflow computing {0}")]
    TimeOverflow(&'static str),
}

/// The result of accruing one province, not yet committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accrual {
    /// Whole intervals consumed.
    pub periods: u64,
    /// Turns actually added (limited by the cap).
    pub turns_credited: u32,
    /// Production summed over the credited turns.
    pub production: TurnYield,
    /// The snapshot after accrual.
    pub snapshot: ProvinceSnapshot,
}

/// Compute the accrual owed to `snapshot` at `now`.
///
/// Returns `None` when `now` is before `next_turn_at`.
///
/// # Errors
///
/// Returns [`AccrualError`] for a non-positive interval, time overflow,
/// production overflow, or an invariant breach in the result.
pub fn accrue(
    economy: &Economy,
    snapshot: &ProvinceSnapshot,
    now: DateTime<Utc>,
    interval: TimeDelta,
) -> Result<Option<Accrual>, AccrualError> {
    if now < snapshot.next_turn_at {
        return Ok(None);
    }
    let interval_ms = u64::try_from(interval.num_milliseconds())
        .ok()
        .filter(|ms| *ms > 0)
        .ok_or(AccrualError::InvalidInterval)?;
    let elapsed = now.signed_duration_since(snapshot.next_turn_at);
    let elapsed_ms = u64::try_from(elapsed.num_milliseconds())
        .map_err(|_err| AccrualError::TimeOverflow("elapsed time"))?;

    let periods = elapsed_ms
        .checked_div(interval_ms)
        .and_then(|whole| whole.checked_add(1))
        .ok_or(AccrualError::TimeOverflow("elapsed periods"))?;

    let resources = snapshot.resources;
    let room = resources.max_turns.saturating_sub(resources.turns);
    let turns_credited = u32::try_from(periods).map_or(room, |p| p.min(room));

    let mut next = snapshot.clone();
    let mut production = TurnYield::default();
    for _ in 0..turns_credited {
        production = production.plus(apply_turn_production(economy, &mut next)?);
    }
    next.resources.turns = resources.turns.saturating_add(turns_credited);

    // Spells run on elapsed periods, so they also wear off at the turn cap.
    let spell_periods = u32::try_from(periods).unwrap_or(u32::MAX);
    next.active_spell = next.active_spell.and_then(|mut spell| {
        spell.remaining_turns = spell.remaining_turns.saturating_sub(spell_periods);
        (spell.remaining_turns > 0).then_some(spell)
    });

    let advance = interval_ms
        .checked_mul(periods)
        .and_then(|ms| i64::try_from(ms).ok())
        .and_then(TimeDelta::try_milliseconds)
        .ok_or(AccrualError::TimeOverflow("next turn offset"))?;
    next.next_turn_at = snapshot
        .next_turn_at
        .checked_add_signed(advance)
        .ok_or(AccrualError::TimeOverflow("next turn time"))?;
    next.last_update = now;

    refresh_derived(economy, &mut next)?;
    check_invariants(economy, &next)?;

    Ok(Some(Accrual {
        periods,
        turns_credited,
        production,
        snapshot: next,
    }))
}

/// What a tick did to one province.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The province's next turn is still in the future.
    NotDue,
    /// Accrual was committed.
    Committed {
        /// Whole intervals consumed.
        periods: u64,
        /// Turns added.
        turns_credited: u32,
        /// The committed row.
        snapshot: Box<ProvinceSnapshot>,
    },
    /// Another tick already accrued these periods, or the row kept
    /// changing; the next pass picks up anything left.
    Skipped,
}

/// Tally of one scheduler pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    /// Provinces listed as due.
    pub due: usize,
    /// Provinces whose accrual was committed.
    pub committed: usize,
    /// Provinces left to another tick.
    pub skipped: usize,
    /// Provinces that turned out not to be due.
    pub not_due: usize,
    /// Provinces whose tick failed.
    pub failed: usize,
}

/// Credits turns and production to provinces as time passes.
#[derive(Debug)]
pub struct TurnClock<S> {
    store: Arc<S>,
    economy: Arc<Economy>,
    interval: TimeDelta,
    max_attempts: u32,
}

impl<S: ProvinceStore> TurnClock<S> {
    /// Create a clock over a store.
    ///
    /// # Errors
    ///
    /// Returns [`AccrualError::InvalidInterval`] if the configured interval
    /// is zero or does not fit a [`TimeDelta`].
    pub fn new(
        store: Arc<S>,
        economy: Arc<Economy>,
        config: &ClockConfig,
    ) -> Result<Self, AccrualError> {
        let interval = config
            .turn_interval()
            .map_err(|_err| AccrualError::InvalidInterval)?;
        if interval <= TimeDelta::zero() {
            return Err(AccrualError::InvalidInterval);
        }
        Ok(Self {
            store,
            economy,
            interval,
            max_attempts: config.max_tick_attempts.max(1),
        })
    }

    /// The accrual period.
    pub const fn interval(&self) -> TimeDelta {
        self.interval
    }

    /// Accrue one province if it is due.
    ///
    /// # Errors
    ///
    /// Returns [`AccrualError`] on store failure or a formula error.
    pub async fn tick_province(
        &self,
        province_id: ProvinceId,
        now: DateTime<Utc>,
    ) -> Result<TickOutcome, AccrualError> {
        let mut current = self.store.get(province_id).await?;

        for attempt in 1..=self.max_attempts {
            let Some(accrual) = accrue(&self.economy, &current, now, self.interval)? else {
                return Ok(TickOutcome::NotDue);
            };

            match self
                .store
                .conditional_update(current.version, accrual.snapshot)
                .await
            {
                Ok(committed) => {
                    debug!(
                        %province_id,
                        periods = accrual.periods,
                        turns_credited = accrual.turns_credited,
                        gold = accrual.production.gold,
                        version = committed.version,
                        "turns accrued"
                    );
                    return Ok(TickOutcome::Committed {
                        periods: accrual.periods,
                        turns_credited: accrual.turns_credited,
                        snapshot: Box::new(committed),
                    });
                }
                Err(StoreError::Conflict { .. }) => {
                    let fresh = self.store.get(province_id).await?;
                    if fresh.next_turn_at != current.next_turn_at {
                        debug!(%province_id, attempt, "another tick accrued first, skipping");
                        return Ok(TickOutcome::Skipped);
                    }
                    debug!(%province_id, attempt, "action landed during tick, recomputing");
                    current = fresh;
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!(
            %province_id,
            attempts = self.max_attempts,
            "tick kept conflicting, leaving it to the next pass"
        );
        Ok(TickOutcome::Skipped)
    }

    /// Accrue every province that is due at `now`.
    ///
    /// Per-province failures are logged and counted, not propagated.
    ///
    /// # Errors
    ///
    /// Returns [`AccrualError::Store`] if the due list cannot be read.
    pub async fn tick_due(&self, now: DateTime<Utc>) -> Result<TickReport, AccrualError> {
        let due = self.store.list_due(now).await?;
        let mut report = TickReport {
            due: due.len(),
            ..TickReport::default()
        };

        for province_id in due {
            match self.tick_province(province_id, now).await {
                Ok(TickOutcome::Committed { .. }) => {
                    report.committed = report.committed.saturating_add(1);
                }
                Ok(TickOutcome::Skipped) => report.skipped = report.skipped.saturating_add(1),
                Ok(TickOutcome::NotDue) => report.not_due = report.not_due.saturating_add(1),
                Err(e) => {
                    warn!(%province_id, error = %e, "accrual tick failed");
                    report.failed = report.failed.saturating_add(1);
                }
            }
        }

        if report.committed > 0 || report.failed > 0 {
            info!(
                due = report.due,
                committed = report.committed,
                skipped = report.skipped,
                failed = report.failed,
                "accrual pass complete"
            );
        }
        Ok(report)
    }
}
