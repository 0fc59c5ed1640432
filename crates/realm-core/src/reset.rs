//! Onboarding and reset entry points.
//!
//! A new province, and a province being reset, both start from the same
//! default snapshot: the configured resource floor, no buildings, no
//! units, no spell, and a first turn one interval away. A reset keeps the
//! province's identity (id, owner, name, traits) and goes through the same
//! version-conditioned write as every other mutation.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use realm_economy::{Economy, FormulaError, InvariantViolation, check_invariants, refresh_derived};
use realm_types::{DerivedStats, ProvinceId, ProvinceSnapshot, Resources, Traits, UserId};
use tracing::{info, warn};

use crate::config::{ConfigError, EngineConfig};
use crate::store::{ProvinceStore, StoreError};

/// Failures of the onboarding and reset entry points.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResetError {
    /// The store failed or the province does not exist.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Derived stats could not be computed.
    #[error(transparent)]
    Formula(#[from] FormulaError),

    /// The configured defaults break a province invariant.
    #[error("default province breaks an invariant: {0}")]
    Invariant(#[from] InvariantViolation),

    /// Timestamps left the representable range.
    #[error("time arithmetic overflow scheduling the first turn")]
    TimeOverflow,

    /// Concurrent writers kept winning the race.
    #[error("province {province_id} changed concurrently; reset gave up after {attempts} attempts")]
    Conflict {
        /// The contested province.
        province_id: ProvinceId,
        /// Write attempts made.
        attempts: u32,
    },
}

/// What a fresh province looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvinceDefaults {
    /// Starting resources, including the turn cap.
    pub resources: Resources,
    /// Delay before the first accrued turn.
    pub turn_interval: TimeDelta,
}

impl ProvinceDefaults {
    /// Read defaults from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the turn interval does not fit.
    pub fn from_config(config: &EngineConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            resources: config.starting_resources(),
            turn_interval: config.clock.turn_interval()?,
        })
    }
}

/// The default snapshot for a province with the given identity.
///
/// # Errors
///
/// Returns [`ResetError`] if derived stats overflow, the defaults break
/// an invariant, or the first turn time is out of range.
pub fn default_snapshot(
    economy: &Economy,
    defaults: &ProvinceDefaults,
    identity: ProvinceIdentity,
    now: DateTime<Utc>,
) -> Result<ProvinceSnapshot, ResetError> {
    let next_turn_at = now
        .checked_add_signed(defaults.turn_interval)
        .ok_or(ResetError::TimeOverflow)?;
    let mut snapshot = ProvinceSnapshot {
        id: identity.id,
        owner_id: identity.owner_id,
        name: identity.name,
        traits: identity.traits,
        resources: defaults.resources,
        buildings: BTreeMap::new(),
        units: Vec::new(),
        active_spell: None,
        derived: DerivedStats::default(),
        last_update: now,
        next_turn_at,
        version: 0,
    };
    refresh_derived(economy, &mut snapshot)?;
    check_invariants(economy, &snapshot)?;
    Ok(snapshot)
}

/// The parts of a province that survive a reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvinceIdentity {
    /// Province identifier.
    pub id: ProvinceId,
    /// Owning user.
    pub owner_id: UserId,
    /// Display name.
    pub name: String,
    /// Faction, class, and alignment.
    pub traits: Traits,
}

impl ProvinceIdentity {
    /// Identity for a brand-new province with a fresh id.
    pub fn new(owner_id: UserId, name: String, traits: Traits) -> Self {
        Self {
            id: ProvinceId::new(),
            owner_id,
            name,
            traits,
        }
    }

    /// Identity of an existing snapshot.
    pub fn of(snapshot: &ProvinceSnapshot) -> Self {
        Self {
            id: snapshot.id,
            owner_id: snapshot.owner_id,
            name: snapshot.name.clone(),
            traits: snapshot.traits,
        }
    }
}

/// Creates and resets provinces.
#[derive(Debug)]
pub struct ProvinceLifecycle<S> {
    store: Arc<S>,
    economy: Arc<Economy>,
    defaults: ProvinceDefaults,
    max_attempts: u32,
}

impl<S: ProvinceStore> ProvinceLifecycle<S> {
    /// Create the entry points over a store.
    pub fn new(
        store: Arc<S>,
        economy: Arc<Economy>,
        defaults: ProvinceDefaults,
        max_attempts: u32,
    ) -> Self {
        Self {
            store,
            economy,
            defaults,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Onboard a new province for `owner_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ResetError`] if the default snapshot cannot be built or
    /// the insert fails.
    pub async fn create_province(
        &self,
        owner_id: UserId,
        name: String,
        traits: Traits,
        now: DateTime<Utc>,
    ) -> Result<ProvinceSnapshot, ResetError> {
        let identity = ProvinceIdentity::new(owner_id, name, traits);
        let snapshot = default_snapshot(&self.economy, &self.defaults, identity, now)?;
        let stored = self.store.insert(snapshot).await?;
        info!(
            province_id = %stored.id,
            owner_id = %stored.owner_id,
            faction = ?stored.traits.faction,
            class = ?stored.traits.class,
            "province created"
        );
        Ok(stored)
    }

    /// Return a province to its default state, keeping its identity.
    ///
    /// Resetting twice yields the same defaults both times (apart from
    /// the version counter).
    ///
    /// # Errors
    ///
    /// Returns [`ResetError`] on store failure or when every write attempt
    /// conflicts.
    pub async fn reset_province(
        &self,
        province_id: ProvinceId,
        now: DateTime<Utc>,
    ) -> Result<ProvinceSnapshot, ResetError> {
        for attempt in 1..=self.max_attempts {
            let current = self.store.get(province_id).await?;
            let fresh = default_snapshot(
                &self.economy,
                &self.defaults,
                ProvinceIdentity::of(&current),
                now,
            )?;
            match self.store.conditional_update(current.version, fresh).await {
                Ok(stored) => {
                    info!(%province_id, version = stored.version, attempt, "province reset");
                    return Ok(stored);
                }
                Err(StoreError::Conflict { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }
        warn!(%province_id, attempts = self.max_attempts, "reset abandoned after conflicts");
        Err(ResetError::Conflict {
            province_id,
            attempts: self.max_attempts,
        })
    }
}
