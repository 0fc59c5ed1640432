//! Shared fixtures for this crate's unit tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, TimeDelta, Utc};
use realm_economy::{Economy, refresh_derived};
use realm_types::{
    Alignment, BuildingType, Class, DerivedStats, Faction, ProvinceId, ProvinceSnapshot,
    Resources, Traits, UnitRow, UnitType, UserId,
};

use crate::memory_store::MemoryProvinceStore;
use crate::store::{ProvinceStore, ProvinceSubscription, StoreError};

/// A mid-game province that satisfies every invariant. `next_turn_at` is
/// ten minutes after `now`.
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
pub fn sample_snapshot(now: DateTime<Utc>) -> ProvinceSnapshot {
    let mut snapshot = ProvinceSnapshot {
        id: ProvinceId::new(),
        owner_id: UserId::new(),
        name: String::from("Highmoor"),
        traits: Traits {
            faction: Faction::Human,
            class: Class::Architect,
            alignment: Alignment::Neutral,
        },
        resources: Resources {
            gold: 50_000,
            mana: 2_000,
            food: 10_000,
            land: 500,
            population: 5_000,
            turns: 40,
            max_turns: 100,
        },
        buildings: BTreeMap::from([
            (BuildingType::Home, 20),
            (BuildingType::Farm, 20),
            (BuildingType::Mine, 10),
            (BuildingType::Barracks, 2),
            (BuildingType::Wall, 5),
        ]),
        units: vec![UnitRow {
            unit_type: UnitType::Militia,
            quantity: 100,
            defense_percent: 100,
        }],
        active_spell: None,
        derived: DerivedStats::default(),
        last_update: now,
        next_turn_at: now + TimeDelta::seconds(600),
        version: 0,
    };
    refresh_derived(&Economy::default(), &mut snapshot).unwrap();
    snapshot
}

/// A store that lets another writer win the race.
///
/// Before each of the next `interference` conditional updates it rewrites
/// the target row (through `mutation`), which bumps its version and makes
/// the caller's expected version stale.
#[derive(Debug)]
pub struct InterferingStore {
    inner: MemoryProvinceStore,
    interference: AtomicU32,
    mutation: fn(&mut ProvinceSnapshot),
}

impl InterferingStore {
    /// Interfering writes leave the row unchanged apart from its version.
    pub fn new(inner: MemoryProvinceStore, interference: u32) -> Self {
        Self::with_mutation(inner, interference, |_| {})
    }

    /// Interfering writes apply `mutation` to the row.
    pub const fn with_mutation(
        inner: MemoryProvinceStore,
        interference: u32,
        mutation: fn(&mut ProvinceSnapshot),
    ) -> Self {
        Self {
            inner,
            interference: AtomicU32::new(interference),
            mutation,
        }
    }

    async fn interfere(&self, province_id: ProvinceId) -> Result<ProvinceSnapshot, StoreError> {
        let mut row = self.inner.get(province_id).await?;
        let expected = row.version;
        (self.mutation)(&mut row);
        self.inner.conditional_update(expected, row).await
    }
}

impl ProvinceStore for InterferingStore {
    async fn get(&self, province_id: ProvinceId) -> Result<ProvinceSnapshot, StoreError> {
        self.inner.get(province_id).await
    }

    async fn insert(&self, snapshot: ProvinceSnapshot) -> Result<ProvinceSnapshot, StoreError> {
        self.inner.insert(snapshot).await
    }

    async fn conditional_update(
        &self,
        expected_version: u64,
        snapshot: ProvinceSnapshot,
    ) -> Result<ProvinceSnapshot, StoreError> {
        let interfere = self
            .interference
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if interfere {
            self.interfere(snapshot.id).await?;
        }
        self.inner.conditional_update(expected_version, snapshot).await
    }

    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<ProvinceId>, StoreError> {
        self.inner.list_due(now).await
    }

    fn subscribe(&self, province_id: ProvinceId) -> ProvinceSubscription {
        self.inner.subscribe(province_id)
    }
}
