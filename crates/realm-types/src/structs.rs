//! Core entity structs: the province snapshot and its parts.
//!
//! The [`ProvinceSnapshot`] is the single shared resource of the engine.
//! It is mutated only by the action validator and the accrual clock, and
//! every committed write bumps [`ProvinceSnapshot::version`] by one.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{Alignment, BuildingType, Class, Faction, SpellType, UnitType};
use crate::ids::{ProvinceId, UserId};

/// The orthogonal player-chosen attributes that modify formula outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Traits {
    /// The province's race.
    pub faction: Faction,
    /// The province's specialisation.
    pub class: Class,
    /// The ruler's alignment.
    pub alignment: Alignment,
}

/// Resource totals held by a province. All values are non-negative by type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Resources {
    /// Currency on hand.
    pub gold: u64,
    /// Magical energy on hand.
    pub mana: u64,
    /// Food stores.
    pub food: u64,
    /// Total acres owned.
    pub land: u64,
    /// Peasant population.
    pub population: u64,
    /// Action budget available right now.
    pub turns: u32,
    /// Upper bound on stored turns.
    pub max_turns: u32,
}

/// One row of a province's army.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct UnitRow {
    /// Which unit this row counts.
    pub unit_type: UnitType,
    /// How many are owned.
    pub quantity: u64,
    /// Share of `quantity` assigned to defense, in `[0, 100]`.
    pub defense_percent: u8,
}

/// The single defensive spell currently in effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ActiveSpell {
    /// Which spell is active.
    pub spell: SpellType,
    /// Turns left before the spell lapses.
    pub remaining_turns: u32,
}

/// Aggregates recomputed from units, buildings, and modifiers.
///
/// Never mutated independently: every write recomputes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DerivedStats {
    /// Ranking score.
    pub networth: u64,
    /// Sum of unit attack values.
    pub total_attack: u64,
    /// Defense power including building and spell bonuses.
    pub total_defense: u64,
}

/// Authoritative state of one province.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ProvinceSnapshot {
    /// Province identifier.
    pub id: ProvinceId,
    /// Owning user.
    pub owner_id: UserId,
    /// Display name.
    pub name: String,
    /// Faction, class, and alignment.
    pub traits: Traits,
    /// Resource totals.
    pub resources: Resources,
    /// Building counts keyed by type. Absent keys mean zero.
    pub buildings: BTreeMap<BuildingType, u64>,
    /// Army rows, at most one per unit type, in acquisition order.
    pub units: Vec<UnitRow>,
    /// The active defensive spell, if any.
    pub active_spell: Option<ActiveSpell>,
    /// Cached aggregates.
    pub derived: DerivedStats,
    /// Wall-clock time of the last committed write.
    pub last_update: DateTime<Utc>,
    /// When the next turn accrues.
    pub next_turn_at: DateTime<Utc>,
    /// Optimistic-concurrency version; increments on every commit.
    pub version: u64,
}

impl ProvinceSnapshot {
    /// Number of buildings of the given type.
    pub fn building_count(&self, building: BuildingType) -> u64 {
        self.buildings.get(&building).copied().unwrap_or(0)
    }

    /// Total number of buildings of every type.
    pub fn total_buildings(&self) -> u64 {
        self.buildings
            .values()
            .fold(0_u64, |acc, count| acc.saturating_add(*count))
    }

    /// The army row for a unit type, if any are owned.
    pub fn unit(&self, unit_type: UnitType) -> Option<&UnitRow> {
        self.units.iter().find(|row| row.unit_type == unit_type)
    }

    /// Number of units of the given type.
    pub fn unit_quantity(&self, unit_type: UnitType) -> u64 {
        self.unit(unit_type).map_or(0, |row| row.quantity)
    }

    /// Total number of units of every type.
    pub fn total_units(&self) -> u64 {
        self.units
            .iter()
            .fold(0_u64, |acc, row| acc.saturating_add(row.quantity))
    }
}

/// Event emitted by the persistence boundary whenever a province row changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ProvinceChanged {
    /// The province that changed.
    pub province_id: ProvinceId,
    /// Version of the row after the change.
    pub version: u64,
    /// The full updated snapshot.
    pub snapshot: ProvinceSnapshot,
}

impl ProvinceChanged {
    /// Build the event for a freshly committed snapshot.
    pub fn from_snapshot(snapshot: ProvinceSnapshot) -> Self {
        Self {
            province_id: snapshot.id,
            version: snapshot.version,
            snapshot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ProvinceSnapshot {
        let now = Utc::now();
        ProvinceSnapshot {
            id: ProvinceId::new(),
            owner_id: UserId::new(),
            name: String::from("Avalon"),
            traits: Traits {
                faction: Faction::Dwarf,
                class: Class::Architect,
                alignment: Alignment::Good,
            },
            resources: Resources::default(),
            buildings: BTreeMap::from([(BuildingType::Farm, 4), (BuildingType::Home, 6)]),
            units: vec![
                UnitRow {
                    unit_type: UnitType::Militia,
                    quantity: 30,
                    defense_percent: 100,
                },
                UnitRow {
                    unit_type: UnitType::Archer,
                    quantity: 12,
                    defense_percent: 50,
                },
            ],
            active_spell: None,
            derived: DerivedStats::default(),
            last_update: now,
            next_turn_at: now,
            version: 0,
        }
    }

    #[test]
    fn counts_default_to_zero() {
        let snap = sample();
        assert_eq!(snap.building_count(BuildingType::Farm), 4);
        assert_eq!(snap.building_count(BuildingType::Fortress), 0);
        assert_eq!(snap.unit_quantity(UnitType::Knight), 0);
    }

    #[test]
    fn totals_sum_rows() {
        let snap = sample();
        assert_eq!(snap.total_buildings(), 10);
        assert_eq!(snap.total_units(), 42);
    }

    #[test]
    fn change_event_carries_version() {
        let mut snap = sample();
        snap.version = 7;
        let event = ProvinceChanged::from_snapshot(snap.clone());
        assert_eq!(event.version, 7);
        assert_eq!(event.province_id, snap.id);
    }
}
