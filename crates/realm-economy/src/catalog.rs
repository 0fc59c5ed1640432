//! Building, unit, and spell reference data.
//!
//! The catalog is immutable input to every formula. Its values are tuning
//! data supplied by configuration (or the `*_catalog` tables); the numbers
//! in [`Catalog::standard`] are only the out-of-the-box defaults.

use std::collections::BTreeMap;

use realm_types::{BuildingType, ResourceKind, SpellType, UnitType};
use serde::{Deserialize, Serialize};

use crate::error::FormulaError;

/// Per-turn output of one building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Production {
    /// What the building produces.
    pub resource: ResourceKind,
    /// How much each building produces per turn.
    pub amount: u64,
}

/// Catalog entry for one building type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingDef {
    /// Gold per building.
    pub gold_cost: u64,
    /// Turns per building, before construction capacity is applied.
    pub turns_cost: u32,
    /// Acres one building occupies.
    pub land_required: u64,
    /// Passive output, if any.
    #[serde(default)]
    pub production: Option<Production>,
    /// Networth contributed per building.
    #[serde(default)]
    pub networth: u64,
}

/// Catalog entry for one unit type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitDef {
    /// Gold per unit trained.
    pub gold_cost: u64,
    /// Attack strength per unit.
    pub attack: u64,
    /// Defense strength per unit.
    pub defense: u64,
    /// Networth contributed per unit.
    #[serde(default)]
    pub networth: u64,
    /// Food eaten per unit per turn.
    #[serde(default)]
    pub food_upkeep: u64,
}

/// Catalog entry for one defensive spell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellDef {
    /// Mana to cast.
    pub mana_cost: u64,
    /// Turns to cast.
    pub turns_cost: u32,
    /// Defense bonus while active, in percent.
    pub defense_bonus_percent: u32,
    /// Turns the spell stays active.
    pub duration_turns: u32,
}

/// The full reference catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    /// Building definitions.
    pub buildings: BTreeMap<BuildingType, BuildingDef>,
    /// Unit definitions.
    pub units: BTreeMap<UnitType, UnitDef>,
    /// Spell definitions.
    pub spells: BTreeMap<SpellType, SpellDef>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl Catalog {
    /// The default catalog shipped with the engine.
    pub fn standard() -> Self {
        let building = |gold_cost, turns_cost, land_required, production, networth| BuildingDef {
            gold_cost,
            turns_cost,
            land_required,
            production,
            networth,
        };
        let produces = |resource, amount| Some(Production { resource, amount });

        let buildings = BTreeMap::from([
            (BuildingType::Home, building(100, 1, 1, produces(ResourceKind::Population, 5), 5)),
            (BuildingType::Farm, building(150, 1, 1, produces(ResourceKind::Food, 40), 5)),
            (BuildingType::Mine, building(250, 1, 1, produces(ResourceKind::Gold, 25), 5)),
            (BuildingType::Tower, building(300, 1, 1, produces(ResourceKind::Mana, 10), 5)),
            (BuildingType::Barracks, building(400, 1, 1, None, 5)),
            (BuildingType::Wall, building(500, 2, 1, None, 10)),
            (BuildingType::Fortress, building(2000, 4, 4, None, 40)),
        ]);

        let unit = |gold_cost, attack, defense, networth, food_upkeep| UnitDef {
            gold_cost,
            attack,
            defense,
            networth,
            food_upkeep,
        };
        let units = BTreeMap::from([
            (UnitType::Militia, unit(50, 1, 2, 1, 1)),
            (UnitType::Archer, unit(120, 2, 5, 3, 1)),
            (UnitType::Knight, unit(400, 10, 6, 10, 2)),
            (UnitType::Sorcerer, unit(350, 8, 3, 8, 1)),
            (UnitType::Catapult, unit(600, 14, 1, 12, 0)),
        ]);

        let spell = |mana_cost, turns_cost, defense_bonus_percent, duration_turns| SpellDef {
            mana_cost,
            turns_cost,
            defense_bonus_percent,
            duration_turns,
        };
        let spells = BTreeMap::from([
            (SpellType::StoneSkin, spell(50, 1, 10, 12)),
            (SpellType::Barrier, spell(150, 1, 25, 12)),
            (SpellType::Sanctuary, spell(400, 2, 50, 24)),
        ]);

        Self {
            buildings,
            units,
            spells,
        }
    }

    /// Look up a building definition.
    ///
    /// # Errors
    ///
    /// Returns [`FormulaError::UnknownBuilding`] on a catalog miss.
    pub fn building(&self, building: BuildingType) -> Result<&BuildingDef, FormulaError> {
        self.buildings
            .get(&building)
            .ok_or(FormulaError::UnknownBuilding(building))
    }

    /// Look up a unit definition.
    ///
    /// # Errors
    ///
    /// Returns [`FormulaError::UnknownUnit`] on a catalog miss.
    pub fn unit(&self, unit: UnitType) -> Result<&UnitDef, FormulaError> {
        self.units.get(&unit).ok_or(FormulaError::UnknownUnit(unit))
    }

    /// Look up a spell definition.
    ///
    /// # Errors
    ///
    /// Returns [`FormulaError::UnknownSpell`] on a catalog miss.
    pub fn spell(&self, spell: SpellType) -> Result<&SpellDef, FormulaError> {
        self.spells.get(&spell).ok_or(FormulaError::UnknownSpell(spell))
    }

    /// Acres occupied by a set of buildings: `Σ land_required × count`.
    ///
    /// # Errors
    ///
    /// Returns [`FormulaError::UnknownBuilding`] if a counted building is
    /// not in the catalog, or [`FormulaError::Overflow`].
    pub fn land_in_use(&self, buildings: &BTreeMap<BuildingType, u64>) -> Result<u64, FormulaError> {
        buildings.iter().try_fold(0_u64, |acc, (building, count)| {
            let def = self.building(*building)?;
            def.land_required
                .checked_mul(*count)
                .and_then(|used| acc.checked_add(used))
                .ok_or(FormulaError::Overflow {
                    context: "land in use",
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_covers_every_building() {
        let catalog = Catalog::standard();
        for building in BuildingType::ALL {
            assert!(catalog.building(building).is_ok(), "missing {building:?}");
        }
    }

    #[test]
    fn missing_entry_is_a_reference_error() {
        let mut catalog = Catalog::standard();
        catalog.buildings.remove(&BuildingType::Tower);
        assert_eq!(
            catalog.building(BuildingType::Tower),
            Err(FormulaError::UnknownBuilding(BuildingType::Tower))
        );
    }

    #[test]
    fn land_in_use_weights_by_land_required() {
        let catalog = Catalog::standard();
        let buildings = BTreeMap::from([(BuildingType::Farm, 10), (BuildingType::Fortress, 2)]);
        // 10 farms x 1 acre + 2 fortresses x 4 acres
        assert_eq!(catalog.land_in_use(&buildings), Ok(18));
    }

    #[test]
    fn catalog_parses_from_yaml() {
        let yaml = r"
buildings:
  Farm: { gold_cost: 10, turns_cost: 1, land_required: 1, production: { resource: Food, amount: 3 } }
units:
  Militia: { gold_cost: 5, attack: 1, defense: 1 }
spells: {}
";
        let catalog: Catalog = serde_yml::from_str(yaml).unwrap_or_default();
        let farm = catalog.building(BuildingType::Farm).copied();
        assert_eq!(farm.map(|def| def.gold_cost), Ok(10));
        assert!(catalog.building(BuildingType::Mine).is_err());
    }
}
