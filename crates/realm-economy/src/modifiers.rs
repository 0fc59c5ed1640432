//! Faction, class, and alignment percentage modifiers.
//!
//! Each trait value maps to a [`Modifiers`] record of signed percentages.
//! A province's effective modifiers are the sum over its three traits.
//! Percentages are applied with [`apply_percent`], which floors.

use std::collections::BTreeMap;

use realm_types::{Alignment, Class, Faction, Traits};
use serde::{Deserialize, Serialize};

use crate::error::FormulaError;

/// Signed percentage adjustments. Zero means "no effect".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    /// Applied to construction gold cost.
    pub construction_gold: i32,
    /// Applied to land found while exploring.
    pub exploration_land: i32,
    /// Applied to exploration gold cost.
    pub exploration_gold: i32,
    /// Applied to training gold cost.
    pub training_gold: i32,
    /// Applied to total defense power.
    pub defense: i32,
    /// Applied to gold production.
    pub gold_production: i32,
    /// Applied to mana production.
    pub mana_production: i32,
    /// Applied to food production.
    pub food_production: i32,
}

impl Modifiers {
    /// Field-wise saturating sum.
    #[must_use]
    pub const fn plus(self, other: Self) -> Self {
        Self {
            construction_gold: self.construction_gold.saturating_add(other.construction_gold),
            exploration_land: self.exploration_land.saturating_add(other.exploration_land),
            exploration_gold: self.exploration_gold.saturating_add(other.exploration_gold),
            training_gold: self.training_gold.saturating_add(other.training_gold),
            defense: self.defense.saturating_add(other.defense),
            gold_production: self.gold_production.saturating_add(other.gold_production),
            mana_production: self.mana_production.saturating_add(other.mana_production),
            food_production: self.food_production.saturating_add(other.food_production),
        }
    }
}

/// Lookup tables from trait values to modifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifierTable {
    /// Per-faction modifiers.
    #[serde(default)]
    pub factions: BTreeMap<Faction, Modifiers>,
    /// Per-class modifiers.
    #[serde(default)]
    pub classes: BTreeMap<Class, Modifiers>,
    /// Per-alignment modifiers.
    #[serde(default)]
    pub alignments: BTreeMap<Alignment, Modifiers>,
}

impl Default for ModifierTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl ModifierTable {
    /// The default modifier table shipped with the engine.
    pub fn standard() -> Self {
        let m = Modifiers::default;

        let factions = BTreeMap::from([
            (Faction::Human, Modifiers { gold_production: 5, ..m() }),
            (Faction::Elf, Modifiers { mana_production: 15, defense: -5, ..m() }),
            (Faction::Dwarf, Modifiers { construction_gold: -10, exploration_land: -10, ..m() }),
            (Faction::Orc, Modifiers { training_gold: -15, defense: -5, ..m() }),
            (Faction::Undead, Modifiers { defense: 10, gold_production: -5, ..m() }),
            (Faction::Gnome, Modifiers { exploration_gold: -25, construction_gold: 5, ..m() }),
            (
                Faction::Giant,
                Modifiers { defense: 15, construction_gold: 10, training_gold: 10, ..m() },
            ),
            (Faction::Halfling, Modifiers { exploration_land: 10, defense: -10, ..m() }),
        ]);

        let classes = BTreeMap::from([
            (Class::Explorer, Modifiers { exploration_land: 20, ..m() }),
            (Class::Architect, Modifiers { construction_gold: -10, ..m() }),
            (Class::Warlord, Modifiers { training_gold: -10, ..m() }),
            (Class::Mystic, Modifiers { mana_production: 20, ..m() }),
            (Class::Merchant, Modifiers { gold_production: 10, ..m() }),
        ]);

        let alignments = BTreeMap::from([
            (Alignment::Good, Modifiers { defense: 5, ..m() }),
            (Alignment::Neutral, m()),
            (Alignment::Evil, Modifiers { gold_production: 5, ..m() }),
        ]);

        Self {
            factions,
            classes,
            alignments,
        }
    }

    /// Effective modifiers for a province: faction + class + alignment.
    ///
    /// Traits without a table entry contribute nothing.
    pub fn combined(&self, traits: Traits) -> Modifiers {
        let faction = self.factions.get(&traits.faction).copied().unwrap_or_default();
        let class = self.classes.get(&traits.class).copied().unwrap_or_default();
        let alignment = self
            .alignments
            .get(&traits.alignment)
            .copied()
            .unwrap_or_default();
        faction.plus(class).plus(alignment)
    }
}

/// Scale `value` by `(100 + percent)%`, flooring. Percent is clamped at -100.
///
/// # Errors
///
/// Returns [`FormulaError::Overflow`] if the result exceeds `u64`.
pub fn apply_percent(value: u64, percent: i32) -> Result<u64, FormulaError> {
    let factor = u128::try_from(i64::from(percent).saturating_add(100).max(0)).unwrap_or(0);
    let overflow = FormulaError::Overflow {
        context: "percentage scaling",
    };
    let scaled = u128::from(value)
        .checked_mul(factor)
        .and_then(|v| v.checked_div(100))
        .ok_or_else(|| overflow.clone())?;
    u64::try_from(scaled).map_err(|_err| overflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_percent_floors() {
        assert_eq!(apply_percent(1000, -10), Ok(900));
        assert_eq!(apply_percent(357, 0), Ok(357));
        // 99 * 1.15 = 113.85
        assert_eq!(apply_percent(99, 15), Ok(113));
    }

    #[test]
    fn apply_percent_clamps_at_zero() {
        assert_eq!(apply_percent(500, -100), Ok(0));
        assert_eq!(apply_percent(500, -250), Ok(0));
    }

    #[test]
    fn apply_percent_reports_overflow() {
        assert!(apply_percent(u64::MAX, 50).is_err());
        assert_eq!(apply_percent(u64::MAX, 0), Ok(u64::MAX));
    }

    #[test]
    fn combined_sums_all_three_traits() {
        let table = ModifierTable::standard();
        let mods = table.combined(Traits {
            faction: Faction::Dwarf,
            class: Class::Architect,
            alignment: Alignment::Neutral,
        });
        assert_eq!(mods.construction_gold, -20);
        assert_eq!(mods.exploration_land, -10);
    }

    #[test]
    fn missing_entries_contribute_nothing() {
        let table = ModifierTable {
            factions: BTreeMap::new(),
            classes: BTreeMap::new(),
            alignments: BTreeMap::new(),
        };
        let mods = table.combined(Traits {
            faction: Faction::Elf,
            class: Class::Mystic,
            alignment: Alignment::Evil,
        });
        assert_eq!(mods, Modifiers::default());
    }
}
