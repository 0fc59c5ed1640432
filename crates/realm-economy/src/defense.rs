//! Defense power, defense assignment, and defensive spells.
//!
//! Defense power is the sum of each unit's defense times the number of
//! units assigned to defense, scaled up by building, spell, and trait
//! bonuses. At most one defensive spell is ever active; casting a new one
//! replaces the old one.

use std::collections::BTreeMap;

use realm_types::{
    ActiveSpell, BuildingType, DefenseAssignment, ProvinceSnapshot, SpellType, UnitRow, UnitType,
};
use serde::{Deserialize, Serialize};

use crate::Economy;
use crate::error::FormulaError;
use crate::modifiers::apply_percent;
use crate::tuning::DefenseTuning;

/// One unit row's contribution to defense.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefenseContribution {
    /// Defense strength per unit (from the catalog).
    pub defense: u64,
    /// Units owned.
    pub quantity: u64,
    /// Share assigned to defense, in `[0, 100]`.
    pub defense_percent: u8,
}

impl DefenseContribution {
    /// Units actually assigned to defense: `floor(quantity × percent / 100)`.
    ///
    /// # Errors
    ///
    /// Returns [`FormulaError::InvalidPercent`] for a share above 100.
    pub fn assigned_units(&self) -> Result<u64, FormulaError> {
        if self.defense_percent > 100 {
            return Err(FormulaError::InvalidPercent {
                percent: self.defense_percent,
            });
        }
        let assigned = u128::from(self.quantity)
            .checked_mul(u128::from(self.defense_percent))
            .and_then(|v| v.checked_div(100))
            .unwrap_or(0);
        // assigned <= quantity, so it always fits.
        Ok(u64::try_from(assigned).unwrap_or(self.quantity))
    }
}

/// Building-derived defense bonus in percent, capped by tuning.
pub fn building_bonus_percent(wall_count: u64, fortress_count: u64, tuning: &DefenseTuning) -> u64 {
    let basis_points = wall_count
        .saturating_mul(tuning.wall_bonus_bp)
        .saturating_add(fortress_count.saturating_mul(tuning.fortress_bonus_bp));
    basis_points
        .checked_div(100)
        .unwrap_or(0)
        .min(tuning.max_building_bonus_percent)
}

/// Total defense power.
///
/// `Σ defense × assigned`, then scaled by the sum of the building bonus,
/// the active spell bonus, and the faction (trait) bonus.
///
/// # Errors
///
/// Returns [`FormulaError::InvalidPercent`] for a share above 100, or
/// [`FormulaError::Overflow`].
pub fn calculate_defense_power(
    tuning: &DefenseTuning,
    units: &[DefenseContribution],
    wall_count: u64,
    fortress_count: u64,
    active_spell_bonus_percent: u32,
    faction_bonus_percent: i32,
) -> Result<u64, FormulaError> {
    let base = units.iter().try_fold(0_u64, |acc, unit| {
        let assigned = unit.assigned_units()?;
        unit.defense
            .checked_mul(assigned)
            .and_then(|power| acc.checked_add(power))
            .ok_or(FormulaError::Overflow {
                context: "base defense power",
            })
    })?;

    let building = i32::try_from(building_bonus_percent(wall_count, fortress_count, tuning))
        .unwrap_or(i32::MAX);
    let spell = i32::try_from(active_spell_bonus_percent).unwrap_or(i32::MAX);
    let bonus = building
        .saturating_add(spell)
        .saturating_add(faction_bonus_percent);

    apply_percent(base, bonus)
}

/// Defense power of a whole province, gathering inputs from its snapshot.
///
/// # Errors
///
/// Returns [`FormulaError`] on a catalog miss, bad share, or overflow.
pub fn province_defense(economy: &Economy, snapshot: &ProvinceSnapshot) -> Result<u64, FormulaError> {
    let units = snapshot
        .units
        .iter()
        .map(|row| {
            economy.catalog.unit(row.unit_type).map(|def| DefenseContribution {
                defense: def.defense,
                quantity: row.quantity,
                defense_percent: row.defense_percent,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let spell_bonus = match snapshot.active_spell {
        Some(active) => economy.catalog.spell(active.spell)?.defense_bonus_percent,
        None => 0,
    };
    let mods = economy.modifiers.combined(snapshot.traits);

    calculate_defense_power(
        &economy.tuning.defense,
        &units,
        snapshot.building_count(BuildingType::Wall),
        snapshot.building_count(BuildingType::Fortress),
        spell_bonus,
        mods.defense,
    )
}

/// Result of [`validate_defense_assignment`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefenseAssignmentOutcome {
    /// Whether every assignment is acceptable.
    pub success: bool,
    /// The accepted shares, keyed by unit.
    pub assignments: BTreeMap<UnitType, u8>,
    /// Human-readable explanation.
    pub message: String,
}

/// Check requested defense shares against the units a province owns.
///
/// Each share must be within `[0, 100]`, each unit must be owned, and a
/// unit may appear only once.
pub fn validate_defense_assignment(
    units: &[UnitRow],
    requested: &[DefenseAssignment],
) -> DefenseAssignmentOutcome {
    let reject = |message: String| DefenseAssignmentOutcome {
        success: false,
        assignments: BTreeMap::new(),
        message,
    };

    if requested.is_empty() {
        return reject(String::from("No defense assignments given"));
    }

    let mut assignments = BTreeMap::new();
    for assignment in requested {
        if assignment.percent > 100 {
            return reject(format!(
                "Cannot assign {}% of {:?} to defense: at most 100%",
                assignment.percent, assignment.unit_type
            ));
        }
        if !units.iter().any(|row| row.unit_type == assignment.unit_type) {
            return reject(format!("No {:?} units to assign", assignment.unit_type));
        }
        if assignments
            .insert(assignment.unit_type, assignment.percent)
            .is_some()
        {
            return reject(format!(
                "{:?} assigned more than once",
                assignment.unit_type
            ));
        }
    }

    let message = format!("Reassigned defense for {} unit types", assignments.len());
    DefenseAssignmentOutcome {
        success: true,
        assignments,
        message,
    }
}

/// Result of [`validate_spell`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellOutcome {
    /// Whether the spell can be cast.
    pub success: bool,
    /// Mana the spell costs.
    pub mana_cost: u64,
    /// Turns the spell costs.
    pub turns_cost: u32,
    /// The spell as it will be active after casting.
    pub activated: ActiveSpell,
    /// The previously active spell this cast replaces.
    pub replaces: Option<SpellType>,
    /// Human-readable explanation.
    pub message: String,
}

/// Check whether a defensive spell can be cast.
///
/// # Errors
///
/// Returns [`FormulaError::UnknownSpell`] on a catalog miss.
pub fn validate_spell(
    economy: &Economy,
    spell: SpellType,
    mana: u64,
    turns: u32,
    active: Option<ActiveSpell>,
) -> Result<SpellOutcome, FormulaError> {
    let def = economy.catalog.spell(spell)?;
    let activated = ActiveSpell {
        spell,
        remaining_turns: def.duration_turns,
    };
    let replaces = active.map(|a| a.spell);

    let (success, message) = if def.mana_cost > mana {
        (
            false,
            format!(
                "Not enough mana to cast {spell:?}: need {}, have {mana}",
                def.mana_cost
            ),
        )
    } else if def.turns_cost > turns {
        (
            false,
            format!(
                "Not enough turns to cast {spell:?}: need {}, have {turns}",
                def.turns_cost
            ),
        )
    } else {
        let note = replaces.map_or_else(String::new, |old| format!(", replacing {old:?}"));
        (
            true,
            format!(
                "Cast {spell:?} for {} turns{note}",
                def.duration_turns
            ),
        )
    };

    Ok(SpellOutcome {
        success,
        mana_cost: def.mana_cost,
        turns_cost: def.turns_cost,
        activated,
        replaces,
        message,
    })
}
