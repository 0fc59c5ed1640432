//! Derived aggregates and province invariants.
//!
//! Networth, total attack, and total defense are recomputed from units,
//! buildings, and modifiers after every mutation. [`check_invariants`] is
//! the gate every write passes before it is committed.

use std::collections::BTreeSet;

use realm_types::{DerivedStats, ProvinceSnapshot};

use crate::Economy;
use crate::defense::province_defense;
use crate::error::{FormulaError, InvariantViolation};

/// Recompute networth, total attack, and total defense.
///
/// # Errors
///
/// Returns [`FormulaError`] on a catalog miss or overflow.
pub fn derive_stats(economy: &Economy, snapshot: &ProvinceSnapshot) -> Result<DerivedStats, FormulaError> {
    let overflow = |context| FormulaError::Overflow { context };

    let land_worth = snapshot
        .resources
        .land
        .checked_mul(economy.tuning.networth.per_acre)
        .ok_or_else(|| overflow("land networth"))?;

    let building_worth = snapshot.buildings.iter().try_fold(0_u64, |acc, (building, count)| {
        let def = economy.catalog.building(*building)?;
        def.networth
            .checked_mul(*count)
            .and_then(|worth| acc.checked_add(worth))
            .ok_or_else(|| overflow("building networth"))
    })?;

    let (unit_worth, total_attack) =
        snapshot
            .units
            .iter()
            .try_fold((0_u64, 0_u64), |(worth, attack), row| {
                let def = economy.catalog.unit(row.unit_type)?;
                let worth = def
                    .networth
                    .checked_mul(row.quantity)
                    .and_then(|w| worth.checked_add(w))
                    .ok_or_else(|| overflow("unit networth"))?;
                let attack = def
                    .attack
                    .checked_mul(row.quantity)
                    .and_then(|a| attack.checked_add(a))
                    .ok_or_else(|| overflow("total attack"))?;
                Ok::<_, FormulaError>((worth, attack))
            })?;

    let networth = land_worth
        .checked_add(building_worth)
        .and_then(|n| n.checked_add(unit_worth))
        .ok_or_else(|| overflow("networth"))?;

    Ok(DerivedStats {
        networth,
        total_attack,
        total_defense: province_defense(economy, snapshot)?,
    })
}

/// Recompute and store the derived aggregates on a snapshot.
///
/// # Errors
///
/// Returns [`FormulaError`] on a catalog miss or overflow.
pub fn refresh_derived(economy: &Economy, snapshot: &mut ProvinceSnapshot) -> Result<(), FormulaError> {
    snapshot.derived = derive_stats(economy, snapshot)?;
    Ok(())
}

/// Verify the invariants that must hold after every mutation.
///
/// Resource non-negativity is guaranteed by the unsigned field types.
///
/// # Errors
///
/// Returns the first [`InvariantViolation`] found.
pub fn check_invariants(economy: &Economy, snapshot: &ProvinceSnapshot) -> Result<(), InvariantViolation> {
    let resources = &snapshot.resources;
    if resources.turns > resources.max_turns {
        return Err(InvariantViolation::TurnsOverCap {
            turns: resources.turns,
            max_turns: resources.max_turns,
        });
    }

    let used = economy.catalog.land_in_use(&snapshot.buildings)?;
    if used > resources.land {
        return Err(InvariantViolation::LandOverused {
            used,
            land: resources.land,
        });
    }

    let mut seen = BTreeSet::new();
    for row in &snapshot.units {
        if row.defense_percent > 100 {
            return Err(InvariantViolation::DefenseShareOutOfRange {
                unit_type: row.unit_type,
                percent: row.defense_percent,
            });
        }
        if !seen.insert(row.unit_type) {
            return Err(InvariantViolation::DuplicateUnitRow(row.unit_type));
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;
    use realm_types::{
        ActiveSpell, Alignment, BuildingType, Class, Faction, ProvinceId, Resources, SpellType,
        Traits, UnitRow, UnitType, UserId,
    };

    use super::*;

    fn province() -> ProvinceSnapshot {
        let now = Utc::now();
        ProvinceSnapshot {
            id: ProvinceId::new(),
            owner_id: UserId::new(),
            name: String::from("Test"),
            traits: Traits {
                faction: Faction::Human,
                class: Class::Merchant,
                alignment: Alignment::Neutral,
            },
            resources: Resources {
                gold: 0,
                mana: 0,
                food: 0,
                land: 200,
                population: 0,
                turns: 10,
                max_turns: 100,
            },
            buildings: BTreeMap::from([(BuildingType::Farm, 10), (BuildingType::Wall, 100)]),
            units: vec![UnitRow {
                unit_type: UnitType::Archer,
                quantity: 10,
                defense_percent: 100,
            }],
            active_spell: None,
            derived: DerivedStats::default(),
            last_update: now,
            next_turn_at: now,
            version: 0,
        }
    }

    #[test]
    fn derived_stats_aggregate_holdings() {
        let economy = Economy::default();
        let stats = derive_stats(&economy, &province()).unwrap();
        // 200 acres x 20 + 10 farms x 5 + 100 walls x 10 + 10 archers x 3
        assert_eq!(stats.networth, 5080);
        assert_eq!(stats.total_attack, 20);
        // 10 archers x 5 defense, +10% from walls
        assert_eq!(stats.total_defense, 55);
    }

    #[test]
    fn active_spell_raises_defense() {
        let economy = Economy::default();
        let mut snap = province();
        snap.active_spell = Some(ActiveSpell {
            spell: SpellType::Barrier,
            remaining_turns: 5,
        });
        let stats = derive_stats(&economy, &snap).unwrap();
        // 50 x (100 + 10 + 25)%
        assert_eq!(stats.total_defense, 67);
    }

    #[test]
    fn invariants_hold_for_a_valid_province() {
        let economy = Economy::default();
        assert!(check_invariants(&economy, &province()).is_ok());
    }

    #[test]
    fn invariants_catch_overused_land() {
        let economy = Economy::default();
        let mut snap = province();
        snap.resources.land = 50;
        assert_eq!(
            check_invariants(&economy, &snap),
            Err(InvariantViolation::LandOverused {
                used: 110,
                land: 50
            })
        );
    }

    #[test]
    fn invariants_catch_turns_over_cap() {
        let economy = Economy::default();
        let mut snap = province();
        snap.resources.turns = 101;
        assert!(matches!(
            check_invariants(&economy, &snap),
            Err(InvariantViolation::TurnsOverCap { .. })
        ));
    }

    #[test]
    fn invariants_catch_duplicate_rows() {
        let economy = Economy::default();
        let mut snap = province();
        snap.units.push(UnitRow {
            unit_type: UnitType::Archer,
            quantity: 1,
            defense_percent: 0,
        });
        assert_eq!(
            check_invariants(&economy, &snap),
            Err(InvariantViolation::DuplicateUnitRow(UnitType::Archer))
        );
    }
}
