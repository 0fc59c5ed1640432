//! Passive per-turn production.
//!
//! Each accrued turn credits the output of every producing building in the
//! catalog, plus a tax on population, scaled by trait modifiers. Troops eat
//! food each turn; food never drops below zero. Population growth stops at
//! `land × max_population_per_acre`.

use std::collections::BTreeMap;

use realm_types::{ProvinceSnapshot, ResourceKind};
use serde::{Deserialize, Serialize};

use crate::Economy;
use crate::error::FormulaError;
use crate::modifiers::apply_percent;

/// Output of one turn of passive production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TurnYield {
    /// Gold from mines and tax.
    pub gold: u64,
    /// Mana from towers.
    pub mana: u64,
    /// Food grown.
    pub food_produced: u64,
    /// Food eaten by troops.
    pub food_upkeep: u64,
    /// Population growth before the land cap.
    pub population: u64,
}

impl TurnYield {
    /// Field-wise saturating sum, for reporting accumulated production.
    #[must_use]
    pub const fn plus(self, other: Self) -> Self {
        Self {
            gold: self.gold.saturating_add(other.gold),
            mana: self.mana.saturating_add(other.mana),
            food_produced: self.food_produced.saturating_add(other.food_produced),
            food_upkeep: self.food_upkeep.saturating_add(other.food_upkeep),
            population: self.population.saturating_add(other.population),
        }
    }
}

/// Compute one turn of production for the province as it stands.
///
/// # Errors
///
/// Returns [`FormulaError`] on a catalog miss or overflow.
pub fn turn_yield(economy: &Economy, snapshot: &ProvinceSnapshot) -> Result<TurnYield, FormulaError> {
    let overflow = |context| FormulaError::Overflow { context };

    let mut raw: BTreeMap<ResourceKind, u64> = BTreeMap::new();
    for (building, count) in &snapshot.buildings {
        let def = economy.catalog.building(*building)?;
        if let Some(production) = def.production {
            let amount = production
                .amount
                .checked_mul(*count)
                .ok_or_else(|| overflow("building production"))?;
            let slot = raw.entry(production.resource).or_insert(0);
            *slot = slot
                .checked_add(amount)
                .ok_or_else(|| overflow("building production"))?;
        }
    }

    let tax = u128::from(snapshot.resources.population)
        .checked_mul(u128::from(economy.tuning.production.gold_per_1000_population))
        .and_then(|v| v.checked_div(1000))
        .and_then(|v| u64::try_from(v).ok())
        .ok_or_else(|| overflow("population tax"))?;

    let get = |kind| raw.get(&kind).copied().unwrap_or(0);
    let mods = economy.modifiers.combined(snapshot.traits);

    let gold_raw = get(ResourceKind::Gold)
        .checked_add(tax)
        .ok_or_else(|| overflow("gold production"))?;
    let gold = apply_percent(gold_raw, mods.gold_production)?;
    let mana = apply_percent(get(ResourceKind::Mana), mods.mana_production)?;
    let food_produced = apply_percent(get(ResourceKind::Food), mods.food_production)?;

    let food_upkeep = snapshot.units.iter().try_fold(0_u64, |acc, row| {
        let def = economy.catalog.unit(row.unit_type)?;
        def.food_upkeep
            .checked_mul(row.quantity)
            .and_then(|eaten| acc.checked_add(eaten))
            .ok_or_else(|| overflow("food upkeep"))
    })?;

    Ok(TurnYield {
        gold,
        mana,
        food_produced,
        food_upkeep,
        population: get(ResourceKind::Population),
    })
}

/// Apply one turn of production to a snapshot in place.
///
/// Returns the yield that was applied.
///
/// # Errors
///
/// Returns [`FormulaError`] on a catalog miss or overflow.
pub fn apply_turn_production(
    economy: &Economy,
    snapshot: &mut ProvinceSnapshot,
) -> Result<TurnYield, FormulaError> {
    let produced = turn_yield(economy, snapshot)?;
    let overflow = |context| FormulaError::Overflow { context };
    let resources = &mut snapshot.resources;

    resources.gold = resources
        .gold
        .checked_add(produced.gold)
        .ok_or_else(|| overflow("gold total"))?;
    resources.mana = resources
        .mana
        .checked_add(produced.mana)
        .ok_or_else(|| overflow("mana total"))?;
    resources.food = resources
        .food
        .checked_add(produced.food_produced)
        .ok_or_else(|| overflow("food total"))?
        .saturating_sub(produced.food_upkeep);

    let population_cap = resources
        .land
        .saturating_mul(economy.tuning.production.max_population_per_acre);
    if resources.population < population_cap {
        resources.population = resources
            .population
            .saturating_add(produced.population)
            .min(population_cap);
    }

    Ok(produced)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use realm_types::{
        Alignment, BuildingType, Class, DerivedStats, Faction, ProvinceId, Resources, Traits,
        UnitRow, UnitType, UserId,
    };

    use super::*;

    fn province() -> ProvinceSnapshot {
        let now = Utc::now();
        ProvinceSnapshot {
            id: ProvinceId::new(),
            owner_id: UserId::new(),
            name: String::from("Test"),
            traits: Traits {
                faction: Faction::Dwarf,
                class: Class::Architect,
                alignment: Alignment::Neutral,
            },
            resources: Resources {
                gold: 0,
                mana: 0,
                food: 10,
                land: 100,
                population: 1000,
                turns: 0,
                max_turns: 100,
            },
            buildings: BTreeMap::from([
                (BuildingType::Mine, 4),
                (BuildingType::Tower, 2),
                (BuildingType::Farm, 1),
                (BuildingType::Home, 3),
            ]),
            units: vec![UnitRow {
                unit_type: UnitType::Knight,
                quantity: 30,
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
    fn yield_combines_buildings_and_tax() {
        let economy = Economy::default();
        let produced = turn_yield(&economy, &province()).unwrap();
        // 4 mines x 25 + 1000 pop x 20/1000
        assert_eq!(produced.gold, 120);
        assert_eq!(produced.mana, 20);
        assert_eq!(produced.food_produced, 40);
        assert_eq!(produced.food_upkeep, 60);
        assert_eq!(produced.population, 15);
    }

    #[test]
    fn food_saturates_at_zero() {
        let economy = Economy::default();
        let mut snap = province();
        apply_turn_production(&economy, &mut snap).unwrap();
        // 10 + 40 - 60
        assert_eq!(snap.resources.food, 0);
        assert_eq!(snap.resources.gold, 120);
    }

    #[test]
    fn population_growth_stops_at_land_cap() {
        let economy = Economy::default();
        let mut snap = province();
        snap.resources.population = 1995;
        apply_turn_production(&economy, &mut snap).unwrap();
        assert_eq!(snap.resources.population, 2000);
        apply_turn_production(&economy, &mut snap).unwrap();
        assert_eq!(snap.resources.population, 2000);
    }

    #[test]
    fn merchant_collects_more_gold() {
        let economy = Economy::default();
        let mut snap = province();
        snap.traits.class = Class::Merchant;
        let produced = turn_yield(&economy, &snap).unwrap();
        // 120 x 1.10
        assert_eq!(produced.gold, 132);
    }
}
