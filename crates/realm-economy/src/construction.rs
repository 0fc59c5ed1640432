//! Construction throughput, construction cost, and demolition.

use realm_types::{BuildingType, Traits};
use serde::{Deserialize, Serialize};

use crate::Economy;
use crate::error::FormulaError;
use crate::modifiers::apply_percent;
use crate::tuning::ConstructionTuning;

/// Buildings a province can raise per turn: `max(1, population / population_per_builder)`.
///
/// Monotonically non-decreasing in population. A zero divisor is treated
/// as "unlimited builders per head", which still floors at 1.
pub fn construction_capacity(population: u64, tuning: &ConstructionTuning) -> u64 {
    population
        .checked_div(tuning.population_per_builder)
        .unwrap_or(population)
        .max(1)
}

/// Inputs to [`validate_construction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstructionInput {
    /// What to build.
    pub building: BuildingType,
    /// How many.
    pub quantity: u64,
    /// Gold on hand.
    pub gold: u64,
    /// Turns on hand.
    pub turns: u32,
    /// Acres owned.
    pub land: u64,
    /// Acres already occupied by buildings.
    pub land_in_use: u64,
    /// Population, which sets construction capacity.
    pub population: u64,
    /// Faction, class, and alignment.
    pub traits: Traits,
}

/// Result of [`validate_construction`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructionOutcome {
    /// Whether the province can afford the order.
    pub success: bool,
    /// Gold the order costs after modifiers.
    pub gold_cost: u64,
    /// Turns the order costs after capacity.
    pub turns_cost: u32,
    /// Acres the new buildings occupy.
    pub land_used: u64,
    /// Human-readable explanation.
    pub message: String,
}

/// Price a construction order and check it against the province's means.
///
/// Gold is `unit_gold × quantity` scaled by the `construction_gold`
/// modifier. Turns are `unit_turns × quantity / capacity`, but never less
/// than one building's turns. Failures are reported for gold, then turns,
/// then free land.
///
/// # Errors
///
/// Returns [`FormulaError::InvalidQuantity`] for a zero quantity,
/// [`FormulaError::UnknownBuilding`] on a catalog miss, or
/// [`FormulaError::Overflow`].
pub fn validate_construction(
    economy: &Economy,
    input: &ConstructionInput,
) -> Result<ConstructionOutcome, FormulaError> {
    if input.quantity == 0 {
        return Err(FormulaError::InvalidQuantity { quantity: 0 });
    }
    let def = economy.catalog.building(input.building)?;
    let mods = economy.modifiers.combined(input.traits);
    let capacity = construction_capacity(input.population, &economy.tuning.construction);

    let base_gold = def
        .gold_cost
        .checked_mul(input.quantity)
        .ok_or(FormulaError::Overflow {
            context: "construction gold",
        })?;
    let gold_cost = apply_percent(base_gold, mods.construction_gold)?;

    let batch_turns = u64::from(def.turns_cost)
        .checked_mul(input.quantity)
        .and_then(|t| t.checked_div(capacity))
        .ok_or(FormulaError::Overflow {
            context: "construction turns",
        })?;
    let turns_cost = u32::try_from(batch_turns)
        .ok()
        .ok_or(FormulaError::Overflow {
            context: "construction turns",
        })?
        .max(def.turns_cost);

    let land_used = def
        .land_required
        .checked_mul(input.quantity)
        .ok_or(FormulaError::Overflow {
            context: "construction land",
        })?;
    let free_land = input.land.saturating_sub(input.land_in_use);

    let failure = if gold_cost > input.gold {
        Some(format!(
            "Not enough gold to build {} {:?}: need {gold_cost}, have {}",
            input.quantity, input.building, input.gold
        ))
    } else if turns_cost > input.turns {
        Some(format!(
            "Not enough turns to build {} {:?}: need {turns_cost}, have {}",
            input.quantity, input.building, input.turns
        ))
    } else if land_used > free_land {
        Some(format!(
            "Not enough free land to build {} {:?}: need {land_used} acres, {free_land} free",
            input.quantity, input.building
        ))
    } else {
        None
    };

    let (success, message) = failure.map_or_else(
        || {
            (
                true,
                format!(
                    "Built {} {:?} for {gold_cost} gold and {turns_cost} turns",
                    input.quantity, input.building
                ),
            )
        },
        |reason| (false, reason),
    );

    Ok(ConstructionOutcome {
        success,
        gold_cost,
        turns_cost,
        land_used,
        message,
    })
}

/// Result of [`validate_demolition`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemolitionOutcome {
    /// Whether the demolition can proceed.
    pub success: bool,
    /// Turns the demolition costs (one per building).
    pub turns_cost: u32,
    /// Human-readable explanation.
    pub message: String,
}

/// Check a demolition order. Costs one turn per building demolished.
///
/// # Errors
///
/// Returns [`FormulaError::InvalidQuantity`] for a zero quantity or
/// [`FormulaError::UnknownBuilding`] on a catalog miss.
pub fn validate_demolition(
    economy: &Economy,
    building: BuildingType,
    quantity: u64,
    current_quantity: u64,
    turns: u32,
) -> Result<DemolitionOutcome, FormulaError> {
    if quantity == 0 {
        return Err(FormulaError::InvalidQuantity { quantity: 0 });
    }
    economy.catalog.building(building)?;
    let turns_cost = u32::try_from(quantity).unwrap_or(u32::MAX);

    let outcome = if current_quantity < quantity {
        DemolitionOutcome {
            success: false,
            turns_cost,
            message: format!(
                "Cannot demolish {quantity} {building:?}: only {current_quantity} owned"
            ),
        }
    } else if turns < turns_cost {
        DemolitionOutcome {
            success: false,
            turns_cost,
            message: format!(
                "Not enough turns to demolish {quantity} {building:?}: need {turns_cost}, have {turns}"
            ),
        }
    } else {
        DemolitionOutcome {
            success: true,
            turns_cost,
            message: format!("Demolished {quantity} {building:?} for {turns_cost} turns"),
        }
    };
    Ok(outcome)
}
