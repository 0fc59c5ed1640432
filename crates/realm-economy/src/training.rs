//! Troop training: converting population and gold into units.

use realm_types::{Traits, UnitType};
use serde::{Deserialize, Serialize};

use crate::Economy;
use crate::error::FormulaError;
use crate::modifiers::apply_percent;

/// Inputs to [`validate_training`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainingInput {
    /// What to recruit.
    pub unit: UnitType,
    /// How many.
    pub quantity: u64,
    /// Gold on hand.
    pub gold: u64,
    /// Turns on hand.
    pub turns: u32,
    /// Population available to recruit from.
    pub population: u64,
    /// Barracks owned.
    pub barracks: u64,
    /// Units of every type already owned.
    pub units_owned: u64,
    /// Faction, class, and alignment.
    pub traits: Traits,
}

/// Result of [`validate_training`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingOutcome {
    /// Whether the order can proceed.
    pub success: bool,
    /// Gold the order costs after modifiers.
    pub gold_cost: u64,
    /// Turns the order costs.
    pub turns_cost: u32,
    /// Peasants drafted.
    pub population_used: u64,
    /// Human-readable explanation.
    pub message: String,
}

/// Units a province can house: base housing plus a fixed amount per barracks.
pub fn unit_housing(economy: &Economy, barracks: u64) -> u64 {
    let tuning = &economy.tuning.training;
    tuning
        .base_unit_housing
        .saturating_add(barracks.saturating_mul(tuning.units_per_barracks))
}

/// Price a training order and check it against the province's means.
///
/// # Errors
///
/// Returns [`FormulaError::InvalidQuantity`] for a zero quantity,
/// [`FormulaError::UnknownUnit`] on a catalog miss, or
/// [`FormulaError::Overflow`].
pub fn validate_training(
    economy: &Economy,
    input: &TrainingInput,
) -> Result<TrainingOutcome, FormulaError> {
    if input.quantity == 0 {
        return Err(FormulaError::InvalidQuantity { quantity: 0 });
    }
    let def = economy.catalog.unit(input.unit)?;
    let mods = economy.modifiers.combined(input.traits);

    let base_gold = def
        .gold_cost
        .checked_mul(input.quantity)
        .ok_or(FormulaError::Overflow {
            context: "training gold",
        })?;
    let gold_cost = apply_percent(base_gold, mods.training_gold)?;
    let turns_cost = economy.tuning.training.turns_per_batch;
    let housing = unit_housing(economy, input.barracks);
    let free_housing = housing.saturating_sub(input.units_owned);

    let (success, message) = if gold_cost > input.gold {
        (
            false,
            format!(
                "Not enough gold to train {} {:?}: need {gold_cost}, have {}",
                input.quantity, input.unit, input.gold
            ),
        )
    } else if turns_cost > input.turns {
        (
            false,
            format!(
                "Not enough turns to train {:?}: need {turns_cost}, have {}",
                input.unit, input.turns
            ),
        )
    } else if input.quantity > input.population {
        (
            false,
            format!(
                "Not enough population to train {} {:?}: have {}",
                input.quantity, input.unit, input.population
            ),
        )
    } else if input.quantity > free_housing {
        (
            false,
            format!(
                "Not enough barracks space for {} {:?}: {free_housing} free",
                input.quantity, input.unit
            ),
        )
    } else {
        (
            true,
            format!(
                "Trained {} {:?} for {gold_cost} gold",
                input.quantity, input.unit
            ),
        )
    };

    Ok(TrainingOutcome {
        success,
        gold_cost,
        turns_cost,
        population_used: input.quantity,
        message,
    })
}
