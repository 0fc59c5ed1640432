//! Exploration: spending turns to find new land.
//!
//! Land found per turn follows a diminishing-returns curve, so large
//! provinces find proportionally less land than small ones:
//!
//! ```text
//! land_per_turn = floor(numerator / (land + land_offset) + flat_bonus)
//! ```
//!
//! With the default tuning (`5_000_000`, `50_000`, `20`) a 500-acre
//! province finds 119 acres per turn.

use realm_types::Traits;
use serde::{Deserialize, Serialize};

use crate::Economy;
use crate::error::FormulaError;
use crate::modifiers::apply_percent;
use crate::tuning::ExplorationTuning;

/// Acres found per exploration turn at the given size, before modifiers.
///
/// # Errors
///
/// Returns [`FormulaError::Overflow`] if the denominator or result overflows.
pub fn land_per_turn(current_land: u64, tuning: &ExplorationTuning) -> Result<u64, FormulaError> {
    let overflow = FormulaError::Overflow {
        context: "land per turn",
    };
    let denominator = current_land
        .checked_add(tuning.land_offset)
        .ok_or_else(|| overflow.clone())?;
    // A zero denominator only happens with a zero offset on an empty
    // province; the curve term then contributes nothing.
    let curve = tuning.numerator.checked_div(denominator).unwrap_or(0);
    curve.checked_add(tuning.flat_bonus).ok_or(overflow)
}

/// Inputs to [`calculate_exploration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExplorationInput {
    /// Turns the player wants to spend.
    pub turns_to_explore: u32,
    /// Turns on hand.
    pub available_turns: u32,
    /// Gold on hand.
    pub gold: u64,
    /// Acres owned now.
    pub current_land: u64,
    /// Faction, class, and alignment.
    pub traits: Traits,
}

/// Result of [`calculate_exploration`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplorationOutcome {
    /// Whether the exploration can proceed.
    pub success: bool,
    /// Acres that would be found.
    pub land_found: u64,
    /// Gold the expedition costs.
    pub gold_cost: u64,
    /// Turns the expedition costs.
    pub turns_cost: u32,
    /// Human-readable explanation.
    pub message: String,
}

/// Compute the yield and cost of exploring for `turns_to_explore` turns.
///
/// # Errors
///
/// Returns [`FormulaError::InvalidQuantity`] when asked to explore for
/// zero turns, or [`FormulaError::Overflow`].
pub fn calculate_exploration(
    economy: &Economy,
    input: &ExplorationInput,
) -> Result<ExplorationOutcome, FormulaError> {
    if input.turns_to_explore == 0 {
        return Err(FormulaError::InvalidQuantity { quantity: 0 });
    }
    let tuning = &economy.tuning.exploration;
    let mods = economy.modifiers.combined(input.traits);

    let per_turn = land_per_turn(input.current_land, tuning)?;
    let raw_land = per_turn
        .checked_mul(u64::from(input.turns_to_explore))
        .ok_or(FormulaError::Overflow {
            context: "land found",
        })?;
    let land_found = apply_percent(raw_land, mods.exploration_land)?;

    let raw_gold = land_found
        .checked_mul(tuning.gold_per_acre)
        .ok_or(FormulaError::Overflow {
            context: "exploration gold",
        })?;
    let gold_cost = apply_percent(raw_gold, mods.exploration_gold)?;
    let turns_cost = input.turns_to_explore;

    let (success, message) = if turns_cost > input.available_turns {
        (
            false,
            format!(
                "Not enough turns to explore: need {turns_cost}, have {}",
                input.available_turns
            ),
        )
    } else if gold_cost > input.gold {
        (
            false,
            format!(
                "Not enough gold to explore: need {gold_cost}, have {}",
                input.gold
            ),
        )
    } else {
        (
            true,
            format!("Explored for {turns_cost} turns and found {land_found} acres"),
        )
    };

    Ok(ExplorationOutcome {
        success,
        land_found,
        gold_cost,
        turns_cost,
        message,
    })
}
