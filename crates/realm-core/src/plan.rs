//! Turning an action request into the deltas it would apply.
//!
//! Planning is pure: it reads one snapshot, runs the matching formula,
//! and either rejects the action with a message or returns the exact
//! [`ActionDeltas`] the validator will commit. Insufficient resources are
//! a rejection. Malformed input (zero quantity, catalog miss, overflow) is
//! a [`FormulaError`].

use std::collections::BTreeMap;

use realm_economy::{
    ConstructionInput, Economy, ExplorationInput, FormulaError, TrainingInput,
    calculate_exploration, validate_construction, validate_defense_assignment,
    validate_demolition, validate_spell, validate_training,
};
use realm_types::{
    ActionDeltas, ActionParameters, BuildingType, DefenseAssignment, ProvinceSnapshot,
    ResourceDeltas, SpellType, UnitType,
};

/// What an action would do to a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionPlan {
    /// The action is affordable; commit these deltas.
    Apply {
        /// Changes to apply.
        deltas: ActionDeltas,
        /// Human-readable outcome.
        message: String,
    },
    /// The action cannot proceed. Nothing is written.
    Reject {
        /// Why not.
        message: String,
    },
}

impl ActionPlan {
    const fn apply(deltas: ActionDeltas, message: String) -> Self {
        Self::Apply { deltas, message }
    }

    const fn reject(message: String) -> Self {
        Self::Reject { message }
    }
}

/// Plan `action` against the current `snapshot`.
///
/// # Errors
///
/// Returns [`FormulaError`] for malformed input or arithmetic overflow.
pub fn plan_action(
    economy: &Economy,
    snapshot: &ProvinceSnapshot,
    action: &ActionParameters,
) -> Result<ActionPlan, FormulaError> {
    match action {
        ActionParameters::Construct { building, quantity } => {
            plan_construct(economy, snapshot, *building, *quantity)
        }
        ActionParameters::Demolish { building, quantity } => {
            plan_demolish(economy, snapshot, *building, *quantity)
        }
        ActionParameters::Explore { turns } => plan_explore(economy, snapshot, *turns),
        ActionParameters::ReconfigureDefense { assignments } => {
            Ok(plan_reconfigure_defense(snapshot, assignments))
        }
        ActionParameters::Train { unit, quantity } => {
            plan_train(economy, snapshot, *unit, *quantity)
        }
        ActionParameters::CastSpell { spell } => plan_cast_spell(economy, snapshot, *spell),
    }
}

/// Convert an unsigned amount into a debit.
fn debit(amount: u64, context: &'static str) -> Result<i64, FormulaError> {
    i64::try_from(amount)
        .ok()
        .and_then(i64::checked_neg)
        .ok_or(FormulaError::Overflow { context })
}

/// Convert an unsigned amount into a credit.
fn credit(amount: u64, context: &'static str) -> Result<i64, FormulaError> {
    i64::try_from(amount)
        .ok()
        .ok_or(FormulaError::Overflow { context })
}

fn plan_construct(
    economy: &Economy,
    snapshot: &ProvinceSnapshot,
    building: BuildingType,
    quantity: u64,
) -> Result<ActionPlan, FormulaError> {
    let resources = &snapshot.resources;
    let outcome = validate_construction(
        economy,
        &ConstructionInput {
            building,
            quantity,
            gold: resources.gold,
            turns: resources.turns,
            land: resources.land,
            land_in_use: economy.catalog.land_in_use(&snapshot.buildings)?,
            population: resources.population,
            traits: snapshot.traits,
        },
    )?;
    if !outcome.success {
        return Ok(ActionPlan::reject(outcome.message));
    }

    let deltas = ActionDeltas {
        resources: ResourceDeltas {
            gold: debit(outcome.gold_cost, "construction gold delta")?,
            turns: debit(u64::from(outcome.turns_cost), "construction turns delta")?,
            ..ResourceDeltas::default()
        },
        buildings: BTreeMap::from([(building, credit(quantity, "construction count delta")?)]),
        ..ActionDeltas::default()
    };
    Ok(ActionPlan::apply(deltas, outcome.message))
}

fn plan_demolish(
    economy: &Economy,
    snapshot: &ProvinceSnapshot,
    building: BuildingType,
    quantity: u64,
) -> Result<ActionPlan, FormulaError> {
    let outcome = validate_demolition(
        economy,
        building,
        quantity,
        snapshot.building_count(building),
        snapshot.resources.turns,
    )?;
    if !outcome.success {
        return Ok(ActionPlan::reject(outcome.message));
    }

    let deltas = ActionDeltas {
        resources: ResourceDeltas {
            turns: debit(u64::from(outcome.turns_cost), "demolition turns delta")?,
            ..ResourceDeltas::default()
        },
        buildings: BTreeMap::from([(building, debit(quantity, "demolition count delta")?)]),
        ..ActionDeltas::default()
    };
    Ok(ActionPlan::apply(deltas, outcome.message))
}

fn plan_explore(
    economy: &Economy,
    snapshot: &ProvinceSnapshot,
    turns: u32,
) -> Result<ActionPlan, FormulaError> {
    let outcome = calculate_exploration(
        economy,
        &ExplorationInput {
            turns_to_explore: turns,
            available_turns: snapshot.resources.turns,
            gold: snapshot.resources.gold,
            current_land: snapshot.resources.land,
            traits: snapshot.traits,
        },
    )?;
    if !outcome.success {
        return Ok(ActionPlan::reject(outcome.message));
    }

    let deltas = ActionDeltas {
        resources: ResourceDeltas {
            gold: debit(outcome.gold_cost, "exploration gold delta")?,
            land: credit(outcome.land_found, "exploration land delta")?,
            turns: debit(u64::from(outcome.turns_cost), "exploration turns delta")?,
            ..ResourceDeltas::default()
        },
        ..ActionDeltas::default()
    };
    Ok(ActionPlan::apply(deltas, outcome.message))
}

fn plan_reconfigure_defense(
    snapshot: &ProvinceSnapshot,
    assignments: &[DefenseAssignment],
) -> ActionPlan {
    let outcome = validate_defense_assignment(&snapshot.units, assignments);
    if !outcome.success {
        return ActionPlan::reject(outcome.message);
    }
    let deltas = ActionDeltas {
        defense_assignments: outcome.assignments,
        ..ActionDeltas::default()
    };
    ActionPlan::apply(deltas, outcome.message)
}

fn plan_train(
    economy: &Economy,
    snapshot: &ProvinceSnapshot,
    unit: UnitType,
    quantity: u64,
) -> Result<ActionPlan, FormulaError> {
    let resources = &snapshot.resources;
    let outcome = validate_training(
        economy,
        &TrainingInput {
            unit,
            quantity,
            gold: resources.gold,
            turns: resources.turns,
            population: resources.population,
            barracks: snapshot.building_count(BuildingType::Barracks),
            units_owned: snapshot.total_units(),
            traits: snapshot.traits,
        },
    )?;
    if !outcome.success {
        return Ok(ActionPlan::reject(outcome.message));
    }

    let deltas = ActionDeltas {
        resources: ResourceDeltas {
            gold: debit(outcome.gold_cost, "training gold delta")?,
            population: debit(outcome.population_used, "training population delta")?,
            turns: debit(u64::from(outcome.turns_cost), "training turns delta")?,
            ..ResourceDeltas::default()
        },
        units: BTreeMap::from([(unit, credit(quantity, "training count delta")?)]),
        ..ActionDeltas::default()
    };
    Ok(ActionPlan::apply(deltas, outcome.message))
}

fn plan_cast_spell(
    economy: &Economy,
    snapshot: &ProvinceSnapshot,
    spell: SpellType,
) -> Result<ActionPlan, FormulaError> {
    let outcome = validate_spell(
        economy,
        spell,
        snapshot.resources.mana,
        snapshot.resources.turns,
        snapshot.active_spell,
    )?;
    if !outcome.success {
        return Ok(ActionPlan::reject(outcome.message));
    }

    let deltas = ActionDeltas {
        resources: ResourceDeltas {
            mana: debit(outcome.mana_cost, "spell mana delta")?,
            turns: debit(u64::from(outcome.turns_cost), "spell turns delta")?,
            ..ResourceDeltas::default()
        },
        spell_cast: Some(outcome.activated),
        ..ActionDeltas::default()
    };
    Ok(ActionPlan::apply(deltas, outcome.message))
}
