//! Formula library for the Realm province engine.
//!
//! Pure, stateless functions computing costs, yields, capacities, and power
//! aggregates. Nothing here performs I/O or suspends; every function takes
//! its inputs explicitly and returns a structured outcome (with `success`
//! and a human-readable `message`) or a fatal [`FormulaError`].
//!
//! All arithmetic is integral with floor semantics and checked for
//! overflow. Fractional quantities are truncated, never rounded.
//!
//! # Modules
//!
//! - [`catalog`] -- Building, unit, and spell reference data
//! - [`tuning`] -- Tunable scaling constants
//! - [`modifiers`] -- Faction/class/alignment percentage modifiers
//! - [`construction`] -- Construction capacity, construction, demolition
//! - [`exploration`] -- Land found by exploring
//! - [`defense`] -- Defense power, defense assignment, spells
//! - [`training`] -- Troop training
//! - [`production`] -- Passive per-turn production
//! - [`derived`] -- Networth/attack/defense aggregates and invariants

pub mod catalog;
pub mod construction;
pub mod defense;
pub mod derived;
pub mod error;
pub mod exploration;
pub mod modifiers;
pub mod production;
pub mod training;
pub mod tuning;

use serde::{Deserialize, Serialize};

// Re-export primary types at crate root.
pub use catalog::{BuildingDef, Catalog, Production, SpellDef, UnitDef};
pub use construction::{
    ConstructionInput, ConstructionOutcome, DemolitionOutcome, construction_capacity,
    validate_construction, validate_demolition,
};
pub use defense::{
    DefenseAssignmentOutcome, DefenseContribution, SpellOutcome, calculate_defense_power,
    province_defense, validate_defense_assignment, validate_spell,
};
pub use derived::{check_invariants, derive_stats, refresh_derived};
pub use error::{FormulaError, InvariantViolation};
pub use exploration::{ExplorationInput, ExplorationOutcome, calculate_exploration};
pub use modifiers::{ModifierTable, Modifiers, apply_percent};
pub use production::{TurnYield, apply_turn_production, turn_yield};
pub use training::{TrainingInput, TrainingOutcome, validate_training};
pub use tuning::EconomyTuning;

/// Everything a formula needs besides its per-call inputs.
///
/// Loaded once from configuration and shared read-only by the validator
/// and the accrual clock.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Economy {
    /// Reference data.
    #[serde(default)]
    pub catalog: Catalog,
    /// Scaling constants.
    #[serde(default)]
    pub tuning: EconomyTuning,
    /// Trait modifiers.
    #[serde(default)]
    pub modifiers: ModifierTable,
}

impl Economy {
    /// Build an economy from its parts.
    pub const fn new(catalog: Catalog, tuning: EconomyTuning, modifiers: ModifierTable) -> Self {
        Self {
            catalog,
            tuning,
            modifiers,
        }
    }
}
