//! Error types for the formula library.
//!
//! A [`FormulaError`] is fatal for the single action that triggered it:
//! bad input (zero quantity), a catalog miss, or arithmetic overflow.
//! Insufficient resources are not errors; they come back as an outcome
//! with `success: false`.

use realm_types::{BuildingType, SpellType, UnitType};

/// Fatal failures of a formula evaluation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormulaError {
    /// Quantity must be at least 1.
    #[error("invalid quantity {quantity}: must be at least 1")]
    InvalidQuantity {
        /// The rejected quantity.
        quantity: u64,
    },

    /// A percentage outside `[0, 100]` reached a formula.
    #[error("invalid percentage {percent}: must be within 0..=100")]
    InvalidPercent {
        /// The rejected percentage.
        percent: u8,
    },

    /// The catalog has no entry for this building.
    #[error("unknown building type: {0:?}")]
    UnknownBuilding(BuildingType),

    /// The catalog has no entry for this unit.
    #[error("unknown unit type: {0:?}")]
    UnknownUnit(UnitType),

    /// The catalog has no entry for this spell.
    #[error("unknown spell: {0:?}")]
    UnknownSpell(SpellType),

    /// An intermediate value left the representable range.
    #[error("arithmetic overflow computing {context}")]
    Overflow {
        /// What was being computed.
        context: &'static str,
    },
}

/// A snapshot broke one of the province invariants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    /// More turns stored than the cap allows.
    #[error("turns {turns} exceed max_turns {max_turns}")]
    TurnsOverCap {
        /// Stored turns.
        turns: u32,
        /// The cap.
        max_turns: u32,
    },

    /// Buildings occupy more land than the province owns.
    #[error("buildings occupy {used} acres but only {land} are owned")]
    LandOverused {
        /// Acres occupied by buildings.
        used: u64,
        /// Acres owned.
        land: u64,
    },

    /// A unit row's defense share is outside `[0, 100]`.
    #[error("defense share {percent}% for {unit_type:?} is out of range")]
    DefenseShareOutOfRange {
        /// The offending unit.
        unit_type: UnitType,
        /// The stored share.
        percent: u8,
    },

    /// The same unit type appears in more than one row.
    #[error("duplicate unit row for {0:?}")]
    DuplicateUnitRow(UnitType),

    /// The snapshot could not be evaluated at all.
    #[error("formula error while checking invariants: {0}")]
    Formula(#[from] FormulaError),
}
