//! Tunable constants for the formula library.
//!
//! Every scaling constant a formula uses lives here so that it can be
//! overridden from configuration. Nothing in the formulas is a literal.

use serde::{Deserialize, Serialize};

/// All tuning sections.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EconomyTuning {
    /// Construction throughput.
    #[serde(default)]
    pub construction: ConstructionTuning,
    /// Exploration curve.
    #[serde(default)]
    pub exploration: ExplorationTuning,
    /// Defense bonuses.
    #[serde(default)]
    pub defense: DefenseTuning,
    /// Passive production.
    #[serde(default)]
    pub production: ProductionTuning,
    /// Troop training.
    #[serde(default)]
    pub training: TrainingTuning,
    /// Networth weights.
    #[serde(default)]
    pub networth: NetworthTuning,
}

/// Construction throughput scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructionTuning {
    /// Population needed per building constructed per turn.
    #[serde(default = "default_population_per_builder")]
    pub population_per_builder: u64,
}

impl Default for ConstructionTuning {
    fn default() -> Self {
        Self {
            population_per_builder: default_population_per_builder(),
        }
    }
}

/// Exploration curve: `land_per_turn = numerator / (land + land_offset) + flat_bonus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplorationTuning {
    /// Numerator of the diminishing-returns term.
    #[serde(default = "default_exploration_numerator")]
    pub numerator: u64,
    /// Offset added to current land in the denominator.
    #[serde(default = "default_exploration_land_offset")]
    pub land_offset: u64,
    /// Flat acres found per turn regardless of size.
    #[serde(default = "default_exploration_flat_bonus")]
    pub flat_bonus: u64,
    /// Gold charged per acre found.
    #[serde(default)]
    pub gold_per_acre: u64,
}

impl Default for ExplorationTuning {
    fn default() -> Self {
        Self {
            numerator: default_exploration_numerator(),
            land_offset: default_exploration_land_offset(),
            flat_bonus: default_exploration_flat_bonus(),
            gold_per_acre: 0,
        }
    }
}

/// Building-derived defense bonuses, in basis points per building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefenseTuning {
    /// Bonus per wall (1/100 of a percent).
    #[serde(default = "default_wall_bonus_bp")]
    pub wall_bonus_bp: u64,
    /// Bonus per fortress (1/100 of a percent).
    #[serde(default = "default_fortress_bonus_bp")]
    pub fortress_bonus_bp: u64,
    /// Cap on the combined building bonus, in percent.
    #[serde(default = "default_max_building_bonus_percent")]
    pub max_building_bonus_percent: u64,
}

impl Default for DefenseTuning {
    fn default() -> Self {
        Self {
            wall_bonus_bp: default_wall_bonus_bp(),
            fortress_bonus_bp: default_fortress_bonus_bp(),
            max_building_bonus_percent: default_max_building_bonus_percent(),
        }
    }
}

/// Passive production parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionTuning {
    /// Gold collected per turn per 1000 population.
    #[serde(default = "default_gold_per_1000_population")]
    pub gold_per_1000_population: u64,
    /// Population ceiling per acre; growth stops there.
    #[serde(default = "default_max_population_per_acre")]
    pub max_population_per_acre: u64,
}

impl Default for ProductionTuning {
    fn default() -> Self {
        Self {
            gold_per_1000_population: default_gold_per_1000_population(),
            max_population_per_acre: default_max_population_per_acre(),
        }
    }
}

/// Troop training parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingTuning {
    /// Turns one training order costs, regardless of size.
    #[serde(default = "default_training_turns")]
    pub turns_per_batch: u32,
    /// Units housed without any barracks.
    #[serde(default = "default_base_unit_housing")]
    pub base_unit_housing: u64,
    /// Additional units housed per barracks.
    #[serde(default = "default_units_per_barracks")]
    pub units_per_barracks: u64,
}

impl Default for TrainingTuning {
    fn default() -> Self {
        Self {
            turns_per_batch: default_training_turns(),
            base_unit_housing: default_base_unit_housing(),
            units_per_barracks: default_units_per_barracks(),
        }
    }
}

/// Networth weights not carried by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworthTuning {
    /// Networth per acre owned.
    #[serde(default = "default_networth_per_acre")]
    pub per_acre: u64,
}

impl Default for NetworthTuning {
    fn default() -> Self {
        Self {
            per_acre: default_networth_per_acre(),
        }
    }
}

const fn default_population_per_builder() -> u64 {
    250
}
const fn default_exploration_numerator() -> u64 {
    5_000_000
}
const fn default_exploration_land_offset() -> u64 {
    50_000
}
const fn default_exploration_flat_bonus() -> u64 {
    20
}
const fn default_wall_bonus_bp() -> u64 {
    10
}
const fn default_fortress_bonus_bp() -> u64 {
    50
}
const fn default_max_building_bonus_percent() -> u64 {
    50
}
const fn default_gold_per_1000_population() -> u64 {
    20
}
const fn default_max_population_per_acre() -> u64 {
    20
}
const fn default_training_turns() -> u32 {
    1
}
const fn default_base_unit_housing() -> u64 {
    100
}
const fn default_units_per_barracks() -> u64 {
    50
}
const fn default_networth_per_acre() -> u64 {
    20
}
