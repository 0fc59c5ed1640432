//! Action request and response types for the player-facing contract.
//!
//! A request names the province and carries one [`ActionParameters`]
//! variant; its serde tag doubles as the `action_type` field on the wire:
//!
//! ```json
//! { "province_id": "…", "action_type": "construct",
//!   "parameters": { "building": "Farm", "quantity": 5 } }
//! ```
//!
//! A response reports success or a human-readable rejection, and on
//! success carries the applied [`ActionDeltas`] and the new snapshot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{BuildingType, SpellType, UnitType};
use crate::ids::ProvinceId;
use crate::structs::{ActiveSpell, ProvinceSnapshot};

/// The kinds of player-triggered action the validator accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ActionType {
    /// Erect buildings on free land.
    Construct,
    /// Tear buildings down.
    Demolish,
    /// Spend turns finding new land.
    Explore,
    /// Change the share of each unit assigned to defense.
    ReconfigureDefense,
    /// Recruit units from the population.
    Train,
    /// Activate a defensive spell.
    CastSpell,
}

impl core::fmt::Display for ActionType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Construct => "construct",
            Self::Demolish => "demolish",
            Self::Explore => "explore",
            Self::ReconfigureDefense => "reconfigure_defense",
            Self::Train => "train",
            Self::CastSpell => "cast_spell",
        };
        f.write_str(name)
    }
}

/// A requested defense share for one unit type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DefenseAssignment {
    /// The unit row to reconfigure.
    pub unit_type: UnitType,
    /// Requested share in percent. Values above 100 are rejected.
    pub percent: u8,
}

/// Action-specific parameters, tagged by action type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "action_type", content = "parameters", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ActionParameters {
    /// Parameters for [`ActionType::Construct`].
    Construct {
        /// What to build.
        building: BuildingType,
        /// How many.
        quantity: u64,
    },
    /// Parameters for [`ActionType::Demolish`].
    Demolish {
        /// What to tear down.
        building: BuildingType,
        /// How many.
        quantity: u64,
    },
    /// Parameters for [`ActionType::Explore`].
    Explore {
        /// Turns to spend exploring.
        turns: u32,
    },
    /// Parameters for [`ActionType::ReconfigureDefense`].
    ReconfigureDefense {
        /// New shares; units not listed keep their current share.
        assignments: Vec<DefenseAssignment>,
    },
    /// Parameters for [`ActionType::Train`].
    Train {
        /// What to recruit.
        unit: UnitType,
        /// How many.
        quantity: u64,
    },
    /// Parameters for [`ActionType::CastSpell`].
    CastSpell {
        /// Which spell to activate.
        spell: SpellType,
    },
}

impl ActionParameters {
    /// The action type this parameter set belongs to.
    pub const fn action_type(&self) -> ActionType {
        match self {
            Self::Construct { .. } => ActionType::Construct,
            Self::Demolish { .. } => ActionType::Demolish,
            Self::Explore { .. } => ActionType::Explore,
            Self::ReconfigureDefense { .. } => ActionType::ReconfigureDefense,
            Self::Train { .. } => ActionType::Train,
            Self::CastSpell { .. } => ActionType::CastSpell,
        }
    }
}

/// A player-triggered action against one province.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    /// The province to act on.
    pub province_id: ProvinceId,
    /// What to do.
    #[serde(flatten)]
    pub action: ActionParameters,
}

/// Signed changes to each resource field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ResourceDeltas {
    /// Change in gold.
    pub gold: i64,
    /// Change in mana.
    pub mana: i64,
    /// Change in food.
    pub food: i64,
    /// Change in land.
    pub land: i64,
    /// Change in population.
    pub population: i64,
    /// Change in turns.
    pub turns: i64,
}

/// The exact set of changes an action applied to a province.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ActionDeltas {
    /// Resource debits and credits.
    pub resources: ResourceDeltas,
    /// Building count changes.
    pub buildings: BTreeMap<BuildingType, i64>,
    /// Unit count changes.
    pub units: BTreeMap<UnitType, i64>,
    /// Replacement defense shares.
    pub defense_assignments: BTreeMap<UnitType, u8>,
    /// Spell activated by this action; replaces any prior spell.
    pub spell_cast: Option<ActiveSpell>,
}

/// Result of one action invocation, as returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ActionResponse {
    /// Whether the action was applied.
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
    /// Applied changes (success only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deltas: Option<ActionDeltas>,
    /// The new authoritative snapshot (success only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<ProvinceSnapshot>,
}

impl ActionResponse {
    /// A successful response carrying the applied deltas and new snapshot.
    pub fn applied(message: String, deltas: ActionDeltas, snapshot: ProvinceSnapshot) -> Self {
        Self {
            success: true,
            message,
            deltas: Some(deltas),
            snapshot: Some(snapshot),
        }
    }

    /// A validation failure. No mutation took place.
    pub const fn rejected(message: String) -> Self {
        Self {
            success: false,
            message,
            deltas: None,
            snapshot: None,
        }
    }
}
