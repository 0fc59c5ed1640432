//! Enumeration types for the Realm province engine.
//!
//! Factions, classes, and alignments are the player-chosen traits that
//! modify formula outputs. Building, unit, and spell types key the
//! catalog; their costs and yields are configuration data, not code.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Province traits
// ---------------------------------------------------------------------------

/// The race a province belongs to. Fixed at province creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Faction {
    /// Balanced economy, slight tax bonus.
    Human,
    /// Strong mana production.
    Elf,
    /// Cheap construction.
    Dwarf,
    /// Cheap troops.
    Orc,
    /// Hardened defenses.
    Undead,
    /// Tinkerers; cheap exploration.
    Gnome,
    /// Costly but sturdy.
    Giant,
    /// Fast explorers with frail walls.
    Halfling,
}

impl Faction {
    /// Every faction, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Human,
        Self::Elf,
        Self::Dwarf,
        Self::Orc,
        Self::Undead,
        Self::Gnome,
        Self::Giant,
        Self::Halfling,
    ];
}

/// The play style a province specialises in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Class {
    /// Finds more land per exploration turn.
    Explorer,
    /// Builds for less gold.
    Architect,
    /// Trains troops for less gold.
    Warlord,
    /// Produces more mana.
    Mystic,
    /// Collects more gold.
    Merchant,
}

/// Moral alignment of the province's ruler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Alignment {
    /// Slight defense bonus.
    Good,
    /// No modifiers by default.
    Neutral,
    /// Slight production bonus.
    Evil,
}

// ---------------------------------------------------------------------------
// Catalog keys
// ---------------------------------------------------------------------------

/// A building that can be constructed on province land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum BuildingType {
    /// Houses population.
    Home,
    /// Produces food.
    Farm,
    /// Produces gold.
    Mine,
    /// Produces mana.
    Tower,
    /// Houses troops.
    Barracks,
    /// Raises defense power.
    Wall,
    /// Raises defense power substantially.
    Fortress,
}

impl BuildingType {
    /// Every building type, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Home,
        Self::Farm,
        Self::Mine,
        Self::Tower,
        Self::Barracks,
        Self::Wall,
        Self::Fortress,
    ];
}

/// A military unit type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum UnitType {
    /// Cheap defensive infantry.
    Militia,
    /// Ranged defenders.
    Archer,
    /// Heavy cavalry.
    Knight,
    /// Spellcasting unit.
    Sorcerer,
    /// Siege engine.
    Catapult,
}

/// A defensive spell. At most one may be active per province.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum SpellType {
    /// Small, cheap defense boost.
    StoneSkin,
    /// Moderate defense boost.
    Barrier,
    /// Large, expensive defense boost.
    Sanctuary,
}

/// A resource a building can produce each turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum ResourceKind {
    /// Currency.
    Gold,
    /// Magical energy.
    Mana,
    /// Feeds population and troops.
    Food,
    /// Peasants.
    Population,
}
