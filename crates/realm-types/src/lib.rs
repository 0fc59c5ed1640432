//! Shared type definitions for the Realm province engine.
//!
//! This crate is the single source of truth for the data model shared by
//! the formula library, the engine core, the persistence layer, and the
//! HTTP surface. Types flow downstream to `TypeScript` via `ts-rs` for the
//! presentation layer.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for all entity identifiers
//! - [`enums`] -- Traits, catalog keys, and resource kinds
//! - [`structs`] -- The province snapshot and its parts
//! - [`actions`] -- Action request/response and delta types

pub mod actions;
pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use actions::{
    ActionDeltas, ActionParameters, ActionRequest, ActionResponse, ActionType, DefenseAssignment,
    ResourceDeltas,
};
pub use enums::{Alignment, BuildingType, Class, Faction, ResourceKind, SpellType, UnitType};
pub use ids::{ProvinceId, SessionId, UserId};
pub use structs::{
    ActiveSpell, DerivedStats, ProvinceChanged, ProvinceSnapshot, Resources, Traits, UnitRow,
};

#[cfg(test)]
mod tests {
    //! Binding generation for the presentation layer.

    #[test]
    fn export_bindings() {
        use ts_rs::TS;

        let _ = crate::ids::ProvinceId::export_all();
        let _ = crate::ids::UserId::export_all();
        let _ = crate::enums::Faction::export_all();
        let _ = crate::enums::BuildingType::export_all();
        let _ = crate::structs::ProvinceSnapshot::export_all();
        let _ = crate::structs::ProvinceChanged::export_all();
        let _ = crate::actions::ActionParameters::export_all();
        let _ = crate::actions::ActionResponse::export_all();
    }
}
