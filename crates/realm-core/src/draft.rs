//! Pending defense edits that have not been submitted yet.
//!
//! A player adjusting defense shares edits a [`DefenseDraft`] locally.
//! Nothing reaches the engine until [`DefenseDraft::commit`] turns the
//! edits into a single `reconfigure_defense` request. When a push changes
//! the province underneath the draft, [`DefenseDraft::rebase`] keeps the
//! edits that still make sense.

use std::collections::BTreeMap;

use realm_types::{
    ActionParameters, ActionRequest, DefenseAssignment, ProvinceId, ProvinceSnapshot, UnitType,
};

/// Invalid edits to a defense draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    /// Shares are whole percentages of a unit row.
    #[error("defense share {percent}% is above 100%")]
    PercentOutOfRange {
        /// The rejected share.
        percent: u8,
    },

    /// The province owns no units of this type.
    #[error("no {0:?} units to assign")]
    UnitNotOwned(UnitType),
}

/// Local, uncommitted defense shares for one province.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefenseDraft {
    province_id: ProvinceId,
    base_version: u64,
    current: BTreeMap<UnitType, u8>,
    edits: BTreeMap<UnitType, u8>,
}

impl DefenseDraft {
    /// Start a draft from the shares in `snapshot`.
    pub fn new(snapshot: &ProvinceSnapshot) -> Self {
        Self {
            province_id: snapshot.id,
            base_version: snapshot.version,
            current: current_shares(snapshot),
            edits: BTreeMap::new(),
        }
    }

    /// Version of the snapshot the draft is based on.
    pub const fn base_version(&self) -> u64 {
        self.base_version
    }

    /// Stage a new share for a unit.
    ///
    /// Setting a unit back to its committed share drops the edit.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError`] for a share above 100 or an unowned unit.
    pub fn set(&mut self, unit_type: UnitType, percent: u8) -> Result<(), DraftError> {
        if percent > 100 {
            return Err(DraftError::PercentOutOfRange { percent });
        }
        let committed = *self
            .current
            .get(&unit_type)
            .ok_or(DraftError::UnitNotOwned(unit_type))?;
        if committed == percent {
            self.edits.remove(&unit_type);
        } else {
            self.edits.insert(unit_type, percent);
        }
        Ok(())
    }

    /// The share shown for a unit: the staged edit if any, else the
    /// committed share.
    pub fn share(&self, unit_type: UnitType) -> Option<u8> {
        self.edits
            .get(&unit_type)
            .or_else(|| self.current.get(&unit_type))
            .copied()
    }

    /// Whether any edits are staged.
    pub fn is_dirty(&self) -> bool {
        !self.edits.is_empty()
    }

    /// Staged edits, keyed by unit.
    pub const fn edits(&self) -> &BTreeMap<UnitType, u8> {
        &self.edits
    }

    /// Drop every staged edit.
    pub fn discard(&mut self) {
        self.edits.clear();
    }

    /// Move the draft onto a newer snapshot.
    ///
    /// Edits for units no longer owned are dropped, as are edits that now
    /// match the committed share.
    pub fn rebase(&mut self, snapshot: &ProvinceSnapshot) {
        self.base_version = snapshot.version;
        self.current = current_shares(snapshot);
        let current = &self.current;
        self.edits
            .retain(|unit, percent| current.get(unit).is_some_and(|now| *now != *percent));
    }

    /// Turn staged edits into a `reconfigure_defense` request and clear
    /// them. Returns `None` when nothing is staged.
    pub fn commit(&mut self) -> Option<ActionRequest> {
        if self.edits.is_empty() {
            return None;
        }
        let assignments = std::mem::take(&mut self.edits)
            .into_iter()
            .map(|(unit_type, percent)| DefenseAssignment { unit_type, percent })
            .collect();
        Some(ActionRequest {
            province_id: self.province_id,
            action: ActionParameters::ReconfigureDefense { assignments },
        })
    }
}

fn current_shares(snapshot: &ProvinceSnapshot) -> BTreeMap<UnitType, u8> {
    snapshot
        .units
        .iter()
        .map(|row| (row.unit_type, row.defense_percent))
        .collect()
}
