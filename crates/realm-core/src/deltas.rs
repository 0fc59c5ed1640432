//! Applying [`ActionDeltas`] to a province snapshot.
//!
//! The validator applies deltas to build the row it commits, and the
//! reconciliation mirror applies the same deltas optimistically. Both go
//! through [`apply_deltas`] so the two never disagree about what an action
//! did. Derived stats are not touched here.

use realm_types::{ActionDeltas, ProvinceSnapshot, UnitRow, UnitType};

/// Defense share given to freshly trained units.
pub const NEW_UNIT_DEFENSE_PERCENT: u8 = 100;

/// A delta could not be applied to a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeltaError {
    /// A debit is larger than the balance it draws from.
    #[error("{field} would go negative")]
    Underflow {
        /// The field being debited.
        field: &'static str,
    },

    /// A credit would exceed the field's range.
    #[error("{field} would overflow")]
    Overflow {
        /// The field being credited.
        field: &'static str,
    },

    /// A defense share was given for a unit the province does not own.
    #[error("no {0:?} row to reassign")]
    MissingUnitRow(UnitType),
}

/// Add a signed delta to an unsigned balance.
///
/// # Errors
///
/// Returns [`DeltaError::Underflow`] or [`DeltaError::Overflow`] when the
/// result leaves `u64`.
pub const fn add_signed(value: u64, delta: i64, field: &'static str) -> Result<u64, DeltaError> {
    if delta >= 0 {
        match value.checked_add(delta.unsigned_abs()) {
            Some(v) => Ok(v),
            None => Err(DeltaError::Overflow { field }),
        }
    } else {
        match value.checked_sub(delta.unsigned_abs()) {
            Some(v) => Ok(v),
            None => Err(DeltaError::Underflow { field }),
        }
    }
}

fn add_signed_u32(value: u32, delta: i64, field: &'static str) -> Result<u32, DeltaError> {
    let widened = add_signed(u64::from(value), delta, field)?;
    u32::try_from(widened)
        .ok()
        .ok_or(DeltaError::Overflow { field })
}

/// Apply every change in `deltas` to `snapshot`.
///
/// On error the snapshot may be partially updated; callers apply to a
/// scratch copy.
///
/// Building and unit entries that reach zero are removed. Units trained
/// into a new row start fully assigned to defense.
///
/// # Errors
///
/// Returns [`DeltaError`] when a balance would leave its range or a
/// defense share targets a unit the province does not own.
pub fn apply_deltas(snapshot: &mut ProvinceSnapshot, deltas: &ActionDeltas) -> Result<(), DeltaError> {
    let r = &mut snapshot.resources;
    let d = &deltas.resources;
    r.gold = add_signed(r.gold, d.gold, "gold")?;
    r.mana = add_signed(r.mana, d.mana, "mana")?;
    r.food = add_signed(r.food, d.food, "food")?;
    r.land = add_signed(r.land, d.land, "land")?;
    r.population = add_signed(r.population, d.population, "population")?;
    r.turns = add_signed_u32(r.turns, d.turns, "turns")?;

    for (&building, &delta) in &deltas.buildings {
        let count = add_signed(snapshot.building_count(building), delta, "building count")?;
        if count == 0 {
            snapshot.buildings.remove(&building);
        } else {
            snapshot.buildings.insert(building, count);
        }
    }

    for (&unit_type, &delta) in &deltas.units {
        let current = snapshot.unit_quantity(unit_type);
        let quantity = add_signed(current, delta, "unit count")?;
        if quantity == 0 {
            snapshot.units.retain(|row| row.unit_type != unit_type);
        } else if let Some(row) = snapshot
            .units
            .iter_mut()
            .find(|row| row.unit_type == unit_type)
        {
            row.quantity = quantity;
        } else {
            snapshot.units.push(UnitRow {
                unit_type,
                quantity,
                defense_percent: NEW_UNIT_DEFENSE_PERCENT,
            });
        }
    }

    for (&unit_type, &percent) in &deltas.defense_assignments {
        let row = snapshot
            .units
            .iter_mut()
            .find(|row| row.unit_type == unit_type)
            .ok_or(DeltaError::MissingUnitRow(unit_type))?;
        row.defense_percent = percent;
    }

    if let Some(spell) = deltas.spell_cast {
        snapshot.active_spell = Some(spell);
    }

    Ok(())
}
