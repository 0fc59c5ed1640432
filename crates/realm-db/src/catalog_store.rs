//! Read-only catalog tables.
//!
//! `building_catalog`, `unit_catalog`, and `spell_catalog` hold one row per
//! catalog key. When the tables are populated they replace the catalog
//! from configuration; [`CatalogStore::seed`] writes a catalog into them.

use std::collections::BTreeMap;

use realm_economy::Catalog;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::PgPool;
use sqlx::types::Json;

use crate::error::DbError;

/// Operations on the catalog tables.
#[derive(Debug)]
pub struct CatalogStore<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogStore<'a> {
    /// Create a new catalog store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Load the catalog, or `None` when every table is empty.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if a query fails, or
    /// [`DbError::Serialization`] if a row does not decode.
    pub async fn load(&self) -> Result<Option<Catalog>, DbError> {
        let buildings =
            self.load_table(r"SELECT building_type, definition FROM building_catalog").await?;
        let units = self.load_table(r"SELECT unit_type, definition FROM unit_catalog").await?;
        let spells = self.load_table(r"SELECT spell_type, definition FROM spell_catalog").await?;

        if buildings.is_empty() && units.is_empty() && spells.is_empty() {
            return Ok(None);
        }
        tracing::info!(
            buildings = buildings.len(),
            units = units.len(),
            spells = spells.len(),
            "Loaded catalog from database"
        );
        Ok(Some(Catalog {
            buildings,
            units,
            spells,
        }))
    }

    /// Write every entry of `catalog`, replacing existing definitions.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if encoding or any insert fails.
    pub async fn seed(&self, catalog: &Catalog) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;
        for (key, def) in &catalog.buildings {
            sqlx::query(
                r"INSERT INTO building_catalog (building_type, definition) VALUES ($1, $2)
                  ON CONFLICT (building_type) DO UPDATE SET definition = EXCLUDED.definition",
            )
            .bind(key_name(key)?)
            .bind(Json(def))
            .execute(&mut *tx)
            .await?;
        }
        for (key, def) in &catalog.units {
            sqlx::query(
                r"INSERT INTO unit_catalog (unit_type, definition) VALUES ($1, $2)
                  ON CONFLICT (unit_type) DO UPDATE SET definition = EXCLUDED.definition",
            )
            .bind(key_name(key)?)
            .bind(Json(def))
            .execute(&mut *tx)
            .await?;
        }
        for (key, def) in &catalog.spells {
            sqlx::query(
                r"INSERT INTO spell_catalog (spell_type, definition) VALUES ($1, $2)
                  ON CONFLICT (spell_type) DO UPDATE SET definition = EXCLUDED.definition",
            )
            .bind(key_name(key)?)
            .bind(Json(def))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        tracing::info!("Seeded catalog tables");
        Ok(())
    }

    async fn load_table<K, V>(&self, sql: &str) -> Result<BTreeMap<K, V>, DbError>
    where
        K: DeserializeOwned + Ord,
        V: DeserializeOwned,
    {
        let rows = sqlx::query_as::<_, (String, Json<serde_json::Value>)>(sql)
            .fetch_all(self.pool)
            .await?;
        rows.into_iter()
            .map(|(key, Json(definition))| -> Result<(K, V), DbError> {
                Ok((parse_key(key)?, serde_json::from_value(definition)?))
            })
            .collect()
    }
}

/// The wire name of a catalog key (`BuildingType::Farm` is `"Farm"`).
///
/// # Errors
///
/// Returns [`DbError::CorruptRow`] if the key does not serialize to a
/// string.
pub fn key_name<K: Serialize>(key: &K) -> Result<String, DbError> {
    match serde_json::to_value(key)? {
        serde_json::Value::String(name) => Ok(name),
        other => Err(DbError::CorruptRow(format!("catalog key {other} is not a string"))),
    }
}

/// Parse a catalog key from its wire name.
///
/// # Errors
///
/// Returns [`DbError::Serialization`] for an unknown name.
pub fn parse_key<K: DeserializeOwned>(name: String) -> Result<K, DbError> {
    Ok(serde_json::from_value(serde_json::Value::String(name))?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use realm_types::{BuildingType, SpellType};

    use super::*;

    #[test]
    fn keys_use_wire_names() {
        assert_eq!(key_name(&BuildingType::Farm).unwrap(), "Farm");
        assert_eq!(key_name(&SpellType::StoneSkin).unwrap(), "StoneSkin");
        assert_eq!(
            parse_key::<BuildingType>(String::from("Fortress")).unwrap(),
            BuildingType::Fortress
        );
    }

    #[test]
    fn unknown_key_is_rejected() {
        assert!(matches!(
            parse_key::<BuildingType>(String::from("Moat")),
            Err(DbError::Serialization(_))
        ));
    }
}
