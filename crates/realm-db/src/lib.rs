//! `PostgreSQL` persistence for the Realm province engine.
//!
//! Implements [`realm_core::ProvinceStore`] over a `provinces` table with a
//! version-conditioned `UPDATE` and `LISTEN`/`NOTIFY` change propagation,
//! and loads the read-only catalog tables.
//!
//! ```text
//! ActionValidator / TurnClock / ProvinceLifecycle
//!     |
//!     +-- get / conditional_update --> PgProvinceStore --> provinces (jsonb)
//!                                          |
//!                                          +-- pg_notify('province_changed')
//!                                                  |
//!     subscribers <-- broadcast <-- PgListener <---+
//! ```
//!
//! # Modules
//!
//! - [`postgres`] -- `PostgreSQL` connection pool and migrations
//! - [`province_store`] -- The [`PgProvinceStore`]
//! - [`catalog_store`] -- Catalog table loading and seeding
//! - [`error`] -- Shared error types

pub mod catalog_store;
pub mod error;
pub mod postgres;
pub mod province_store;

// Re-export primary types for convenience.
pub use catalog_store::CatalogStore;
pub use error::DbError;
pub use postgres::{PostgresConfig, PostgresPool};
pub use province_store::{CHANGE_NOTIFY_CHANNEL, ChangeNotice, PgProvinceStore};
