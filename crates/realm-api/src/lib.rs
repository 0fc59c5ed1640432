//! Province API server for the Realm province engine.
//!
//! This crate provides an Axum HTTP server that carries the engine's
//! request/response and push contracts:
//!
//! - **REST endpoints** for reading provinces (with lazy turn accrual),
//!   executing actions, onboarding, and reset
//! - **`WebSocket` endpoint** (`/ws/provinces/{id}`) streaming every
//!   committed change to a province as a full snapshot with its version
//!
//! Handlers are generic over [`realm_core::ProvinceStore`], so the same
//! router runs against the in-memory store and `PostgreSQL`.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::{AppState, StateError};
