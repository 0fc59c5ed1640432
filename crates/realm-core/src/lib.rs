//! Action validation, turn accrual, and reconciliation for the Realm
//! province engine.
//!
//! Every mutation of a province goes through this crate: player actions
//! through the [`ActionValidator`], elapsed time through the
//! [`TurnClock`], and onboarding or reset through the
//! [`ProvinceLifecycle`]. All three read a snapshot, compute a new one,
//! and write it back conditioned on the snapshot's version.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `realm-config.yaml` into
//!   strongly-typed structs.
//! - [`store`] -- The [`ProvinceStore`] persistence contract and change
//!   subscriptions.
//! - [`memory_store`] -- In-process store used by tests and local runs.
//! - [`deltas`] -- Applying [`ActionDeltas`] to a snapshot.
//! - [`plan`] -- Turning an action request into deltas via the formulas.
//! - [`validator`] -- The action state machine with bounded retry.
//! - [`accrual`] -- Per-province catch-up of elapsed turn periods.
//! - [`scheduler`] -- Background loop driving the accrual clock.
//! - [`reset`] -- Province creation and reset to defaults.
//! - [`reconcile`] -- Client-side mirror settled by pushed changes.
//! - [`draft`] -- Uncommitted defense edits.
//! - [`session`] -- Per-session context owning mirrors and push watchers.
//!
//! [`ActionDeltas`]: realm_types::ActionDeltas

pub mod accrual;
pub mod config;
pub mod deltas;
pub mod draft;
pub mod memory_store;
pub mod plan;
pub mod reconcile;
pub mod reset;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod validator;

#[cfg(test)]
mod testing;

pub use accrual::{Accrual, AccrualError, TickOutcome, TickReport, TurnClock, accrue};
pub use config::{ConfigError, EngineConfig, LogFormat, LoggingConfig};
pub use draft::{DefenseDraft, DraftError};
pub use memory_store::MemoryProvinceStore;
pub use reconcile::{ProvinceMirror, PushDisposition};
pub use reset::{ProvinceDefaults, ProvinceIdentity, ProvinceLifecycle, ResetError};
pub use scheduler::{SchedulerSummary, run_scheduler};
pub use session::{SessionContext, SessionError, SharedMirror};
pub use store::{ProvinceStore, ProvinceSubscription, StoreError};
pub use validator::{ActionError, ActionPhase, ActionValidator};
