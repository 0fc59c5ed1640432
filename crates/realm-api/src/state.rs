//! Shared application state for the province API.
//!
//! [`AppState`] bundles the engine services that handlers call: the
//! store, the action validator, the turn clock (for lazy accrual on
//! reads), and the onboarding/reset entry points. It is generic over the
//! [`ProvinceStore`] so the same router serves the in-memory store in
//! tests and `PostgreSQL` in production.

use std::sync::Arc;

use realm_core::{
    AccrualError, ActionValidator, ConfigError, EngineConfig, ProvinceDefaults,
    ProvinceLifecycle, ProvinceStore, TurnClock,
};
use realm_economy::Economy;

/// Failures assembling the application state from configuration.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// The configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The turn clock rejected the configuration.
    #[error(transparent)]
    Clock(#[from] AccrualError),
}

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Debug)]
pub struct AppState<S> {
    /// The province store.
    pub store: Arc<S>,
    /// The active economy (catalog, tuning, modifiers).
    pub economy: Arc<Economy>,
    /// The only path for player mutations.
    pub validator: ActionValidator<S>,
    /// Accrues elapsed turns on read.
    pub clock: Arc<TurnClock<S>>,
    /// Onboarding and reset.
    pub lifecycle: ProvinceLifecycle<S>,
}

impl<S: ProvinceStore> AppState<S> {
    /// Assemble the services over `store` with the given economy.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] if the clock settings are invalid.
    pub fn new(
        store: Arc<S>,
        economy: Arc<Economy>,
        config: &EngineConfig,
    ) -> Result<Self, StateError> {
        let clock = TurnClock::new(Arc::clone(&store), Arc::clone(&economy), &config.clock)?;
        Ok(Self {
            validator: ActionValidator::new(
                Arc::clone(&store),
                Arc::clone(&economy),
                &config.validator,
            ),
            lifecycle: ProvinceLifecycle::new(
                Arc::clone(&store),
                Arc::clone(&economy),
                ProvinceDefaults::from_config(config)?,
                config.validator.max_commit_attempts,
            ),
            clock: Arc::new(clock),
            economy,
            store,
        })
    }
}
