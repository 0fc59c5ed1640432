//! Configuration loading and typed config structures for the Realm engine.
//!
//! The canonical configuration lives in `realm-config.yaml` at the project
//! root. This module defines strongly-typed structs that mirror the YAML
//! structure and a loader that reads the file and applies environment
//! overrides. Every section and field is optional; missing values fall back
//! to the defaults below.

use std::path::Path;

use chrono::TimeDelta;
use realm_economy::Economy;
use realm_types::Resources;
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but makes no sense.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level engine configuration.
///
/// Mirrors the structure of `realm-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// World-level settings.
    #[serde(default)]
    pub world: WorldConfig,

    /// Turn accrual settings.
    #[serde(default)]
    pub clock: ClockConfig,

    /// Resources a new or reset province starts with.
    #[serde(default)]
    pub start: StartConfig,

    /// Action validator settings.
    #[serde(default)]
    pub validator: ValidatorConfig,

    /// Catalog, tuning constants, and trait modifiers.
    #[serde(default)]
    pub economy: Economy,

    /// Database and HTTP settings.
    #[serde(default)]
    pub infrastructure: InfrastructureConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables `DATABASE_URL` and `REALM_API_PORT` override
    /// the corresponding infrastructure values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.infrastructure.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would stall the clock or the validator.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.clock.turn_interval_secs == 0 {
            return Err(ConfigError::Invalid(String::from(
                "clock.turn_interval_secs must be at least 1",
            )));
        }
        if self.clock.scheduler_interval_ms == 0 {
            return Err(ConfigError::Invalid(String::from(
                "clock.scheduler_interval_ms must be at least 1",
            )));
        }
        if self.clock.max_turns == 0 {
            return Err(ConfigError::Invalid(String::from(
                "clock.max_turns must be at least 1",
            )));
        }
        if self.start.turns > self.clock.max_turns {
            return Err(ConfigError::Invalid(format!(
                "start.turns ({}) exceeds clock.max_turns ({})",
                self.start.turns, self.clock.max_turns
            )));
        }
        if self.validator.max_commit_attempts == 0 || self.clock.max_tick_attempts == 0 {
            return Err(ConfigError::Invalid(String::from(
                "retry budgets must be at least 1",
            )));
        }
        Ok(())
    }

    /// The resource floor a fresh province starts from.
    pub const fn starting_resources(&self) -> Resources {
        Resources {
            gold: self.start.gold,
            mana: self.start.mana,
            food: self.start.food,
            land: self.start.land,
            population: self.start.population,
            turns: self.start.turns,
            max_turns: self.clock.max_turns,
        }
    }
}

/// World-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldConfig {
    /// Human-readable world name.
    #[serde(default = "default_world_name")]
    pub name: String,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: default_world_name(),
        }
    }
}

/// Turn accrual configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClockConfig {
    /// Seconds between two accrued turns.
    #[serde(default = "default_turn_interval_secs")]
    pub turn_interval_secs: u64,

    /// Upper bound on stored turns.
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,

    /// How often the background scheduler scans for due provinces.
    #[serde(default = "default_scheduler_interval_ms")]
    pub scheduler_interval_ms: u64,

    /// Write attempts per province per tick before giving up until the
    /// next pass.
    #[serde(default = "default_max_tick_attempts")]
    pub max_tick_attempts: u32,
}

impl ClockConfig {
    /// The accrual period as a [`TimeDelta`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the interval does not fit.
    pub fn turn_interval(&self) -> Result<TimeDelta, ConfigError> {
        i64::try_from(self.turn_interval_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "clock.turn_interval_secs {} is out of range",
                    self.turn_interval_secs
                ))
            })
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            turn_interval_secs: default_turn_interval_secs(),
            max_turns: default_max_turns(),
            scheduler_interval_ms: default_scheduler_interval_ms(),
            max_tick_attempts: default_max_tick_attempts(),
        }
    }
}

/// Starting resources for new and reset provinces.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StartConfig {
    /// Starting gold.
    #[serde(default = "default_start_gold")]
    pub gold: u64,
    /// Starting mana.
    #[serde(default = "default_start_mana")]
    pub mana: u64,
    /// Starting food.
    #[serde(default = "default_start_food")]
    pub food: u64,
    /// Starting acres.
    #[serde(default = "default_start_land")]
    pub land: u64,
    /// Starting population.
    #[serde(default = "default_start_population")]
    pub population: u64,
    /// Starting turns.
    #[serde(default = "default_start_turns")]
    pub turns: u32,
}

impl Default for StartConfig {
    fn default() -> Self {
        Self {
            gold: default_start_gold(),
            mana: default_start_mana(),
            food: default_start_food(),
            land: default_start_land(),
            population: default_start_population(),
            turns: default_start_turns(),
        }
    }
}

/// Action validator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ValidatorConfig {
    /// Conditional-write attempts before an action reports a conflict.
    #[serde(default = "default_max_commit_attempts")]
    pub max_commit_attempts: u32,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_commit_attempts: default_max_commit_attempts(),
        }
    }
}

/// Infrastructure connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InfrastructureConfig {
    /// `PostgreSQL` connection string. When absent the engine runs on the
    /// in-memory store.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Maximum pooled database connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Address the HTTP server binds to.
    #[serde(default = "default_api_host")]
    pub api_host: String,

    /// Port the HTTP server listens on.
    #[serde(default = "default_api_port")]
    pub api_port: u16,
}

impl InfrastructureConfig {
    /// Override connection settings from environment variables.
    ///
    /// Checks `DATABASE_URL` and `REALM_API_PORT`. An unparsable port is
    /// ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("DATABASE_URL") {
            self.database_url = Some(val);
        }
        if let Some(port) = std::env::var("REALM_API_PORT")
            .ok()
            .and_then(|val| val.parse().ok())
        {
            self.api_port = port;
        }
    }
}

impl Default for InfrastructureConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: default_max_connections(),
            api_host: default_api_host(),
            api_port: default_api_port(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions for serde
// ---------------------------------------------------------------------------

fn default_world_name() -> String {
    String::from("Realm")
}

const fn default_turn_interval_secs() -> u64 {
    600
}

const fn default_max_turns() -> u32 {
    250
}

const fn default_scheduler_interval_ms() -> u64 {
    5_000
}

const fn default_max_tick_attempts() -> u32 {
    3
}

const fn default_start_gold() -> u64 {
    100_000
}

const fn default_start_mana() -> u64 {
    1_000
}

const fn default_start_food() -> u64 {
    20_000
}

const fn default_start_land() -> u64 {
    250
}

const fn default_start_population() -> u64 {
    2_500
}

const fn default_start_turns() -> u32 {
    50
}

const fn default_max_commit_attempts() -> u32 {
    3
}

const fn default_max_connections() -> u32 {
    10
}

fn default_api_host() -> String {
    String::from("0.0.0.0")
}

const fn default_api_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    String::from("info")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use realm_types::BuildingType;

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.clock.turn_interval_secs, 600);
        assert_eq!(config.validator.max_commit_attempts, 3);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn parse_partial_yaml_fills_defaults() {
        let yaml = r"
world:
  name: Westmarch
clock:
  turn_interval_secs: 60
  max_turns: 100
start:
  gold: 500
logging:
  format: json
";
        let config = EngineConfig::parse(yaml).unwrap();
        assert_eq!(config.world.name, "Westmarch");
        assert_eq!(config.clock.turn_interval_secs, 60);
        assert_eq!(config.clock.max_turns, 100);
        assert_eq!(config.clock.max_tick_attempts, 3);
        assert_eq!(config.start.gold, 500);
        assert_eq!(config.start.land, 250);
        assert_eq!(config.logging.format, LogFormat::Json);

        let resources = config.starting_resources();
        assert_eq!(resources.gold, 500);
        assert_eq!(resources.max_turns, 100);
    }

    #[test]
    fn economy_section_overrides_catalog_entries() {
        let yaml = r"
economy:
  tuning:
    construction:
      population_per_builder: 100
";
        let config = EngineConfig::parse(yaml).unwrap();
        assert_eq!(config.economy.tuning.construction.population_per_builder, 100);
        // Untouched parts keep the standard catalog.
        assert_eq!(
            config
                .economy
                .catalog
                .building(BuildingType::Farm)
                .unwrap()
                .gold_cost,
            150
        );
    }

    #[test]
    fn zero_interval_is_rejected() {
        let yaml = "clock:\n  turn_interval_secs: 0\n";
        assert!(matches!(
            EngineConfig::parse(yaml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn zero_scheduler_interval_is_rejected() {
        let yaml = "clock:\n  scheduler_interval_ms: 0\n";
        assert!(matches!(
            EngineConfig::parse(yaml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn starting_turns_above_cap_are_rejected() {
        let yaml = "clock:\n  max_turns: 10\nstart:\n  turns: 11\n";
        assert!(matches!(
            EngineConfig::parse(yaml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn turn_interval_converts_to_time_delta() {
        let clock = ClockConfig::default();
        assert_eq!(clock.turn_interval().unwrap(), TimeDelta::seconds(600));
    }

    #[test]
    fn bad_yaml_is_an_error() {
        assert!(matches!(
            EngineConfig::parse("clock: [unclosed"),
            Err(ConfigError::Yaml { .. })
        ));
    }
}
