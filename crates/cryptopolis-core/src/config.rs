//! Configuration loading and typed config structures for the Cryptopolis
//! simulation.
//!
//! The canonical configuration lives in `cryptopolis-config.yaml` at the
//! project root. This module defines strongly-typed structs that mirror the
//! YAML structure, and provides a loader that reads the file. Every field
//! has a default, so a partial (or empty) file is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use cryptopolis_types::{BuildingType, SentimentBand};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Environment variable that overrides `session.seed`.
pub const SEED_ENV_VAR: &str = "CRYPTOPOLIS_SEED";

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

    /// A value is outside its allowed range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Explanation of what is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SimulationConfig {
    /// Session-level settings (seed, timing, starting funds, map size).
    #[serde(default)]
    pub session: SessionConfig,

    /// Market-sentiment walk parameters.
    #[serde(default)]
    pub sentiment: SentimentConfig,

    /// Treasury and building economics.
    #[serde(default)]
    pub economy: EconomyConfig,

    /// Disaster and rug-pull probabilities.
    #[serde(default)]
    pub events: EventsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `CRYPTOPOLIS_SEED` overrides `session.seed` when set to a valid
    /// integer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.session.apply_env_overrides();
        Ok(config)
    }

    /// Check value ranges that the type system cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.day_interval_ms == 0 {
            return Err(invalid("session.day_interval_ms", "must be greater than zero"));
        }
        if self.session.grid_width == 0 || self.session.grid_height == 0 {
            return Err(invalid("session.grid", "width and height must be greater than zero"));
        }
        if self.session.starting_treasury < self.economy.insolvency_floor {
            return Err(invalid(
                "session.starting_treasury",
                "must not be below economy.insolvency_floor",
            ));
        }
        if self.session.starting_treasury.is_sign_negative()
            && !self.session.starting_treasury.is_zero()
        {
            return Err(invalid("session.starting_treasury", "must not be negative"));
        }
        check_range("sentiment.initial", self.sentiment.initial, Decimal::ONE_HUNDRED)?;
        check_range("sentiment.baseline", self.sentiment.baseline, Decimal::ONE_HUNDRED)?;
        check_range("sentiment.reversion_rate", self.sentiment.reversion_rate, Decimal::ONE)?;
        check_range(
            "sentiment.noise_amplitude",
            self.sentiment.noise_amplitude,
            Decimal::ONE_HUNDRED,
        )?;
        check_range(
            "economy.demolition_refund_pct",
            self.economy.demolition_refund_pct,
            Decimal::ONE_HUNDRED,
        )?;
        check_range(
            "events.rug_pull_loss_pct",
            self.events.rug_pull_loss_pct,
            Decimal::ONE_HUNDRED,
        )?;
        if self.events.rug_pull_destroy_bps > BPS_SCALE {
            return Err(invalid("events.rug_pull_destroy_bps", "must be at most 10000"));
        }
        Ok(())
    }
}

/// Denominator for basis-point probabilities.
pub const BPS_SCALE: u32 = 10_000;

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_owned(),
    }
}

fn check_range(field: &'static str, value: Decimal, max: Decimal) -> Result<(), ConfigError> {
    if value < Decimal::ZERO || value > max {
        return Err(ConfigError::Invalid {
            field,
            reason: format!("{value} is outside [0, {max}]"),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Session-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionConfig {
    /// Human-readable city name.
    #[serde(default = "default_session_name")]
    pub name: String,

    /// Random seed for reproducibility.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Real-time milliseconds per in-game day.
    #[serde(default = "default_day_interval_ms")]
    pub day_interval_ms: u64,

    /// Treasury balance when the session opens.
    #[serde(default = "default_starting_treasury")]
    pub starting_treasury: Decimal,

    /// Number of buildable columns.
    #[serde(default = "default_grid_size")]
    pub grid_width: u32,

    /// Number of buildable rows.
    #[serde(default = "default_grid_size")]
    pub grid_height: u32,

    /// Day limit for headless runs (0 = unlimited).
    #[serde(default = "default_max_days")]
    pub max_days: u64,

    /// Buildings placed before the first day.
    #[serde(default)]
    pub opening_builds: Vec<OpeningBuild>,

    /// Where the engine writes a snapshot when the run ends.
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
}

impl SessionConfig {
    /// Real time per in-game day.
    pub const fn day_interval(&self) -> Duration {
        Duration::from_millis(self.day_interval_ms)
    }

    /// Override the seed from `CRYPTOPOLIS_SEED` when it holds a valid
    /// integer.
    pub fn apply_env_overrides(&mut self) {
        let seed = std::env::var(SEED_ENV_VAR)
            .ok()
            .and_then(|val| val.trim().parse::<u64>().ok());
        if let Some(seed) = seed {
            self.seed = seed;
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: default_session_name(),
            seed: default_seed(),
            day_interval_ms: default_day_interval_ms(),
            starting_treasury: default_starting_treasury(),
            grid_width: default_grid_size(),
            grid_height: default_grid_size(),
            max_days: default_max_days(),
            opening_builds: Vec::new(),
            snapshot_path: None,
        }
    }
}

/// A building placed during session setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct OpeningBuild {
    /// Catalog type to place.
    pub building_type: BuildingType,
    /// Grid column.
    pub x: i32,
    /// Grid row.
    pub y: i32,
}

// ---------------------------------------------------------------------------
// Sentiment
// ---------------------------------------------------------------------------

/// Market-sentiment walk configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SentimentConfig {
    /// Index value when the session opens.
    #[serde(default = "default_sentiment_midpoint")]
    pub initial: Decimal,

    /// Level the index reverts toward.
    #[serde(default = "default_sentiment_midpoint")]
    pub baseline: Decimal,

    /// Fraction of the distance to the baseline recovered each day.
    #[serde(default = "default_reversion_rate")]
    pub reversion_rate: Decimal,

    /// Maximum absolute noise added each day.
    #[serde(default = "default_noise_amplitude")]
    pub noise_amplitude: Decimal,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            initial: default_sentiment_midpoint(),
            baseline: default_sentiment_midpoint(),
            reversion_rate: default_reversion_rate(),
            noise_amplitude: default_noise_amplitude(),
        }
    }
}

// ---------------------------------------------------------------------------
// Economy
// ---------------------------------------------------------------------------

/// Treasury and building economics.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EconomyConfig {
    /// Lowest balance the treasury settles at after a tick.
    #[serde(default)]
    pub insolvency_floor: Decimal,

    /// Percentage of the cost basis refunded on demolition.
    #[serde(default = "default_demolition_refund_pct")]
    pub demolition_refund_pct: Decimal,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            insolvency_floor: Decimal::ZERO,
            demolition_refund_pct: default_demolition_refund_pct(),
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Disaster and rug-pull configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EventsConfig {
    /// Master switch for stochastic events.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Daily disaster probability per sentiment band, in basis points.
    #[serde(default = "default_disaster_bps")]
    pub disaster_bps: BandTable,

    /// Daily rug-pull probability per sentiment band at 50% speculative
    /// exposure, in basis points.
    #[serde(default = "default_rug_pull_bps")]
    pub rug_pull_bps: BandTable,

    /// Percentage of the target's value lost in a rug pull.
    #[serde(default = "default_rug_pull_loss_pct")]
    pub rug_pull_loss_pct: Decimal,

    /// Probability that a rug pull destroys its target, in basis points.
    #[serde(default = "default_rug_pull_destroy_bps")]
    pub rug_pull_destroy_bps: u32,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            disaster_bps: default_disaster_bps(),
            rug_pull_bps: default_rug_pull_bps(),
            rug_pull_loss_pct: default_rug_pull_loss_pct(),
            rug_pull_destroy_bps: default_rug_pull_destroy_bps(),
        }
    }
}

/// One value per sentiment band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct BandTable {
    /// Value in [`SentimentBand::ExtremeFear`].
    pub extreme_fear: u32,
    /// Value in [`SentimentBand::Fear`].
    pub fear: u32,
    /// Value in [`SentimentBand::Neutral`].
    pub neutral: u32,
    /// Value in [`SentimentBand::Greed`].
    pub greed: u32,
    /// Value in [`SentimentBand::ExtremeGreed`].
    pub extreme_greed: u32,
}

impl BandTable {
    /// Same value in every band.
    pub const fn uniform(value: u32) -> Self {
        Self {
            extreme_fear: value,
            fear: value,
            neutral: value,
            greed: value,
            extreme_greed: value,
        }
    }

    /// Value for `band`.
    pub const fn get(&self, band: SentimentBand) -> u32 {
        match band {
            SentimentBand::ExtremeFear => self.extreme_fear,
            SentimentBand::Fear => self.fear,
            SentimentBand::Neutral => self.neutral,
            SentimentBand::Greed => self.greed,
            SentimentBand::ExtremeGreed => self.extreme_greed,
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
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
    /// Default filter directive (overridden by `RUST_LOG`).
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
            format: LogFormat::Pretty,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_session_name() -> String {
    "Genesis Block City".to_owned()
}

const fn default_seed() -> u64 {
    42
}

const fn default_day_interval_ms() -> u64 {
    1_000
}

const fn default_starting_treasury() -> Decimal {
    Decimal::from_parts(10_000, 0, 0, false, 0)
}

const fn default_grid_size() -> u32 {
    32
}

const fn default_max_days() -> u64 {
    365
}

const fn default_sentiment_midpoint() -> Decimal {
    Decimal::from_parts(50, 0, 0, false, 0)
}

const fn default_reversion_rate() -> Decimal {
    Decimal::from_parts(1, 0, 0, false, 1)
}

const fn default_noise_amplitude() -> Decimal {
    Decimal::from_parts(8, 0, 0, false, 0)
}

const fn default_demolition_refund_pct() -> Decimal {
    Decimal::from_parts(30, 0, 0, false, 0)
}

const fn default_disaster_bps() -> BandTable {
    BandTable {
        extreme_fear: 800,
        fear: 300,
        neutral: 100,
        greed: 300,
        extreme_greed: 800,
    }
}

const fn default_rug_pull_bps() -> BandTable {
    BandTable {
        extreme_fear: 2_500,
        fear: 1_000,
        neutral: 300,
        greed: 500,
        extreme_greed: 1_200,
    }
}

const fn default_rug_pull_loss_pct() -> Decimal {
    Decimal::from_parts(50, 0, 0, false, 0)
}

const fn default_rug_pull_destroy_bps() -> u32 {
    5_000
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SimulationConfig::default();
        assert_eq!(config.session.seed, 42);
        assert_eq!(config.session.starting_treasury, Decimal::from(10_000));
        assert_eq!(config.sentiment.reversion_rate, Decimal::new(1, 1));
        assert_eq!(config.economy.demolition_refund_pct, Decimal::from(30));
        assert_eq!(config.events.disaster_bps.get(SentimentBand::Neutral), 100);
        assert_eq!(config.events.rug_pull_bps.get(SentimentBand::ExtremeFear), 2_500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
session:
  name: "Test City"
  seed: 123
  day_interval_ms: 250
  starting_treasury: 5000
  grid_width: 16
  grid_height: 12
  max_days: 90
  opening_builds:
    - building_type: Exchange
      x: 1
      y: 2
    - building_type: HodlerHousing
      x: 3
      y: 4
  snapshot_path: "saves/test.json"

sentiment:
  initial: 35
  baseline: 55
  reversion_rate: 0.25
  noise_amplitude: 4.5

economy:
  insolvency_floor: 0
  demolition_refund_pct: 40

events:
  enabled: false
  disaster_bps:
    extreme_fear: 1000
    fear: 500
    neutral: 0
    greed: 500
    extreme_greed: 1000
  rug_pull_bps:
    extreme_fear: 10000
    fear: 0
    neutral: 0
    greed: 0
    extreme_greed: 0
  rug_pull_loss_pct: 75
  rug_pull_destroy_bps: 10000

logging:
  level: debug
  format: json
"#;
        let config = SimulationConfig::parse(yaml).unwrap();

        assert_eq!(config.session.name, "Test City");
        assert_eq!(config.session.day_interval(), Duration::from_millis(250));
        assert_eq!(config.session.starting_treasury, Decimal::from(5_000));
        assert_eq!(config.session.grid_width, 16);
        assert_eq!(config.session.opening_builds.len(), 2);
        assert_eq!(
            config.session.opening_builds.first().map(|b| b.building_type),
            Some(BuildingType::Exchange)
        );
        assert_eq!(
            config.session.snapshot_path,
            Some(PathBuf::from("saves/test.json"))
        );
        assert_eq!(config.sentiment.reversion_rate, Decimal::new(25, 2));
        assert_eq!(config.sentiment.noise_amplitude, Decimal::new(45, 1));
        assert_eq!(config.economy.demolition_refund_pct, Decimal::from(40));
        assert!(!config.events.enabled);
        assert_eq!(config.events.rug_pull_bps.get(SentimentBand::ExtremeFear), 10_000);
        assert_eq!(config.events.rug_pull_destroy_bps, 10_000);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_minimal_yaml() {
        let yaml = "session:\n  name: Minimal\n";
        let config = SimulationConfig::parse(yaml).unwrap();

        assert_eq!(config.session.name, "Minimal");
        assert_eq!(config.session.day_interval_ms, 1_000);
        assert_eq!(config.sentiment.initial, Decimal::from(50));
        assert!(config.events.enabled);
    }

    #[test]
    fn validate_rejects_zero_interval() {
        let mut config = SimulationConfig::default();
        config.session.day_interval_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "session.day_interval_ms",
                ..
            })
        ));
    }

    #[test]
    fn validate_rejects_out_of_range_sentiment() {
        let mut config = SimulationConfig::default();
        config.sentiment.initial = Decimal::from(101);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "sentiment.initial",
                ..
            })
        ));
    }

    #[test]
    fn validate_rejects_empty_grid() {
        let mut config = SimulationConfig::default();
        config.session.grid_height = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn band_table_lookup() {
        let table = BandTable::uniform(7);
        for band in SentimentBand::ALL {
            assert_eq!(table.get(band), 7);
        }
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("cryptopolis-config.yaml");
        if path.exists() {
            let config = SimulationConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}
