//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use court_core::Policy;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// JSON file of per-slot forecasts shown in schedule views.
    #[serde(default)]
    pub weather_path: Option<PathBuf>,

    /// Rates, coin costs, and view limits.
    #[serde(default)]
    pub policy: Policy,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("weather_path", &self.weather_path)
            .field("booking_unit_cost", &self.policy.booking_unit_cost)
            .finish_non_exhaustive()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("court.db"),
            weather_path: None,
            policy: Policy::default(),
        }
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // COURT_POLICY__BOOKING_UNIT_COST -> policy.booking_unit_cost
        figment = figment.merge(Env::prefixed("COURT_").split("__"));

        let config: Self = figment.extract()?;
        config
            .policy
            .validate()
            .map_err(|err| figment::Error::from(format!("invalid policy: {err}")))?;
        Ok(config)
    }
}

/// Returns the platform-specific config directory for court.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("court"))
}

/// Returns the platform-specific data directory for court.
///
/// On Linux: `~/.local/share/court`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("court"))
}
