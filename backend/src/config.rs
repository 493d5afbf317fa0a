//! Application configuration file support.
//!
//! The backend reads a single TOML file (`argus.toml`) describing the HTTP
//! listener, the telescope site and its observability limits, the
//! orchestration folder shared with the telescope driver, and the seeded
//! user directory.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("No argus.toml found in standard locations")]
    NotFound,

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    pub telescope: TelescopeSettings,
    pub orchestration: OrchestrationSettings,
    #[serde(default)]
    pub users: Vec<UserEntry>,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Observatory site and observability limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelescopeSettings {
    #[serde(default = "default_telescope_name")]
    pub name: String,
    /// Geodetic latitude in degrees, north positive.
    pub latitude: f64,
    /// Longitude in degrees, east positive.
    pub longitude: f64,
    #[serde(alias = "min_zenith", default = "default_min_altitude")]
    pub min_altitude: f64,
    #[serde(alias = "max_zenith", default = "default_max_altitude")]
    pub max_altitude: f64,
    #[serde(default = "default_min_azimuth")]
    pub min_azimuth: f64,
    #[serde(default = "default_max_azimuth")]
    pub max_azimuth: f64,
    #[serde(default = "default_max_distance_from_zenith")]
    pub max_distance_from_zenith: f64,
    pub filters: Vec<String>,
    pub frame_modes: Vec<String>,
    #[serde(default = "default_max_exposure_s")]
    pub max_exposure_s: f64,
    #[serde(default = "default_max_reservation_minutes")]
    pub max_reservation_minutes: i64,
    /// Offset of the observatory's civil time from UTC, in hours.
    #[serde(default)]
    pub utc_offset_hours: f64,
    #[serde(default = "default_true")]
    pub require_reservation: bool,
}

impl TelescopeSettings {
    pub fn accepts_filter(&self, filter: &str) -> bool {
        self.filters.iter().any(|f| f == filter)
    }

    pub fn accepts_frame_mode(&self, mode: &str) -> bool {
        self.frame_modes.iter().any(|m| m == mode)
    }
}

/// The folder shared with the telescope driver and the polling cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationSettings {
    pub folder: PathBuf,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Ticks a file may sit in the folder before the driver is presumed hung.
    #[serde(default = "default_ticks")]
    pub stuck_ticks: u32,
    /// A file vanishing within this many ticks counts as a pickup.
    #[serde(default = "default_ticks")]
    pub pickup_ticks: u32,
    /// Ticks with only HANDSHAKE present before an error state is cleared.
    #[serde(default = "default_ticks")]
    pub handshake_ticks: u32,
    #[serde(default = "default_operation_timeout_s")]
    pub operation_timeout_s: f64,
    #[serde(default = "default_slew_wait_s")]
    pub slew_wait_s: f64,
    #[serde(default = "default_filter_wait_s")]
    pub filter_wait_s: f64,
    #[serde(default = "default_frame_wait_s")]
    pub frame_wait_s: f64,
}

impl OrchestrationSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Validated at load; an unrepresentable value times out at once.
    pub fn operation_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.operation_timeout_s).unwrap_or(Duration::ZERO)
    }
}

/// A seeded user with its bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEntry {
    pub email: String,
    pub token: String,
    #[serde(default)]
    pub staff: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_telescope_name() -> String {
    "argus".to_string()
}

fn default_min_altitude() -> f64 {
    30.0
}

fn default_max_altitude() -> f64 {
    90.0
}

fn default_min_azimuth() -> f64 {
    0.0
}

fn default_max_azimuth() -> f64 {
    360.0
}

fn default_max_distance_from_zenith() -> f64 {
    60.0
}

fn default_max_exposure_s() -> f64 {
    300.0
}

fn default_max_reservation_minutes() -> i64 {
    120
}

fn default_true() -> bool {
    true
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_ticks() -> u32 {
    10
}

fn default_operation_timeout_s() -> f64 {
    1800.0
}

fn default_slew_wait_s() -> f64 {
    10.0
}

fn default_filter_wait_s() -> f64 {
    5.0
}

fn default_frame_wait_s() -> f64 {
    2.0
}

impl AppConfig {
    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Load configuration from the default location.
    ///
    /// `ARGUS_CONFIG` wins when set. Otherwise searches for `argus.toml` in:
    /// 1. Current directory
    /// 2. `backend/` directory
    /// 3. Parent directory
    pub fn from_default_location() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var("ARGUS_CONFIG") {
            return Self::from_file(path);
        }

        let search_paths = [
            PathBuf::from("argus.toml"),
            PathBuf::from("backend/argus.toml"),
            PathBuf::from("../argus.toml"),
        ];

        for path in search_paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Err(ConfigError::NotFound)
    }

    /// Apply `HOST` / `PORT` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("HOST") {
            self.server.host = host;
        }
        if let Some(port) = std::env::var("PORT").ok().and_then(|s| s.parse().ok()) {
            self.server.port = port;
        }
    }

    /// Ensure the orchestration folder exists on disk.
    pub fn check_paths(&self) -> Result<(), ConfigError> {
        if !self.orchestration.folder.is_dir() {
            return Err(ConfigError::Invalid(format!(
                "Orchestrate folder ({}) does not exist",
                self.orchestration.folder.display()
            )));
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.telescope;
        if !(-90.0..=90.0).contains(&t.latitude) {
            return Err(ConfigError::Invalid(format!(
                "telescope.latitude out of range: {}",
                t.latitude
            )));
        }
        if !t.longitude.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "telescope.longitude is not a number: {}",
                t.longitude
            )));
        }
        if t.min_altitude > t.max_altitude {
            return Err(ConfigError::Invalid(
                "telescope.min_altitude exceeds max_altitude".to_string(),
            ));
        }
        if t.min_azimuth > t.max_azimuth {
            return Err(ConfigError::Invalid(
                "telescope.min_azimuth exceeds max_azimuth".to_string(),
            ));
        }
        if t.filters.is_empty() || t.frame_modes.is_empty() {
            return Err(ConfigError::Invalid(
                "telescope.filters and telescope.frame_modes must not be empty".to_string(),
            ));
        }
        if !(t.max_exposure_s.is_finite() && t.max_exposure_s > 0.0)
            || t.max_reservation_minutes <= 0
        {
            return Err(ConfigError::Invalid(
                "telescope limits must be positive".to_string(),
            ));
        }

        let o = &self.orchestration;
        if o.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "orchestration.tick_interval_ms must be positive".to_string(),
            ));
        }
        if o.stuck_ticks == 0 || o.pickup_ticks == 0 || o.handshake_ticks == 0 {
            return Err(ConfigError::Invalid(
                "orchestration tick thresholds must be positive".to_string(),
            ));
        }
        match Duration::try_from_secs_f64(o.operation_timeout_s) {
            Ok(timeout) if !timeout.is_zero() => {}
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "orchestration.operation_timeout_s must be a positive number of seconds, got {}",
                    o.operation_timeout_s
                )))
            }
        }
        for (key, wait) in [
            ("slew_wait_s", o.slew_wait_s),
            ("filter_wait_s", o.filter_wait_s),
            ("frame_wait_s", o.frame_wait_s),
        ] {
            if !(wait.is_finite() && wait >= 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "orchestration.{} must be a non-negative number, got {}",
                    key, wait
                )));
            }
        }
        Ok(())
    }
}
