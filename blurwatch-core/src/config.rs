//! Configuration Module
//!
//! Loads, validates and saves the Blurwatch configuration. Every field has a
//! default so partial TOML files load; `validate` is the single gate that
//! decides whether a monitor may start.

use crate::aggregator::AggregatePolicy;
use crate::error::ConfigError;
use crate::model::Camera;
use crate::tracker::AlertPolicy;
use crate::washdown::{WashdownClock, WashdownFilter, WashdownSchedule, WashdownWindow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_THRESHOLD_SECONDS: f64 = 60.0;
pub const DEFAULT_SUPPRESS_SECONDS: f64 = 5.0 * 60.0;
pub const DEFAULT_AGGREGATE_WINDOW_SECONDS: f64 = 45.0;
pub const DEFAULT_AGGREGATE_MIN: usize = 2;
pub const DEFAULT_AGGREGATE_SUPPRESS_SECONDS: f64 = 5.0 * 60.0;
pub const DEFAULT_SITE_ID: &str = "Default";
/// One tick a day is the slowest cadence accepted.
pub const MAX_TICK_INTERVAL_SECONDS: f64 = 24.0 * 60.0 * 60.0;

const PROJECT_CONFIG_FILE: &str = ".blurwatch.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlurwatchConfig {
    pub fleet: FleetConfig,
    pub alerts: AlertsConfig,
    pub aggregate: AggregateConfig,
    pub washdown: WashdownConfig,
    pub storage: StorageConfig,
    pub simulator: SimulatorConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    pub cameras: usize,
    pub tick_interval_seconds: f64,
    pub site_id: String,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            cameras: 3,
            tick_interval_seconds: 5.0,
            site_id: DEFAULT_SITE_ID.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    /// Seconds a camera must stay blurry before it alerts
    pub alert_threshold_seconds: f64,
    /// Seconds to suppress repeat alerts per camera
    pub suppress_seconds: f64,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            alert_threshold_seconds: DEFAULT_THRESHOLD_SECONDS,
            suppress_seconds: DEFAULT_SUPPRESS_SECONDS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateConfig {
    pub window_seconds: f64,
    pub min_count: usize,
    pub suppress_seconds: f64,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            window_seconds: DEFAULT_AGGREGATE_WINDOW_SECONDS,
            min_count: DEFAULT_AGGREGATE_MIN,
            suppress_seconds: DEFAULT_AGGREGATE_SUPPRESS_SECONDS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WashdownConfig {
    pub windows: Vec<WashdownWindow>,
    pub clock: WashdownClock,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub events_csv: PathBuf,
    pub episodes_csv: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            events_csv: PathBuf::from("events.csv"),
            episodes_csv: PathBuf::from("blur_episodes.csv"),
        }
    }
}

/// Random blur model used by the command-line simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub blur_on_probability: f64,
    pub blur_off_probability: f64,
    pub auto_clear: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_ticks: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            blur_on_probability: 0.08,
            blur_off_probability: 0.20,
            auto_clear: false,
            seed: None,
            max_ticks: None,
        }
    }
}

impl BlurwatchConfig {
    /// Load from an explicit path, or discover one; defaults when nothing is found.
    /// Returns the path the configuration came from, if any.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        if let Some(path) = explicit {
            return Ok((Self::load_from_path(path)?, Some(path.to_path_buf())));
        }

        match Self::discover_config_path() {
            Some(path) => Ok((Self::load_from_path(&path)?, Some(path))),
            None => Ok((Self::default(), None)),
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), ConfigError> {
        // Create parent directories if they don't exist
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }

        fs::write(path, self.to_toml_string()?).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// User-level configuration file (`~/.config/blurwatch/config.toml`).
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config").join("blurwatch").join("config.toml"))
    }

    fn discover_config_path() -> Option<PathBuf> {
        // Check for project-level config first
        if let Ok(current_dir) = env::current_dir() {
            let project_config = current_dir.join(PROJECT_CONFIG_FILE);
            if project_config.exists() {
                return Some(project_config);
            }
        }

        Self::user_config_path().filter(|path| path.exists())
    }

    /// Reject values the monitor cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fleet.cameras == 0 {
            return Err(ConfigError::invalid("fleet.cameras", "must be at least 1"));
        }
        let interval = self.fleet.tick_interval_seconds;
        if !interval.is_finite() || interval <= 0.0 || interval > MAX_TICK_INTERVAL_SECONDS {
            return Err(ConfigError::invalid(
                "fleet.tick_interval_seconds",
                format!(
                    "must be a positive number of seconds no larger than {}, got {}",
                    MAX_TICK_INTERVAL_SECONDS, interval
                ),
            ));
        }
        if self.fleet.site_id.trim().is_empty() {
            return Err(ConfigError::invalid("fleet.site_id", "must not be empty"));
        }

        non_negative("alerts.alert_threshold_seconds", self.alerts.alert_threshold_seconds)?;
        non_negative("alerts.suppress_seconds", self.alerts.suppress_seconds)?;
        non_negative("aggregate.window_seconds", self.aggregate.window_seconds)?;
        non_negative("aggregate.suppress_seconds", self.aggregate.suppress_seconds)?;
        if self.aggregate.min_count == 0 {
            return Err(ConfigError::invalid("aggregate.min_count", "must be at least 1"));
        }

        // Empty washdown windows are rejected when parsed, see `WashdownWindow::new`.

        if self.storage.events_csv.as_os_str().is_empty() {
            return Err(ConfigError::invalid("storage.events_csv", "must not be empty"));
        }
        if self.storage.episodes_csv.as_os_str().is_empty() {
            return Err(ConfigError::invalid("storage.episodes_csv", "must not be empty"));
        }

        probability("simulator.blur_on_probability", self.simulator.blur_on_probability)?;
        probability("simulator.blur_off_probability", self.simulator.blur_off_probability)?;

        Ok(())
    }

    pub fn cameras(&self) -> Vec<Camera> {
        Camera::fleet(self.fleet.cameras, &self.fleet.site_id)
    }

    pub fn alert_policy(&self) -> AlertPolicy {
        AlertPolicy {
            alert_threshold_seconds: self.alerts.alert_threshold_seconds,
            suppress_seconds: self.alerts.suppress_seconds,
        }
    }

    pub fn aggregate_policy(&self) -> AggregatePolicy {
        AggregatePolicy {
            window_seconds: self.aggregate.window_seconds,
            min_count: self.aggregate.min_count,
            suppress_seconds: self.aggregate.suppress_seconds,
        }
    }

    pub fn washdown_filter(&self) -> WashdownFilter {
        WashdownFilter::new(
            WashdownSchedule::new(self.washdown.windows.clone()),
            self.washdown.clock,
        )
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::invalid(
            field,
            format!("must be a non-negative number of seconds, got {}", value),
        ));
    }
    Ok(())
}

fn probability(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::invalid(
            field,
            format!("must be between 0 and 1, got {}", value),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_default_config_is_valid() {
        let config = BlurwatchConfig::default();
        config.validate().unwrap();
        assert_eq!(config.fleet.cameras, 3);
        assert_eq!(config.alerts.alert_threshold_seconds, 60.0);
        assert_eq!(config.aggregate.min_count, 2);
        assert_eq!(config.fleet.site_id, "Default");
    }

    #[test]
    fn test_partial_file_uses_defaults() -> anyhow::Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        let config_content = r#"
[fleet]
cameras = 6

[washdown]
windows = ["06:00-06:30", "23:00-01:00"]
clock = "utc"
"#;
        temp_file.write_all(config_content.as_bytes())?;
        temp_file.flush()?;

        let config = BlurwatchConfig::load_from_path(temp_file.path())?;
        assert_eq!(config.fleet.cameras, 6);
        assert_eq!(config.fleet.tick_interval_seconds, 5.0);
        assert_eq!(config.washdown.windows.len(), 2);
        assert_eq!(config.washdown.clock, WashdownClock::Utc);
        assert!(config.washdown.windows[1].wraps_midnight());
        config.validate()?;
        Ok(())
    }

    #[test]
    fn test_bad_washdown_window_fails_to_parse() {
        let result = toml::from_str::<BlurwatchConfig>("[washdown]\nwindows = [\"06:00\"]\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = BlurwatchConfig::default();
        config.fleet.cameras = 0;
        assert!(config.validate().is_err());

        let mut config = BlurwatchConfig::default();
        config.alerts.alert_threshold_seconds = -1.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("alerts.alert_threshold_seconds"));

        let mut config = BlurwatchConfig::default();
        config.fleet.tick_interval_seconds = 0.0;
        assert!(config.validate().is_err());

        let mut config = BlurwatchConfig::default();
        config.aggregate.min_count = 0;
        assert!(config.validate().is_err());

        let mut config = BlurwatchConfig::default();
        config.aggregate.window_seconds = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = BlurwatchConfig::default();
        config.simulator.blur_on_probability = 1.5;
        assert!(config.validate().is_err());

        let mut config = BlurwatchConfig::default();
        config.fleet.site_id = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tick_interval_must_fit_a_duration() {
        let mut config = BlurwatchConfig::default();
        config.fleet.tick_interval_seconds = 1e30;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("fleet.tick_interval_seconds"));

        config.fleet.tick_interval_seconds = f64::INFINITY;
        assert!(config.validate().is_err());

        config.fleet.tick_interval_seconds = MAX_TICK_INTERVAL_SECONDS;
        config.validate().unwrap();
        assert!(std::time::Duration::try_from_secs_f64(config.fleet.tick_interval_seconds).is_ok());
    }

    #[test]
    fn test_empty_washdown_window_rejected_on_load() {
        let result = toml::from_str::<BlurwatchConfig>("[washdown]\nwindows = [\"06:00-06:00\"]\n");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("06:00-06:00"));
    }

    #[test]
    fn test_save_and_reload() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = BlurwatchConfig::default();
        config.washdown.windows = vec!["22:00-02:00".parse()?];
        config.simulator.seed = Some(7);
        config.save_to_path(&path)?;

        let (reloaded, source) = BlurwatchConfig::load(Some(path.as_path()))?;
        assert_eq!(reloaded, config);
        assert_eq!(source, Some(path));
        Ok(())
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let absent = temp_dir.path().join("absent.toml");
        let err = BlurwatchConfig::load(Some(absent.as_path())).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_policies_follow_config() {
        let mut config = BlurwatchConfig::default();
        config.alerts.suppress_seconds = 30.0;
        config.aggregate.window_seconds = 10.0;

        assert_eq!(config.alert_policy().suppress_seconds, 30.0);
        assert_eq!(config.aggregate_policy().window_seconds, 10.0);
        assert_eq!(config.cameras().len(), 3);
        assert!(config.washdown_filter().schedule().is_empty());
    }
}
