//! Configuration management for the smartfand daemon.
//!
//! Handles loading, parsing, and validation of the YAML configuration file
//! that defines thresholds, LED colors, and the external commands to run.
//! The resolved configuration is immutable for the life of the process.

use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    controller::DeviceFilter,
    error::ConfigError,
    fan_curve::{SpeedCurve, SpeedStep, validate_steps},
    lighting::{LedPolicy, LedSetting},
    sensors::SensorFilter,
};

/// Environment variable pointing at an explicit config file.
pub const CONFIG_ENV: &str = "SMARTFAND_CONFIG";

/// Main configuration structure for the smartfand daemon.
///
/// Every field has a default, so an empty file (or no file at all) yields
/// a working setup for an NZXT smart device.
///
/// # Example
///
/// ```yaml
/// version: 1
/// interval: 10
/// min_speed: 10
/// max_speed: 100
/// max_temp: 65
///
/// led:
///   normal: { color: "555555", mode: "fixed" }
///   warning: { color: "ff0000", mode: "fixed" }
///
/// device:
///   vendor: "0x1e71"
///
/// speed_steps:
///   - { ratio: 0.95, speed: 100 }
///   - { ratio: 0.90, speed: 75 }
///
/// sensors:
///   command: "sensors"
///   args: ["-j"]
///   key_markers: ["temp", "input"]
///   chips: ["k10temp", "amdgpu", "nvme"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Configuration version for compatibility checking.
    #[serde(default = "defaults::version")]
    pub version: u8,

    /// Seconds to sleep between ticks.
    #[serde(default = "defaults::interval")]
    pub interval: u64,

    /// Lowest fan speed in percent.
    #[serde(default = "defaults::min_speed")]
    pub min_speed: u8,

    /// Highest fan speed in percent, applied on overheat.
    #[serde(default = "defaults::max_speed")]
    pub max_speed: u8,

    /// Overheat threshold in Celsius.
    #[serde(default = "defaults::max_temp")]
    pub max_temp: f64,

    #[serde(default)]
    pub led: LedCfg,

    /// Vendor/product selector for the controller tool.
    #[serde(default = "defaults::device")]
    pub device: DeviceFilter,

    /// Step table, ordered by descending ratio.
    #[serde(default = "crate::fan_curve::default_steps")]
    pub speed_steps: Vec<SpeedStep>,

    #[serde(default)]
    pub sensors: SensorCfg,

    #[serde(default)]
    pub controller: ControllerCfg,

    /// Optional limit for each external command, in seconds.
    #[serde(default)]
    pub command_timeout: Option<u64>,
}

/// Normal and warning LED pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedCfg {
    #[serde(default = "defaults::led_normal")]
    pub normal: LedSetting,
    #[serde(default = "defaults::led_warning")]
    pub warning: LedSetting,
}

/// External sensor reader and the selection of its output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorCfg {
    #[serde(default = "defaults::sensors_command")]
    pub command: String,

    #[serde(default = "defaults::sensors_args")]
    pub args: Vec<String>,

    /// Substrings a metric key must all contain to count as a temperature.
    #[serde(default = "defaults::key_markers")]
    pub key_markers: Vec<String>,

    /// Chip name hints; empty means every chip.
    #[serde(default)]
    pub chips: Vec<String>,
}

/// External device-control tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerCfg {
    #[serde(default = "defaults::controller_command")]
    pub command: String,
}

mod defaults {
    use crate::{controller::DeviceFilter, lighting::LedSetting};

    pub fn version() -> u8 {
        1
    }

    pub fn interval() -> u64 {
        10
    }

    pub fn min_speed() -> u8 {
        10
    }

    pub fn max_speed() -> u8 {
        100
    }

    pub fn max_temp() -> f64 {
        65.0
    }

    pub fn led_normal() -> LedSetting {
        LedSetting::new("555555", "fixed")
    }

    pub fn led_warning() -> LedSetting {
        LedSetting::new("ff0000", "fixed")
    }

    /// NZXT vendor id.
    pub fn device() -> DeviceFilter {
        DeviceFilter {
            vendor: Some("0x1e71".into()),
            product: None,
        }
    }

    pub fn sensors_command() -> String {
        "sensors".into()
    }

    pub fn sensors_args() -> Vec<String> {
        vec!["-j".into()]
    }

    pub fn key_markers() -> Vec<String> {
        vec!["input".into()]
    }

    pub fn controller_command() -> String {
        "liquidctl".into()
    }
}

impl Default for LedCfg {
    fn default() -> Self {
        Self {
            normal: defaults::led_normal(),
            warning: defaults::led_warning(),
        }
    }
}

impl Default for SensorCfg {
    fn default() -> Self {
        Self {
            command: defaults::sensors_command(),
            args: defaults::sensors_args(),
            key_markers: defaults::key_markers(),
            chips: Vec::new(),
        }
    }
}

impl Default for ControllerCfg {
    fn default() -> Self {
        Self {
            command: defaults::controller_command(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: defaults::version(),
            interval: defaults::interval(),
            min_speed: defaults::min_speed(),
            max_speed: defaults::max_speed(),
            max_temp: defaults::max_temp(),
            led: LedCfg::default(),
            device: defaults::device(),
            speed_steps: crate::fan_curve::default_steps(),
            sensors: SensorCfg::default(),
            controller: ControllerCfg::default(),
            command_timeout: None,
        }
    }
}

impl Config {
    /// Validates the configuration for consistency.
    ///
    /// # Example
    ///
    /// ```
    /// use smartfand::config::Config;
    ///
    /// let mut config = Config::default();
    /// assert!(config.validate().is_ok());
    ///
    /// config.min_speed = 100;
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Version(self.version));
        }
        if self.max_speed > 100 {
            return Err(ConfigError::SpeedAboveHundred(self.max_speed));
        }
        if self.min_speed >= self.max_speed {
            return Err(ConfigError::SpeedRange {
                min: self.min_speed,
                max: self.max_speed,
            });
        }
        // Negated so NaN is rejected too.
        if !(self.max_temp > 0.0) {
            return Err(ConfigError::MaxTemp(self.max_temp));
        }
        if self.interval == 0 {
            return Err(ConfigError::Interval);
        }
        if self.sensors.command.trim().is_empty() {
            return Err(ConfigError::EmptyCommand("sensor"));
        }
        if self.controller.command.trim().is_empty() {
            return Err(ConfigError::EmptyCommand("controller"));
        }
        if self.sensors.key_markers.is_empty() {
            return Err(ConfigError::NoKeyMarkers);
        }
        validate_steps(&self.speed_steps)
    }

    /// Loads configuration.
    ///
    /// Searches for configuration in the following order:
    /// 1. Provided path parameter
    /// 2. `SMARTFAND_CONFIG` environment variable
    /// 3. `$XDG_CONFIG_HOME/smartfand/config.yml` or `~/.config/smartfand/config.yml`
    /// 4. `/etc/smartfand/config.yml`
    ///
    /// Falls back to built-in defaults when no file is found. The result is
    /// not validated; command-line overrides are applied first and
    /// [`Config::validate`] runs on the merged values.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        match path.or_else(locate_config) {
            Some(config_path) => {
                info!("Loading config from: {}", config_path.display());
                Self::load_from_path(&config_path)
            }
            None => {
                info!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        // An empty document deserializes to `null`, not an empty mapping.
        let config: Config = if content.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML in: {}", path.display()))?
        };

        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout.map(Duration::from_secs)
    }

    pub fn speed_curve(&self) -> SpeedCurve {
        SpeedCurve {
            max_temp: self.max_temp,
            min_speed: self.min_speed,
            max_speed: self.max_speed,
            steps: self.speed_steps.clone(),
        }
    }

    pub fn led_policy(&self) -> LedPolicy {
        LedPolicy::new(self.led.normal.clone(), self.led.warning.clone())
    }

    pub fn sensor_filter(&self) -> SensorFilter {
        SensorFilter {
            key_markers: self.sensors.key_markers.clone(),
            chips: self.sensors.chips.clone(),
        }
    }
}

fn locate_config() -> Option<PathBuf> {
    // An explicit env path is returned even if missing so the read fails loudly.
    if let Ok(env_path) = env::var(CONFIG_ENV) {
        return Some(PathBuf::from(env_path));
    }

    if let Some(mut cfg_dir) = env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|h| Path::new(&h).join(".config")))
    {
        cfg_dir.push("smartfand/config.yml");
        if cfg_dir.exists() {
            return Some(cfg_dir);
        }
    }

    let etc = Path::new("/etc/smartfand/config.yml");
    etc.exists().then(|| etc.to_path_buf())
}
