//! Temperature aggregation from the external sensor reader.
//!
//! The reader (`sensors -j` by default) prints a JSON object shaped as
//! `chip -> sensor -> metric -> value`. Metrics whose key carries every
//! configured marker are temperature inputs in °C; the hottest of them drives
//! the control loop.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    command::{CommandRunner, display_command},
    error::SensorError,
};

/// A single labelled temperature, e.g. `k10temp-pci-00c3/Tdie/temp2_input`.
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureReading {
    pub label: String,
    pub value: f64,
}

/// Which entries of a snapshot count as temperature readings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorFilter {
    /// Substrings a metric key must all contain.
    pub key_markers: Vec<String>,
    /// Chip name hints; empty accepts every chip.
    pub chips: Vec<String>,
}

impl Default for SensorFilter {
    fn default() -> Self {
        Self {
            key_markers: vec!["input".into()],
            chips: Vec::new(),
        }
    }
}

impl SensorFilter {
    fn accepts_chip(&self, chip: &str) -> bool {
        self.chips.is_empty() || self.chips.iter().any(|hint| chip.contains(hint.as_str()))
    }
}

/// Sensor-selection predicate: `key` must contain every marker.
pub fn is_temperature_key<S: AsRef<str>>(key: &str, markers: &[S]) -> bool {
    markers.iter().all(|marker| key.contains(marker.as_ref()))
}

/// Extracts the matching readings from raw sensor JSON.
///
/// Non-object chips/sensors (such as the `"Adapter"` string) and non-numeric
/// metrics are skipped.
pub fn parse_snapshot(
    raw: &[u8],
    filter: &SensorFilter,
) -> Result<Vec<TemperatureReading>, SensorError> {
    let snapshot: BTreeMap<String, Value> = serde_json::from_slice(raw)?;

    let readings = snapshot
        .iter()
        .filter(|(chip, _)| filter.accepts_chip(chip))
        .filter_map(|(chip, sensors)| Some((chip, sensors.as_object()?)))
        .flat_map(move |(chip, sensors)| {
            sensors
                .iter()
                .filter_map(|(sensor, metrics)| Some((sensor, metrics.as_object()?)))
                .flat_map(move |(sensor, metrics)| {
                    metrics
                        .iter()
                        .filter(move |(key, _)| is_temperature_key(key, &filter.key_markers))
                        .filter_map(move |(key, value)| {
                            Some(TemperatureReading {
                                label: format!("{chip}/{sensor}/{key}"),
                                value: value.as_f64()?,
                            })
                        })
                })
        })
        .collect();

    Ok(readings)
}

/// Hottest value among `readings`.
pub fn max_temperature(readings: &[TemperatureReading]) -> Result<f64, SensorError> {
    readings
        .iter()
        .map(|reading| reading.value)
        .reduce(f64::max)
        .ok_or(SensorError::NoData)
}

/// Source of temperature readings for one tick.
#[async_trait]
pub trait TemperatureSensor: Send + Sync {
    /// Every matching reading from a fresh snapshot.
    async fn read_temperatures(&self) -> Result<Vec<TemperatureReading>, SensorError>;

    /// Hottest matching reading; fails with [`SensorError::NoData`] if none matched.
    async fn read_max_temperature(&self) -> Result<f64, SensorError> {
        max_temperature(&self.read_temperatures().await?)
    }
}

/// [`TemperatureSensor`] that shells out to a JSON-producing reader.
pub struct SensorsCommand<R: CommandRunner> {
    runner: R,
    command: String,
    args: Vec<String>,
    filter: SensorFilter,
}

impl<R: CommandRunner> SensorsCommand<R> {
    pub fn new(runner: R, command: String, args: Vec<String>, filter: SensorFilter) -> Self {
        Self {
            runner,
            command,
            args,
            filter,
        }
    }

    fn read_error(&self, reason: String) -> SensorError {
        SensorError::Read {
            command: display_command(&self.command, &self.args),
            reason,
        }
    }
}

#[async_trait]
impl<R: CommandRunner> TemperatureSensor for SensorsCommand<R> {
    async fn read_temperatures(&self) -> Result<Vec<TemperatureReading>, SensorError> {
        let output = self
            .runner
            .run(&self.command, &self.args)
            .await
            .map_err(|e| self.read_error(e.to_string()))?;

        if !output.success {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.read_error(format!("{} {}", output.status, stderr.trim())));
        }

        log::debug!("Sensor output: {}", String::from_utf8_lossy(&output.stdout));
        parse_snapshot(&output.stdout, &self.filter)
    }
}
