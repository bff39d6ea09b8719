//! Error taxonomy for the daemon.
//!
//! Every error kind is fatal: the control loop propagates it to `main`,
//! which logs it and exits with a non-zero status.

/// Result alias for daemon-level operations.
pub type Result<T> = std::result::Result<T, DaemonError>;

/// Invalid configuration detected at startup.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("min speed ({min}%) must be lower than max speed ({max}%)")]
    SpeedRange { min: u8, max: u8 },

    #[error("max speed ({0}%) must not exceed 100%")]
    SpeedAboveHundred(u8),

    #[error("max temperature must be positive, got {0}°C")]
    MaxTemp(f64),

    #[error("poll interval must be at least one second")]
    Interval,

    #[error("invalid speed step #{index}: {reason}")]
    SpeedStep { index: usize, reason: String },

    #[error("{0} command must not be empty")]
    EmptyCommand(&'static str),

    #[error("at least one sensor key marker is required")]
    NoKeyMarkers,

    #[error("unsupported config version {0}")]
    Version(u8),
}

/// Failure to obtain a usable temperature for a tick.
#[derive(thiserror::Error, Debug)]
pub enum SensorError {
    #[error("failed to read sensors via `{command}`: {reason}")]
    Read { command: String, reason: String },

    #[error("sensor output is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("no temperature readings matched the sensor filter")]
    NoData,
}

/// Failure to apply a command to the physical device.
#[derive(thiserror::Error, Debug)]
pub enum ActuationError {
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}")]
    Failed { command: String, status: String },

    #[error("`{command}` timed out")]
    Timeout { command: String },
}

/// Top-level error wrapping every fatal condition.
#[derive(thiserror::Error, Debug)]
pub enum DaemonError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("sensor error: {0}")]
    Sensor(#[from] SensorError),

    #[error("actuation error: {0}")]
    Actuation(#[from] ActuationError),
}
