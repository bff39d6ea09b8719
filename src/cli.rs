use clap::{Parser, ValueEnum};
use log::LevelFilter;
use std::path::PathBuf;

use crate::{config::Config, lighting::LedSetting};

/// smartfand: temperature-driven fan and LED control for NZXT smart devices
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// YAML config file path
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Interval between checks, in seconds
    #[arg(long)]
    pub interval: Option<u64>,

    /// Minimum fan speed, in percent
    #[arg(long)]
    pub min_speed: Option<u8>,

    /// Maximum fan speed, in percent
    #[arg(long)]
    pub max_speed: Option<u8>,

    /// Maximum temperature allowed, in Celsius
    #[arg(long)]
    pub max_temp: Option<f64>,

    /// Normal LED mode
    #[arg(long)]
    pub led_mode: Option<String>,

    /// Warning LED mode
    #[arg(long)]
    pub led_mode_warn: Option<String>,

    /// Normal LED color
    #[arg(long)]
    pub led_color: Option<String>,

    /// Warning LED color
    #[arg(long)]
    pub led_color_warn: Option<String>,

    /// Device vendor id passed to the controller tool
    #[arg(long)]
    pub vendor: Option<String>,

    /// Device product id passed to the controller tool
    #[arg(long)]
    pub product: Option<String>,

    /// Log level
    #[arg(long, value_enum, ignore_case = true, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Detach from the terminal and log to syslog
    #[arg(short = 'd', long = "daemonize", default_value = "false")]
    pub daemonize: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warning => LevelFilter::Warn,
            // `log` has no level above error.
            LogLevel::Error | LogLevel::Critical => LevelFilter::Error,
        }
    }
}

impl Cli {
    /// Overrides file values with the flags given on the command line.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(interval) = self.interval {
            config.interval = interval;
        }
        if let Some(min_speed) = self.min_speed {
            config.min_speed = min_speed;
        }
        if let Some(max_speed) = self.max_speed {
            config.max_speed = max_speed;
        }
        if let Some(max_temp) = self.max_temp {
            config.max_temp = max_temp;
        }
        override_led(&mut config.led.normal, &self.led_color, &self.led_mode);
        override_led(&mut config.led.warning, &self.led_color_warn, &self.led_mode_warn);
        if let Some(vendor) = &self.vendor {
            config.device.vendor = Some(vendor.clone());
        }
        if let Some(product) = &self.product {
            config.device.product = Some(product.clone());
        }
    }
}

fn override_led(led: &mut LedSetting, color: &Option<String>, mode: &Option<String>) {
    if let Some(color) = color {
        led.color = color.clone();
    }
    if let Some(mode) = mode {
        led.mode = mode.clone();
    }
}
