//! # smartfand
//!
//! A Linux daemon that drives an NZXT smart device's fans and LEDs from
//! hardware temperatures.
//!
//! ## Features
//!
//! - **Sensor aggregation**: reads `sensors -j` and keeps the hottest reading
//! - **Step-curve fan control**: maps the temperature/threshold ratio to a speed
//! - **Overheat warning**: switches the LEDs to a warning color and mode
//! - **Debounced actuation**: only calls `liquidctl` when a target changes
//! - **Fail-fast**: any sensor or device failure stops the daemon
//!
//! ## Architecture
//!
//! - [`ControlLoop`](monitoring::ControlLoop) - poll, decide, actuate, sleep
//! - [`TemperatureSensor`](sensors::TemperatureSensor) - sensor snapshot source
//! - [`FanController`](fan_controller::FanController) - debounced device actuator
//! - [`CommandRunner`](command::CommandRunner) - seam over external processes
//!
//! ## Example
//!
//! ```no_run
//! use smartfand::{application::Application, config::Config};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     Application::builder()
//!         .with_config(Config::load(None)?)
//!         .build()?
//!         .run()
//!         .await
//! }
//! ```

pub mod application;
pub mod cli;
pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod fan_controller;
pub mod fan_curve;
pub mod lighting;
pub mod monitoring;
pub mod sensors;
