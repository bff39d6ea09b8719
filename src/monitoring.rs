//! Poll-decide-actuate control loop.
//!
//! Each tick reads the hottest temperature, maps it to a fan speed and LED
//! pair, and hands both to the controller, which skips unchanged values.
//! The loop then sleeps for the configured interval; tick latency adds to it.
//! Any error ends the loop and is returned to the caller.

use std::time::Duration;

use log::{debug, info, warn};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::{
    error::Result,
    fan_controller::FanController,
    fan_curve::SpeedCurve,
    lighting::LedPolicy,
    sensors::{TemperatureSensor, max_temperature},
};

/// What a single tick decided.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutcome {
    pub temperature: f64,
    pub speed: u8,
    pub overheating: bool,
}

/// The daemon's single control loop.
pub struct ControlLoop<S: TemperatureSensor, C: FanController> {
    sensors: S,
    controller: C,
    curve: SpeedCurve,
    leds: LedPolicy,
    interval: Duration,
}

impl<S: TemperatureSensor, C: FanController> ControlLoop<S, C> {
    pub fn new(
        sensors: S,
        controller: C,
        curve: SpeedCurve,
        leds: LedPolicy,
        interval: Duration,
    ) -> Self {
        Self {
            sensors,
            controller,
            curve,
            leds,
            interval,
        }
    }

    #[cfg(test)]
    pub(crate) fn controller(&self) -> &C {
        &self.controller
    }

    /// Initializes the device, then ticks until an error or cancellation.
    ///
    /// Cancellation also interrupts a pending command; the in-flight future is
    /// dropped and a real child process is killed with it.
    pub async fn run(&mut self, cancel_token: CancellationToken) -> Result<()> {
        tokio::select! {
            biased;
            result = self.controller.initialize() => result?,
            () = cancel_token.cancelled() => {
                info!("Control loop cancelled during initialization");
                return Ok(());
            }
        }

        loop {
            tokio::select! {
                biased;
                result = self.tick() => {
                    result?;
                }
                () = cancel_token.cancelled() => {
                    info!("Control loop cancelled during a tick");
                    break;
                }
            }

            tokio::select! {
                () = cancel_token.cancelled() => {
                    info!("Control loop cancelled");
                    break;
                }
                () = sleep(self.interval) => {}
            }
        }

        Ok(())
    }

    /// Runs one poll-decide-actuate iteration.
    pub async fn tick(&mut self) -> Result<TickOutcome> {
        let readings = self.sensors.read_temperatures().await?;
        let temperature = max_temperature(&readings)?;
        let overheating = self.curve.is_overheating(temperature);
        let speed = self.curve.compute(temperature);

        if overheating {
            warn!("Highest temperature: {temperature}ºC");
            for reading in &readings {
                info!("{}: {}ºC", reading.label, reading.value);
            }
        } else {
            for reading in &readings {
                debug!("{}: {}ºC", reading.label, reading.value);
            }
            debug!(
                "current_max_temp: {temperature}, configured_max_temp: {}, ratio: {:.3}, speed: {speed}",
                self.curve.max_temp,
                temperature / self.curve.max_temp,
            );
        }

        self.controller.apply_speed(speed).await?;
        self.controller
            .apply_led(self.leds.compute_led(overheating))
            .await?;

        Ok(TickOutcome {
            temperature,
            speed,
            overheating,
        })
    }
}
