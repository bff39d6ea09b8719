//! Device actuation through the `liquidctl` command-line tool.

use async_trait::async_trait;
use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::{
    command::{CommandRunner, display_command},
    error::ActuationError,
    fan_controller::{DeviceState, FanController},
    lighting::LedSetting,
};

/// Optional vendor/product selector passed verbatim to the controller tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFilter {
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
}

impl DeviceFilter {
    /// Leading `--vendor`/`--product` arguments for every invocation.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(vendor) = &self.vendor {
            args.extend(["--vendor".to_string(), vendor.clone()]);
        }
        if let Some(product) = &self.product {
            args.extend(["--product".to_string(), product.clone()]);
        }
        args
    }
}

/// Debounced fan/LED actuator backed by an external controller command.
///
/// Owns the [`DeviceState`] cache; nothing else reads or writes it.
#[derive(Debug)]
pub struct LiquidctlController<R: CommandRunner> {
    runner: R,
    command: String,
    filter: DeviceFilter,
    state: DeviceState,
}

impl<R: CommandRunner> LiquidctlController<R> {
    pub fn new(runner: R, command: String, filter: DeviceFilter) -> Self {
        Self {
            runner,
            command,
            filter,
            state: DeviceState::default(),
        }
    }

    #[cfg(test)]
    fn with_state(runner: R, command: String, filter: DeviceFilter, state: DeviceState) -> Self {
        Self {
            runner,
            command,
            filter,
            state,
        }
    }

    async fn invoke(&self, subcommand: &[&str]) -> Result<(), ActuationError> {
        let mut args = self.filter.to_args();
        args.extend(subcommand.iter().map(|s| s.to_string()));
        let command = display_command(&self.command, &args);

        let output = self.runner.run(&self.command, &args).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::TimedOut {
                ActuationError::Timeout {
                    command: command.clone(),
                }
            } else {
                ActuationError::Spawn {
                    command: command.clone(),
                    source: e,
                }
            }
        })?;

        if !output.success {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stderr.trim().is_empty() {
                error!("{}: {}", self.command, stderr.trim());
            }
            return Err(ActuationError::Failed {
                command,
                status: output.status,
            });
        }

        Ok(())
    }
}

#[async_trait]
impl<R: CommandRunner + core::fmt::Debug> FanController for LiquidctlController<R> {
    async fn initialize(&mut self) -> Result<(), ActuationError> {
        info!("Initializing devices");
        self.invoke(&["initialize"]).await
    }

    async fn apply_speed(&mut self, percent: u8) -> Result<(), ActuationError> {
        if self.state.speed == Some(percent) {
            return Ok(());
        }

        info!("Setting fan speed to {percent}%");
        let speed = percent.to_string();
        self.invoke(&["set", "sync", "speed", speed.as_str()]).await?;

        self.state.speed = Some(percent);
        Ok(())
    }

    async fn apply_led(&mut self, led: &LedSetting) -> Result<(), ActuationError> {
        if self.state.led.as_ref() == Some(led) {
            return Ok(());
        }

        info!("Setting LED color to {} and mode {}", led.color, led.mode);
        self.invoke(&["set", "led", "color", led.mode.as_str(), led.color.as_str()])
            .await?;

        self.state.led = Some(led.clone());
        Ok(())
    }

    fn state(&self) -> &DeviceState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandOutput, MockCommandRunner};
    use mockall::Sequence;
    use pretty_assertions::assert_eq;
    use std::io;

    fn nzxt() -> DeviceFilter {
        DeviceFilter {
            vendor: Some("0x1e71".into()),
            product: None,
        }
    }

    fn args_are(args: &[String], expected: &[&str]) -> bool {
        args.iter().map(String::as_str).eq(expected.iter().copied())
    }

    fn controller(runner: MockCommandRunner) -> LiquidctlController<MockCommandRunner> {
        LiquidctlController::new(runner, "liquidctl".into(), nzxt())
    }

    #[test]
    fn filter_args_are_optional() {
        assert!(DeviceFilter::default().to_args().is_empty());
        assert_eq!(nzxt().to_args(), vec!["--vendor", "0x1e71"]);

        let both = DeviceFilter {
            vendor: Some("0x1e71".into()),
            product: Some("0x2006".into()),
        };
        assert_eq!(both.to_args(), vec!["--vendor", "0x1e71", "--product", "0x2006"]);
    }

    #[tokio::test]
    async fn initialize_passes_filter_first() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|program, args| {
                program == "liquidctl" && args_are(args, &["--vendor", "0x1e71", "initialize"])
            })
            .times(1)
            .returning(|_, _| Ok(CommandOutput::ok("")));

        let mut controller = controller(runner);
        controller.initialize().await.unwrap();
        assert_eq!(controller.state(), &DeviceState::default());
    }

    #[tokio::test]
    async fn initialize_failure_is_fatal() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .times(1)
            .returning(|_, _| Ok(CommandOutput::failed(1)));

        let err = controller(runner).initialize().await.unwrap_err();
        assert!(matches!(err, ActuationError::Failed { .. }));
        assert!(err.to_string().contains("initialize"));
    }

    #[tokio::test]
    async fn repeated_speed_is_applied_once() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|_, args| args_are(args, &["--vendor", "0x1e71", "set", "sync", "speed", "40"]))
            .times(1)
            .returning(|_, _| Ok(CommandOutput::ok("")));

        let mut controller = controller(runner);
        controller.apply_speed(40).await.unwrap();
        controller.apply_speed(40).await.unwrap();
        assert_eq!(controller.state().speed, Some(40));
    }

    #[tokio::test]
    async fn changed_speed_is_applied_each_time() {
        let mut seq = Sequence::new();
        let mut runner = MockCommandRunner::new();
        for value in ["40", "75"] {
            runner
                .expect_run()
                .withf(move |_, args| args.last().map(String::as_str) == Some(value))
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_, _| Ok(CommandOutput::ok("")));
        }

        let mut controller = controller(runner);
        controller.apply_speed(40).await.unwrap();
        controller.apply_speed(75).await.unwrap();
        assert_eq!(controller.state().speed, Some(75));
    }

    #[tokio::test]
    async fn cached_speed_skips_and_new_speed_updates_cache() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|_, args| args.last().map(String::as_str) == Some("51"))
            .times(1)
            .returning(|_, _| Ok(CommandOutput::ok("")));

        let state = DeviceState {
            speed: Some(50),
            led: None,
        };
        let mut controller =
            LiquidctlController::with_state(runner, "liquidctl".into(), nzxt(), state);

        controller.apply_speed(50).await.unwrap();
        controller.apply_speed(51).await.unwrap();
        assert_eq!(controller.state().speed, Some(51));
    }

    #[tokio::test]
    async fn failed_speed_leaves_cache_untouched() {
        let mut seq = Sequence::new();
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(CommandOutput::failed(2)));
        runner
            .expect_run()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(CommandOutput::ok("")));

        let mut controller = controller(runner);
        let err = controller.apply_speed(60).await.unwrap_err();
        assert!(err.to_string().contains("exit status: 2"));
        assert_eq!(controller.state().speed, None);

        // The same transition is attempted again rather than assumed.
        controller.apply_speed(60).await.unwrap();
        assert_eq!(controller.state().speed, Some(60));
    }

    #[tokio::test]
    async fn led_uses_mode_then_color() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|_, args| {
                args_are(
                    args,
                    &["--vendor", "0x1e71", "set", "led", "color", "fixed", "ff0000"],
                )
            })
            .times(1)
            .returning(|_, _| Ok(CommandOutput::ok("")));

        let mut controller = controller(runner);
        let warn = LedSetting::new("ff0000", "fixed");
        controller.apply_led(&warn).await.unwrap();
        controller.apply_led(&warn).await.unwrap();
        assert_eq!(controller.state().led, Some(warn));
    }

    #[tokio::test]
    async fn led_mode_or_color_change_reapplies() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .times(3)
            .returning(|_, _| Ok(CommandOutput::ok("")));

        let mut controller = controller(runner);
        controller
            .apply_led(&LedSetting::new("555555", "fixed"))
            .await
            .unwrap();
        controller
            .apply_led(&LedSetting::new("555555", "breathing"))
            .await
            .unwrap();
        controller
            .apply_led(&LedSetting::new("ff0000", "breathing"))
            .await
            .unwrap();
        assert_eq!(
            controller.state().led,
            Some(LedSetting::new("ff0000", "breathing"))
        );
    }

    #[tokio::test]
    async fn failure_carries_the_full_command_line() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .returning(|_, _| Ok(CommandOutput::failed(2)));

        let err = controller(runner).apply_speed(60).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "`liquidctl --vendor 0x1e71 set sync speed 60` exited with exit status: 2"
        );
    }

    #[tokio::test]
    async fn failed_led_leaves_cache_untouched() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .returning(|_, _| Ok(CommandOutput::failed(1)));

        let mut controller = controller(runner);
        assert!(
            controller
                .apply_led(&LedSetting::new("555555", "fixed"))
                .await
                .is_err()
        );
        assert_eq!(controller.state().led, None);
    }

    #[tokio::test]
    async fn spawn_and_timeout_errors_are_distinguished() {
        let mut seq = Sequence::new();
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(io::Error::new(io::ErrorKind::NotFound, "missing")));
        runner
            .expect_run()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(io::Error::new(io::ErrorKind::TimedOut, "slow")));

        let mut controller = controller(runner);
        assert!(matches!(
            controller.apply_speed(30).await,
            Err(ActuationError::Spawn { .. })
        ));
        assert!(matches!(
            controller.apply_speed(30).await,
            Err(ActuationError::Timeout { .. })
        ));
        assert_eq!(controller.state().speed, None);
    }
}
