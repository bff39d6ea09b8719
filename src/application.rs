//! Application entry point and builder pattern implementation.

use anyhow::{Context, Result};
use log::info;
use tokio_util::sync::CancellationToken;

use crate::{
    command::SystemCommandRunner,
    config::Config,
    controller::LiquidctlController,
    monitoring::ControlLoop,
    sensors::SensorsCommand,
};

/// Main application structure wiring the sensor reader, the policies and the
/// device controller into one control loop.
///
/// # Example
///
/// ```no_run
/// use smartfand::{application::Application, config::Config};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::load(None)?;
/// Application::builder()
///     .with_config(config)
///     .build()?
///     .run()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct Application {
    control_loop: ControlLoop<
        SensorsCommand<SystemCommandRunner>,
        LiquidctlController<SystemCommandRunner>,
    >,
}

impl Application {
    /// Creates a new ApplicationBuilder for constructing Application instances.
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    /// Initializes the device and runs the control loop until a fatal error
    /// or a termination signal.
    pub async fn run(&mut self) -> Result<()> {
        let cancel_token = CancellationToken::new();
        tokio::spawn(watch_signals(cancel_token.clone()));

        self.control_loop
            .run(cancel_token)
            .await
            .context("Control loop terminated")?;

        info!("Shutting down; device keeps its last applied state");
        Ok(())
    }
}

/// Builder pattern for creating Application instances.
pub struct ApplicationBuilder {
    config: Option<Config>,
}

impl ApplicationBuilder {
    fn new() -> Self {
        Self { config: None }
    }

    /// Sets the resolved configuration for the application.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Validates the configuration and builds the Application instance.
    pub fn build(self) -> Result<Application> {
        let config = self
            .config
            .ok_or_else(|| anyhow::anyhow!("Configuration is required"))?;
        config.validate().context("Invalid configuration")?;

        let runner = SystemCommandRunner::new(config.command_timeout());
        let sensors = SensorsCommand::new(
            runner.clone(),
            config.sensors.command.clone(),
            config.sensors.args.clone(),
            config.sensor_filter(),
        );
        let controller = LiquidctlController::new(
            runner,
            config.controller.command.clone(),
            config.device.clone(),
        );

        Ok(Application {
            control_loop: ControlLoop::new(
                sensors,
                controller,
                config.speed_curve(),
                config.led_policy(),
                config.poll_interval(),
            ),
        })
    }
}

async fn watch_signals(cancel_token: CancellationToken) {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            log::warn!("Failed to listen for SIGTERM: {e}");
            return;
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => info!("Received Ctrl+C, stopping"),
            Err(e) => {
                log::warn!("Failed to listen for Ctrl+C: {e}");
                return;
            }
        },
        _ = sigterm.recv() => info!("Received SIGTERM, stopping"),
    }

    cancel_token.cancel();
}
