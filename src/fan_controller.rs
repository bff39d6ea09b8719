//! Fan controller abstraction and trait definitions.

use async_trait::async_trait;

use crate::{error::ActuationError, lighting::LedSetting};

/// Last values successfully applied to the device.
///
/// `None` means "never applied", so the first real command is always sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceState {
    pub speed: Option<u8>,
    pub led: Option<LedSetting>,
}

/// Trait for fan/LED controller implementations.
///
/// `apply_*` calls are debounced against [`DeviceState`]: a request equal to
/// the cached value returns `Ok` without touching the device, and the cache
/// only changes after the device acknowledged the new value.
///
/// # Example
///
/// ```no_run
/// use smartfand::{
///     error::ActuationError,
///     fan_controller::{DeviceState, FanController},
///     lighting::LedSetting,
/// };
///
/// #[derive(Debug, Default)]
/// struct NullController(DeviceState);
///
/// #[async_trait::async_trait]
/// impl FanController for NullController {
///     async fn initialize(&mut self) -> Result<(), ActuationError> { Ok(()) }
///     async fn apply_speed(&mut self, percent: u8) -> Result<(), ActuationError> {
///         self.0.speed = Some(percent);
///         Ok(())
///     }
///     async fn apply_led(&mut self, led: &LedSetting) -> Result<(), ActuationError> {
///         self.0.led = Some(led.clone());
///         Ok(())
///     }
///     fn state(&self) -> &DeviceState { &self.0 }
/// }
/// ```
#[async_trait]
pub trait FanController: Send + core::fmt::Debug {
    /// Initializes the device. Called once, before any `apply_*`.
    async fn initialize(&mut self) -> Result<(), ActuationError>;

    /// Sets the fan speed in percent if it differs from the cached value.
    async fn apply_speed(&mut self, percent: u8) -> Result<(), ActuationError>;

    /// Sets the LED color/mode pair if either differs from the cached pair.
    async fn apply_led(&mut self, led: &LedSetting) -> Result<(), ActuationError>;

    /// Currently cached device state.
    fn state(&self) -> &DeviceState;
}
