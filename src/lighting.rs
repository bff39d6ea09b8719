//! LED policy: normal vs. warning color/mode pair.

use serde::{Deserialize, Serialize};

/// LED color and mode as understood by the device controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedSetting {
    /// Hex RGB color, e.g. `"ff0000"`.
    pub color: String,
    /// Controller lighting mode, e.g. `"fixed"`.
    pub mode: String,
}

impl LedSetting {
    pub fn new(color: impl Into<String>, mode: impl Into<String>) -> Self {
        Self {
            color: color.into(),
            mode: mode.into(),
        }
    }
}

/// Two-way LED selection with no hysteresis.
///
/// # Example
///
/// ```
/// use smartfand::lighting::{LedPolicy, LedSetting};
///
/// let policy = LedPolicy::new(
///     LedSetting::new("555555", "fixed"),
///     LedSetting::new("ff0000", "fixed"),
/// );
/// assert_eq!(policy.compute_led(true).color, "ff0000");
/// assert_eq!(policy.compute_led(false).color, "555555");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedPolicy {
    normal: LedSetting,
    warning: LedSetting,
}

impl LedPolicy {
    pub fn new(normal: LedSetting, warning: LedSetting) -> Self {
        Self { normal, warning }
    }

    /// Picks the warning pair on overheat ticks and the normal pair otherwise.
    pub fn compute_led(&self, is_overheating: bool) -> &LedSetting {
        if is_overheating {
            &self.warning
        } else {
            &self.normal
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn policy() -> LedPolicy {
        LedPolicy::new(
            LedSetting::new("555555", "fixed"),
            LedSetting::new("ff0000", "breathing"),
        )
    }

    #[test]
    fn overheating_selects_warning_pair() {
        assert_eq!(policy().compute_led(true), &LedSetting::new("ff0000", "breathing"));
    }

    #[test]
    fn normal_tick_selects_normal_pair() {
        assert_eq!(policy().compute_led(false), &LedSetting::new("555555", "fixed"));
    }

    #[test]
    fn flips_back_immediately() {
        let policy = policy();
        let sequence: Vec<_> = [false, true, false]
            .into_iter()
            .map(|hot| policy.compute_led(hot).color.clone())
            .collect();
        assert_eq!(sequence, vec!["555555", "ff0000", "555555"]);
    }
}
