//! Fan speed policy for temperature-based control.
//!
//! The curve is a step function over the ratio between the hottest reading
//! and the configured maximum temperature. At or above the maximum the fan
//! saturates to the configured top speed regardless of the table.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One threshold of the step table.
///
/// Applies `speed` once `current / max_temp >= ratio`.
///
/// # Example
///
/// ```
/// use smartfand::fan_curve::SpeedStep;
///
/// let step = SpeedStep { ratio: 0.9, speed: 75 }; // 90% of max -> 75% fan
/// let from_tuple: SpeedStep = (0.9, 75).into();
/// assert_eq!(step, from_tuple);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedStep {
    pub ratio: f64,
    pub speed: u8,
}

impl From<(f64, u8)> for SpeedStep {
    fn from(value: (f64, u8)) -> Self {
        Self {
            ratio: value.0,
            speed: value.1,
        }
    }
}

/// Step table used when none is configured, ordered by descending ratio.
pub const DEFAULT_STEPS: [SpeedStep; 5] = [
    SpeedStep { ratio: 0.95, speed: 100 },
    SpeedStep { ratio: 0.90, speed: 75 },
    SpeedStep { ratio: 0.85, speed: 60 },
    SpeedStep { ratio: 0.80, speed: 40 },
    SpeedStep { ratio: 0.75, speed: 25 },
];

pub fn default_steps() -> Vec<SpeedStep> {
    DEFAULT_STEPS.to_vec()
}

/// Whether `current_temp` has reached the overheat threshold.
pub fn is_overheating(current_temp: f64, max_temp: f64) -> bool {
    current_temp >= max_temp
}

/// Computes the target fan speed using the default step table.
///
/// # Example
///
/// ```
/// use smartfand::fan_curve::compute_speed;
///
/// assert_eq!(compute_speed(60.0, 65.0, 10, 100), 75);
/// assert_eq!(compute_speed(65.0, 65.0, 10, 100), 100);
/// assert_eq!(compute_speed(10.0, 65.0, 10, 100), 10);
/// ```
pub fn compute_speed(current_temp: f64, max_temp: f64, min_speed: u8, max_speed: u8) -> u8 {
    step_speed(current_temp, max_temp, min_speed, max_speed, &DEFAULT_STEPS)
}

fn step_speed(
    current_temp: f64,
    max_temp: f64,
    min_speed: u8,
    max_speed: u8,
    steps: &[SpeedStep],
) -> u8 {
    // Checked before the table so exact ties saturate.
    if is_overheating(current_temp, max_temp) {
        return max_speed;
    }

    let ratio = current_temp / max_temp;
    let raw = steps
        .iter()
        .find(|step| ratio >= step.ratio)
        .map_or(0, |step| step.speed);

    raw.min(max_speed).max(min_speed)
}

/// Checks that a step table is usable.
///
/// Ratios must be in `(0, 1]` and strictly descending; speeds must be at
/// most 100 and non-increasing so the curve stays monotonic.
pub fn validate_steps(steps: &[SpeedStep]) -> Result<(), ConfigError> {
    for (index, step) in steps.iter().enumerate() {
        if !(step.ratio > 0.0 && step.ratio <= 1.0) {
            return Err(ConfigError::SpeedStep {
                index,
                reason: format!("ratio {} is outside (0, 1]", step.ratio),
            });
        }
        if step.speed > 100 {
            return Err(ConfigError::SpeedStep {
                index,
                reason: format!("speed {}% exceeds 100%", step.speed),
            });
        }
    }

    for (index, pair) in steps.windows(2).enumerate() {
        let (higher, lower) = (pair[0], pair[1]);
        if lower.ratio >= higher.ratio {
            return Err(ConfigError::SpeedStep {
                index: index + 1,
                reason: "ratios must be strictly descending".into(),
            });
        }
        if lower.speed > higher.speed {
            return Err(ConfigError::SpeedStep {
                index: index + 1,
                reason: "speeds must not increase as the ratio drops".into(),
            });
        }
    }

    Ok(())
}

/// Resolved speed policy built from the configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedCurve {
    pub max_temp: f64,
    pub min_speed: u8,
    pub max_speed: u8,
    pub steps: Vec<SpeedStep>,
}

impl SpeedCurve {
    /// Target speed for the given temperature, clamped to `[min, max]`.
    pub fn compute(&self, current_temp: f64) -> u8 {
        step_speed(
            current_temp,
            self.max_temp,
            self.min_speed,
            self.max_speed,
            &self.steps,
        )
    }

    pub fn is_overheating(&self, current_temp: f64) -> bool {
        is_overheating(current_temp, self.max_temp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn curve() -> SpeedCurve {
        SpeedCurve {
            max_temp: 65.0,
            min_speed: 10,
            max_speed: 100,
            steps: default_steps(),
        }
    }

    #[test]
    fn ratio_above_ninety_percent_gives_75() {
        // 60 / 65 = 0.923
        assert_eq!(compute_speed(60.0, 65.0, 10, 100), 75);
    }

    #[test]
    fn reaching_max_temp_saturates() {
        assert_eq!(compute_speed(65.0, 65.0, 10, 100), 100);
        assert!(is_overheating(65.0, 65.0));
        assert!(!is_overheating(64.9, 65.0));
    }

    #[test]
    fn cool_temperature_is_clamped_to_min_speed() {
        // 10 / 65 = 0.154, raw 0
        assert_eq!(compute_speed(10.0, 65.0, 10, 100), 10);
        assert_eq!(compute_speed(10.0, 65.0, 0, 100), 0);
    }

    #[test]
    fn each_bracket_maps_to_its_step() {
        let max = 100.0;
        assert_eq!(compute_speed(96.0, max, 0, 100), 100);
        assert_eq!(compute_speed(95.0, max, 0, 100), 100);
        assert_eq!(compute_speed(92.0, max, 0, 100), 75);
        assert_eq!(compute_speed(87.0, max, 0, 100), 60);
        assert_eq!(compute_speed(80.0, max, 0, 100), 40);
        assert_eq!(compute_speed(76.0, max, 0, 100), 25);
        assert_eq!(compute_speed(74.9, max, 0, 100), 0);
    }

    #[test]
    fn step_result_is_clamped_to_max_speed() {
        assert_eq!(compute_speed(96.0, 100.0, 10, 50), 50);
        assert_eq!(compute_speed(100.0, 100.0, 10, 50), 50);
    }

    #[test]
    fn zero_and_negative_temperatures_fall_through() {
        assert_eq!(compute_speed(0.0, 65.0, 10, 100), 10);
        assert_eq!(compute_speed(-20.0, 65.0, 10, 100), 10);
    }

    #[test]
    fn saturation_ignores_min_speed() {
        assert_eq!(compute_speed(80.0, 65.0, 90, 95), 95);
    }

    #[test]
    fn configured_table_is_used() {
        let curve = SpeedCurve {
            steps: vec![(0.95, 75).into(), (0.90, 50).into(), (0.80, 25).into()],
            ..curve()
        };
        assert_eq!(curve.compute(62.0), 75);
        assert_eq!(curve.compute(59.0), 50);
        assert_eq!(curve.compute(53.0), 25);
        assert_eq!(curve.compute(40.0), 10);
        assert_eq!(curve.compute(70.0), 100);
        assert!(curve.is_overheating(70.0));
    }

    #[test]
    fn empty_table_only_saturates() {
        let curve = SpeedCurve {
            steps: vec![],
            ..curve()
        };
        assert_eq!(curve.compute(64.0), 10);
        assert_eq!(curve.compute(65.0), 100);
    }

    #[test]
    fn default_table_is_valid() {
        assert!(validate_steps(&DEFAULT_STEPS).is_ok());
        assert!(validate_steps(&[]).is_ok());
    }

    #[test]
    fn validate_rejects_unordered_ratios() {
        let steps = vec![SpeedStep::from((0.8, 40)), SpeedStep::from((0.9, 75))];
        let err = validate_steps(&steps).unwrap_err();
        assert!(matches!(err, ConfigError::SpeedStep { index: 1, .. }));
    }

    #[test]
    fn validate_rejects_increasing_speeds() {
        let steps = vec![SpeedStep::from((0.9, 40)), SpeedStep::from((0.8, 75))];
        assert!(validate_steps(&steps).is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        assert!(validate_steps(&[SpeedStep::from((0.0, 40))]).is_err());
        assert!(validate_steps(&[SpeedStep::from((1.5, 40))]).is_err());
        assert!(validate_steps(&[SpeedStep::from((0.9, 120))]).is_err());
        assert!(validate_steps(&[SpeedStep::from((f64::NAN, 40))]).is_err());
    }

    #[test]
    fn speed_step_deserializes_from_yaml() {
        let steps: Vec<SpeedStep> =
            serde_yaml::from_str("- { ratio: 0.9, speed: 75 }\n- { ratio: 0.8, speed: 25 }\n")
                .unwrap();
        assert_eq!(steps, vec![SpeedStep::from((0.9, 75)), SpeedStep::from((0.8, 25))]);
    }

    proptest! {
        #[test]
        fn below_max_matches_step_table(
            temp in 0.0f64..65.0,
            min in 0u8..50,
            max in 50u8..=100,
        ) {
            prop_assume!(min < max);
            let ratio = temp / 65.0;
            let raw = DEFAULT_STEPS
                .iter()
                .find(|s| ratio >= s.ratio)
                .map_or(0, |s| s.speed);
            prop_assert_eq!(compute_speed(temp, 65.0, min, max), raw.clamp(min, max));
        }

        #[test]
        fn at_or_above_max_saturates(
            temp in 65.0f64..500.0,
            min in 0u8..=100,
            max in 0u8..=100,
        ) {
            prop_assert_eq!(compute_speed(temp, 65.0, min, max), max);
        }

        #[test]
        fn speed_is_monotonic_in_temperature(
            a in -50.0f64..150.0,
            b in -50.0f64..150.0,
            max_temp in 1.0f64..120.0,
            min in 0u8..50,
            max in 50u8..=100,
        ) {
            prop_assume!(min < max);
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(
                compute_speed(lo, max_temp, min, max) <= compute_speed(hi, max_temp, min, max)
            );
        }

        #[test]
        fn result_stays_within_band(
            temp in -50.0f64..150.0,
            min in 0u8..50,
            max in 50u8..=100,
        ) {
            prop_assume!(min < max);
            let speed = compute_speed(temp, 65.0, min, max);
            prop_assert!(speed >= min && speed <= max);
        }
    }
}
