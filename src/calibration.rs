//! Per-sensor calibration of the analog pressure channels.
//!
//! Each pressure transducer maps a voltage range linearly onto a pressure
//! range in PSI. The station is authoritative; values edited here are
//! validated before they are sent back.

use serde::{Deserialize, Serialize};

use crate::device::models::PRESSURE_SENSORS;
use crate::error::{AppError, AppResult};

/// 1 PSI in bar.
pub const PSI_TO_BAR: f64 = 0.068_947_6;

const INVALID_MESSAGE: &str = "invalid values: v_min < v_max and psi_min < psi_max required";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub v_min: f64,
    pub v_max: f64,
    pub psi_min: f64,
    pub psi_max: f64,
}

impl Default for Calibration {
    /// Factory curve of the 0.5–4.5 V, 0–10 PSI transducers.
    fn default() -> Self {
        Self {
            v_min: 0.5,
            v_max: 4.5,
            psi_min: 0.0,
            psi_max: 10.0,
        }
    }
}

impl Calibration {
    /// Build a calibration, rejecting inverted or non-finite ranges.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if the ranges are invalid.
    pub fn new(v_min: f64, v_max: f64, psi_min: f64, psi_max: f64) -> AppResult<Self> {
        let calibration = Self {
            v_min,
            v_max,
            psi_min,
            psi_max,
        };
        calibration.validate()?;
        Ok(calibration)
    }

    /// Parse the four form fields as entered by the user.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if a field is not a number or the ranges are invalid.
    pub fn parse_fields(v_min: &str, v_max: &str, psi_min: &str, psi_max: &str) -> AppResult<Self> {
        let parse = |value: &str| -> AppResult<f64> {
            value
                .trim()
                .parse::<f64>()
                .map_err(|_| AppError::Validation(INVALID_MESSAGE.to_string()))
        };
        Self::new(parse(v_min)?, parse(v_max)?, parse(psi_min)?, parse(psi_max)?)
    }

    /// # Errors
    ///
    /// Returns `AppError::Validation` unless all values are finite,
    /// `v_min < v_max` and `psi_min < psi_max`.
    pub fn validate(&self) -> AppResult<()> {
        let finite = [self.v_min, self.v_max, self.psi_min, self.psi_max]
            .iter()
            .all(|v| v.is_finite());

        if !finite || self.v_min >= self.v_max || self.psi_min >= self.psi_max {
            return Err(AppError::Validation(INVALID_MESSAGE.to_string()));
        }
        Ok(())
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Pressure in PSI for a raw channel voltage. Not clamped to the range.
    #[must_use]
    pub fn psi_at(&self, voltage: f64) -> f64 {
        self.psi_min
            + (voltage - self.v_min) * (self.psi_max - self.psi_min) / (self.v_max - self.v_min)
    }

    #[must_use]
    pub fn bar_at(&self, voltage: f64) -> f64 {
        self.psi_at(voltage) * PSI_TO_BAR
    }

    /// Form field text: voltages with 2 decimals, pressures with 1.
    #[must_use]
    pub fn field_text(&self) -> [String; 4] {
        [
            format!("{:.2}", self.v_min),
            format!("{:.2}", self.v_max),
            format!("{:.1}", self.psi_min),
            format!("{:.1}", self.psi_max),
        ]
    }
}

/// Check a 0-based sensor index before it is sent to the station.
///
/// # Errors
///
/// Returns `AppError::Validation` for indices outside the pressure channels.
pub fn check_sensor(index: usize) -> AppResult<usize> {
    if index < PRESSURE_SENSORS {
        Ok(index)
    } else {
        Err(AppError::Validation(format!(
            "sensor index {index} out of range (0-{})",
            PRESSURE_SENSORS - 1
        )))
    }
}
