use serde::{Deserialize, Serialize};

use crate::calibration::Calibration;
use crate::error::{AppError, AppResult};

/// Number of analog pressure channels on the station.
pub const PRESSURE_SENSORS: usize = 4;
/// Number of pulse flow channels on the station.
pub const FLOW_SENSORS: usize = 2;

/// Response from `/api/sensorwerte`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub time: String,
    /// bar
    pub pressure: [f64; PRESSURE_SENSORS],
    /// L/min
    pub flow_rate: [f64; FLOW_SENSORS],
    /// L since the last reset
    pub cumulative_flow: [f64; FLOW_SENSORS],
    /// Older firmware does not report the recording flag.
    #[serde(default)]
    pub recording: Option<bool>,
}

/// Response from `/api/last10min`, `/api/loggingData` and `/api/logdata`.
///
/// Every column is index-aligned with `timestamps`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub timestamps: Vec<String>,
    pub pressure: PressureColumns,
    pub flow: FlowColumns,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PressureColumns {
    #[serde(default)]
    pub sensor1: Vec<f64>,
    #[serde(default)]
    pub sensor2: Vec<f64>,
    #[serde(default)]
    pub sensor3: Vec<f64>,
    #[serde(default)]
    pub sensor4: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowColumns {
    #[serde(default)]
    pub sensor1: Vec<f64>,
    #[serde(default)]
    pub sensor2: Vec<f64>,
}

impl Series {
    #[must_use]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Pressure column for a 1-based sensor number.
    #[must_use]
    pub fn pressure(&self, sensor: usize) -> Option<&[f64]> {
        match sensor {
            1 => Some(&self.pressure.sensor1),
            2 => Some(&self.pressure.sensor2),
            3 => Some(&self.pressure.sensor3),
            4 => Some(&self.pressure.sensor4),
            _ => None,
        }
    }

    /// Flow column for a 1-based sensor number.
    #[must_use]
    pub fn flow(&self, sensor: usize) -> Option<&[f64]> {
        match sensor {
            1 => Some(&self.flow.sensor1),
            2 => Some(&self.flow.sensor2),
            _ => None,
        }
    }

    /// All value columns, pressure first, in sensor order.
    pub fn columns_mut(&mut self) -> [&mut Vec<f64>; PRESSURE_SENSORS + FLOW_SENSORS] {
        [
            &mut self.pressure.sensor1,
            &mut self.pressure.sensor2,
            &mut self.pressure.sensor3,
            &mut self.pressure.sensor4,
            &mut self.flow.sensor1,
            &mut self.flow.sensor2,
        ]
    }

    fn columns(&self) -> [(&'static str, &Vec<f64>); PRESSURE_SENSORS + FLOW_SENSORS] {
        [
            ("pressure.sensor1", &self.pressure.sensor1),
            ("pressure.sensor2", &self.pressure.sensor2),
            ("pressure.sensor3", &self.pressure.sensor3),
            ("pressure.sensor4", &self.pressure.sensor4),
            ("flow.sensor1", &self.flow.sensor1),
            ("flow.sensor2", &self.flow.sensor2),
        ]
    }

    /// Reject series whose columns are not index-aligned with `timestamps`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Malformed` naming the first column with a different length.
    pub fn check_aligned(&self) -> AppResult<()> {
        let expected = self.timestamps.len();
        for (name, column) in self.columns() {
            if column.len() != expected {
                return Err(AppError::Malformed(format!(
                    "{name} has {} values for {expected} timestamps",
                    column.len()
                )));
            }
        }
        Ok(())
    }

    /// Append one aligned sample.
    pub fn push(
        &mut self,
        timestamp: String,
        pressure: [f64; PRESSURE_SENSORS],
        flow: [f64; FLOW_SENSORS],
    ) {
        self.timestamps.push(timestamp);
        let values = pressure.into_iter().chain(flow);
        for (column, value) in self.columns_mut().into_iter().zip(values) {
            column.push(value);
        }
    }
}

/// Body of `POST /updateCalibration`
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CalibrationUpdate {
    /// 0-based sensor index
    pub sensor: usize,
    #[serde(flatten)]
    pub calibration: Calibration,
}

/// Wire shape of a JSON `/calibrateVmin` response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawVminResponse {
    pub status: String,
    #[serde(default)]
    pub v_min: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VminStatus {
    Success,
    Failed,
    /// Prose response without a recognizable value.
    Unparsed,
}

/// Outcome of an automatic `v_min` calibration.
#[derive(Debug, Clone, PartialEq)]
pub struct VminCalibration {
    pub status: VminStatus,
    pub v_min: Option<f64>,
    /// Text the station sent, kept for display.
    pub message: String,
}

impl VminCalibration {
    /// Interpret a `/calibrateVmin` body.
    ///
    /// Current firmware answers `{"status": "success", "v_min": 0.512}`; older
    /// builds answer with a sentence such as `Neuer v_min-Wert = 0.512 V`.
    /// Both end up in the same structure.
    #[must_use]
    pub fn from_body(body: &str) -> Self {
        let message = body.trim().to_string();

        if let Ok(raw) = serde_json::from_str::<RawVminResponse>(&message) {
            let status = if raw.status.eq_ignore_ascii_case("success") {
                VminStatus::Success
            } else {
                VminStatus::Failed
            };
            return Self {
                status,
                v_min: raw.v_min.filter(|v| v.is_finite()),
                message,
            };
        }

        match vmin_from_prose(&message) {
            Some(v_min) => Self {
                status: VminStatus::Success,
                v_min: Some(v_min),
                message,
            },
            None => Self {
                status: VminStatus::Unparsed,
                v_min: None,
                message,
            },
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == VminStatus::Success && self.v_min.is_some()
    }
}

/// Extract the voltage from `... v_min-Wert = 0.512 V ...` or `v_min = 0.512 V`.
fn vmin_from_prose(text: &str) -> Option<f64> {
    let start = text.find("v_min")?;
    let rest = &text[start..];
    let rest = &rest[rest.find('=')? + 1..];
    let number: String = rest
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    number.parse().ok().filter(|v: &f64| v.is_finite())
}

/// Free-text confirmation returned by the control endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlReply {
    pub message: String,
}

impl ControlReply {
    /// Recording state implied by a `/toggleRecording` reply, if the wording is known.
    #[must_use]
    pub fn recording_hint(&self) -> Option<bool> {
        let text = self.message.to_lowercase();
        if text.contains("gestartet") || text.contains("started") {
            Some(true)
        } else if text.contains("gestoppt") || text.contains("stopped") {
            Some(false)
        } else {
            None
        }
    }
}

impl std::fmt::Display for ControlReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}
