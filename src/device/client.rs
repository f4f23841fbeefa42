use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::calibration::{Calibration, check_sensor};
use crate::config::Config;
use crate::device::models::{
    CalibrationUpdate, ControlReply, PRESSURE_SENSORS, Series, Snapshot, VminCalibration,
};
use crate::error::{AppError, AppResult};

/// Series endpoints exposed by the station.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeriesEndpoint {
    /// Rolling ten-minute window, not guaranteed to be ordered.
    Last10Min,
    /// Samples of the active recording.
    LoggingData,
    /// A stored log file, e.g. `/log_20250101_120000.csv`.
    LogFile(String),
}

impl SeriesEndpoint {
    #[must_use]
    pub fn path(&self) -> &'static str {
        match self {
            Self::Last10Min => "/api/last10min",
            Self::LoggingData => "/api/loggingData",
            Self::LogFile(_) => "/api/logdata",
        }
    }
}

impl std::fmt::Display for SeriesEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LogFile(name) => write!(f, "{}?name={name}", self.path()),
            _ => f.write_str(self.path()),
        }
    }
}

/// How `/updateCalibration` is called. Both variants exist in deployed firmware.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpdateMethod {
    #[default]
    JsonBody,
    Query,
}

pub struct DeviceClient {
    http_client: Client,
    base_url: String,
}

impl DeviceClient {
    /// # Errors
    ///
    /// Returns `AppError::Device` if the HTTP client cannot be built.
    pub fn new(config: &Config) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| AppError::Device(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url: config.device_base_url.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(&self, request: RequestBuilder) -> AppResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| AppError::Device(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::DeviceStatus {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> AppResult<T> {
        let text = self
            .send(request)
            .await?
            .text()
            .await
            .map_err(|e| AppError::Device(format!("Failed to get response text: {e}")))?;

        serde_json::from_str(&text).map_err(|e| {
            tracing::debug!(
                error = %e,
                body_preview = %text.chars().take(200).collect::<String>(),
                "Failed to parse station response"
            );
            AppError::Malformed(format!("Failed to parse response: {e}"))
        })
    }

    async fn get_text(&self, request: RequestBuilder) -> AppResult<String> {
        self.send(request)
            .await?
            .text()
            .await
            .map_err(|e| AppError::Device(format!("Failed to get response text: {e}")))
    }

    async fn control(&self, path: &str) -> AppResult<ControlReply> {
        let message = self.get_text(self.http_client.get(self.url(path))).await?;
        tracing::debug!(path, message = %message, "Control command acknowledged");
        Ok(ControlReply { message })
    }

    /// Current readings of all channels.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not a snapshot.
    pub async fn get_snapshot(&self) -> AppResult<Snapshot> {
        self.get_json(self.http_client.get(self.url("/api/sensorwerte")))
            .await
    }

    /// Fetch a series and check that its columns are aligned.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the body does not parse, or the
    /// columns differ in length.
    pub async fn get_series(&self, endpoint: &SeriesEndpoint) -> AppResult<Series> {
        let mut request = self.http_client.get(self.url(endpoint.path()));
        if let SeriesEndpoint::LogFile(name) = endpoint {
            request = request.query(&[("name", name)]);
        }

        let series: Series = self.get_json(request).await?;
        series.check_aligned()?;
        Ok(series)
    }

    /// Calibration of all pressure channels, in sensor order.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the station does not report
    /// one entry per pressure channel.
    pub async fn get_calibration(&self) -> AppResult<Vec<Calibration>> {
        let calibrations: Vec<Calibration> = self
            .get_json(self.http_client.get(self.url("/api/calibration")))
            .await?;

        if calibrations.len() != PRESSURE_SENSORS {
            return Err(AppError::Malformed(format!(
                "expected {PRESSURE_SENSORS} calibration entries, got {}",
                calibrations.len()
            )));
        }
        Ok(calibrations)
    }

    /// Push a calibration for one sensor. Invalid values never leave the client.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for invalid input, otherwise any request error.
    pub async fn update_calibration(
        &self,
        sensor: usize,
        calibration: Calibration,
        method: UpdateMethod,
    ) -> AppResult<ControlReply> {
        let sensor = check_sensor(sensor)?;
        calibration.validate()?;

        let url = self.url("/updateCalibration");
        let request = match method {
            UpdateMethod::JsonBody => self.http_client.post(url).json(&CalibrationUpdate {
                sensor,
                calibration,
            }),
            UpdateMethod::Query => self.http_client.get(url).query(&[
                ("sensor", sensor.to_string()),
                ("v_min", calibration.v_min.to_string()),
                ("v_max", calibration.v_max.to_string()),
                ("psi_min", calibration.psi_min.to_string()),
                ("psi_max", calibration.psi_max.to_string()),
            ]),
        };

        let message = self.get_text(request).await?;
        tracing::info!(sensor, ?method, "Calibration updated");
        Ok(ControlReply { message })
    }

    /// Let the station measure the current voltage and adopt it as `v_min`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails. A reply without a value is not an
    /// error; it is reported through [`VminCalibration::status`].
    pub async fn calibrate_vmin(&self, sensor: usize) -> AppResult<VminCalibration> {
        let sensor = check_sensor(sensor)?;
        let body = self
            .get_text(
                self.http_client
                    .get(self.url("/calibrateVmin"))
                    .query(&[("sensor", sensor)]),
            )
            .await?;

        Ok(VminCalibration::from_body(&body))
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn toggle_recording(&self) -> AppResult<ControlReply> {
        self.control("/toggleRecording").await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails or no log exists.
    pub async fn delete_log(&self) -> AppResult<ControlReply> {
        self.control("/deleteLog").await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn clear_cumulative_flow(&self) -> AppResult<ControlReply> {
        self.control("/clearCumulativeFlow").await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn reset_calibration(&self) -> AppResult<ControlReply> {
        self.control("/resetCalibration").await
    }

    /// Set the station clock (epoch seconds).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn set_time(&self, at: DateTime<Utc>) -> AppResult<ControlReply> {
        let message = self
            .get_text(
                self.http_client
                    .get(self.url("/setTime"))
                    .query(&[("t", at.timestamp())]),
            )
            .await?;
        Ok(ControlReply { message })
    }

    /// Station clock as `YYYY-MM-DD HH:MM:SS`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get_time(&self) -> AppResult<String> {
        self.get_text(self.http_client.get(self.url("/getTime")))
            .await
            .map(|t| t.trim().to_string())
    }

    /// The recorded log as CSV text.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or no log exists.
    pub async fn download_log(&self) -> AppResult<String> {
        self.get_text(self.http_client.get(self.url("/downloadlog")))
            .await
    }
}
