use std::time::Duration;

use crate::device::SeriesEndpoint;
use crate::error::{AppError, AppResult};
use crate::render::chart::{Chart, ChartId};

/// What a page shows and how it refreshes.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewConfig {
    pub name: &'static str,
    /// Poll `/api/sensorwerte` for the text readout.
    pub snapshot: bool,
    /// Series feeding the charts, if any.
    pub series: Option<SeriesEndpoint>,
    /// `None` loads once and never refreshes.
    pub refresh: Option<Duration>,
    pub charts: Vec<ChartId>,
    /// Sort every series by timestamp before it reaches the charts.
    pub sort_by_time: bool,
}

impl ViewConfig {
    /// Live readout plus charts of the active recording.
    #[must_use]
    pub fn dashboard(refresh: Duration) -> Self {
        Self {
            name: "dashboard",
            snapshot: true,
            series: Some(SeriesEndpoint::LoggingData),
            refresh: Some(refresh),
            charts: all_charts(),
            sort_by_time: false,
        }
    }

    /// Rolling ten-minute window. The station does not order it.
    #[must_use]
    pub fn history(refresh: Duration) -> Self {
        Self {
            name: "history",
            snapshot: false,
            series: Some(SeriesEndpoint::Last10Min),
            refresh: Some(refresh),
            charts: all_charts(),
            sort_by_time: true,
        }
    }

    /// A stored log file, loaded once.
    #[must_use]
    pub fn log_file(name: impl Into<String>) -> Self {
        Self {
            name: "log",
            snapshot: false,
            series: Some(SeriesEndpoint::LogFile(name.into())),
            refresh: None,
            charts: all_charts(),
            sort_by_time: false,
        }
    }

    #[must_use]
    pub fn with_sorting(mut self, sort_by_time: bool) -> Self {
        self.sort_by_time = sort_by_time;
        self
    }

    /// A refreshing view needs a non-zero interval.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for a zero refresh interval.
    pub fn validate(&self) -> AppResult<()> {
        if self.refresh.is_some_and(|period| period.is_zero()) {
            return Err(AppError::Validation(format!(
                "{} view: refresh interval must be greater than zero",
                self.name
            )));
        }
        Ok(())
    }

    pub(crate) fn build_charts(&self) -> Vec<Chart> {
        self.charts
            .iter()
            .map(|id| match id {
                ChartId::Pressure => Chart::pressure(),
                ChartId::Flow => Chart::flow(),
                ChartId::Combined => Chart::combined(),
            })
            .collect()
    }
}

fn all_charts() -> Vec<ChartId> {
    vec![ChartId::Pressure, ChartId::Flow, ChartId::Combined]
}
