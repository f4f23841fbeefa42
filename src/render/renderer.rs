use crate::device::models::{Series, Snapshot};
use crate::error::AppResult;
use crate::render::chart::{Chart, ChartId};
use crate::render::readout::{Readout, format_readout};
use crate::render::surface::Surface;
use crate::render::view::ViewConfig;
use crate::series::sort_by_timestamp;

/// Result of handing a response to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// A response with this or a newer sequence number was already applied.
    Stale { last_applied: u64 },
    Disposed,
}

/// Holds everything one view displays: the readout and its charts.
///
/// Snapshot and series responses are gated independently: each only replaces
/// what is shown when its sequence number is newer than the last one applied
/// for the same feed.
pub struct Renderer {
    view: ViewConfig,
    surface: Box<dyn Surface>,
    readout: Option<Readout>,
    charts: Vec<Chart>,
    last_snapshot: Option<u64>,
    last_series: Option<u64>,
    disposed: bool,
}

impl Renderer {
    #[must_use]
    pub fn new(view: ViewConfig, surface: Box<dyn Surface>) -> Self {
        let charts = view.build_charts();
        Self {
            view,
            surface,
            readout: None,
            charts,
            last_snapshot: None,
            last_series: None,
            disposed: false,
        }
    }

    #[must_use]
    pub fn view(&self) -> &ViewConfig {
        &self.view
    }

    #[must_use]
    pub fn readout(&self) -> Option<&Readout> {
        self.readout.as_ref()
    }

    #[must_use]
    pub fn charts(&self) -> &[Chart] {
        &self.charts
    }

    #[must_use]
    pub fn chart(&self, id: ChartId) -> Option<&Chart> {
        self.charts.iter().find(|c| c.id == id)
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Replace the readout with a newer snapshot.
    pub fn apply_snapshot(&mut self, seq: u64, snapshot: &Snapshot) -> ApplyOutcome {
        if self.disposed {
            return ApplyOutcome::Disposed;
        }
        if let Some(last_applied) = self.last_snapshot.filter(|last| seq <= *last) {
            return ApplyOutcome::Stale { last_applied };
        }

        let readout = format_readout(snapshot);
        self.surface.show_readout(&readout);
        self.readout = Some(readout);
        self.last_snapshot = Some(seq);
        ApplyOutcome::Applied
    }

    /// Overwrite every chart with a newer series and redraw.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Malformed` if the series is not aligned. Charts keep
    /// their previous data in that case.
    pub fn update(&mut self, seq: u64, mut series: Series) -> AppResult<ApplyOutcome> {
        if self.disposed {
            return Ok(ApplyOutcome::Disposed);
        }
        if let Some(last_applied) = self.last_series.filter(|last| seq <= *last) {
            return Ok(ApplyOutcome::Stale { last_applied });
        }

        if self.view.sort_by_time {
            sort_by_timestamp(&mut series)?;
        } else {
            series.check_aligned()?;
        }

        for chart in &mut self.charts {
            chart.apply(&series);
        }
        self.surface.redraw(&self.charts);
        self.last_series = Some(seq);
        Ok(ApplyOutcome::Applied)
    }

    /// Show a message on the surface.
    pub fn notify(&mut self, message: &str) {
        self.surface.notify(message);
    }

    /// Release chart data. Later responses are ignored.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        for chart in &mut self.charts {
            chart.clear();
        }
        self.readout = None;
        self.disposed = true;
        tracing::debug!(view = self.view.name, "Renderer disposed");
    }
}
