//! Line charts fed from a [`Series`].
//!
//! A chart owns its labels and dataset arrays; [`Chart::apply`] overwrites
//! them wholesale. Each dataset names the series column it reads through a
//! [`DatasetSource`], so the mapping does not depend on label wording.

use plotters::prelude::*;

use crate::device::models::Series;
use crate::error::{AppError, AppResult};

const PRESSURE_COLORS: [(u8, u8, u8); 4] = [
    (255, 99, 132),
    (54, 162, 235),
    (255, 206, 86),
    (75, 192, 192),
];
const FLOW_COLORS: [(u8, u8, u8); 2] = [(153, 102, 255), (255, 159, 64)];

const PRESSURE_AXIS: &str = "Pressure (bar)";
const FLOW_AXIS: &str = "Flow (L/min)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartId {
    Pressure,
    Flow,
    Combined,
}

impl ChartId {
    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            Self::Pressure => "pressure",
            Self::Flow => "flow",
            Self::Combined => "combined",
        }
    }
}

/// Series column a dataset reads (1-based sensor numbers).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetSource {
    Pressure(usize),
    Flow(usize),
}

impl DatasetSource {
    fn column(self, series: &Series) -> Option<&[f64]> {
        match self {
            Self::Pressure(n) => series.pressure(n),
            Self::Flow(n) => series.flow(n),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Left y-axis.
    Primary,
    /// Right y-axis, only drawn when a chart has datasets on it.
    Secondary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub label: String,
    pub color: (u8, u8, u8),
    pub source: DatasetSource,
    pub axis: Axis,
    pub data: Vec<f64>,
}

impl Dataset {
    fn new(label: String, color: (u8, u8, u8), source: DatasetSource, axis: Axis) -> Self {
        Self {
            label,
            color,
            source,
            axis,
            data: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub id: ChartId,
    pub primary_axis: &'static str,
    pub secondary_axis: Option<&'static str>,
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

impl Chart {
    /// Four pressure channels on one axis.
    #[must_use]
    pub fn pressure() -> Self {
        Self {
            id: ChartId::Pressure,
            primary_axis: PRESSURE_AXIS,
            secondary_axis: None,
            labels: Vec::new(),
            datasets: pressure_datasets("Sensor", Axis::Primary),
        }
    }

    /// Both flow channels on one axis.
    #[must_use]
    pub fn flow() -> Self {
        Self {
            id: ChartId::Flow,
            primary_axis: FLOW_AXIS,
            secondary_axis: None,
            labels: Vec::new(),
            datasets: flow_datasets(Axis::Primary),
        }
    }

    /// Pressure on the left axis, flow on the right.
    #[must_use]
    pub fn combined() -> Self {
        let mut datasets = pressure_datasets("Pressure Sensor", Axis::Primary);
        datasets.extend(flow_datasets(Axis::Secondary));
        Self {
            id: ChartId::Combined,
            primary_axis: PRESSURE_AXIS,
            secondary_axis: Some(FLOW_AXIS),
            labels: Vec::new(),
            datasets,
        }
    }

    /// Overwrite labels and every dataset from an aligned series.
    pub fn apply(&mut self, series: &Series) {
        self.labels.clone_from(&series.timestamps);
        for dataset in &mut self.datasets {
            dataset.data = dataset
                .source
                .column(series)
                .map(<[f64]>::to_vec)
                .unwrap_or_default();
        }
    }

    pub fn clear(&mut self) {
        self.labels.clear();
        for dataset in &mut self.datasets {
            dataset.data.clear();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Render the chart as SVG at `width` x `height` multiplied by `scale`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Export` if plotting fails or the scaled size is
    /// zero or exceeds [`MAX_SIDE`] pixels.
    pub fn to_svg(&self, width: u32, height: u32, scale: u32) -> AppResult<String> {
        let scale = scale.max(1);
        let size = scaled_size(width, height, scale)?;
        let font_size = f64::from(12 * scale);

        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
            root.fill(&WHITE).map_err(draw_error)?;

            let x_max = self.len().saturating_sub(1).max(1) as f64;
            let (y_min, y_max) = value_range(self.values_on(Axis::Primary));

            let mut chart = ChartBuilder::on(&root)
                .margin(10 * scale)
                .x_label_area_size(40 * scale)
                .y_label_area_size(55 * scale)
                .right_y_label_area_size(if self.secondary_axis.is_some() { 55 * scale } else { 0 })
                .build_cartesian_2d(0.0..x_max, y_min..y_max)
                .map_err(draw_error)?
                .set_secondary_coord(0.0..x_max, {
                    let (lo, hi) = value_range(self.values_on(Axis::Secondary));
                    lo..hi
                });

            let labels = &self.labels;
            chart
                .configure_mesh()
                .x_labels(10)
                .y_labels(8)
                .x_desc("Time")
                .y_desc(self.primary_axis)
                .label_style(("sans-serif", font_size))
                .x_label_formatter(&|x| label_at(labels, *x))
                .draw()
                .map_err(draw_error)?;

            if let Some(secondary) = self.secondary_axis {
                chart
                    .configure_secondary_axes()
                    .y_desc(secondary)
                    .label_style(("sans-serif", font_size))
                    .draw()
                    .map_err(draw_error)?;
            }

            for dataset in &self.datasets {
                let color = RGBColor(dataset.color.0, dataset.color.1, dataset.color.2);
                let points = dataset
                    .data
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (i as f64, *v));
                let style = ShapeStyle::from(&color).stroke_width(2 * scale);

                let series = match dataset.axis {
                    Axis::Primary => chart
                        .draw_series(LineSeries::new(points, style))
                        .map_err(draw_error)?,
                    Axis::Secondary => chart
                        .draw_secondary_series(LineSeries::new(points, style))
                        .map_err(draw_error)?,
                };
                series
                    .label(dataset.label.clone())
                    .legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + 20, y)], ShapeStyle::from(&color))
                    });
            }

            chart
                .configure_series_labels()
                .background_style(&WHITE.mix(0.8))
                .border_style(&BLACK)
                .label_font(("sans-serif", font_size))
                .draw()
                .map_err(draw_error)?;

            root.present().map_err(draw_error)?;
        }

        Ok(svg)
    }

    fn values_on(&self, axis: Axis) -> impl Iterator<Item = f64> + '_ {
        self.datasets
            .iter()
            .filter(move |d| d.axis == axis)
            .flat_map(|d| d.data.iter().copied())
            .filter(|v| v.is_finite())
    }
}

fn pressure_datasets(prefix: &str, axis: Axis) -> Vec<Dataset> {
    PRESSURE_COLORS
        .iter()
        .enumerate()
        .map(|(i, color)| {
            Dataset::new(
                format!("{prefix} {}", i + 1),
                *color,
                DatasetSource::Pressure(i + 1),
                axis,
            )
        })
        .collect()
}

fn flow_datasets(axis: Axis) -> Vec<Dataset> {
    FLOW_COLORS
        .iter()
        .enumerate()
        .map(|(i, color)| {
            Dataset::new(
                format!("Flow Sensor {}", i + 1),
                *color,
                DatasetSource::Flow(i + 1),
                axis,
            )
        })
        .collect()
}

/// Padded min/max of the values, or `0..1` when there are none.
fn value_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    let pad = ((max - min) * 0.05).max(0.1);
    (min - pad, max + pad)
}

fn label_at(labels: &[String], x: f64) -> String {
    if x < 0.0 {
        return String::new();
    }
    labels
        .get(x.round() as usize)
        .cloned()
        .unwrap_or_default()
}

/// Largest rendered side in pixels.
pub const MAX_SIDE: u32 = 16_384;

/// `width` x `height` times `scale`, bounded by [`MAX_SIDE`].
///
/// # Errors
///
/// Returns `AppError::Export` if either side overflows, is zero, or is too large.
pub fn scaled_size(width: u32, height: u32, scale: u32) -> AppResult<(u32, u32)> {
    let scale_side = |side: u32| side.checked_mul(scale).filter(|v| (1..=MAX_SIDE).contains(v));
    match (scale_side(width), scale_side(height)) {
        (Some(w), Some(h)) => Ok((w, h)),
        _ => Err(AppError::Export(format!(
            "chart size {width}x{height} at scale {scale} must be between 1 and {MAX_SIDE} pixels per side"
        ))),
    }
}

fn draw_error<E: std::fmt::Display>(e: E) -> AppError {
    AppError::Export(format!("Failed to draw chart: {e}"))
}
