//! Readout formatting, chart mapping and the renderer's sequence gate.

mod support;

use std::time::Duration;

use flowstation::device::models::{Series, Snapshot};
use flowstation::error::AppError;
use flowstation::render::chart::{Axis, DatasetSource};
use flowstation::render::{ApplyOutcome, Chart, ChartId, Renderer, ViewConfig, format_readout};
use support::{RecordingSurface, SurfaceEvent};

fn snapshot() -> Snapshot {
    serde_json::from_value(support::snapshot_json()).unwrap()
}

fn series() -> Series {
    serde_json::from_value(support::series_json()).unwrap()
}

fn renderer(view: ViewConfig) -> (Renderer, RecordingSurface) {
    let surface = RecordingSurface::default();
    (Renderer::new(view, Box::new(surface.clone())), surface)
}

#[test]
fn readout_uses_three_decimals_for_pressure_and_two_for_flow() {
    let readout = format_readout(&snapshot());

    assert_eq!(readout.time, "Time: 12:00:00");
    assert_eq!(
        readout.pressure,
        [
            "Sensor 1: 1.234 bar",
            "Sensor 2: 2.000 bar",
            "Sensor 3: 3.000 bar",
            "Sensor 4: 4.000 bar"
        ]
    );
    assert_eq!(
        readout.flow,
        [
            "Sensor 1: 1.50 L/min (cumulative: 10.00 L)",
            "Sensor 2: 2.50 L/min (cumulative: 20.00 L)"
        ]
    );
    assert_eq!(readout.recording, Some(false));
}

#[test]
fn combined_chart_maps_datasets_by_source() {
    let mut chart = Chart::combined();
    chart.apply(&series());

    assert_eq!(chart.len(), 3);
    let flow2 = chart
        .datasets
        .iter()
        .find(|d| d.source == DatasetSource::Flow(2))
        .unwrap();
    assert_eq!(flow2.axis, Axis::Secondary);
    assert_eq!(flow2.label, "Flow Sensor 2");
    assert_eq!(flow2.data, [0.7, 0.5, 0.6]);

    let pressure3 = chart
        .datasets
        .iter()
        .find(|d| d.source == DatasetSource::Pressure(3))
        .unwrap();
    assert_eq!(pressure3.axis, Axis::Primary);
    assert_eq!(pressure3.data, [3.2, 3.0, 3.1]);
}

#[test]
fn renderer_builds_charts_from_view() {
    let (renderer, _) = renderer(ViewConfig::dashboard(Duration::from_secs(1)));
    let ids: Vec<ChartId> = renderer.charts().iter().map(|c| c.id).collect();
    assert_eq!(ids, [ChartId::Pressure, ChartId::Flow, ChartId::Combined]);
    assert!(renderer.charts().iter().all(Chart::is_empty));
}

#[test]
fn older_responses_never_replace_newer_ones() {
    let (mut renderer, _) = renderer(ViewConfig::dashboard(Duration::from_secs(1)));
    let mut newer = snapshot();
    newer.time = "12:00:05".to_string();

    assert_eq!(renderer.apply_snapshot(5, &newer), ApplyOutcome::Applied);
    assert_eq!(
        renderer.apply_snapshot(4, &snapshot()),
        ApplyOutcome::Stale { last_applied: 5 }
    );
    assert_eq!(
        renderer.apply_snapshot(5, &snapshot()),
        ApplyOutcome::Stale { last_applied: 5 }
    );
    assert_eq!(renderer.readout().unwrap().time, "Time: 12:00:05");

    assert_eq!(renderer.update(7, series()).unwrap(), ApplyOutcome::Applied);
    let mut old = series();
    old.timestamps[0] = "old".to_string();
    assert_eq!(
        renderer.update(6, old).unwrap(),
        ApplyOutcome::Stale { last_applied: 7 }
    );
    assert_eq!(
        renderer.chart(ChartId::Pressure).unwrap().labels[0],
        "2025-01-01 12:00:02"
    );
}

#[test]
fn snapshot_and_series_sequences_are_independent() {
    let (mut renderer, _) = renderer(ViewConfig::dashboard(Duration::from_secs(1)));

    assert_eq!(renderer.apply_snapshot(10, &snapshot()), ApplyOutcome::Applied);
    assert_eq!(renderer.update(3, series()).unwrap(), ApplyOutcome::Applied);
}

#[test]
fn history_view_sorts_before_drawing() {
    let (mut renderer, surface) = renderer(ViewConfig::history(Duration::from_secs(1)));

    renderer.update(1, series()).unwrap();

    let pressure = renderer.chart(ChartId::Pressure).unwrap();
    assert_eq!(
        pressure.labels,
        ["2025-01-01 12:00:00", "2025-01-01 12:00:01", "2025-01-01 12:00:02"]
    );
    assert_eq!(pressure.datasets[0].data, [1.0, 1.1, 1.2]);
    assert_eq!(surface.events(), [SurfaceEvent::Redraw(3)]);
}

#[test]
fn malformed_series_keeps_previous_charts() {
    let (mut renderer, _) = renderer(ViewConfig::dashboard(Duration::from_secs(1)));
    renderer.update(1, series()).unwrap();
    let before = renderer.charts().to_vec();

    let mut broken = series();
    broken.pressure.sensor1.push(9.9);
    let err = renderer.update(2, broken).unwrap_err();

    assert!(matches!(err, AppError::Malformed(_)));
    assert_eq!(renderer.charts(), before.as_slice());
    // The rejected response does not consume its sequence number.
    assert_eq!(renderer.update(2, series()).unwrap(), ApplyOutcome::Applied);
}

#[test]
fn dispose_clears_and_ignores_later_updates() {
    let (mut renderer, surface) = renderer(ViewConfig::dashboard(Duration::from_secs(1)));
    renderer.apply_snapshot(1, &snapshot());
    renderer.update(1, series()).unwrap();

    renderer.dispose();

    assert!(renderer.is_disposed());
    assert!(renderer.readout().is_none());
    assert!(renderer.charts().iter().all(Chart::is_empty));
    assert_eq!(renderer.apply_snapshot(2, &snapshot()), ApplyOutcome::Disposed);
    assert_eq!(renderer.update(2, series()).unwrap(), ApplyOutcome::Disposed);
    assert_eq!(surface.events().len(), 2);
}

#[test]
fn svg_is_rendered_at_upscaled_size() {
    let mut chart = Chart::combined();
    chart.apply(&series());

    let svg = chart.to_svg(400, 200, 2).unwrap();

    assert!(svg.contains("<svg"));
    assert!(svg.contains("width=\"800\""));
    assert!(svg.contains("height=\"400\""));
    assert!(svg.contains("Flow Sensor 1"));
}

#[test]
fn empty_chart_still_renders() {
    let svg = Chart::pressure().to_svg(200, 100, 1).unwrap();
    assert!(svg.contains("<svg"));
}

#[test]
fn oversized_or_empty_chart_is_an_export_error() {
    let chart = Chart::pressure();

    let err = chart.to_svg(800, 400, u32::MAX / 100).unwrap_err();
    assert!(matches!(err, AppError::Export(ref msg) if msg.contains("800x400")));

    assert!(matches!(chart.to_svg(0, 400, 1), Err(AppError::Export(_))));
    assert!(matches!(chart.to_svg(20_000, 400, 1), Err(AppError::Export(_))));
}
