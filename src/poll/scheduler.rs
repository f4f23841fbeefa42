use tokio::time::{MissedTickBehavior, interval};

use crate::common::AppState;
use crate::device::SeriesEndpoint;
use crate::error::AppResult;
use crate::render::ApplyOutcome;

/// Run the view's polls on its refresh interval until the task is dropped.
///
/// Each tick spawns its requests and returns to the ticker without waiting,
/// so a slow station can have several polls in flight. Responses carry their
/// sequence number and the renderer drops any that arrive out of order.
/// Views without a refresh interval are loaded once.
///
/// # Errors
///
/// Returns `AppError::Validation` if the view's refresh interval is zero.
pub async fn run_poller(state: AppState) -> AppResult<()> {
    let view = state.renderer.lock().await.view().clone();
    view.validate()?;

    let Some(period) = view.refresh else {
        tracing::info!(view = view.name, "Loading view once");
        poll_once(&state).await;
        return Ok(());
    };

    tracing::info!(
        view = view.name,
        interval_ms = period.as_millis() as u64,
        series = ?view.series,
        "Starting poller"
    );

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        if view.snapshot {
            let seq = state.sequencer.next();
            tokio::spawn(poll_snapshot(state.clone(), seq));
        }
        if let Some(endpoint) = &view.series {
            let seq = state.sequencer.next();
            tokio::spawn(poll_series(state.clone(), endpoint.clone(), seq));
        }
    }
}

/// Poll every feed of the view once and wait for the results.
pub async fn poll_once(state: &AppState) {
    let view = state.renderer.lock().await.view().clone();

    let snapshot = async {
        if view.snapshot {
            let seq = state.sequencer.next();
            poll_snapshot(state.clone(), seq).await;
        }
    };
    let series = async {
        if let Some(endpoint) = view.series.clone() {
            let seq = state.sequencer.next();
            poll_series(state.clone(), endpoint, seq).await;
        }
    };
    tokio::join!(snapshot, series);
}

/// Fetch the snapshot and hand it to the renderer.
///
/// Failures are logged and leave the readout untouched; there is no retry.
pub async fn poll_snapshot(state: AppState, seq: u64) -> Option<ApplyOutcome> {
    let snapshot = match state.client.get_snapshot().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::warn!(seq, endpoint = "/api/sensorwerte", error = %e, "Snapshot poll failed");
            return None;
        }
    };

    let outcome = state.renderer.lock().await.apply_snapshot(seq, &snapshot);
    log_outcome(seq, "/api/sensorwerte", outcome);
    Some(outcome)
}

/// Fetch a series and hand it to the renderer.
///
/// Failures are logged and leave the charts untouched; there is no retry.
pub async fn poll_series(
    state: AppState,
    endpoint: SeriesEndpoint,
    seq: u64,
) -> Option<ApplyOutcome> {
    let series = match state.client.get_series(&endpoint).await {
        Ok(series) => series,
        Err(e) => {
            tracing::warn!(seq, endpoint = %endpoint, error = %e, "Series poll failed");
            return None;
        }
    };

    let samples = series.len();
    match state.renderer.lock().await.update(seq, series) {
        Ok(outcome) => {
            log_outcome(seq, endpoint.path(), outcome);
            if outcome == ApplyOutcome::Applied {
                tracing::trace!(seq, samples, "Charts updated");
            }
            Some(outcome)
        }
        Err(e) => {
            tracing::warn!(seq, endpoint = %endpoint, error = %e, "Series rejected");
            None
        }
    }
}

fn log_outcome(seq: u64, endpoint: &str, outcome: ApplyOutcome) {
    match outcome {
        ApplyOutcome::Applied => {}
        ApplyOutcome::Stale { last_applied } => {
            tracing::debug!(seq, last_applied, endpoint, "Discarded stale response");
        }
        ApplyOutcome::Disposed => {
            tracing::debug!(seq, endpoint, "Response arrived after dispose");
        }
    }
}
