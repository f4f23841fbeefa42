//! In-process fake station for integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::get,
};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use flowstation::config::Config;
use flowstation::render::{Chart, Readout, Surface};

pub const LOG_CSV: &str = "Timestamp,Pressure1 (bar),Pressure2 (bar),Pressure3 (bar),Pressure4 (bar),FlowRate1 (L/min),FlowRate2 (L/min),CumulativeFlow1 (L),CumulativeFlow2 (L)\n\
2025-01-01 12:00:00,1.000,2.000,3.000,4.000,0.50,0.60,1.00,2.00\n\
2025-01-01 12:00:01,1.100,2.100,3.100,4.100,0.55,0.65,1.01,2.01\n";

pub fn snapshot_json() -> Value {
    json!({
        "time": "12:00:00",
        "pressure": [1.234, 2, 3, 4],
        "flowRate": [1.5, 2.5],
        "cumulativeFlow": [10, 20],
        "recording": false
    })
}

/// Three samples, deliberately out of order.
pub fn series_json() -> Value {
    json!({
        "timestamps": ["2025-01-01 12:00:02", "2025-01-01 12:00:00", "2025-01-01 12:00:01"],
        "pressure": {
            "sensor1": [1.2, 1.0, 1.1],
            "sensor2": [2.2, 2.0, 2.1],
            "sensor3": [3.2, 3.0, 3.1],
            "sensor4": [4.2, 4.0, 4.1]
        },
        "flow": {
            "sensor1": [0.2, 0.0, 0.1],
            "sensor2": [0.7, 0.5, 0.6]
        }
    })
}

pub struct StationState {
    pub snapshot: Mutex<Value>,
    pub series: Mutex<Value>,
    pub vmin_body: Mutex<String>,
    pub fail_snapshot: AtomicBool,
    pub fail_csv: AtomicBool,
    pub log_exists: AtomicBool,
    pub recording: AtomicBool,
    pub requests: AtomicUsize,
    pub calibration_updates: Mutex<Vec<Value>>,
    pub calibration_queries: Mutex<Vec<HashMap<String, String>>>,
    pub log_names: Mutex<Vec<String>>,
    pub set_time: Mutex<Option<i64>>,
}

impl Default for StationState {
    fn default() -> Self {
        Self {
            snapshot: Mutex::new(snapshot_json()),
            series: Mutex::new(series_json()),
            vmin_body: Mutex::new(r#"{"status":"success","v_min":0.512}"#.to_string()),
            fail_snapshot: AtomicBool::new(false),
            fail_csv: AtomicBool::new(false),
            log_exists: AtomicBool::new(true),
            recording: AtomicBool::new(false),
            requests: AtomicUsize::new(0),
            calibration_updates: Mutex::new(Vec::new()),
            calibration_queries: Mutex::new(Vec::new()),
            log_names: Mutex::new(Vec::new()),
            set_time: Mutex::new(None),
        }
    }
}

type Shared = Arc<StationState>;

pub struct FakeStation {
    pub base_url: String,
    pub state: Shared,
}

impl FakeStation {
    pub async fn spawn() -> Self {
        let state: Shared = Arc::new(StationState::default());

        let app = Router::new()
            .route("/api/sensorwerte", get(sensorwerte))
            .route("/api/last10min", get(series))
            .route("/api/loggingData", get(series))
            .route("/api/logdata", get(logdata))
            .route("/api/calibration", get(calibration))
            .route(
                "/updateCalibration",
                get(update_calibration_query).post(update_calibration_json),
            )
            .route("/calibrateVmin", get(calibrate_vmin))
            .route("/toggleRecording", get(toggle_recording))
            .route("/deleteLog", get(delete_log))
            .route("/clearCumulativeFlow", get(clear_flow))
            .route("/resetCalibration", get(reset_calibration))
            .route("/setTime", get(set_time))
            .route("/getTime", get(get_time))
            .route("/downloadlog", get(download_log))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn config(&self) -> Config {
        Config {
            device_base_url: self.base_url.clone(),
            ..Config::default()
        }
    }

    pub fn requests(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }
}

fn hit(state: &StationState) {
    state.requests.fetch_add(1, Ordering::SeqCst);
}

async fn sensorwerte(State(state): State<Shared>) -> Result<Json<Value>, StatusCode> {
    hit(&state);
    if state.fail_snapshot.load(Ordering::SeqCst) {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    Ok(Json(state.snapshot.lock().unwrap().clone()))
}

async fn series(State(state): State<Shared>) -> Json<Value> {
    hit(&state);
    Json(state.series.lock().unwrap().clone())
}

async fn logdata(
    State(state): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    hit(&state);
    if let Some(name) = params.get("name") {
        state.log_names.lock().unwrap().push(name.clone());
    }
    Json(state.series.lock().unwrap().clone())
}

async fn calibration(State(state): State<Shared>) -> Json<Value> {
    hit(&state);
    Json(json!([
        {"v_min": 0.5, "v_max": 4.5, "psi_min": 0.0, "psi_max": 10.0},
        {"v_min": 0.52, "v_max": 4.5, "psi_min": 0.0, "psi_max": 10.0},
        {"v_min": 0.5, "v_max": 4.48, "psi_min": 0.0, "psi_max": 30.0},
        {"v_min": 0.5, "v_max": 4.5, "psi_min": 0.0, "psi_max": 10.0}
    ]))
}

async fn update_calibration_json(State(state): State<Shared>, Json(body): Json<Value>) -> String {
    hit(&state);
    let sensor = body["sensor"].as_u64().unwrap_or_default();
    state.calibration_updates.lock().unwrap().push(body);
    format!("Calibration for sensor {} updated", sensor + 1)
}

async fn update_calibration_query(
    State(state): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
) -> String {
    hit(&state);
    state.calibration_queries.lock().unwrap().push(params);
    "Calibration updated".to_string()
}

async fn calibrate_vmin(State(state): State<Shared>) -> String {
    hit(&state);
    state.vmin_body.lock().unwrap().clone()
}

async fn toggle_recording(State(state): State<Shared>) -> &'static str {
    hit(&state);
    let was = state.recording.fetch_xor(true, Ordering::SeqCst);
    if was {
        "Recording gestoppt"
    } else {
        "Recording gestartet"
    }
}

async fn delete_log(State(state): State<Shared>) -> (StatusCode, &'static str) {
    hit(&state);
    if state.log_exists.swap(false, Ordering::SeqCst) {
        (StatusCode::OK, "Logdatei gelöscht")
    } else {
        (StatusCode::NOT_FOUND, "Logdatei nicht gefunden")
    }
}

async fn clear_flow(State(state): State<Shared>) -> &'static str {
    hit(&state);
    "Kumulativer Durchfluss zurückgesetzt"
}

async fn reset_calibration(State(state): State<Shared>) -> &'static str {
    hit(&state);
    "Kalibrierung zurückgesetzt"
}

async fn set_time(
    State(state): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, &'static str) {
    hit(&state);
    match params.get("t").and_then(|t| t.parse().ok()) {
        Some(t) => {
            *state.set_time.lock().unwrap() = Some(t);
            (StatusCode::OK, "Zeit aktualisiert")
        }
        None => (StatusCode::BAD_REQUEST, "Fehlender Parameter 't'"),
    }
}

async fn get_time(State(state): State<Shared>) -> &'static str {
    hit(&state);
    "2025-01-01 12:00:00\n"
}

async fn download_log(State(state): State<Shared>) -> (StatusCode, &'static str) {
    hit(&state);
    if state.fail_csv.load(Ordering::SeqCst) {
        (StatusCode::NOT_FOUND, "Logdatei nicht gefunden")
    } else {
        (StatusCode::OK, LOG_CSV)
    }
}

/// What a surface was asked to show.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    Readout(Readout),
    Redraw(usize),
    Notify(String),
}

/// Surface that records every call for later inspection.
#[derive(Clone, Default)]
pub struct RecordingSurface {
    pub events: Arc<Mutex<Vec<SurfaceEvent>>>,
}

impl RecordingSurface {
    pub fn events(&self) -> Vec<SurfaceEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl Surface for RecordingSurface {
    fn show_readout(&mut self, readout: &Readout) {
        self.events
            .lock()
            .unwrap()
            .push(SurfaceEvent::Readout(readout.clone()));
    }

    fn redraw(&mut self, charts: &[Chart]) {
        self.events
            .lock()
            .unwrap()
            .push(SurfaceEvent::Redraw(charts.len()));
    }

    fn notify(&mut self, message: &str) {
        self.events
            .lock()
            .unwrap()
            .push(SurfaceEvent::Notify(message.to_string()));
    }
}
