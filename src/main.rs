use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime, TimeZone, Utc};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flowstation::calibration::Calibration;
use flowstation::common::AppState;
use flowstation::config::Config;
use flowstation::device::{DeviceClient, SeriesEndpoint, UpdateMethod};
use flowstation::error::{AppError, AppResult};
use flowstation::export::{self, ExportOptions};
use flowstation::poll;
use flowstation::render::{Surface, TerminalSurface, ViewConfig};
use flowstation::series;

/// Flowstation - pressure/flow measurement station client
#[derive(Parser)]
#[command(name = "flowstation")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Station base URL, overrides DEVICE_BASE_URL
    #[arg(long, global = true)]
    url: Option<String>,

    /// Verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Live readout and charts of the active recording
    Watch {
        /// Refresh interval in milliseconds
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        interval_ms: Option<u64>,
    },

    /// Charts of the last ten minutes
    History {
        /// Refresh interval in milliseconds
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        interval_ms: Option<u64>,

        /// Keep the order the station sends
        #[arg(long)]
        no_sort: bool,
    },

    /// Charts of a stored log file on the station
    Log {
        /// Log file name, e.g. /log_20250101_120000.csv
        name: String,

        /// Write chart images into this directory
        #[arg(long)]
        svg_dir: Option<PathBuf>,
    },

    /// Charts of a downloaded log CSV
    LogCsv {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Write chart images into this directory
        #[arg(long)]
        svg_dir: Option<PathBuf>,

        /// Sort samples by timestamp
        #[arg(long)]
        sort: bool,
    },

    /// Start or stop recording
    Record,

    /// Delete the log file on the station
    DeleteLog,

    /// Reset the cumulative flow counters
    ClearFlow,

    /// Set the station clock (defaults to now)
    SetTime {
        /// Local time, "YYYY-MM-DD HH:MM[:SS]"
        #[arg(long)]
        at: Option<String>,
    },

    /// Show the station clock
    Time,

    /// Pressure sensor calibration
    #[command(subcommand)]
    Calibration(CalibrationCommand),

    /// Download the log as CSV
    DownloadLog {
        #[arg(value_name = "OUTPUT", default_value = "log.csv")]
        out: PathBuf,
    },

    /// Export log CSV and chart images as a ZIP archive
    Export {
        /// Output directory, overrides EXPORT_DIR
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum CalibrationCommand {
    /// Show the calibration of all sensors
    Show,

    /// Set the calibration of one sensor
    Set {
        /// Sensor number (1-4)
        #[arg(value_parser = clap::value_parser!(u8).range(1..=4))]
        sensor: u8,

        #[arg(long, allow_hyphen_values = true)]
        v_min: Option<String>,

        #[arg(long, allow_hyphen_values = true)]
        v_max: Option<String>,

        #[arg(long, allow_hyphen_values = true)]
        psi_min: Option<String>,

        #[arg(long, allow_hyphen_values = true)]
        psi_max: Option<String>,

        /// Use the factory curve (0.5-4.5 V, 0-10 PSI)
        #[arg(long, conflicts_with_all = ["v_min", "v_max", "psi_min", "psi_max"])]
        defaults: bool,

        /// Send as query string instead of a JSON body
        #[arg(long)]
        query: bool,
    },

    /// Measure the current voltage and adopt it as v_min
    Auto {
        /// Sensor number (1-4)
        #[arg(value_parser = clap::value_parser!(u8).range(1..=4))]
        sensor: u8,
    },

    /// Reset all sensors to the factory calibration
    Reset,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "Command failed");
        TerminalSurface.notify(&format!("Error: {e}"));
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8, json: bool) {
    let default_filter = match verbose {
        0 => "warn,flowstation=info",
        1 => "info,flowstation=debug",
        _ => "debug,flowstation=trace",
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(cli: Cli) -> AppResult<()> {
    let mut config = Config::from_env()?;
    if let Some(url) = cli.url {
        config.device_base_url = url.trim_end_matches('/').to_string();
        config.validate()?;
    }
    tracing::debug!(url = %config.device_base_url, "Configuration loaded");

    let client = DeviceClient::new(&config)?;
    let mut surface = TerminalSurface;

    match cli.command {
        Command::Watch { interval_ms } => {
            let refresh = interval_ms.map_or(config.poll_interval(), std::time::Duration::from_millis);
            watch(config, client, ViewConfig::dashboard(refresh)).await
        }
        Command::History {
            interval_ms,
            no_sort,
        } => {
            let refresh = interval_ms.map_or(config.poll_interval(), std::time::Duration::from_millis);
            let view = ViewConfig::history(refresh).with_sorting(!no_sort);
            watch(config, client, view).await
        }
        Command::Log { name, svg_dir } => show_log(config, client, name, svg_dir).await,
        Command::LogCsv {
            file,
            svg_dir,
            sort,
        } => show_log_csv(&config, &file, svg_dir.as_deref(), sort).await,
        Command::Record => {
            let reply = client.toggle_recording().await?;
            surface.notify(&reply.message);
            if let Some(recording) = reply.recording_hint() {
                tracing::info!(recording, "Recording toggled");
            }
            Ok(())
        }
        Command::DeleteLog => {
            surface.notify(&client.delete_log().await?.message);
            Ok(())
        }
        Command::ClearFlow => {
            surface.notify(&client.clear_cumulative_flow().await?.message);
            Ok(())
        }
        Command::SetTime { at } => {
            let at = match at {
                Some(text) => parse_local_time(&text)?,
                None => Utc::now(),
            };
            surface.notify(&client.set_time(at).await?.message);
            Ok(())
        }
        Command::Time => {
            surface.notify(&client.get_time().await?);
            Ok(())
        }
        Command::Calibration(command) => calibration(&client, &mut surface, command).await,
        Command::DownloadLog { out } => {
            let bytes = export::save_log(&client, &out).await?;
            surface.notify(&format!("Saved {bytes} bytes to {}", out.display()));
            Ok(())
        }
        Command::Export { dir } => {
            let mut options = ExportOptions::from(&config);
            if let Some(dir) = dir {
                options.dir = dir;
            }
            export_all(config, client, options).await
        }
    }
}

async fn watch(config: Config, client: DeviceClient, view: ViewConfig) -> AppResult<()> {
    view.validate()?;
    let state = AppState::new(config, client, view, Box::new(TerminalSurface));

    let result = tokio::select! {
        result = poll::run_poller(state.clone()) => result,
        () = shutdown_signal() => Ok(()),
    };

    state.renderer.lock().await.dispose();
    result
}

async fn show_log(
    config: Config,
    client: DeviceClient,
    name: String,
    svg_dir: Option<PathBuf>,
) -> AppResult<()> {
    let view = ViewConfig::log_file(name.clone());
    let state = AppState::new(config, client, view, Box::new(TerminalSurface));

    let seq = state.sequencer.next();
    let series = state
        .client
        .get_series(&SeriesEndpoint::LogFile(name))
        .await?;
    state.renderer.lock().await.update(seq, series)?;

    if let Some(dir) = svg_dir {
        write_charts(&state, &dir).await?;
    }
    Ok(())
}

async fn show_log_csv(
    config: &Config,
    file: &Path,
    svg_dir: Option<&Path>,
    sort: bool,
) -> AppResult<()> {
    let reader = std::fs::File::open(file)?;
    let series = series::from_log_csv(reader)?;

    let view = ViewConfig::log_file(file.display().to_string()).with_sorting(sort);
    let mut renderer = flowstation::render::Renderer::new(view, Box::new(TerminalSurface));
    renderer.update(1, series)?;

    if let Some(dir) = svg_dir {
        let options = ExportOptions::from(config);
        for chart in renderer.charts() {
            let path = dir.join(format!("{}.svg", chart.id.slug()));
            export::write_chart(chart, &path, &options).await?;
        }
    }
    Ok(())
}

async fn write_charts(state: &AppState, dir: &Path) -> AppResult<()> {
    let options = ExportOptions::from(state.config.as_ref());
    let renderer = state.renderer.lock().await;
    for chart in renderer.charts() {
        let path = dir.join(format!("{}.svg", chart.id.slug()));
        export::write_chart(chart, &path, &options).await?;
    }
    Ok(())
}

async fn calibration(
    client: &DeviceClient,
    surface: &mut TerminalSurface,
    command: CalibrationCommand,
) -> AppResult<()> {
    match command {
        CalibrationCommand::Show => {
            for (i, calibration) in client.get_calibration().await?.iter().enumerate() {
                let [v_min, v_max, psi_min, psi_max] = calibration.field_text();
                surface.notify(&format!(
                    "Sensor {}: v_min={v_min} V v_max={v_max} V psi_min={psi_min} psi_max={psi_max}",
                    i + 1
                ));
            }
            Ok(())
        }
        CalibrationCommand::Set {
            sensor,
            v_min,
            v_max,
            psi_min,
            psi_max,
            defaults,
            query,
        } => {
            let calibration = if defaults {
                Calibration::default()
            } else {
                match (v_min, v_max, psi_min, psi_max) {
                    (Some(v_min), Some(v_max), Some(psi_min), Some(psi_max)) => {
                        Calibration::parse_fields(&v_min, &v_max, &psi_min, &psi_max)?
                    }
                    _ => {
                        return Err(AppError::Validation(
                            "--v-min, --v-max, --psi-min and --psi-max are required".to_string(),
                        ));
                    }
                }
            };
            let method = if query {
                UpdateMethod::Query
            } else {
                UpdateMethod::JsonBody
            };

            let reply = client
                .update_calibration(usize::from(sensor - 1), calibration, method)
                .await?;
            surface.notify(&format!("{reply}\nVoltage values apply until the next restart."));
            Ok(())
        }
        CalibrationCommand::Auto { sensor } => {
            let outcome = client.calibrate_vmin(usize::from(sensor - 1)).await?;
            match outcome.v_min {
                Some(v_min) if outcome.is_success() => {
                    surface.notify(&format!(
                        "v_min calibrated: {v_min:.2} V\nApplies until the next restart."
                    ));
                    Ok(())
                }
                _ => {
                    tracing::warn!(status = ?outcome.status, reply = %outcome.message, "No v_min in reply");
                    Err(AppError::Device(format!(
                        "calibration failed: {}",
                        outcome.message
                    )))
                }
            }
        }
        CalibrationCommand::Reset => {
            surface.notify(&client.reset_calibration().await?.message);
            Ok(())
        }
    }
}

async fn export_all(config: Config, client: DeviceClient, options: ExportOptions) -> AppResult<()> {
    let view = ViewConfig::dashboard(config.poll_interval());
    let state = AppState::new(config, client, view, Box::new(TerminalSurface));

    let seq = state.sequencer.next();
    match state.client.get_series(&SeriesEndpoint::LoggingData).await {
        Ok(series) => {
            state.renderer.lock().await.update(seq, series)?;
        }
        Err(e) => {
            tracing::warn!(error = %e, "Exporting charts without logging data");
        }
    }

    let charts = state.renderer.lock().await.charts().to_vec();
    let path = export::export_archive(&state.client, &charts, &options, Local::now()).await?;
    TerminalSurface.notify(&format!("Archive written to {}", path.display()));
    Ok(())
}

fn parse_local_time(text: &str) -> AppResult<chrono::DateTime<Utc>> {
    let naive = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text.trim(), format).ok())
        .ok_or_else(|| AppError::Validation(format!("cannot parse time '{text}'")))?;

    Local
        .from_local_datetime(&naive)
        .single()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| AppError::Validation(format!("ambiguous local time '{text}'")))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down...");
        },
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        },
    }
}
