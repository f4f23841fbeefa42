//! Downloads: the raw log, single chart images and the combined archive.
//!
//! The archive is assembled in memory and written to disk only once every
//! part is available, so a failed export never leaves a partial file.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::config::Config;
use crate::device::DeviceClient;
use crate::error::{AppError, AppResult};
use crate::render::{Chart, ChartId};

/// Charts that go into every archive, in archive order.
pub const ARCHIVE_CHARTS: [ChartId; 3] = [ChartId::Pressure, ChartId::Flow, ChartId::Combined];

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub dir: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Images are rendered at `width * upscale` x `height * upscale`.
    pub upscale: u32,
}

impl From<&Config> for ExportOptions {
    fn from(config: &Config) -> Self {
        Self {
            dir: config.export_dir.clone(),
            width: config.chart_width,
            height: config.chart_height,
            upscale: config.export_upscale,
        }
    }
}

/// File name prefix, `dd-mm-yyyy_HH-MM` in local time.
#[must_use]
pub fn file_stamp(now: DateTime<Local>) -> String {
    now.format("%d-%m-%Y_%H-%M").to_string()
}

/// Build `<stamp>_log_charts.zip` from the station log and the given charts.
///
/// Chart images are captured first, then the CSV is fetched. Any missing
/// chart or a failed CSV fetch aborts the export without writing anything.
///
/// # Errors
///
/// Returns `AppError::Export` if a chart is missing or the CSV cannot be
/// loaded, and I/O or ZIP errors from writing the archive.
pub async fn export_archive(
    client: &DeviceClient,
    charts: &[Chart],
    options: &ExportOptions,
    now: DateTime<Local>,
) -> AppResult<PathBuf> {
    let stamp = file_stamp(now);

    let mut images = Vec::with_capacity(ARCHIVE_CHARTS.len());
    for id in ARCHIVE_CHARTS {
        let chart = charts
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| AppError::Export(format!("chart not found: {}", id.slug())))?;
        let svg = chart.to_svg(options.width, options.height, options.upscale)?;
        images.push((format!("{stamp}_{}.svg", id.slug()), svg));
    }

    let csv = client.download_log().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to load log CSV for export");
        AppError::Export(format!("failed to load CSV: {e}"))
    })?;

    let mut entries = vec![(format!("{stamp}_raw.csv"), csv)];
    entries.extend(images);
    let archive = build_zip(&entries)?;

    let path = options.dir.join(format!("{stamp}_log_charts.zip"));
    write_atomically(&path, &archive).await?;

    tracing::info!(path = %path.display(), bytes = archive.len(), "Archive written");
    Ok(path)
}

fn build_zip(entries: &[(String, String)]) -> AppResult<Vec<u8>> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    for (name, contents) in entries {
        zip.start_file(name.as_str(), options)?;
        zip.write_all(contents.as_bytes())?;
    }

    Ok(zip.finish()?.into_inner())
}

/// Write through a sibling `.part` file so readers never see a truncated file.
async fn write_atomically(path: &Path, bytes: &[u8]) -> AppResult<()> {
    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);

    if let Err(e) = tokio::fs::write(&partial, bytes).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e.into());
    }
    if let Err(e) = tokio::fs::rename(&partial, path).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e.into());
    }
    Ok(())
}

/// Save one chart as an SVG image.
///
/// # Errors
///
/// Returns an error if rendering or writing fails.
pub async fn write_chart(chart: &Chart, path: &Path, options: &ExportOptions) -> AppResult<()> {
    let svg = chart.to_svg(options.width, options.height, options.upscale)?;
    write_atomically(path, svg.as_bytes()).await?;
    tracing::info!(chart = chart.id.slug(), path = %path.display(), "Chart written");
    Ok(())
}

/// Download the station log to `path`, returning the number of bytes written.
///
/// # Errors
///
/// Returns an error if the download or the write fails.
pub async fn save_log(client: &DeviceClient, path: &Path) -> AppResult<usize> {
    let csv = client.download_log().await?;
    write_atomically(path, csv.as_bytes()).await?;
    tracing::info!(path = %path.display(), bytes = csv.len(), "Log saved");
    Ok(csv.len())
}
