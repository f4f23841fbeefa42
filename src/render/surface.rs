use std::io::Write;

use crate::render::chart::Chart;
use crate::render::readout::Readout;

/// Where the renderer draws. Implementations must not block for long; they
/// run while the renderer is locked.
pub trait Surface: Send {
    fn show_readout(&mut self, readout: &Readout);

    fn redraw(&mut self, charts: &[Chart]);

    /// Blocking user notification (errors, command replies).
    fn notify(&mut self, message: &str);
}

/// Plain text output on stdout.
#[derive(Debug, Default)]
pub struct TerminalSurface;

impl Surface for TerminalSurface {
    fn show_readout(&mut self, readout: &Readout) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{readout}");
    }

    fn redraw(&mut self, charts: &[Chart]) {
        let mut out = std::io::stdout().lock();
        for chart in charts {
            let last = chart.labels.last().map_or("-", String::as_str);
            let _ = write!(out, "[{}] {} samples, last {last}:", chart.id.slug(), chart.len());
            for dataset in &chart.datasets {
                match dataset.data.last() {
                    Some(v) => {
                        let _ = write!(out, " {}={v:.3}", dataset.label);
                    }
                    None => {
                        let _ = write!(out, " {}=-", dataset.label);
                    }
                }
            }
            let _ = writeln!(out);
        }
    }

    fn notify(&mut self, message: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{message}");
    }
}
