use crate::device::models::Snapshot;

/// Text panel for one snapshot, as shown next to the charts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Readout {
    pub time: String,
    pub pressure: Vec<String>,
    pub flow: Vec<String>,
    pub recording: Option<bool>,
}

/// Format a snapshot: pressures with 3 decimals, flow values with 2.
#[must_use]
pub fn format_readout(snapshot: &Snapshot) -> Readout {
    let pressure = snapshot
        .pressure
        .iter()
        .enumerate()
        .map(|(i, p)| format!("Sensor {}: {p:.3} bar", i + 1))
        .collect();

    let flow = snapshot
        .flow_rate
        .iter()
        .zip(snapshot.cumulative_flow.iter())
        .enumerate()
        .map(|(i, (rate, total))| {
            format!("Sensor {}: {rate:.2} L/min (cumulative: {total:.2} L)", i + 1)
        })
        .collect();

    Readout {
        time: format!("Time: {}", snapshot.time),
        pressure,
        flow,
        recording: snapshot.recording,
    }
}

impl std::fmt::Display for Readout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.time)?;
        if let Some(recording) = self.recording {
            writeln!(f, "Recording: {}", if recording { "on" } else { "off" })?;
        }
        writeln!(f, "Pressure")?;
        for line in &self.pressure {
            writeln!(f, "  {line}")?;
        }
        writeln!(f, "Flow")?;
        for line in &self.flow {
            writeln!(f, "  {line}")?;
        }
        Ok(())
    }
}
