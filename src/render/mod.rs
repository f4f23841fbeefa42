pub mod chart;
pub mod readout;
pub mod renderer;
pub mod surface;
pub mod view;

pub use chart::{Chart, ChartId};
pub use readout::{Readout, format_readout};
pub use renderer::{ApplyOutcome, Renderer};
pub use surface::{Surface, TerminalSurface};
pub use view::ViewConfig;
