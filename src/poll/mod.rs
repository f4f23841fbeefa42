pub mod scheduler;

pub use scheduler::{poll_once, poll_series, poll_snapshot, run_poller};
