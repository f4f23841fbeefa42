use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

use crate::config::Config;
use crate::device::DeviceClient;
use crate::render::{Renderer, Surface, ViewConfig};

/// Hands out request sequence numbers, starting at 1.
#[derive(Debug, Default)]
pub struct Sequencer(AtomicU64);

impl Sequencer {
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub client: Arc<DeviceClient>,
    pub renderer: Arc<Mutex<Renderer>>,
    pub sequencer: Arc<Sequencer>,
}

impl AppState {
    pub fn new(
        config: Config,
        client: DeviceClient,
        view: ViewConfig,
        surface: Box<dyn Surface>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            client: Arc::new(client),
            renderer: Arc::new(Mutex::new(Renderer::new(view, surface))),
            sequencer: Arc::new(Sequencer::default()),
        }
    }
}
