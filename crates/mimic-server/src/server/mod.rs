//! HTTP surface of the emulator.
//!
//! - `router`: dispatch by method and path
//! - `handlers`: health probes, emulator control, models and completions
//! - `openai`: response envelopes
//! - `types`: error envelope and response helpers
//! - `listener`: accept loop

pub mod handlers;
mod listener;
pub mod openai;
mod router;
pub mod types;

pub use listener::EmulatorServer;
pub use router::route_request;

use crate::config::Config;
use crate::engine::Engine;
use crate::stream::DEFAULT_EVENT_DELAY;
use std::sync::Arc;
use std::time::Duration;

/// State shared by all connections
#[derive(Debug, Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    /// Enables request logging and the session state endpoint
    pub debug: bool,
    /// Pause between stream events
    pub stream_delay: Duration,
}

impl AppState {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            debug: false,
            stream_delay: DEFAULT_EVENT_DELAY,
        }
    }

    /// Build the engine and state described by a validated config
    pub fn from_config(config: &Config) -> Self {
        let engine = if config.models.is_empty() {
            Engine::new()
        } else {
            Engine::with_models(config.models.clone())
        };
        Self::new(Arc::new(engine))
            .with_debug(config.debug)
            .with_stream_delay(config.stream.delay())
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_stream_delay(mut self, delay: Duration) -> Self {
        self.stream_delay = delay;
        self
    }
}
