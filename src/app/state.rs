//! Application state shared across routes

use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::game::MatchRegistry;
use crate::store::{EventSink, NullSink, RestEventSink, SupabaseClient};

/// Capacity of the event sink backlog
const EVENT_SINK_BACKLOG: usize = 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub match_registry: Arc<MatchRegistry>,
}

impl AppState {
    /// Build state from configuration. Must run inside a tokio runtime when
    /// an event sink is configured.
    pub fn new(config: Config) -> Self {
        let sink: Arc<dyn EventSink> = match (&config.event_sink_url, &config.event_sink_key) {
            (Some(url), Some(key)) => {
                info!(url = %url, "Persisting match events over REST");
                Arc::new(RestEventSink::spawn(
                    SupabaseClient::new(url.clone(), key.clone()),
                    EVENT_SINK_BACKLOG,
                ))
            }
            _ => {
                info!("No event sink configured, match events are not persisted");
                Arc::new(NullSink)
            }
        };

        Self::with_sink(config, sink)
    }

    /// Build state around an explicit sink
    pub fn with_sink(config: Config, sink: Arc<dyn EventSink>) -> Self {
        let match_registry = Arc::new(MatchRegistry::new(config.rules.clone(), sink));

        Self {
            config: Arc::new(config),
            match_registry,
        }
    }
}
