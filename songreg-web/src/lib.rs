//! songreg-web library - Song registry web service
//!
//! Accepts song registrations from a web form, relays them to the BaaS
//! platform for on-chain recording, and tracks confirmation through the
//! platform's webhook.

pub mod api;
pub mod blockapi;
pub mod config;
pub mod error;
pub mod flash;
pub mod registry;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use songreg_common::events::EventBus;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::blockapi::BlockApiClient;
use crate::registry::SongRegistry;

/// SSE fan-out buffer per subscriber
pub const EVENT_BUS_CAPACITY: usize = 100;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Registered songs (volatile)
    pub registry: SongRegistry,
    /// Outbound BaaS client
    pub blockapi: Arc<BlockApiClient>,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Secret for flash cookie signatures
    pub secret_key: Arc<str>,
    /// Public webhook URL, shown on the index page
    pub webhook_url: Option<String>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(blockapi: BlockApiClient, secret_key: &str, webhook_url: Option<String>) -> Self {
        Self {
            registry: SongRegistry::new(),
            blockapi: Arc::new(blockapi),
            event_bus: EventBus::new(EVENT_BUS_CAPACITY),
            secret_key: Arc::from(secret_key),
            webhook_url,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        // UI routes (HTML pages)
        .merge(api::ui_routes())
        // Form submission and JSON API
        .merge(api::song_routes())
        // BaaS callback
        .merge(api::webhook_routes())
        .route("/events", get(api::event_stream))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
