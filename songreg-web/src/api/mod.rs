//! HTTP API handlers for songreg-web

pub mod health;
pub mod songs;
pub mod sse;
pub mod ui;
pub mod webhook;

pub use health::health_routes;
pub use songs::song_routes;
pub use sse::event_stream;
pub use ui::ui_routes;
pub use webhook::webhook_routes;
