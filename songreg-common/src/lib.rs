//! # Song Registry Common Library
//!
//! Shared code for the song registry service including:
//! - Song record model and status transitions
//! - Event types (SongEvent enum) and the EventBus
//! - Configuration loading (TOML bootstrap file)
//! - Payload signing for client-held state
//! - SSE stream helpers

pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod signing;
pub mod sse;

pub use error::{Error, Result};
pub use models::{SongRecord, SongStatus};
