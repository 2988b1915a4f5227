//! Server-Sent Events for live song list updates

use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;

/// GET /events - SSE stream of SongRegistered / SongSettled events
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    songreg_common::sse::create_event_sse_stream(&state.event_bus, "songreg-web")
}
