//! Song registration form handler and JSON listing API

use axum::{
    extract::{rejection::FormRejection, Path, State},
    http::HeaderMap,
    response::Response,
    routing::{get, post},
    Form, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use songreg_common::events::SongEvent;
use songreg_common::models::{parse_price, validate_owner, NewSong, SongRecord};
use tracing::{info, warn};

use crate::blockapi::{BlockApiError, BlockchainTask};
use crate::flash::{self, FlashLevel, FlashMessage};
use crate::{ApiError, ApiResult, AppState};

/// Longest BaaS error body echoed back to the user
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Registration form fields
///
/// All optional so that missing fields reach validation instead of failing
/// extraction.
#[derive(Debug, Default, Deserialize)]
pub struct RegistrationForm {
    pub title: Option<String>,
    pub url: Option<String>,
    pub price: Option<String>,
    pub owner: Option<String>,
}

/// Song list response
#[derive(Debug, Serialize)]
pub struct SongListResponse {
    pub total: usize,
    pub songs: Vec<SongRecord>,
}

/// POST /register_song
///
/// Always redirects to `/`; the outcome travels as flash messages. A body the
/// form extractor rejects (wrong content type, repeated field) is reported the
/// same way.
pub async fn register_song(
    State(state): State<AppState>,
    headers: HeaderMap,
    form: Result<Form<RegistrationForm>, FormRejection>,
) -> Response {
    let mut flashes = flash::read_from_headers(&headers, &state.secret_key);
    match form {
        Ok(Form(form)) => flashes.extend(process_registration(&state, form).await),
        Err(rejection) => {
            warn!("Unreadable registration form: {}", rejection.body_text());
            flashes.push(FlashMessage::new(
                FlashLevel::Error,
                format!("Error registering song: {}", rejection.body_text()),
            ));
        }
    }
    flash::redirect_with(&flashes, "/", &state.secret_key)
}

/// Validate, relay to the BaaS, and record on success
///
/// Price is checked before the owner address.
async fn process_registration(state: &AppState, form: RegistrationForm) -> Vec<FlashMessage> {
    let price = match parse_price(form.price.as_deref()) {
        Ok(price) => price,
        Err(e) => return vec![registration_error(e)],
    };

    let owner = match validate_owner(form.owner.as_deref()) {
        Ok(owner) => owner.to_string(),
        Err(songreg_common::Error::InvalidInput(msg)) => {
            return vec![FlashMessage::new(FlashLevel::Error, msg)];
        }
        Err(e) => return vec![registration_error(e)],
    };

    let now = Utc::now();
    let song = NewSong {
        data_id: state.registry.allocate_data_id(now).await,
        title: form.title.unwrap_or_default(),
        url: form.url.unwrap_or_default(),
        price,
        owner,
        timestamp: now,
    };

    let task = BlockchainTask::for_song(&song);
    match state.blockapi.submit_task(&task).await {
        Ok(receipt) => {
            let record = state.registry.register(song, receipt.task_id.clone()).await;
            info!(
                data_id = %record.data_id,
                id = record.id,
                title = %record.title,
                "Song registered, awaiting blockchain confirmation"
            );

            state.event_bus.emit_lossy(SongEvent::SongRegistered {
                data_id: record.data_id.clone(),
                title: record.title.clone(),
                baas_task_id: record.baas_task_id.clone(),
                timestamp: Utc::now(),
            });

            let task_id = receipt.task_id.as_deref().unwrap_or("None");
            vec![
                FlashMessage::new(
                    FlashLevel::Success,
                    format!("Song registered successfully! Tracking ID: {}", record.data_id),
                ),
                FlashMessage::new(
                    FlashLevel::Info,
                    format!(
                        "BaaS Task ID: {} - Your song will be written to the blockchain shortly.",
                        task_id
                    ),
                ),
            ]
        }
        Err(BlockApiError::Rejected { status, body }) => {
            warn!(data_id = %song.data_id, status, "Song registration rejected by BaaS");
            vec![FlashMessage::new(
                FlashLevel::Error,
                format!("Error: {} - {}", status, truncate(&body, MAX_ERROR_BODY_CHARS)),
            )]
        }
        Err(e) => {
            warn!(data_id = %song.data_id, "Song registration failed: {}", e);
            vec![FlashMessage::new(
                FlashLevel::Error,
                format!("Error registering song: {}", e),
            )]
        }
    }
}

fn registration_error(e: songreg_common::Error) -> FlashMessage {
    FlashMessage::new(FlashLevel::Error, format!("Error registering song: {}", e))
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

/// GET /api/songs
pub async fn list_songs(State(state): State<AppState>) -> Json<SongListResponse> {
    let songs = state.registry.list().await;
    Json(SongListResponse {
        total: songs.len(),
        songs,
    })
}

/// GET /api/songs/:data_id
pub async fn get_song(
    State(state): State<AppState>,
    Path(data_id): Path<String>,
) -> ApiResult<Json<SongRecord>> {
    state
        .registry
        .get(&data_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("song {}", data_id)))
}

/// Build registration and listing routes
pub fn song_routes() -> Router<AppState> {
    Router::new()
        .route("/register_song", post(register_song))
        .route("/api/songs", get(list_songs))
        .route("/api/songs/:data_id", get(get_song))
}
