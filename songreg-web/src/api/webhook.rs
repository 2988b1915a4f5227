//! BaaS transaction-complete webhook
//!
//! The platform posts `{dataSchemaName, dataId, transactionId, status}` once a
//! submitted task has been written (or has failed to be written) on chain.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use songreg_common::events::SongEvent;
use songreg_common::models::SongStatus;
use tracing::{error, info, warn};

use crate::blockapi::SCHEMA_NAME;
use crate::registry::SettleResult;
use crate::AppState;

/// Webhook body
///
/// Fields are loose JSON values; only string identifiers can match a record.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookNotification {
    #[serde(default)]
    pub data_schema_name: Option<Value>,
    #[serde(default)]
    pub data_id: Option<Value>,
    #[serde(default)]
    pub transaction_id: Option<Value>,
    #[serde(default)]
    pub status: Option<Value>,
}

impl WebhookNotification {
    fn schema(&self) -> Option<&str> {
        self.data_schema_name.as_ref().and_then(Value::as_str)
    }

    fn data_id(&self) -> Option<&str> {
        self.data_id
            .as_ref()
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }

    fn status(&self) -> Option<&str> {
        self.status.as_ref().and_then(Value::as_str)
    }

    fn transaction_id(&self) -> Option<String> {
        match self.transaction_id.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

/// POST /webhook/blockchain-notification
pub async fn blockchain_webhook(State(state): State<AppState>, body: Bytes) -> Response {
    info!("Received webhook: {}", String::from_utf8_lossy(&body));

    let notification = match parse_notification(&body) {
        Ok(notification) => notification,
        Err(e) => {
            error!("Webhook error: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Webhook processing failed"})),
            )
                .into_response();
        }
    };

    apply_notification(&state, &notification).await;

    (
        StatusCode::OK,
        Json(json!({"message": "Webhook processed successfully"})),
    )
        .into_response()
}

/// Body must be a JSON object; arrays and scalars are rejected
fn parse_notification(body: &[u8]) -> Result<WebhookNotification, serde_json::Error> {
    let value: Value = serde_json::from_slice(body)?;
    if !value.is_object() {
        return Err(serde::de::Error::custom("webhook body is not a JSON object"));
    }
    serde_json::from_value(value)
}

async fn apply_notification(state: &AppState, notification: &WebhookNotification) {
    if notification.schema() != Some(SCHEMA_NAME) {
        info!(
            schema = ?notification.schema(),
            "Ignoring webhook for foreign schema"
        );
        return;
    }

    let Some(data_id) = notification.data_id() else {
        warn!("Ignoring webhook without dataId");
        return;
    };

    let status = SongStatus::from_webhook_status(notification.status());
    let transaction_id = notification.transaction_id();

    match state
        .registry
        .settle(data_id, status, transaction_id, Utc::now())
        .await
    {
        SettleResult::Settled(record) => {
            info!(
                data_id = %record.data_id,
                status = %record.status,
                tx_id = %record.transaction_id.as_deref().unwrap_or("none"),
                "Updated song"
            );
            state.event_bus.emit_lossy(SongEvent::SongSettled {
                data_id: record.data_id,
                status: record.status,
                transaction_id: record.transaction_id,
                timestamp: Utc::now(),
            });
        }
        SettleResult::AlreadySettled(current) => {
            warn!(
                data_id = %data_id,
                current = %current,
                "Ignoring webhook for already settled song"
            );
        }
        SettleResult::Unknown => {
            warn!(data_id = %data_id, "Webhook for unknown song");
        }
    }
}

/// Build webhook routes
pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/webhook/blockchain-notification", post(blockchain_webhook))
}
