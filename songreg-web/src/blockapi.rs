//! BaaS (blockchain-as-a-service) API client
//!
//! Submits song metadata as a blockchain task. The platform acknowledges
//! immediately with a task ID and reports the on-chain result later through
//! the webhook endpoint.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use songreg_common::models::{format_timestamp, NewSong};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Schema (table) name the records are filed under on the BaaS side
pub const SCHEMA_NAME: &str = "songRegistry";
/// Application name carried inside each payload
pub const APPLICATION_NAME: &str = "songRegistry";
/// Payload layout version
pub const PAYLOAD_VERSION: u32 = 4;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("songreg-web/", env!("CARGO_PKG_VERSION"));

/// BaaS client errors
#[derive(Debug, Error)]
pub enum BlockApiError {
    #[error("HTTP client setup failed: {0}")]
    Client(String),

    #[error("Network error: {0}")]
    Network(String),

    /// Non-200/201 response
    #[error("{status} - {body}")]
    Rejected { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Request body for `POST /blockchainTask`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockchainTask {
    /// Table/schema name from the sender's perspective
    pub data_schema_name: String,
    /// Row ID from the sender's perspective
    pub data_id: String,
    /// The data to be hashed and stored
    pub json_payload: SongPayload,
}

/// Song metadata as written to the chain
#[derive(Debug, Clone, Serialize)]
pub struct SongPayload {
    pub application: String,
    pub version: u32,
    pub title: String,
    pub url: String,
    pub price: u64,
    pub owner: String,
    pub timestamp: String,
}

impl BlockchainTask {
    pub fn for_song(song: &NewSong) -> Self {
        Self {
            data_schema_name: SCHEMA_NAME.to_string(),
            data_id: song.data_id.clone(),
            json_payload: SongPayload {
                application: APPLICATION_NAME.to_string(),
                version: PAYLOAD_VERSION,
                title: song.title.clone(),
                url: song.url.clone(),
                price: song.price,
                owner: song.owner.clone(),
                timestamp: format_timestamp(&song.timestamp),
            },
        }
    }
}

/// Acknowledgement body: `{"data": {"id": ...}}`
#[derive(Debug, Deserialize)]
struct TaskAck {
    data: Option<TaskAckData>,
}

#[derive(Debug, Deserialize)]
struct TaskAckData {
    id: Option<Value>,
}

/// Accepted task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReceipt {
    /// HTTP status of the acknowledgement (200 or 201)
    pub status: u16,
    /// BaaS task ID, when the acknowledgement carried one
    pub task_id: Option<String>,
}

/// BaaS API client
pub struct BlockApiClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl BlockApiClient {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, BlockApiError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BlockApiError::Client(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn task_url(&self) -> String {
        format!("{}/blockchainTask", self.base_url)
    }

    /// Submit a blockchain task
    ///
    /// 200 and 201 are both accepted. Any other status is returned as
    /// `Rejected` with the response body text.
    pub async fn submit_task(&self, task: &BlockchainTask) -> Result<TaskReceipt, BlockApiError> {
        let url = self.task_url();
        debug!(data_id = %task.data_id, url = %url, "Submitting blockchain task");

        let mut request = self.http_client.post(&url).json(task);
        if let Some(key) = &self.api_key {
            request = request.header("X-API-Key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BlockApiError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| BlockApiError::Network(e.to_string()))?;

        if status != 200 && status != 201 {
            warn!(data_id = %task.data_id, status, "BaaS rejected blockchain task");
            return Err(BlockApiError::Rejected { status, body });
        }

        let task_id = parse_task_id(&body)?;

        info!(
            data_id = %task.data_id,
            task_id = %task_id.as_deref().unwrap_or("none"),
            "BaaS accepted blockchain task"
        );

        Ok(TaskReceipt { status, task_id })
    }
}

/// Extract `data.id` from an acknowledgement body
///
/// Numeric IDs are rendered as text. An empty body carries no ID.
fn parse_task_id(body: &str) -> Result<Option<String>, BlockApiError> {
    if body.trim().is_empty() {
        return Ok(None);
    }

    let ack: TaskAck =
        serde_json::from_str(body).map_err(|e| BlockApiError::Parse(e.to_string()))?;

    Ok(ack.data.and_then(|data| data.id).and_then(|id| match id {
        Value::String(s) => Some(s),
        Value::Null => None,
        other => Some(other.to_string()),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_task_payload_shape() {
        let song = NewSong {
            data_id: "song_1700000000".to_string(),
            title: "Night Drive".to_string(),
            url: "https://example.com/night.mp3".to_string(),
            price: 12,
            owner: "X".repeat(58),
            timestamp: Utc.with_ymd_and_hms(2023, 11, 14, 22, 13, 20).unwrap(),
        };

        let json = serde_json::to_value(BlockchainTask::for_song(&song)).unwrap();

        assert_eq!(json["dataSchemaName"], "songRegistry");
        assert_eq!(json["dataId"], "song_1700000000");
        let payload = &json["jsonPayload"];
        assert_eq!(payload["application"], "songRegistry");
        assert_eq!(payload["version"], 4);
        assert_eq!(payload["title"], "Night Drive");
        assert_eq!(payload["price"], 12);
        assert_eq!(payload["timestamp"], "2023-11-14T22:13:20.000000Z");
    }

    #[test]
    fn test_parse_task_id_variants() {
        assert_eq!(
            parse_task_id(r#"{"data": {"id": "abc"}}"#).unwrap().as_deref(),
            Some("abc")
        );
        assert_eq!(
            parse_task_id(r#"{"data": {"id": 77}}"#).unwrap().as_deref(),
            Some("77")
        );
        assert_eq!(parse_task_id(r#"{"data": {}}"#).unwrap(), None);
        assert_eq!(parse_task_id(r#"{"ok": true}"#).unwrap(), None);
        assert_eq!(parse_task_id("").unwrap(), None);
        assert!(matches!(parse_task_id("<html>"), Err(BlockApiError::Parse(_))));
    }

    #[test]
    fn test_task_url_strips_trailing_slash() {
        let client = BlockApiClient::new("https://baas.test/api/v1/", None).unwrap();
        assert_eq!(client.base_url(), "https://baas.test/api/v1");
        assert_eq!(client.task_url(), "https://baas.test/api/v1/blockchainTask");
    }
}
