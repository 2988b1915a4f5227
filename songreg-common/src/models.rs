//! Song registration record and its status transitions

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Length of a base32-encoded Algorand address
pub const ALGORAND_ADDRESS_LEN: usize = 58;

/// Blockchain confirmation status of a song registration
///
/// Only `Pending` may transition, and only once, to `Confirmed` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SongStatus {
    /// Submitted to the BaaS, awaiting the webhook
    Pending,
    /// Webhook reported a successful on-chain write
    Confirmed,
    /// Webhook reported any other outcome
    Failed,
}

impl SongStatus {
    /// Map a webhook `status` field to the settled status
    pub fn from_webhook_status(status: Option<&str>) -> Self {
        match status {
            Some("success") => SongStatus::Confirmed,
            _ => SongStatus::Failed,
        }
    }

    pub fn is_settled(self) -> bool {
        !matches!(self, SongStatus::Pending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SongStatus::Pending => "pending",
            SongStatus::Confirmed => "confirmed",
            SongStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SongStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated song metadata from the registration form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSong {
    pub data_id: String,
    pub title: String,
    pub url: String,
    pub price: u64,
    pub owner: String,
    pub timestamp: DateTime<Utc>,
}

/// A registered song as held in the registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SongRecord {
    /// 1-based position at insertion time
    pub id: u64,
    /// Tracking ID sent to the BaaS as `dataId`
    pub data_id: String,
    pub title: String,
    pub url: String,
    pub price: u64,
    /// Algorand address of the owner
    pub owner: String,
    /// Submission time
    #[serde(with = "micros_utc")]
    pub timestamp: DateTime<Utc>,
    pub status: SongStatus,
    /// Task ID from the BaaS acknowledgement
    pub baas_task_id: Option<String>,
    /// On-chain transaction ID from the webhook
    pub transaction_id: Option<String>,
    /// When the webhook settled this record
    pub settled_at: Option<DateTime<Utc>>,
}

impl SongRecord {
    /// Build a pending record from validated metadata
    pub fn pending(id: u64, song: NewSong, baas_task_id: Option<String>) -> Self {
        Self {
            id,
            data_id: song.data_id,
            title: song.title,
            url: song.url,
            price: song.price,
            owner: song.owner,
            timestamp: song.timestamp,
            status: SongStatus::Pending,
            baas_task_id,
            transaction_id: None,
            settled_at: None,
        }
    }

    /// Apply the one-time pending → settled transition
    ///
    /// Returns `false` without touching the record if it is already settled.
    pub fn settle(
        &mut self,
        status: SongStatus,
        transaction_id: Option<String>,
        at: DateTime<Utc>,
    ) -> bool {
        if self.status.is_settled() || !status.is_settled() {
            return false;
        }
        self.status = status;
        self.transaction_id = transaction_id;
        self.settled_at = Some(at);
        true
    }
}

/// Check that an owner address is present and has Algorand length
pub fn validate_owner(owner: Option<&str>) -> Result<&str> {
    match owner {
        Some(addr) if addr.chars().count() == ALGORAND_ADDRESS_LEN => Ok(addr),
        _ => Err(Error::InvalidInput(format!(
            "Please provide a valid Algorand address ({} characters)",
            ALGORAND_ADDRESS_LEN
        ))),
    }
}

/// Parse the price form field as whole units
pub fn parse_price(raw: Option<&str>) -> Result<u64> {
    let raw = raw.map(str::trim).unwrap_or_default();
    raw.parse::<u64>()
        .map_err(|_| Error::InvalidInput(format!("invalid price '{}'", raw)))
}

/// RFC 3339 with microseconds and a `Z` suffix, e.g. `2025-01-02T03:04:05.123456Z`
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

mod micros_utc {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> NewSong {
        NewSong {
            data_id: "song_1700000000".to_string(),
            title: "Blue".to_string(),
            url: "https://example.com/blue.mp3".to_string(),
            price: 10,
            owner: "A".repeat(ALGORAND_ADDRESS_LEN),
            timestamp: Utc.with_ymd_and_hms(2023, 11, 14, 22, 13, 20).unwrap(),
        }
    }

    #[test]
    fn test_webhook_status_mapping() {
        assert_eq!(SongStatus::from_webhook_status(Some("success")), SongStatus::Confirmed);
        assert_eq!(SongStatus::from_webhook_status(Some("failed")), SongStatus::Failed);
        assert_eq!(SongStatus::from_webhook_status(Some("SUCCESS")), SongStatus::Failed);
        assert_eq!(SongStatus::from_webhook_status(None), SongStatus::Failed);
    }

    #[test]
    fn test_settle_only_once() {
        let mut record = SongRecord::pending(1, sample(), Some("42".to_string()));
        assert_eq!(record.status, SongStatus::Pending);

        let now = Utc::now();
        assert!(record.settle(SongStatus::Confirmed, Some("TX1".to_string()), now));
        assert_eq!(record.status, SongStatus::Confirmed);
        assert_eq!(record.transaction_id.as_deref(), Some("TX1"));

        // Second settlement is ignored
        assert!(!record.settle(SongStatus::Failed, Some("TX2".to_string()), now));
        assert_eq!(record.status, SongStatus::Confirmed);
        assert_eq!(record.transaction_id.as_deref(), Some("TX1"));
    }

    #[test]
    fn test_settle_rejects_pending_target() {
        let mut record = SongRecord::pending(1, sample(), None);
        assert!(!record.settle(SongStatus::Pending, None, Utc::now()));
        assert!(record.settled_at.is_none());
    }

    #[test]
    fn test_validate_owner_length() {
        let good = "B".repeat(58);
        assert_eq!(validate_owner(Some(&good)).unwrap(), good);
        assert!(validate_owner(Some(&"B".repeat(57))).is_err());
        assert!(validate_owner(Some(&"B".repeat(59))).is_err());
        assert!(validate_owner(Some("")).is_err());
        assert!(validate_owner(None).is_err());
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price(Some("25")).unwrap(), 25);
        assert_eq!(parse_price(Some(" 7 ")).unwrap(), 7);
        assert!(parse_price(Some("-3")).is_err());
        assert!(parse_price(Some("1.5")).is_err());
        assert!(parse_price(Some("abc")).is_err());
        assert!(parse_price(None).is_err());
    }

    #[test]
    fn test_timestamp_format() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        assert_eq!(format_timestamp(&ts), "2024-05-06T07:08:09.000000Z");
    }

    #[test]
    fn test_record_serializes_lowercase_status() {
        let record = SongRecord::pending(3, sample(), None);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["id"], 3);
        assert_eq!(json["timestamp"], "2023-11-14T22:13:20.000000Z");
        assert!(json["transaction_id"].is_null());
    }
}
