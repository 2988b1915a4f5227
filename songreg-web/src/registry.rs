//! In-memory song registry
//!
//! Volatile storage: records live for the lifetime of the process. Records are
//! appended on registration, settled at most once by a webhook, and never
//! removed.

use chrono::{DateTime, Utc};
use songreg_common::models::{NewSong, SongRecord, SongStatus};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Outcome of applying a webhook to the registry
#[derive(Debug, Clone)]
pub enum SettleResult {
    /// Record moved from pending to the given status
    Settled(SongRecord),
    /// Record was already settled; nothing changed
    AlreadySettled(SongStatus),
    /// No record with that tracking ID
    Unknown,
}

/// Tracking IDs issued during the most recent second
#[derive(Debug, Default)]
struct IssuedIds {
    second: i64,
    count: u32,
}

/// Shared song registry
///
/// Cloning is cheap; all clones see the same records.
#[derive(Clone, Default)]
pub struct SongRegistry {
    songs: Arc<RwLock<Vec<SongRecord>>>,
    issued: Arc<Mutex<IssuedIds>>,
}

impl SongRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a unique tracking ID for a submission at `now`
    ///
    /// `song_<unix-seconds>`, with `_<n>` appended for the second and later
    /// IDs issued within the same second. IDs are reserved even if the BaaS
    /// later rejects the submission. Only the current second is tracked.
    pub async fn allocate_data_id(&self, now: DateTime<Utc>) -> String {
        let second = now.timestamp();
        let mut issued = self.issued.lock().await;

        if issued.second != second {
            *issued = IssuedIds { second, count: 0 };
        }
        let n = issued.count;
        issued.count += 1;

        if n == 0 {
            format!("song_{}", second)
        } else {
            format!("song_{}_{}", second, n)
        }
    }

    /// Append a pending record and return it
    pub async fn register(&self, song: NewSong, baas_task_id: Option<String>) -> SongRecord {
        let mut songs = self.songs.write().await;
        let record = SongRecord::pending(songs.len() as u64 + 1, song, baas_task_id);
        songs.push(record.clone());
        record
    }

    /// All records in registration order
    pub async fn list(&self) -> Vec<SongRecord> {
        self.songs.read().await.clone()
    }

    pub async fn get(&self, data_id: &str) -> Option<SongRecord> {
        self.songs
            .read()
            .await
            .iter()
            .find(|song| song.data_id == data_id)
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.songs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.songs.read().await.is_empty()
    }

    /// Settle the record with `data_id` to `status`
    pub async fn settle(
        &self,
        data_id: &str,
        status: SongStatus,
        transaction_id: Option<String>,
        at: DateTime<Utc>,
    ) -> SettleResult {
        let mut songs = self.songs.write().await;
        let Some(record) = songs.iter_mut().find(|song| song.data_id == data_id) else {
            return SettleResult::Unknown;
        };

        if record.settle(status, transaction_id, at) {
            SettleResult::Settled(record.clone())
        } else {
            SettleResult::AlreadySettled(record.status)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn new_song(data_id: &str) -> NewSong {
        NewSong {
            data_id: data_id.to_string(),
            title: "Song".to_string(),
            url: "https://example.com/s.mp3".to_string(),
            price: 5,
            owner: "O".repeat(58),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_data_ids_unique_within_second() {
        let registry = SongRegistry::new();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let ts = now.timestamp();

        assert_eq!(registry.allocate_data_id(now).await, format!("song_{}", ts));
        assert_eq!(registry.allocate_data_id(now).await, format!("song_{}_1", ts));
        assert_eq!(registry.allocate_data_id(now).await, format!("song_{}_2", ts));

        let later = now + chrono::Duration::seconds(1);
        assert_eq!(registry.allocate_data_id(later).await, format!("song_{}", ts + 1));
        assert_eq!(registry.allocate_data_id(later).await, format!("song_{}_1", ts + 1));
    }

    #[tokio::test]
    async fn test_new_second_resets_issued_ids() {
        let registry = SongRegistry::new();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        for _ in 0..5 {
            registry.allocate_data_id(now).await;
        }

        let later = now + chrono::Duration::seconds(1);
        registry.allocate_data_id(later).await;

        let issued = registry.issued.lock().await;
        assert_eq!(issued.second, later.timestamp());
        assert_eq!(issued.count, 1);
    }

    #[tokio::test]
    async fn test_register_assigns_sequential_ids() {
        let registry = SongRegistry::new();
        assert!(registry.is_empty().await);

        let first = registry.register(new_song("song_1"), Some("t1".to_string())).await;
        let second = registry.register(new_song("song_2"), None).await;

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.status, SongStatus::Pending);
        assert_eq!(first.baas_task_id.as_deref(), Some("t1"));

        let all = registry.list().await;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].data_id, "song_1");
        assert_eq!(all[1].data_id, "song_2");
    }

    #[tokio::test]
    async fn test_settle_transitions_once() {
        let registry = SongRegistry::new();
        registry.register(new_song("song_1"), None).await;

        match registry
            .settle("song_1", SongStatus::Confirmed, Some("TX".to_string()), Utc::now())
            .await
        {
            SettleResult::Settled(record) => {
                assert_eq!(record.status, SongStatus::Confirmed);
                assert_eq!(record.transaction_id.as_deref(), Some("TX"));
            }
            other => panic!("expected Settled, got {:?}", other),
        }

        assert!(matches!(
            registry
                .settle("song_1", SongStatus::Failed, None, Utc::now())
                .await,
            SettleResult::AlreadySettled(SongStatus::Confirmed)
        ));

        let stored = registry.get("song_1").await.unwrap();
        assert_eq!(stored.status, SongStatus::Confirmed);
        assert_eq!(stored.transaction_id.as_deref(), Some("TX"));
    }

    #[tokio::test]
    async fn test_settle_unknown_id() {
        let registry = SongRegistry::new();
        assert!(matches!(
            registry
                .settle("missing", SongStatus::Confirmed, None, Utc::now())
                .await,
            SettleResult::Unknown
        ));
        assert!(registry.get("missing").await.is_none());
        assert_eq!(registry.len().await, 0);
    }
}
