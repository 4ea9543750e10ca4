//! Per-request storage of forecast artifacts

use crate::error::{Result, ServiceError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

const MAX_SESSION_ID_LEN: usize = 64;
const META_FILE: &str = "meta.json";
const CHART_FILE: &str = "chart.svg";
const TABLE_FILE: &str = "combined.csv";
const SESSIONS_DIR: &str = "sessions";

/// Artifacts of one forecast request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRecord {
    pub request_id: Uuid,
    pub session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub chart_media_type: String,
    pub chart: Vec<u8>,
    pub combined_table: Vec<u8>,
}

/// Session ids become file names, so they are restricted to
/// `[A-Za-z0-9_-]` and at most 64 characters
pub fn validate_session_id(session_id: &str) -> Result<()> {
    let valid = !session_id.is_empty()
        && session_id.len() <= MAX_SESSION_ID_LEN
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ServiceError::validation(
            "session_id",
            format!(
                "must be 1-{} characters of letters, digits, '-' or '_'",
                MAX_SESSION_ID_LEN
            ),
        ))
    }
}

/// Request-scoped artifact cache
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn put(&self, record: ArtifactRecord) -> Result<()>;

    async fn get(&self, request_id: Uuid) -> Result<Option<ArtifactRecord>>;

    /// Most recently created record stored under `session_id`
    async fn latest_for_session(&self, session_id: &str) -> Result<Option<ArtifactRecord>>;
}

/// Process-local store
#[derive(Default)]
pub struct MemoryArtifactStore {
    records: DashMap<Uuid, Arc<ArtifactRecord>>,
    sessions: DashMap<String, (DateTime<Utc>, Uuid)>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn put(&self, record: ArtifactRecord) -> Result<()> {
        if let Some(session_id) = &record.session_id {
            validate_session_id(session_id)?;
            let entry = (record.created_at, record.request_id);
            self.sessions
                .entry(session_id.clone())
                .and_modify(|latest| {
                    if entry.0 >= latest.0 {
                        *latest = entry;
                    }
                })
                .or_insert(entry);
        }
        self.records.insert(record.request_id, Arc::new(record));
        Ok(())
    }

    async fn get(&self, request_id: Uuid) -> Result<Option<ArtifactRecord>> {
        Ok(self
            .records
            .get(&request_id)
            .map(|record| record.value().as_ref().clone()))
    }

    async fn latest_for_session(&self, session_id: &str) -> Result<Option<ArtifactRecord>> {
        let request_id = match self.sessions.get(session_id) {
            Some(entry) => entry.value().1,
            None => return Ok(None),
        };
        self.get(request_id).await
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RecordMeta {
    request_id: Uuid,
    session_id: Option<String>,
    created_at: DateTime<Utc>,
    chart_media_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionPointer {
    request_id: Uuid,
    created_at: DateTime<Utc>,
}

/// Store keeping one directory per request under `root`, so artifacts
/// survive across processes
pub struct DirArtifactStore {
    root: PathBuf,
    // Held across the read-compare-write of a session pointer
    pointer_lock: Mutex<()>,
}

impl DirArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            pointer_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_dir(&self, request_id: Uuid) -> PathBuf {
        self.root.join(request_id.to_string())
    }

    fn session_pointer(&self, session_id: &str) -> PathBuf {
        self.root.join(SESSIONS_DIR).join(format!("{}.json", session_id))
    }

    async fn read_pointer(&self, session_id: &str) -> Result<Option<SessionPointer>> {
        match tokio::fs::read(self.session_pointer(session_id)).await {
            Ok(bytes) => Ok(Some(decode(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn decode<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes)
        .map_err(|e| ServiceError::Internal(format!("Corrupt artifact metadata: {}", e)))
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(value).map_err(|e| ServiceError::Internal(e.to_string()))
}

/// Write through a temporary sibling and rename into place
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl ArtifactStore for DirArtifactStore {
    async fn put(&self, record: ArtifactRecord) -> Result<()> {
        if let Some(session_id) = &record.session_id {
            validate_session_id(session_id)?;
        }

        let dir = self.record_dir(record.request_id);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(CHART_FILE), &record.chart).await?;
        tokio::fs::write(dir.join(TABLE_FILE), &record.combined_table).await?;

        let meta = RecordMeta {
            request_id: record.request_id,
            session_id: record.session_id.clone(),
            created_at: record.created_at,
            chart_media_type: record.chart_media_type.clone(),
        };
        write_atomic(&dir.join(META_FILE), &encode(&meta)?).await?;

        if let Some(session_id) = &record.session_id {
            tokio::fs::create_dir_all(self.root.join(SESSIONS_DIR)).await?;
            let _guard = self.pointer_lock.lock().await;
            let newer = self
                .read_pointer(session_id)
                .await?
                .map_or(true, |current| record.created_at >= current.created_at);
            if newer {
                let pointer = SessionPointer {
                    request_id: record.request_id,
                    created_at: record.created_at,
                };
                write_atomic(&self.session_pointer(session_id), &encode(&pointer)?).await?;
            }
        }
        Ok(())
    }

    async fn get(&self, request_id: Uuid) -> Result<Option<ArtifactRecord>> {
        let dir = self.record_dir(request_id);
        let meta_bytes = match tokio::fs::read(dir.join(META_FILE)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let meta: RecordMeta = decode(&meta_bytes)?;

        Ok(Some(ArtifactRecord {
            request_id: meta.request_id,
            session_id: meta.session_id,
            created_at: meta.created_at,
            chart_media_type: meta.chart_media_type,
            chart: tokio::fs::read(dir.join(CHART_FILE)).await?,
            combined_table: tokio::fs::read(dir.join(TABLE_FILE)).await?,
        }))
    }

    async fn latest_for_session(&self, session_id: &str) -> Result<Option<ArtifactRecord>> {
        validate_session_id(session_id)?;
        match self.read_pointer(session_id).await? {
            Some(pointer) => self.get(pointer.request_id).await,
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rstest::rstest;

    fn record(session: Option<&str>, created_at: DateTime<Utc>, table: &str) -> ArtifactRecord {
        ArtifactRecord {
            request_id: Uuid::new_v4(),
            session_id: session.map(str::to_string),
            created_at,
            chart_media_type: "image/svg+xml".to_string(),
            chart: b"<svg/>".to_vec(),
            combined_table: table.as_bytes().to_vec(),
        }
    }

    #[rstest]
    #[case("abc-123_X", true)]
    #[case("", false)]
    #[case("../etc", false)]
    #[case("a b", false)]
    fn test_session_id_rules(#[case] id: &str, #[case] ok: bool) {
        assert_eq!(validate_session_id(id).is_ok(), ok);
    }

    #[tokio::test]
    async fn test_memory_store_latest_wins() {
        let store = MemoryArtifactStore::new();
        let now = Utc::now();
        let older = record(Some("s1"), now - Duration::seconds(5), "old");
        let newer = record(Some("s1"), now, "new");

        store.put(newer.clone()).await.unwrap();
        store.put(older.clone()).await.unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.latest_for_session("s1").await.unwrap(), Some(newer));
        assert_eq!(store.get(older.request_id).await.unwrap(), Some(older));
        assert_eq!(store.latest_for_session("s2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_dir_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirArtifactStore::new(dir.path());
        let first = record(Some("desk"), Utc::now() - Duration::seconds(1), "a,b,kind\n");
        let second = record(Some("desk"), Utc::now(), "c,d,kind\n");

        store.put(first.clone()).await.unwrap();
        store.put(second.clone()).await.unwrap();

        assert_eq!(store.get(first.request_id).await.unwrap(), Some(first));
        assert_eq!(
            store.latest_for_session("desk").await.unwrap(),
            Some(second.clone())
        );

        let reopened = DirArtifactStore::new(dir.path());
        assert_eq!(reopened.get(second.request_id).await.unwrap(), Some(second));
        assert_eq!(reopened.get(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_dir_store_concurrent_puts_keep_newest() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(DirArtifactStore::new(dir.path()));
        let now = Utc::now();

        for round in 0..5 {
            let session = format!("desk{}", round);
            let records: Vec<ArtifactRecord> = (0..8)
                .map(|i| record(Some(&session), now - Duration::seconds(i), &format!("t{}", i)))
                .collect();
            let newest = records[0].clone();

            let tasks: Vec<_> = records
                .into_iter()
                .map(|r| {
                    let store = Arc::clone(&store);
                    tokio::spawn(async move { store.put(r).await })
                })
                .collect();
            for task in tasks {
                task.await.unwrap().unwrap();
            }

            assert_eq!(
                store.latest_for_session(&session).await.unwrap(),
                Some(newest)
            );
        }
    }
}
