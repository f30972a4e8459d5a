// Filesystem-backed record store: one JSON file per event, keyed by id.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{EventSink, SinkError};
use crate::model::{StatusEvent, StoredRecord};

#[derive(Debug, Clone)]
pub struct FsRecordStore {
    dir: PathBuf,
}

impl FsRecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Persist `event` as `<dir>/<id>.json`.
    ///
    /// Written to a temporary file and renamed into place, so readers never
    /// observe a partial record. Storing the same id again overwrites.
    pub async fn put(&self, event: &StatusEvent) -> Result<StoredRecord, SinkError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| SinkError::Io { path, source }
        };

        fs::create_dir_all(&self.dir).await.map_err(io_err(&self.dir))?;

        let record = StoredRecord::new(event.clone());
        let bytes = serde_json::to_vec_pretty(&record)?;

        let path = self.record_path(event.id());
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes).await.map_err(io_err(&tmp))?;
        fs::rename(&tmp, &path).await.map_err(io_err(&path))?;

        debug!(path = %path.display(), "record stored");
        Ok(record)
    }

    /// Load one record by event id.
    pub async fn get(&self, id: Uuid) -> Result<Option<StoredRecord>, SinkError> {
        let path = self.record_path(id);
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(SinkError::Io { path, source }),
        }
    }

    /// Every stored record, oldest first. Unreadable files are skipped.
    pub async fn records(&self) -> Result<Vec<StoredRecord>, SinkError> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(SinkError::Io {
                    path: self.dir.clone(),
                    source,
                });
            }
        };

        let mut records = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(source) => {
                    return Err(SinkError::Io {
                        path: self.dir.clone(),
                        source,
                    });
                }
            };
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let parsed = fs::read(&path)
                .await
                .map_err(|e| e.to_string())
                .and_then(|bytes| {
                    serde_json::from_slice::<StoredRecord>(&bytes).map_err(|e| e.to_string())
                });
            match parsed {
                Ok(record) => records.push(record),
                Err(reason) => warn!(path = %path.display(), %reason, "skipping unreadable record"),
            }
        }

        records.sort_by_key(|r| r.stored_at);
        Ok(records)
    }
}

#[async_trait]
impl EventSink for FsRecordStore {
    async fn deliver(&self, event: &StatusEvent) -> Result<(), SinkError> {
        self.put(event).await.map(|_| ())
    }
}
