//! Spill-to-disk fallback
//!
//! When delivery keeps failing, payloads are written as pretty-printed JSON
//! files, one per record, for later replay. Files are never overwritten:
//! names carry the wall-clock time plus a sequence number, and creation uses
//! `create_new` so a name collision moves on to the next sequence number.
//!
//! ```text
//! failed_data_20250301_142501_387_0.json
//!             └─ date ┘└ time ┘└ms┘ └ seq
//! ```

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::TelemetryPayload;

/// Name collisions tolerated before giving up on one write
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Spill write failed; the record is lost
#[derive(Debug, Error)]
pub enum SpillWriteError {
    /// Filesystem error
    #[error("Failed to write spill file {path}: {source}")]
    Io {
        /// File or directory being written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Payload could not be encoded
    #[error("Failed to encode spill record: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Every candidate name already existed
    #[error("No free spill file name in {0}")]
    NamesExhausted(PathBuf),

    /// Blocking write task panicked or was cancelled
    #[error("Spill task failed: {0}")]
    Task(String),
}

/// Directory of write-once spill files
///
/// Clones share the sequence counter, so a clone can be handed to a
/// blocking worker without reusing names.
#[derive(Debug, Clone)]
pub struct SpillStore {
    dir: PathBuf,
    next_seq: Arc<AtomicU64>,
}

impl SpillStore {
    /// Store rooted at `dir`; the directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            next_seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Spill directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write one payload, named after the current time
    pub fn write(&self, payload: &TelemetryPayload) -> Result<PathBuf, SpillWriteError> {
        self.write_at(payload, Utc::now())
    }

    /// Write one payload, named after `now`
    pub fn write_at(
        &self,
        payload: &TelemetryPayload,
        now: DateTime<Utc>,
    ) -> Result<PathBuf, SpillWriteError> {
        let body = serde_json::to_vec_pretty(payload)?;

        fs::create_dir_all(&self.dir).map_err(|source| SpillWriteError::Io {
            path: self.dir.clone(),
            source,
        })?;

        for _ in 0..MAX_NAME_ATTEMPTS {
            let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
            let path = self.dir.join(file_name(now, seq));

            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    log::debug!("Spill file {} exists, trying next sequence", path.display());
                    continue;
                }
                Err(source) => return Err(SpillWriteError::Io { path, source }),
            };

            if let Err(source) = file.write_all(&body).and_then(|_| file.sync_all()) {
                return Err(SpillWriteError::Io { path, source });
            }
            return Ok(path);
        }

        Err(SpillWriteError::NamesExhausted(self.dir.clone()))
    }
}

fn file_name(now: DateTime<Utc>, seq: u64) -> String {
    format!(
        "failed_data_{}_{:03}_{}.json",
        now.format("%Y%m%d_%H%M%S"),
        now.timestamp_subsec_millis(),
        seq
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn payload() -> TelemetryPayload {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 14, 25, 1).unwrap();
        TelemetryPayload {
            id: Uuid::new_v4(),
            timestamp: at,
            device_id: "AIRIS_HOME_001".into(),
            co2: Some(640.0),
            pm25: Some(0.02),
            co: Some(3.5),
            temperature: Some(22.1),
            humidity: Some(48.0),
            created_at: at,
            alert_level: airis_core::AlertLevel::Normal,
            location: Some("Living Room".into()),
        }
    }

    fn instant() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_740_839_101_387).unwrap()
    }

    #[test]
    fn name_format() {
        assert_eq!(file_name(instant(), 4), "failed_data_20250301_142501_387_4.json");
    }

    #[test]
    fn writes_pretty_json_matching_payload() {
        let dir = tempfile::tempdir().unwrap();
        let store = SpillStore::new(dir.path().join("spill"));
        let payload = payload();

        let path = store.write_at(&payload, instant()).unwrap();
        let text = fs::read_to_string(&path).unwrap();

        assert!(text.contains('\n'));
        let back: TelemetryPayload = serde_json::from_str(&text).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn same_instant_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = SpillStore::new(dir.path());

        let first = store.write_at(&payload(), instant()).unwrap();
        let second = store.write_at(&payload(), instant()).unwrap();
        assert_ne!(first, second);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn existing_file_bumps_sequence() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(file_name(instant(), 0)), "{}").unwrap();

        let store = SpillStore::new(dir.path());
        let path = store.write_at(&payload(), instant()).unwrap();

        assert_eq!(path.file_name().unwrap(), file_name(instant(), 1).as_str());
        assert_eq!(fs::read_to_string(dir.path().join(file_name(instant(), 0))).unwrap(), "{}");
    }

    #[test]
    fn clones_never_reuse_a_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = SpillStore::new(dir.path());
        let worker = store.clone();

        let first = worker.write_at(&payload(), instant()).unwrap();
        let second = store.write_at(&payload(), instant()).unwrap();
        assert_eq!(first.file_name().unwrap(), file_name(instant(), 0).as_str());
        assert_eq!(second.file_name().unwrap(), file_name(instant(), 1).as_str());
    }

    #[test]
    fn unwritable_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();

        let store = SpillStore::new(blocker.join("spill"));
        assert!(matches!(
            store.write_at(&payload(), instant()),
            Err(SpillWriteError::Io { .. })
        ));
    }
}
