//! Durable stage snapshots
//!
//! A snapshot is a versioned JSON document holding the three id sets:
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "saved_at": "2024-05-20T10:00:00Z",
//!   "found": ["ab12cd34"],
//!   "downloaded": [],
//!   "exported": ["zz99yy88"]
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

use crate::error::{IngestError, Result};

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSnapshot {
    pub format_version: u32,
    pub saved_at: DateTime<Utc>,
    #[serde(default)]
    pub found: BTreeSet<String>,
    #[serde(default)]
    pub downloaded: BTreeSet<String>,
    #[serde(default)]
    pub exported: BTreeSet<String>,
}

impl StageSnapshot {
    pub fn empty() -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            saved_at: Utc::now(),
            found: BTreeSet::new(),
            downloaded: BTreeSet::new(),
            exported: BTreeSet::new(),
        }
    }

    pub fn check_version(&self) -> Result<()> {
        if self.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(IngestError::SnapshotVersion {
                found: self.format_version,
                expected: SNAPSHOT_FORMAT_VERSION,
            });
        }
        Ok(())
    }
}

/// Where stage snapshots are persisted
pub trait SnapshotStore: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet
    fn load(&self) -> Result<Option<StageSnapshot>>;

    fn save(&self, snapshot: &StageSnapshot) -> Result<()>;
}

/// Snapshot stored as a pretty-printed JSON file
///
/// Writes go to a sibling temp file which is then renamed over the target,
/// so a crash mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "stages.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Result<Option<StageSnapshot>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let snapshot: StageSnapshot = serde_json::from_str(&content)?;
        snapshot.check_version()?;
        debug!(path = %self.path.display(), "Loaded stage snapshot");
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &StageSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let temp = self.temp_path();
        std::fs::write(&temp, serde_json::to_string_pretty(snapshot)?)?;
        std::fs::rename(&temp, &self.path)?;

        debug!(path = %self.path.display(), "Saved stage snapshot");
        Ok(())
    }
}

/// In-memory store, mainly for tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshot: Mutex<Option<StageSnapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: StageSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(Some(snapshot)),
        }
    }

    pub fn current(&self) -> Option<StageSnapshot> {
        self.snapshot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Option<StageSnapshot>> {
        let snapshot = self.current();
        if let Some(ref snapshot) = snapshot {
            snapshot.check_version()?;
        }
        Ok(snapshot)
    }

    fn save(&self, snapshot: &StageSnapshot) -> Result<()> {
        *self
            .snapshot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(snapshot.clone());
        Ok(())
    }
}

impl<S: SnapshotStore + ?Sized> SnapshotStore for std::sync::Arc<S> {
    fn load(&self) -> Result<Option<StageSnapshot>> {
        (**self).load()
    }

    fn save(&self, snapshot: &StageSnapshot) -> Result<()> {
        (**self).save(snapshot)
    }
}
