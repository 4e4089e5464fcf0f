//! Pipeline stage tracking
//!
//! Every posting id sits in at most one of three sets:
//!
//! 1. **found**: the id was seen on a listing page and nothing else was done
//! 2. **downloaded**: the raw posting JSON is stored locally
//! 3. **exported**: the normalized record was handed to the record sink
//!
//! Transitions are lenient: adding is idempotent and removing an id that is
//! not there is a no-op. They never leave an id in two sets. Persistence is
//! explicit through [`StageTracker::save`] so callers choose how often to pay
//! for a durable write.

pub mod snapshot;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::error::Result;
pub use snapshot::{JsonFileStore, MemoryStore, SnapshotStore, StageSnapshot, SNAPSHOT_FORMAT_VERSION};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Found,
    Downloaded,
    Exported,
}

impl Stage {
    pub fn as_str(&self) -> &str {
        match self {
            Stage::Found => "found",
            Stage::Downloaded => "downloaded",
            Stage::Exported => "exported",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three disjoint id sets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageSet {
    found: BTreeSet<String>,
    downloaded: BTreeSet<String>,
    exported: BTreeSet<String>,
}

impl StageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a snapshot, repairing overlaps in favour of the later stage
    pub fn from_snapshot(snapshot: StageSnapshot) -> Self {
        let StageSnapshot {
            mut found,
            mut downloaded,
            exported,
            ..
        } = snapshot;

        let stale_downloaded = downloaded.intersection(&exported).count();
        downloaded.retain(|id| !exported.contains(id));

        let before = found.len();
        found.retain(|id| !downloaded.contains(id) && !exported.contains(id));
        let stale_found = before - found.len();

        if stale_downloaded + stale_found > 0 {
            warn!(
                stale_found,
                stale_downloaded,
                "Stage snapshot had ids in several stages, kept the latest stage"
            );
        }

        Self {
            found,
            downloaded,
            exported,
        }
    }

    pub fn to_snapshot(&self) -> StageSnapshot {
        StageSnapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            saved_at: Utc::now(),
            found: self.found.clone(),
            downloaded: self.downloaded.clone(),
            exported: self.exported.clone(),
        }
    }

    pub fn stage_of(&self, id: &str) -> Option<Stage> {
        if self.exported.contains(id) {
            Some(Stage::Exported)
        } else if self.downloaded.contains(id) {
            Some(Stage::Downloaded)
        } else if self.found.contains(id) {
            Some(Stage::Found)
        } else {
            None
        }
    }

    pub fn ids(&self, stage: Stage) -> &BTreeSet<String> {
        match stage {
            Stage::Found => &self.found,
            Stage::Downloaded => &self.downloaded,
            Stage::Exported => &self.exported,
        }
    }

    pub fn len(&self) -> usize {
        self.found.len() + self.downloaded.len() + self.exported.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unknown -> found. Ids already further along are left in place.
    pub fn mark_found(&mut self, id: &str) -> bool {
        if self.downloaded.contains(id) || self.exported.contains(id) {
            return false;
        }
        self.found.insert(id.to_string())
    }

    /// Found -> downloaded. Exported ids stay exported.
    pub fn mark_downloaded(&mut self, id: &str) -> bool {
        if self.exported.contains(id) {
            return false;
        }
        self.found.remove(id);
        self.downloaded.insert(id.to_string())
    }

    /// Downloaded -> exported
    pub fn mark_exported(&mut self, id: &str) -> bool {
        self.downloaded.remove(id);
        self.found.remove(id);
        self.exported.insert(id.to_string())
    }
}

/// Stage counts for reporting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCounts {
    pub found: usize,
    pub downloaded: usize,
    pub exported: usize,
}

/// [`StageSet`] bound to the store it is loaded from and saved to
pub struct StageTracker {
    stages: StageSet,
    store: Box<dyn SnapshotStore>,
    unsaved: usize,
}

impl StageTracker {
    /// Load the current snapshot, starting empty if none was saved yet
    pub fn open(store: impl SnapshotStore + 'static) -> Result<Self> {
        let stages = match store.load()? {
            Some(snapshot) => StageSet::from_snapshot(snapshot),
            None => {
                info!("No stage snapshot found, starting with empty stages");
                StageSet::new()
            }
        };

        let tracker = Self {
            stages,
            store: Box::new(store),
            unsaved: 0,
        };
        let counts = tracker.counts();
        debug!(
            found = counts.found,
            downloaded = counts.downloaded,
            exported = counts.exported,
            "Stage tracker ready"
        );
        Ok(tracker)
    }

    /// Reload from the store, discarding unsaved transitions
    pub fn load(&mut self) -> Result<()> {
        self.stages = self
            .store
            .load()?
            .map(StageSet::from_snapshot)
            .unwrap_or_default();
        self.unsaved = 0;
        Ok(())
    }

    pub fn save(&mut self) -> Result<()> {
        self.store.save(&self.stages.to_snapshot())?;
        self.unsaved = 0;
        Ok(())
    }

    /// Save only once `every` transitions have accumulated
    pub fn save_if_due(&mut self, every: usize) -> Result<bool> {
        if self.unsaved >= every.max(1) {
            self.save()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Transitions applied since the last save or load
    pub fn unsaved(&self) -> usize {
        self.unsaved
    }

    pub fn mark_found(&mut self, id: &str) -> bool {
        let changed = self.stages.mark_found(id);
        self.record(changed)
    }

    pub fn mark_downloaded(&mut self, id: &str) -> bool {
        let changed = self.stages.mark_downloaded(id);
        self.record(changed)
    }

    pub fn mark_exported(&mut self, id: &str) -> bool {
        let changed = self.stages.mark_exported(id);
        self.record(changed)
    }

    fn record(&mut self, changed: bool) -> bool {
        if changed {
            self.unsaved += 1;
        }
        changed
    }

    pub fn stage_of(&self, id: &str) -> Option<Stage> {
        self.stages.stage_of(id)
    }

    pub fn is_tracked(&self, id: &str) -> bool {
        self.stage_of(id).is_some()
    }

    /// Snapshot of the ids currently in `stage`, in sorted order
    pub fn ids_in(&self, stage: Stage) -> Vec<String> {
        self.stages.ids(stage).iter().cloned().collect()
    }

    pub fn stages(&self) -> &StageSet {
        &self.stages
    }

    pub fn counts(&self) -> StageCounts {
        StageCounts {
            found: self.stages.found.len(),
            downloaded: self.stages.downloaded.len(),
            exported: self.stages.exported.len(),
        }
    }
}

impl std::fmt::Debug for StageTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageTracker")
            .field("counts", &self.counts())
            .field("unsaved", &self.unsaved)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn assert_disjoint(stages: &StageSet) {
        for id in stages.ids(Stage::Downloaded) {
            assert!(!stages.ids(Stage::Found).contains(id));
        }
        for id in stages.ids(Stage::Exported) {
            assert!(!stages.ids(Stage::Downloaded).contains(id));
            assert!(!stages.ids(Stage::Found).contains(id));
        }
    }

    #[test]
    fn test_found_then_downloaded() {
        let mut stages = StageSet::new();
        assert!(stages.mark_found("x"));
        assert!(stages.mark_downloaded("x"));

        assert!(stages.ids(Stage::Downloaded).contains("x"));
        assert!(!stages.ids(Stage::Found).contains("x"));
        assert_eq!(stages.stage_of("x"), Some(Stage::Downloaded));
    }

    #[test]
    fn test_downloaded_without_found_is_lenient() {
        let mut stages = StageSet::new();
        stages.mark_found("other");
        assert!(stages.mark_downloaded("x"));

        assert!(stages.ids(Stage::Downloaded).contains("x"));
        assert_eq!(stages.ids(Stage::Found).len(), 1);
        assert!(stages.ids(Stage::Found).contains("other"));
    }

    #[test]
    fn test_full_lifecycle() {
        let mut stages = StageSet::new();
        stages.mark_found("x");
        stages.mark_downloaded("x");
        assert!(stages.mark_exported("x"));

        assert_eq!(stages.stage_of("x"), Some(Stage::Exported));
        assert_eq!(stages.len(), 1);
        assert_disjoint(&stages);
    }

    #[test]
    fn test_mark_found_is_idempotent() {
        let mut stages = StageSet::new();
        assert!(stages.mark_found("x"));
        assert!(!stages.mark_found("x"));
        assert_eq!(stages.len(), 1);
    }

    #[test]
    fn test_rediscovery_does_not_regress() {
        let mut stages = StageSet::new();
        stages.mark_found("d");
        stages.mark_downloaded("d");
        stages.mark_found("e");
        stages.mark_downloaded("e");
        stages.mark_exported("e");

        assert!(!stages.mark_found("d"));
        assert!(!stages.mark_found("e"));
        assert!(!stages.mark_downloaded("e"));

        assert_eq!(stages.stage_of("d"), Some(Stage::Downloaded));
        assert_eq!(stages.stage_of("e"), Some(Stage::Exported));
        assert_disjoint(&stages);
    }

    #[test]
    fn test_export_from_found_keeps_sets_disjoint() {
        let mut stages = StageSet::new();
        stages.mark_found("x");
        stages.mark_exported("x");
        assert_eq!(stages.stage_of("x"), Some(Stage::Exported));
        assert_disjoint(&stages);
    }

    #[test]
    fn test_overlapping_snapshot_is_repaired() {
        let mut snapshot = StageSnapshot::empty();
        snapshot.found = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        snapshot.downloaded = ["b", "c"].iter().map(|s| s.to_string()).collect();
        snapshot.exported = ["c"].iter().map(|s| s.to_string()).collect();

        let stages = StageSet::from_snapshot(snapshot);
        assert_eq!(stages.stage_of("a"), Some(Stage::Found));
        assert_eq!(stages.stage_of("b"), Some(Stage::Downloaded));
        assert_eq!(stages.stage_of("c"), Some(Stage::Exported));
        assert_eq!(stages.len(), 3);
        assert_disjoint(&stages);
    }

    #[test]
    fn test_tracker_save_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stages.json");

        let mut tracker = StageTracker::open(JsonFileStore::new(&path)).unwrap();
        tracker.mark_found("a");
        tracker.mark_found("b");
        tracker.mark_downloaded("b");
        tracker.mark_found("c");
        tracker.mark_downloaded("c");
        tracker.mark_exported("c");
        tracker.save().unwrap();

        let reopened = StageTracker::open(JsonFileStore::new(&path)).unwrap();
        assert_eq!(reopened.stages(), tracker.stages());
        assert_eq!(
            reopened.counts(),
            StageCounts { found: 1, downloaded: 1, exported: 1 }
        );
    }

    #[test]
    fn test_transitions_are_not_persisted_until_save() {
        let store = Arc::new(MemoryStore::new());
        let mut tracker = StageTracker::open(store.clone()).unwrap();

        tracker.mark_found("a");
        assert_eq!(tracker.unsaved(), 1);
        assert!(store.current().is_none());

        tracker.save().unwrap();
        assert_eq!(tracker.unsaved(), 0);
        assert!(store.current().unwrap().found.contains("a"));
    }

    #[test]
    fn test_load_discards_unsaved_transitions() {
        let store = Arc::new(MemoryStore::new());
        let mut tracker = StageTracker::open(store.clone()).unwrap();
        tracker.mark_found("kept");
        tracker.save().unwrap();

        tracker.mark_found("dropped");
        tracker.load().unwrap();

        assert!(tracker.is_tracked("kept"));
        assert!(!tracker.is_tracked("dropped"));
    }

    #[test]
    fn test_save_if_due() {
        let store = Arc::new(MemoryStore::new());
        let mut tracker = StageTracker::open(store.clone()).unwrap();

        tracker.mark_found("a");
        assert!(!tracker.save_if_due(2).unwrap());
        tracker.mark_found("a");
        assert!(!tracker.save_if_due(2).unwrap());
        tracker.mark_found("b");
        assert!(tracker.save_if_due(2).unwrap());
        assert_eq!(store.current().unwrap().found.len(), 2);
    }
}
