//! Pipeline orchestration
//!
//! [`Pipeline`] drives postings through the three stages:
//!
//! 1. **discover**: walk listing pages and mark new ids as found
//! 2. **download**: fetch each found posting and store the raw JSON
//! 3. **export**: normalize each downloaded posting and hand it to a sink
//!
//! A failure on one posting is logged and counted; the posting stays in its
//! current stage and is retried on the next run. Only stage snapshot I/O
//! aborts a stage.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::IngestConfig;
use crate::diagnostics::{Anomaly, Diagnostic, DiagnosticSink, TracingSink};
use crate::document::RawDocument;
use crate::error::{IngestError, Result};
use crate::normalize::RecordNormalizer;
use crate::progress::{create_progress_bar, create_spinner};
use crate::raw_store::RawStore;
use crate::sink::RecordSink;
use crate::source::{IdDiscovery, NoFluffJobsClient, PostingFetcher};
use crate::stages::{JsonFileStore, Stage, StageCounts, StageTracker};

/// Outcome counts of one stage pass
///
/// For discovery, `attempted` counts ids seen on listing pages, `skipped`
/// the ones already tracked, and `failed` the listing pages that could not
/// be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: Stage,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl StageReport {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            attempted: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
        }
    }

    fn log_summary(&self) {
        info!(
            stage = %self.stage,
            attempted = self.attempted,
            succeeded = self.succeeded,
            failed = self.failed,
            skipped = self.skipped,
            "Stage complete"
        );
    }
}

/// Reports of a full discover, download, export run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub discover: StageReport,
    pub download: StageReport,
    pub export: StageReport,
}

pub struct Pipeline {
    run_id: Uuid,
    save_every: usize,
    tracker: StageTracker,
    discovery: Box<dyn IdDiscovery>,
    fetcher: Box<dyn PostingFetcher>,
    raw_store: RawStore,
    normalizer: RecordNormalizer,
    diagnostics: Arc<dyn DiagnosticSink>,
    show_progress: bool,
}

impl Pipeline {
    pub fn new(
        config: &IngestConfig,
        tracker: StageTracker,
        discovery: Box<dyn IdDiscovery>,
        fetcher: Box<dyn PostingFetcher>,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            save_every: config.save_every,
            tracker,
            discovery,
            fetcher,
            raw_store: RawStore::new(config.raw_dir()),
            normalizer: RecordNormalizer::new(config.posting_base_url.clone()),
            diagnostics,
            show_progress: false,
        }
    }

    /// Wire the HTTP client, the snapshot file and tracing diagnostics
    pub fn from_config(config: &IngestConfig) -> Result<Self> {
        config.validate()?;
        let client = NoFluffJobsClient::new(config)?;
        let tracker = StageTracker::open(JsonFileStore::new(config.stages_path()))?;

        Ok(Self::new(
            config,
            tracker,
            Box::new(client.clone()),
            Box::new(client),
            Arc::new(TracingSink),
        ))
    }

    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn tracker(&self) -> &StageTracker {
        &self.tracker
    }

    pub fn counts(&self) -> StageCounts {
        self.tracker.counts()
    }

    pub fn raw_store(&self) -> &RawStore {
        &self.raw_store
    }

    /// Walk listing pages in order, stopping at the first empty page
    ///
    /// The snapshot is saved after every page.
    pub async fn discover(&mut self, pages: RangeInclusive<u32>) -> Result<StageReport> {
        let span = info_span!("discover", run_id = %self.run_id);
        self.discover_pages(pages).instrument(span).await
    }

    async fn discover_pages(&mut self, pages: RangeInclusive<u32>) -> Result<StageReport> {
        let mut report = StageReport::new(Stage::Found);
        let progress = create_spinner("Discovering postings", self.show_progress);

        for page in pages {
            let ids = match self.discovery.list_candidate_ids(page).await {
                Ok(ids) => ids,
                Err(e) => {
                    warn!(page, error = %e, "Listing page failed, stopping discovery");
                    report.failed += 1;
                    break;
                }
            };

            if ids.is_empty() {
                info!(page, "Empty listing page, discovery finished");
                break;
            }

            for id in &ids {
                report.attempted += 1;
                if self.tracker.mark_found(id) {
                    report.succeeded += 1;
                    progress.inc(1);
                } else {
                    report.skipped += 1;
                }
            }

            self.tracker.save()?;
            debug!(page, listed = ids.len(), "Listing page processed");
        }

        progress.finish_and_clear();
        report.log_summary();
        Ok(report)
    }

    /// Fetch found postings and store their raw JSON
    ///
    /// A posting whose raw file already exists and parses is marked
    /// downloaded without fetching it again.
    pub async fn download(&mut self, limit: Option<usize>) -> Result<StageReport> {
        let span = info_span!("download", run_id = %self.run_id);
        self.download_found(limit).instrument(span).await
    }

    async fn download_found(&mut self, limit: Option<usize>) -> Result<StageReport> {
        let mut report = StageReport::new(Stage::Downloaded);
        let ids = take_limit(self.tracker.ids_in(Stage::Found), limit);
        let progress = create_progress_bar(ids.len() as u64, "Downloading postings", self.show_progress);

        for id in ids {
            report.attempted += 1;

            if self.has_usable_copy(&id) {
                debug!(external_id = %id, "Raw posting already stored");
                self.tracker.mark_downloaded(&id);
                report.skipped += 1;
            } else {
                match self.download_one(&id).await {
                    Ok(()) => {
                        self.tracker.mark_downloaded(&id);
                        report.succeeded += 1;
                    }
                    Err(e) => {
                        warn!(external_id = %id, error = %e, "Download failed");
                        report.failed += 1;
                    }
                }
            }

            progress.inc(1);
            self.tracker.save_if_due(self.save_every)?;
        }

        self.tracker.save()?;
        progress.finish_and_clear();
        report.log_summary();
        Ok(report)
    }

    /// True when a stored copy parses; an unreadable one is deleted so the
    /// posting is fetched again
    fn has_usable_copy(&self, id: &str) -> bool {
        if !self.raw_store.contains(id) {
            return false;
        }

        match self.raw_store.read(id) {
            Ok(_) => true,
            Err(e) => {
                warn!(external_id = %id, error = %e, "Stored raw posting is unreadable, fetching again");
                if let Err(e) = self.raw_store.remove(id) {
                    warn!(external_id = %id, error = %e, "Failed to remove unreadable raw posting");
                }
                false
            }
        }
    }

    async fn download_one(&self, id: &str) -> Result<()> {
        let text = self.fetcher.fetch_raw_document(id).await?;
        // Refuse to store anything that is not JSON
        RawDocument::parse(id, &text)?;
        let path = self.raw_store.write(id, &text)?;
        debug!(external_id = %id, path = %path.display(), "Stored raw posting");
        Ok(())
    }

    /// Normalize downloaded postings and hand them to `sink`
    pub async fn export(&mut self, sink: &dyn RecordSink, limit: Option<usize>) -> Result<StageReport> {
        let span = info_span!("export", run_id = %self.run_id);
        self.export_downloaded(sink, limit).instrument(span).await
    }

    async fn export_downloaded(
        &mut self,
        sink: &dyn RecordSink,
        limit: Option<usize>,
    ) -> Result<StageReport> {
        let mut report = StageReport::new(Stage::Exported);
        let ids = take_limit(self.tracker.ids_in(Stage::Downloaded), limit);
        let progress = create_progress_bar(ids.len() as u64, "Exporting postings", self.show_progress);

        for id in ids {
            report.attempted += 1;

            match self.export_one(sink, &id).await {
                Ok(()) => {
                    self.tracker.mark_exported(&id);
                    report.succeeded += 1;
                }
                Err(e) => {
                    warn!(external_id = %id, error = %e, "Export failed");
                    report.failed += 1;
                }
            }

            progress.inc(1);
            self.tracker.save_if_due(self.save_every)?;
        }

        let finished = sink.finish().await;
        self.tracker.save()?;
        finished?;

        progress.finish_and_clear();
        report.log_summary();
        Ok(report)
    }

    async fn export_one(&self, sink: &dyn RecordSink, id: &str) -> Result<()> {
        let doc = match self.raw_store.read(id) {
            Ok(doc) => doc,
            Err(e) => {
                if matches!(e, IngestError::InvalidDocument { .. }) {
                    self.diagnostics.report(&Diagnostic::new(
                        id,
                        Anomaly::UnreadableDocument {
                            reason: e.to_string(),
                        },
                        "",
                        "Stored posting is not valid JSON",
                    ));
                }
                return Err(e);
            }
        };

        let normalized = self.normalizer.normalize(&doc);
        self.diagnostics.report_all(&normalized.diagnostics);
        sink.write(&normalized.record).await
    }

    /// Discover, download and export in order
    pub async fn run(
        &mut self,
        pages: RangeInclusive<u32>,
        limit: Option<usize>,
        sink: &dyn RecordSink,
    ) -> Result<RunReport> {
        info!(run_id = %self.run_id, "Starting pipeline run");

        let discover = self.discover(pages).await?;
        let download = self.download(limit).await?;
        let export = self.export(sink, limit).await?;

        let counts = self.counts();
        info!(
            run_id = %self.run_id,
            found = counts.found,
            downloaded = counts.downloaded,
            exported = counts.exported,
            "Pipeline run complete"
        );

        Ok(RunReport {
            discover,
            download,
            export,
        })
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("run_id", &self.run_id)
            .field("tracker", &self.tracker)
            .field("raw_store", &self.raw_store)
            .finish()
    }
}

fn take_limit(ids: Vec<String>, limit: Option<usize>) -> Vec<String> {
    match limit {
        Some(limit) => ids.into_iter().take(limit).collect(),
        None => ids,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;
    use crate::record::CanonicalRecord;
    use crate::stages::MemoryStore;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct FakeBoard {
        pages: HashMap<u32, Vec<String>>,
        postings: HashMap<String, String>,
    }

    #[async_trait]
    impl IdDiscovery for FakeBoard {
        async fn list_candidate_ids(&self, page: u32) -> Result<Vec<String>> {
            Ok(self.pages.get(&page).cloned().unwrap_or_default())
        }
    }

    #[async_trait]
    impl PostingFetcher for FakeBoard {
        async fn fetch_raw_document(&self, external_id: &str) -> Result<String> {
            self.postings
                .get(external_id)
                .cloned()
                .ok_or_else(|| IngestError::HttpStatus {
                    status: 404,
                    url: external_id.to_string(),
                })
        }
    }

    #[derive(Default)]
    struct CollectingSink {
        records: Mutex<Vec<CanonicalRecord>>,
    }

    #[async_trait]
    impl RecordSink for CollectingSink {
        async fn write(&self, record: &CanonicalRecord) -> Result<()> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    fn board() -> FakeBoard {
        let mut pages = HashMap::new();
        pages.insert(1, vec!["a1".to_string(), "b2".to_string()]);
        pages.insert(2, vec!["b2".to_string(), "c3".to_string()]);

        let mut postings = HashMap::new();
        postings.insert("a1".to_string(), r#"{"id": "a1", "title": "Rust Dev"}"#.to_string());
        postings.insert("b2".to_string(), "<html>not json</html>".to_string());
        postings.insert("c3".to_string(), r#"{"id": "c3", "company": {"size": "10-20"}}"#.to_string());

        FakeBoard { pages, postings }
    }

    fn pipeline(dir: &TempDir, store: Arc<MemoryStore>, diagnostics: Arc<MemorySink>) -> Pipeline {
        let config = IngestConfig::default().with_data_dir(dir.path()).with_save_every(1);
        let tracker = StageTracker::open(store).unwrap();
        Pipeline::new(
            &config,
            tracker,
            Box::new(board()),
            Box::new(board()),
            diagnostics,
        )
    }

    #[tokio::test]
    async fn test_discover_stops_at_empty_page() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new());
        let mut pipeline = pipeline(&dir, store.clone(), Arc::new(MemorySink::new()));

        let report = pipeline.discover(1..=10).await.unwrap();
        assert_eq!(report.attempted, 4);
        assert_eq!(report.succeeded, 3);
        assert_eq!(report.skipped, 1);
        assert_eq!(store.current().unwrap().found.len(), 3);
    }

    #[tokio::test]
    async fn test_failed_download_stays_found() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new());
        let mut pipeline = pipeline(&dir, store.clone(), Arc::new(MemorySink::new()));

        pipeline.discover(1..=2).await.unwrap();
        let report = pipeline.download(None).await.unwrap();

        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(pipeline.tracker().stage_of("b2"), Some(Stage::Found));
        assert_eq!(pipeline.tracker().stage_of("a1"), Some(Stage::Downloaded));
        assert!(!pipeline.raw_store().contains("b2"));

        let snapshot = store.current().unwrap();
        assert!(snapshot.downloaded.contains("c3"));
    }

    #[tokio::test]
    async fn test_download_limit() {
        let dir = TempDir::new().unwrap();
        let mut pipeline = pipeline(&dir, Arc::new(MemoryStore::new()), Arc::new(MemorySink::new()));

        pipeline.discover(1..=2).await.unwrap();
        let report = pipeline.download(Some(1)).await.unwrap();
        assert_eq!(report.attempted, 1);
        assert_eq!(pipeline.counts().found, 2);
    }

    #[tokio::test]
    async fn test_existing_raw_file_is_not_fetched_again() {
        let dir = TempDir::new().unwrap();
        let mut pipeline = pipeline(&dir, Arc::new(MemoryStore::new()), Arc::new(MemorySink::new()));
        pipeline.raw_store().write("b2", r#"{"id": "b2"}"#).unwrap();

        pipeline.discover(1..=2).await.unwrap();
        let report = pipeline.download(None).await.unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(pipeline.tracker().stage_of("b2"), Some(Stage::Downloaded));
    }

    #[tokio::test]
    async fn test_truncated_raw_file_is_fetched_again() {
        let dir = TempDir::new().unwrap();
        let mut pipeline = pipeline(&dir, Arc::new(MemoryStore::new()), Arc::new(MemorySink::new()));
        pipeline.raw_store().write("a1", r#"{"id": "a1", "ti"#).unwrap();

        pipeline.discover(1..=2).await.unwrap();
        let report = pipeline.download(None).await.unwrap();
        assert_eq!(report.skipped, 0);
        assert_eq!(pipeline.tracker().stage_of("a1"), Some(Stage::Downloaded));
        assert_eq!(
            pipeline.raw_store().read("a1").unwrap().str_at(&["title"]),
            Some("Rust Dev")
        );

        let sink = CollectingSink::default();
        pipeline.export(&sink, None).await.unwrap();
        assert_eq!(pipeline.tracker().stage_of("a1"), Some(Stage::Exported));
    }

    #[tokio::test]
    async fn test_run_exports_and_reports_diagnostics() {
        let dir = TempDir::new().unwrap();
        let diagnostics = Arc::new(MemorySink::new());
        let mut pipeline = pipeline(&dir, Arc::new(MemoryStore::new()), diagnostics.clone());
        let sink = CollectingSink::default();

        let report = pipeline.run(1..=5, None, &sink).await.unwrap();
        assert_eq!(report.export.succeeded, 2);

        let records = sink.records.lock().unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.external_id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "c3"]);
        assert_eq!(records[1].company_size, Some(15));

        assert_eq!(diagnostics.count_by_code("missing_salary"), 2);
        assert_eq!(pipeline.tracker().stage_of("a1"), Some(Stage::Exported));
        assert_eq!(pipeline.tracker().stage_of("b2"), Some(Stage::Found));
    }

    #[tokio::test]
    async fn test_unreadable_raw_file_stays_downloaded() {
        let dir = TempDir::new().unwrap();
        let diagnostics = Arc::new(MemorySink::new());
        let store = Arc::new(MemoryStore::new());
        let mut tracker = StageTracker::open(store.clone()).unwrap();
        tracker.mark_downloaded("zz99");
        tracker.save().unwrap();

        let config = IngestConfig::default().with_data_dir(dir.path());
        let mut pipeline = Pipeline::new(
            &config,
            StageTracker::open(store).unwrap(),
            Box::new(board()),
            Box::new(board()),
            diagnostics.clone(),
        );
        pipeline.raw_store().write("zz99", "{truncated").unwrap();

        let sink = CollectingSink::default();
        let report = pipeline.export(&sink, None).await.unwrap();

        assert_eq!(report.failed, 1);
        assert!(sink.records.lock().unwrap().is_empty());
        assert_eq!(diagnostics.count_by_code("unreadable_document"), 1);
        assert_eq!(pipeline.tracker().stage_of("zz99"), Some(Stage::Downloaded));
    }
}
