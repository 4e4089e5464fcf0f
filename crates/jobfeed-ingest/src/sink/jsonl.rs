//! JSON Lines record sink

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::RecordSink;
use crate::error::{IngestError, Result};
use crate::record::CanonicalRecord;

/// Appends one JSON object per record to a `.jsonl` file
#[derive(Debug, Clone)]
pub struct JsonLinesSink {
    path: PathBuf,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back every record in the file
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<CanonicalRecord>> {
        let records = serde_jsonlines::json_lines(path)?.collect::<std::io::Result<Vec<_>>>()?;
        Ok(records)
    }
}

#[async_trait]
impl RecordSink for JsonLinesSink {
    async fn write(&self, record: &CanonicalRecord) -> Result<()> {
        let path = self.path.clone();
        let record = record.clone();

        tokio::task::spawn_blocking(move || {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            serde_jsonlines::append_json_lines(&path, [&record])
        })
        .await
        .map_err(|e| IngestError::sink(format!("JSON Lines writer task failed: {}", e)))??;

        debug!(path = %self.path.display(), "Appended record");
        Ok(())
    }
}
