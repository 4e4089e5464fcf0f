//! Local storage of downloaded postings, one `<id>.json` file each

use std::path::{Path, PathBuf};

use crate::document::RawDocument;
use crate::error::{IngestError, Result};

#[derive(Debug, Clone)]
pub struct RawStore {
    dir: PathBuf,
}

impl RawStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, external_id: &str) -> Result<PathBuf> {
        validate_id(external_id)?;
        Ok(self.dir.join(format!("{}.json", external_id)))
    }

    /// Store raw response text verbatim
    ///
    /// The text goes to a sibling temp file first and is renamed into place,
    /// so an interrupted write never leaves a truncated `<id>.json` behind.
    pub fn write(&self, external_id: &str, text: &str) -> Result<PathBuf> {
        let path = self.path_for(external_id)?;
        std::fs::create_dir_all(&self.dir)?;

        let temp = self.dir.join(format!("{}.json.tmp", external_id));
        std::fs::write(&temp, text)?;
        std::fs::rename(&temp, &path)?;
        Ok(path)
    }

    /// Delete a stored posting; a missing file is not an error
    pub fn remove(&self, external_id: &str) -> Result<()> {
        match std::fs::remove_file(self.path_for(external_id)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn read(&self, external_id: &str) -> Result<RawDocument> {
        let text = std::fs::read_to_string(self.path_for(external_id)?)?;
        RawDocument::parse(external_id, &text)
    }

    pub fn contains(&self, external_id: &str) -> bool {
        self.path_for(external_id)
            .map(|path| path.is_file())
            .unwrap_or(false)
    }
}

/// Ids become file names, so only plain tokens are accepted
fn validate_id(external_id: &str) -> Result<()> {
    let valid = !external_id.is_empty()
        && external_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(IngestError::InvalidExternalId(external_id.to_string()))
    }
}
