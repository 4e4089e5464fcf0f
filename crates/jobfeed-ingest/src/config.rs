//! Ingestion configuration
//!
//! Defaults target the public No Fluff Jobs endpoints. Every value can be
//! overridden through `JOBFEED_*` environment variables or the builder-style
//! setters.

use jobfeed_common::error::{env_var, parse_env_var};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::{IngestError, Result};

// ============================================================================
// Defaults
// ============================================================================

/// Listing of all offers with salary above 0 PLN, which is every offer since
/// salaries are mandatory. The page number is appended.
pub const DEFAULT_LISTING_URL: &str =
    "https://nofluffjobs.com/pl/?lang=en&criteria=salary%3Epln0m&page=";

/// Posting API; the uppercased offer id is appended.
pub const DEFAULT_API_URL: &str = "https://nofluffjobs.com/api/posting/";

/// Public posting page; the `postingUrl` slug is appended.
pub const DEFAULT_POSTING_BASE_URL: &str = "https://nofluffjobs.com/job/";

pub const DEFAULT_DATA_DIR: &str = "./local";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SAVE_EVERY: usize = 25;
pub const DEFAULT_USER_AGENT: &str = concat!("jobfeed/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestConfig {
    /// Root for the stage snapshot and downloaded raw postings
    pub data_dir: PathBuf,
    pub listing_url: String,
    pub api_url: String,
    pub posting_base_url: String,
    pub http_timeout_secs: u64,
    /// Persist the stage snapshot after this many transitions
    pub save_every: usize,
    pub user_agent: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            listing_url: DEFAULT_LISTING_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            posting_base_url: DEFAULT_POSTING_BASE_URL.to_string(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            save_every: DEFAULT_SAVE_EVERY,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl IngestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables
    ///
    /// - `JOBFEED_DATA_DIR`
    /// - `JOBFEED_LISTING_URL`
    /// - `JOBFEED_API_URL`
    /// - `JOBFEED_POSTING_BASE_URL`
    /// - `JOBFEED_HTTP_TIMEOUT_SECS`
    /// - `JOBFEED_SAVE_EVERY`
    /// - `JOBFEED_USER_AGENT`
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(dir) = env_var("JOBFEED_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(url) = env_var("JOBFEED_LISTING_URL") {
            config.listing_url = url;
        }
        if let Some(url) = env_var("JOBFEED_API_URL") {
            config.api_url = url;
        }
        if let Some(url) = env_var("JOBFEED_POSTING_BASE_URL") {
            config.posting_base_url = url;
        }
        if let Some(secs) = parse_env_var("JOBFEED_HTTP_TIMEOUT_SECS")? {
            config.http_timeout_secs = secs;
        }
        if let Some(every) = parse_env_var("JOBFEED_SAVE_EVERY")? {
            config.save_every = every;
        }
        if let Some(agent) = env_var("JOBFEED_USER_AGENT") {
            config.user_agent = agent;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_listing_url(mut self, url: impl Into<String>) -> Self {
        self.listing_url = url.into();
        self
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_posting_base_url(mut self, url: impl Into<String>) -> Self {
        self.posting_base_url = url.into();
        self
    }

    pub fn with_http_timeout(mut self, secs: u64) -> Self {
        self.http_timeout_secs = secs;
        self
    }

    pub fn with_save_every(mut self, every: usize) -> Self {
        self.save_every = every;
        self
    }

    /// Check URLs parse and numeric settings are usable
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("listing_url", &self.listing_url),
            ("api_url", &self.api_url),
            ("posting_base_url", &self.posting_base_url),
        ] {
            Url::parse(value)
                .map_err(|e| IngestError::config(format!("{} {:?} is not a valid URL: {}", name, value, e)))?;
        }

        if self.save_every == 0 {
            return Err(IngestError::config("save_every must be at least 1"));
        }
        if self.http_timeout_secs == 0 {
            return Err(IngestError::config("http_timeout_secs must be at least 1"));
        }

        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Location of the stage snapshot
    pub fn stages_path(&self) -> PathBuf {
        self.data_dir.join("data_stages").join("stages.json")
    }

    /// Directory holding one `<id>.json` per downloaded posting
    pub fn raw_dir(&self) -> PathBuf {
        self.data_dir.join("raw")
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
