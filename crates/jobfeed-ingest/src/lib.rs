//! jobfeed ingestion library
//!
//! Collects job postings from No Fluff Jobs, normalizes them into a flat
//! record schema and tracks each posting through the pipeline stages.
//!
//! # Components
//!
//! - **document**: nested field lookup over raw posting JSON
//! - **normalize**: field rules and the [`RecordNormalizer`]
//! - **stages**: the found / downloaded / exported tracker and its snapshots
//! - **source**, **raw_store**, **sink**: I/O around the core
//! - **pipeline**: the stage runner tying everything together
//!
//! # Example
//!
//! ```no_run
//! use jobfeed_ingest::config::IngestConfig;
//! use jobfeed_ingest::pipeline::Pipeline;
//! use jobfeed_ingest::sink::JsonLinesSink;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = IngestConfig::from_env()?;
//!     let mut pipeline = Pipeline::from_config(&config)?;
//!     let sink = JsonLinesSink::new("./local/offers.jsonl");
//!     pipeline.run(1..=3, Some(100), &sink).await?;
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod diagnostics;
pub mod document;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod progress;
pub mod raw_store;
pub mod record;
pub mod sink;
pub mod source;
pub mod stages;

pub use config::IngestConfig;
pub use diagnostics::{Diagnostic, DiagnosticSink, Severity};
pub use document::RawDocument;
pub use error::{IngestError, Result};
pub use normalize::{Normalized, RecordNormalizer};
pub use pipeline::{Pipeline, StageReport};
pub use record::CanonicalRecord;
pub use stages::{Stage, StageTracker};
