//! Destinations for normalized records

pub mod jsonl;
#[cfg(feature = "database")]
pub mod postgres;

use async_trait::async_trait;

use crate::error::Result;
use crate::record::CanonicalRecord;

pub use jsonl::JsonLinesSink;
#[cfg(feature = "database")]
pub use postgres::PostgresSink;

/// Accepts canonical records one at a time
///
/// A record is exported once `write` returns `Ok`.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn write(&self, record: &CanonicalRecord) -> Result<()>;

    /// Flush buffered output, called once at the end of an export pass
    async fn finish(&self) -> Result<()> {
        Ok(())
    }
}
