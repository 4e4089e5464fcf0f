//! Posting normalization
//!
//! [`RecordNormalizer`] runs every field rule against one [`RawDocument`] and
//! merges the results into a [`CanonicalRecord`]. Rules never fail: a missing
//! field stays null or empty, a malformed one also adds a [`Diagnostic`].
//!
//! # Example
//!
//! ```
//! use jobfeed_ingest::document::RawDocument;
//! use jobfeed_ingest::normalize::RecordNormalizer;
//! use serde_json::json;
//!
//! let doc = RawDocument::new("ab12cd34", json!({
//!     "id": "ab12cd34",
//!     "company": { "size": "50-100" }
//! }));
//! let normalized = RecordNormalizer::default().normalize(&doc);
//! assert_eq!(normalized.record.company_size, Some(75));
//! ```

pub mod basics;
pub mod company_size;
pub mod dates;
pub mod locations;
pub mod salary;
pub mod skills;

use chrono::{NaiveDate, Utc};
use tracing::debug;

use crate::config::DEFAULT_POSTING_BASE_URL;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::document::RawDocument;
use crate::record::CanonicalRecord;

/// Output of one normalization pass
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub record: CanonicalRecord,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone)]
pub struct RecordNormalizer {
    posting_base_url: String,
}

impl Default for RecordNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_POSTING_BASE_URL)
    }
}

impl RecordNormalizer {
    /// `posting_base_url` is prefixed to the `postingUrl` slug
    pub fn new(posting_base_url: impl Into<String>) -> Self {
        Self {
            posting_base_url: posting_base_url.into(),
        }
    }

    /// Normalize with today's date (UTC) as the download date
    pub fn normalize(&self, doc: &RawDocument) -> Normalized {
        self.normalize_on(doc, Utc::now().date_naive())
    }

    pub fn normalize_on(&self, doc: &RawDocument, download_date: NaiveDate) -> Normalized {
        let mut diagnostics = Diagnostics::new(doc.external_id.clone());

        let basics = basics::basics(doc);
        let mut record = CanonicalRecord::new(basics.external_id, download_date);

        record.posted_date = dates::posted_date(doc);
        record.title = basics.title;
        record.category = basics.category;
        record.seniorities = basics.seniorities;
        record.url = basics::posting_url(doc, &self.posting_base_url);
        record.company_size = company_size::company_size(doc, &mut diagnostics);

        let salaries = salary::salaries(doc, &mut diagnostics);
        record.salary_currency = salaries.currency;
        for (agreement, range) in salaries.ranges {
            record.set_salary(agreement, range);
        }

        let skills = skills::skills(doc, &mut diagnostics);
        record.must_skills = skills.must;
        record.nice_skills = skills.nice;

        let locations = locations::locations(doc, &mut diagnostics);
        record.available_remote = locations.remote;
        record.available_in_poland = locations.in_poland;
        record.locations = locations.markers;

        debug!(
            external_id = %record.external_id,
            anomalies = diagnostics.len(),
            "Normalized posting"
        );

        Normalized {
            record,
            diagnostics: diagnostics.into_vec(),
        }
    }
}
