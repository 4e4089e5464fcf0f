//! Field-level anomaly reporting
//!
//! Normalization never fails on bad data. Each problem becomes a
//! [`Diagnostic`] carrying a stable code, the offending path and a message.
//! The normalizer collects them; callers forward them to a [`DiagnosticSink`].

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::{error, info, warn};

use crate::normalize::salary::AgreementType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Expected irregularity, recorded for completeness
    Info,
    /// Something is off but the record is still usable
    Warning,
    /// The record could not be processed at all
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// What went wrong, with the context needed to investigate it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum Anomaly {
    /// None of the agreement types carries a salary period
    MissingSalary,
    UnknownSalaryPeriod {
        agreement: AgreementType,
        period: String,
    },
    MalformedSalaryRange {
        agreement: AgreementType,
    },
    MalformedCompanySize {
        raw: String,
    },
    UnknownLanguageType {
        language: String,
        kind: String,
    },
    UnrecognizedLocation {
        index: usize,
    },
    /// Raw document could not be read or parsed
    UnreadableDocument {
        reason: String,
    },
}

impl Anomaly {
    /// Stable code used in logs and sinks
    pub fn code(&self) -> &'static str {
        match self {
            Anomaly::MissingSalary => "missing_salary",
            Anomaly::UnknownSalaryPeriod { .. } => "unknown_salary_period",
            Anomaly::MalformedSalaryRange { .. } => "malformed_salary_range",
            Anomaly::MalformedCompanySize { .. } => "malformed_company_size",
            Anomaly::UnknownLanguageType { .. } => "unknown_language_type",
            Anomaly::UnrecognizedLocation { .. } => "unrecognized_location",
            Anomaly::UnreadableDocument { .. } => "unreadable_document",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Anomaly::UnreadableDocument { .. } => Severity::Critical,
            _ => Severity::Warning,
        }
    }
}

/// One reported anomaly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub external_id: String,
    #[serde(flatten)]
    pub anomaly: Anomaly,
    /// Dotted path of the offending field
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        external_id: impl Into<String>,
        anomaly: Anomaly,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: anomaly.severity(),
            external_id: external_id.into(),
            anomaly,
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        self.anomaly.code()
    }
}

/// Diagnostics gathered during one normalization pass
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    external_id: String,
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new(external_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, anomaly: Anomaly, path: impl Into<String>, message: impl Into<String>) {
        self.entries.push(Diagnostic::new(
            self.external_id.clone(),
            anomaly,
            path,
            message,
        ));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

/// Destination for diagnostics
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: &Diagnostic);

    fn report_all(&self, diagnostics: &[Diagnostic]) {
        for diagnostic in diagnostics {
            self.report(diagnostic);
        }
    }
}

/// Forwards diagnostics to `tracing` at a level matching their severity
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, d: &Diagnostic) {
        match d.severity {
            Severity::Info => info!(
                code = d.code(),
                external_id = %d.external_id,
                path = %d.path,
                "{}",
                d.message
            ),
            Severity::Warning => warn!(
                code = d.code(),
                external_id = %d.external_id,
                path = %d.path,
                "{}",
                d.message
            ),
            Severity::Critical => error!(
                code = d.code(),
                external_id = %d.external_id,
                path = %d.path,
                "{}",
                d.message
            ),
        }
    }
}

/// Keeps diagnostics in memory for later inspection
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<Diagnostic>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn count_by_code(&self, code: &str) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter(|d| d.code() == code)
            .count()
    }
}

impl DiagnosticSink for MemorySink {
    fn report(&self, diagnostic: &Diagnostic) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(diagnostic.clone());
    }
}
