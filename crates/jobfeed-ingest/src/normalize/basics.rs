//! Identifier, title, category, seniority and posting URL

use serde_json::Value;
use std::collections::BTreeSet;
use tracing::debug;

use crate::document::RawDocument;

#[derive(Debug, Clone, PartialEq)]
pub struct Basics {
    pub external_id: String,
    pub title: Option<String>,
    pub category: Option<String>,
    pub seniorities: BTreeSet<String>,
}

/// Falls back to the fetch id when the body carries no usable `id`
pub fn basics(doc: &RawDocument) -> Basics {
    let external_id = match doc.str_at(&["id"]).filter(|id| !id.trim().is_empty()) {
        Some(id) => id.to_string(),
        None => {
            debug!(external_id = %doc.external_id, "Posting body has no id, using fetch id");
            doc.external_id.clone()
        }
    };

    let seniorities = doc
        .array_at(&["basics", "seniority"])
        .map(|levels| {
            levels
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Basics {
        external_id,
        title: doc.str_at(&["title"]).map(str::to_string),
        category: doc.str_at(&["basics", "category"]).map(str::to_string),
        seniorities,
    }
}

/// Public posting URL built from the `postingUrl` slug
pub fn posting_url(doc: &RawDocument, base_url: &str) -> Option<String> {
    doc.str_at(&["postingUrl"])
        .filter(|slug| !slug.is_empty())
        .map(|slug| format!("{}{}", base_url, slug))
}
