//! Posting dates

use chrono::{DateTime, NaiveDate};
use serde_json::Value;

use crate::document::RawDocument;

/// Calendar date (UTC) of the `posted` timestamp, given in milliseconds
pub fn posted_date(doc: &RawDocument) -> Option<NaiveDate> {
    let millis = match doc.get(&["posted"])? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64))?,
        _ => return None,
    };
    DateTime::from_timestamp_millis(millis).map(|dt| dt.date_naive())
}
