//! Must-have and nice-to-have skills, including spoken languages

use serde_json::Value;
use std::collections::BTreeSet;

use crate::diagnostics::{Anomaly, Diagnostics};
use crate::document::RawDocument;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Skills {
    pub must: BTreeSet<String>,
    pub nice: BTreeSet<String>,
}

pub fn skills(doc: &RawDocument, diagnostics: &mut Diagnostics) -> Skills {
    let mut skills = Skills::default();

    for (category, target) in [("musts", &mut skills.must), ("nices", &mut skills.nice)] {
        if let Some(entries) = doc.array_at(&["requirements", category]) {
            target.extend(
                entries
                    .iter()
                    .filter_map(|entry| entry.get("value").and_then(Value::as_str))
                    .map(str::to_string),
            );
        }
    }

    // Languages are filed by their own requirement level rather than by list.
    if let Some(languages) = doc.array_at(&["requirements", "languages"]) {
        for (index, language) in languages.iter().enumerate() {
            let code = language.get("code").and_then(Value::as_str);
            let kind = language.get("type").and_then(Value::as_str);

            let (code, kind) = match (code, kind) {
                (Some(code), Some(kind)) => (code, kind),
                _ => continue,
            };

            if kind.eq_ignore_ascii_case("must") {
                skills.must.insert(code.to_string());
            } else if kind.eq_ignore_ascii_case("nice") {
                skills.nice.insert(code.to_string());
            } else {
                diagnostics.push(
                    Anomaly::UnknownLanguageType {
                        language: code.to_string(),
                        kind: kind.to_string(),
                    },
                    format!("requirements.languages.{}.type", index),
                    format!("Unknown requirement level {:?} for language {}", kind, code),
                );
            }
        }
    }

    skills
}
