//! Location markers and the remote / in-Poland flags

use serde_json::Value;
use std::collections::BTreeSet;

use crate::diagnostics::{Anomaly, Diagnostics};
use crate::document::{resolve, RawDocument};

pub const REMOTE: &str = "Remote";
pub const POLAND: &str = "POL";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Locations {
    pub remote: bool,
    pub in_poland: bool,
    pub markers: BTreeSet<String>,
}

pub fn locations(doc: &RawDocument, diagnostics: &mut Diagnostics) -> Locations {
    let mut locations = Locations::default();

    let places = match doc.array_at(&["location", "places"]) {
        Some(places) => places,
        None => return locations,
    };

    for (index, place) in places.iter().enumerate() {
        let city = resolve(place, &["city"]).and_then(Value::as_str);
        let country = resolve(place, &["country", "code"])
            .and_then(Value::as_str)
            .filter(|code| !code.is_empty());

        match (city, country) {
            (Some(REMOTE), _) => {
                locations.remote = true;
                locations.markers.insert(REMOTE.to_string());
            }
            (_, Some(POLAND)) => {
                locations.in_poland = true;
                locations.markers.insert(POLAND.to_string());
            }
            (_, Some(code)) => {
                locations.markers.insert(code.to_string());
            }
            _ => {
                diagnostics.push(
                    Anomaly::UnrecognizedLocation { index },
                    format!("location.places.{}", index),
                    format!("Place {} has neither a remote city nor a country code", place),
                );
            }
        }
    }

    locations
}
