//! Salary unification across agreement types
//!
//! Each agreement type publishes its own `(period, range)` pair. Ranges are
//! converted to monthly amounts assuming 168 working hours per month, 8 per
//! day and 40 per week.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::diagnostics::{Anomaly, Diagnostics};
use crate::document::{display_path, RawDocument};
use crate::record::MonthlySalary;

pub const HOURS_PER_MONTH: f64 = 168.0;
pub const HOURS_PER_DAY: f64 = 8.0;
pub const HOURS_PER_WEEK: f64 = 40.0;

const SALARY_PATH: [&str; 2] = ["essentials", "originalSalary"];

/// Employment contract category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgreementType {
    /// Employment contract (UoP)
    Permanent,
    B2b,
    /// Civil-law contract, stored in the `Other` columns
    Zlecenie,
}

impl AgreementType {
    pub const ALL: [AgreementType; 3] = [
        AgreementType::Permanent,
        AgreementType::B2b,
        AgreementType::Zlecenie,
    ];

    /// Key of this agreement under `essentials.originalSalary.types`
    pub fn key(self) -> &'static str {
        match self {
            AgreementType::Permanent => "permanent",
            AgreementType::B2b => "b2b",
            AgreementType::Zlecenie => "zlecenie",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SalaryPeriod {
    Hour,
    Day,
    Week,
    Month,
}

impl SalaryPeriod {
    pub fn to_monthly(self, amount: f64) -> f64 {
        match self {
            SalaryPeriod::Hour => amount * HOURS_PER_MONTH,
            SalaryPeriod::Day => amount / HOURS_PER_DAY * HOURS_PER_MONTH,
            SalaryPeriod::Week => amount / HOURS_PER_WEEK * HOURS_PER_MONTH,
            SalaryPeriod::Month => amount,
        }
    }
}

impl std::str::FromStr for SalaryPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hour" => Ok(SalaryPeriod::Hour),
            "day" => Ok(SalaryPeriod::Day),
            "week" => Ok(SalaryPeriod::Week),
            "month" => Ok(SalaryPeriod::Month),
            _ => Err(s.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SalaryFields {
    pub currency: Option<String>,
    pub ranges: Vec<(AgreementType, MonthlySalary)>,
}

pub fn salaries(doc: &RawDocument, diagnostics: &mut Diagnostics) -> SalaryFields {
    let mut fields = SalaryFields::default();
    let mut absent = 0;

    for agreement in AgreementType::ALL {
        let period_path = [SALARY_PATH[0], SALARY_PATH[1], "types", agreement.key(), "period"];
        let range_path = [SALARY_PATH[0], SALARY_PATH[1], "types", agreement.key(), "range"];

        let period = match doc.get(&period_path) {
            Some(value) => value,
            None => {
                absent += 1;
                continue;
            }
        };

        let period = match period.as_str().map(str::parse::<SalaryPeriod>) {
            Some(Ok(period)) => period,
            _ => {
                let raw = match period {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                diagnostics.push(
                    Anomaly::UnknownSalaryPeriod {
                        agreement,
                        period: raw.clone(),
                    },
                    display_path(&period_path),
                    format!("Unrecognized salary period {:?}, {} salary skipped", raw, agreement.key()),
                );
                continue;
            }
        };

        let (low, high) = match doc.get(&range_path).and_then(range_bounds) {
            Some(bounds) => bounds,
            None => {
                diagnostics.push(
                    Anomaly::MalformedSalaryRange { agreement },
                    display_path(&range_path),
                    format!("Salary range is missing or malformed, {} salary skipped", agreement.key()),
                );
                continue;
            }
        };

        fields.ranges.push((
            agreement,
            MonthlySalary {
                min: period.to_monthly(low.min(high)),
                max: period.to_monthly(low.max(high)),
            },
        ));
    }

    // Counts absent periods, not failed conversions.
    if absent == AgreementType::ALL.len() {
        diagnostics.push(
            Anomaly::MissingSalary,
            display_path(&[SALARY_PATH[0], SALARY_PATH[1], "types"]),
            "No agreement type carries a salary, salaries were not populated",
        );
        return fields;
    }

    fields.currency = doc
        .str_at(&[SALARY_PATH[0], SALARY_PATH[1], "currency"])
        .map(str::to_string);

    fields
}

/// `[v]` becomes `(v, v)`, `[a, b]` stays as is; anything else is malformed
fn range_bounds(value: &Value) -> Option<(f64, f64)> {
    let amounts: Vec<f64> = value
        .as_array()?
        .iter()
        .map(Value::as_f64)
        .collect::<Option<_>>()?;

    match amounts.as_slice() {
        [single] => Some((*single, *single)),
        [low, high] => Some((*low, *high)),
        _ => None,
    }
}
