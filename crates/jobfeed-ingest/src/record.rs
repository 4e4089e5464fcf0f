//! Canonical flat record produced by normalization

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::normalize::salary::AgreementType;

/// Salary bounds in monthly units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlySalary {
    pub min: f64,
    pub max: f64,
}

/// One job posting in the flat schema handed to record sinks
///
/// Field names serialize exactly as the storage schema expects them
/// (`ExternalID`, `SalaryMinUoP`, ...). Set-valued fields are ordered so
/// that serialized output is stable across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CanonicalRecord {
    #[serde(rename = "ExternalID")]
    pub external_id: String,

    pub posted_date: Option<NaiveDate>,
    pub download_date: NaiveDate,

    pub title: Option<String>,
    pub category: Option<String>,
    pub seniorities: BTreeSet<String>,

    #[serde(rename = "URL")]
    pub url: Option<String>,

    pub company_size: Option<i64>,

    pub salary_currency: Option<String>,
    #[serde(rename = "SalaryMinUoP")]
    pub salary_min_uop: Option<f64>,
    #[serde(rename = "SalaryMaxUoP")]
    pub salary_max_uop: Option<f64>,
    #[serde(rename = "SalaryMinB2B")]
    pub salary_min_b2b: Option<f64>,
    #[serde(rename = "SalaryMaxB2B")]
    pub salary_max_b2b: Option<f64>,
    pub salary_min_other: Option<f64>,
    pub salary_max_other: Option<f64>,

    pub must_skills: BTreeSet<String>,
    pub nice_skills: BTreeSet<String>,

    pub available_remote: bool,
    pub available_in_poland: bool,
    pub locations: BTreeSet<String>,
}

impl CanonicalRecord {
    /// Empty record: every nullable field null, every set freshly allocated
    pub fn new(external_id: impl Into<String>, download_date: NaiveDate) -> Self {
        Self {
            external_id: external_id.into(),
            posted_date: None,
            download_date,
            title: None,
            category: None,
            seniorities: BTreeSet::new(),
            url: None,
            company_size: None,
            salary_currency: None,
            salary_min_uop: None,
            salary_max_uop: None,
            salary_min_b2b: None,
            salary_max_b2b: None,
            salary_min_other: None,
            salary_max_other: None,
            must_skills: BTreeSet::new(),
            nice_skills: BTreeSet::new(),
            available_remote: false,
            available_in_poland: false,
            locations: BTreeSet::new(),
        }
    }

    pub fn salary(&self, agreement: AgreementType) -> Option<MonthlySalary> {
        let (min, max) = match agreement {
            AgreementType::Permanent => (self.salary_min_uop, self.salary_max_uop),
            AgreementType::B2b => (self.salary_min_b2b, self.salary_max_b2b),
            AgreementType::Zlecenie => (self.salary_min_other, self.salary_max_other),
        };
        Some(MonthlySalary {
            min: min?,
            max: max?,
        })
    }

    pub fn set_salary(&mut self, agreement: AgreementType, salary: MonthlySalary) {
        let (min, max) = match agreement {
            AgreementType::Permanent => (&mut self.salary_min_uop, &mut self.salary_max_uop),
            AgreementType::B2b => (&mut self.salary_min_b2b, &mut self.salary_max_b2b),
            AgreementType::Zlecenie => (&mut self.salary_min_other, &mut self.salary_max_other),
        };
        *min = Some(salary.min);
        *max = Some(salary.max);
    }

    /// True when no agreement type carries a salary
    pub fn has_no_salary(&self) -> bool {
        AgreementType::ALL.iter().all(|a| self.salary(*a).is_none())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn test_new_record_is_empty() {
        let record = CanonicalRecord::new("ab12cd34", date());
        assert_eq!(record.external_id, "ab12cd34");
        assert!(record.seniorities.is_empty());
        assert!(record.locations.is_empty());
        assert!(record.has_no_salary());
        assert!(!record.available_remote);
    }

    #[test]
    fn test_records_do_not_share_collections() {
        let mut first = CanonicalRecord::new("a", date());
        let second = CanonicalRecord::new("b", date());
        first.must_skills.insert("rust".into());
        assert!(second.must_skills.is_empty());
    }

    #[test]
    fn test_set_salary_targets_agreement_fields() {
        let mut record = CanonicalRecord::new("a", date());
        record.set_salary(AgreementType::B2b, MonthlySalary { min: 10.0, max: 20.0 });

        assert_eq!(record.salary_min_b2b, Some(10.0));
        assert_eq!(record.salary_max_b2b, Some(20.0));
        assert!(record.salary(AgreementType::Permanent).is_none());
        assert!(!record.has_no_salary());
    }

    #[test]
    fn test_serialized_field_names() {
        let mut record = CanonicalRecord::new("a", date());
        record.set_salary(AgreementType::Permanent, MonthlySalary { min: 1.0, max: 2.0 });
        let value = serde_json::to_value(&record).unwrap();

        for key in [
            "ExternalID",
            "PostedDate",
            "DownloadDate",
            "URL",
            "CompanySize",
            "SalaryMinUoP",
            "SalaryMaxB2B",
            "SalaryMinOther",
            "MustSkills",
            "AvailableInPoland",
            "Locations",
        ] {
            assert!(value.get(key).is_some(), "missing key {}", key);
        }
        assert_eq!(value["DownloadDate"], "2024-03-01");
    }
}
