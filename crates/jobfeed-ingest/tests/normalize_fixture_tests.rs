//! Normalization of a complete posting as served by the posting API

use chrono::NaiveDate;
use jobfeed_ingest::diagnostics::Severity;
use jobfeed_ingest::document::RawDocument;
use jobfeed_ingest::normalize::salary::AgreementType;
use jobfeed_ingest::normalize::RecordNormalizer;
use jobfeed_ingest::record::MonthlySalary;
use std::collections::BTreeSet;

const POSTING: &str = include_str!("fixtures/posting.json");

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn download_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 21).expect("valid date")
}

#[test]
fn test_fixture_record_fields() {
    let doc = RawDocument::parse("ab12cd34", POSTING).expect("fixture is valid JSON");
    let record = RecordNormalizer::default()
        .normalize_on(&doc, download_date())
        .record;

    assert_eq!(record.external_id, "ab12cd34");
    assert_eq!(record.posted_date, NaiveDate::from_ymd_opt(2024, 5, 20));
    assert_eq!(record.download_date, download_date());
    assert_eq!(record.title.as_deref(), Some("Senior Rust Developer"));
    assert_eq!(record.category.as_deref(), Some("backend"));
    assert_eq!(record.seniorities, set(&["Expert", "Senior"]));
    assert_eq!(
        record.url.as_deref(),
        Some("https://nofluffjobs.com/job/senior-rust-developer-acme-warszawa-ab12cd34")
    );
    assert_eq!(record.company_size, Some(150));

    assert_eq!(record.salary_currency.as_deref(), Some("PLN"));
    assert_eq!(
        record.salary(AgreementType::Permanent),
        Some(MonthlySalary { min: 22000.0, max: 28000.0 })
    );
    assert_eq!(
        record.salary(AgreementType::B2b),
        Some(MonthlySalary { min: 25200.0, max: 33600.0 })
    );
    assert_eq!(record.salary(AgreementType::Zlecenie), None);

    assert_eq!(record.must_skills, set(&["PostgreSQL", "Rust", "Tokio", "en"]));
    assert_eq!(record.nice_skills, set(&["Kubernetes", "Rust", "pl"]));

    assert!(record.available_remote);
    assert!(record.available_in_poland);
    assert_eq!(record.locations, set(&["DEU", "POL", "Remote"]));
}

#[test]
fn test_fixture_diagnostics() {
    let doc = RawDocument::parse("ab12cd34", POSTING).expect("fixture is valid JSON");
    let diagnostics = RecordNormalizer::default()
        .normalize_on(&doc, download_date())
        .diagnostics;

    let codes: Vec<&str> = diagnostics.iter().map(|d| d.code()).collect();
    assert_eq!(
        codes,
        vec!["unknown_salary_period", "unknown_language_type", "unrecognized_location"]
    );
    assert!(diagnostics.iter().all(|d| d.severity == Severity::Warning));
    assert!(diagnostics.iter().all(|d| d.external_id == "ab12cd34"));

    assert_eq!(
        diagnostics[0].path,
        "essentials.originalSalary.types.zlecenie.period"
    );
    assert_eq!(diagnostics[1].path, "requirements.languages.2.type");
    assert_eq!(diagnostics[2].path, "location.places.3");
}

#[test]
fn test_fixture_serializes_with_storage_field_names() {
    let doc = RawDocument::parse("ab12cd34", POSTING).expect("fixture is valid JSON");
    let record = RecordNormalizer::default()
        .normalize_on(&doc, download_date())
        .record;

    let value = serde_json::to_value(&record).expect("record serializes");
    assert_eq!(value["ExternalID"], "ab12cd34");
    assert_eq!(value["PostedDate"], "2024-05-20");
    assert_eq!(value["CompanySize"], 150);
    assert_eq!(value["SalaryMinB2B"], 25200.0);
    assert_eq!(value["SalaryMaxUoP"], 28000.0);
    assert!(value["SalaryMinOther"].is_null());
    assert_eq!(value["AvailableInPoland"], true);
}

#[test]
fn test_fixture_normalization_is_repeatable() {
    let doc = RawDocument::parse("ab12cd34", POSTING).expect("fixture is valid JSON");
    let normalizer = RecordNormalizer::default();

    let first = normalizer.normalize_on(&doc, download_date());
    let second = normalizer.normalize_on(&doc, download_date());
    assert_eq!(first, second);
}
