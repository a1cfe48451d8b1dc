/*!
 * Tests for validator dispatch, verdicts and correction
 */

use async_trait::async_trait;
use std::sync::Arc;

use traductal::validation::{
    Corrector, ValidationConfig, ValidationService, ValidationVerdict, Validator, ValidatorKind, VerdictStatus,
};

/// Validator that rejects everything, to check dispatch overrides
#[derive(Debug)]
struct RejectingValidator;

#[async_trait]
impl Validator for RejectingValidator {
    fn kind(&self) -> ValidatorKind {
        ValidatorKind::Symbolic
    }

    async fn validate(&self, _source: &str, _translation: &str, language: &str) -> ValidationVerdict {
        ValidationVerdict::from_errors(
            ValidatorKind::Symbolic,
            language,
            vec!["Coptic syntax error detected".to_string()],
            VerdictStatus::Invalid,
        )
    }
}

#[tokio::test]
async fn test_validate_withSwissGermanTarget_shouldFlagStandardGerman() {
    let service = ValidationService::new();
    let verdict = service
        .validate("gsw", "I have no time", "Ich habe keine Zeit, das ist nicht gut")
        .await;

    assert_eq!(verdict.validator, Some(ValidatorKind::SwissGerman));
    assert_eq!(verdict.status, VerdictStatus::Invalid);
    assert!(verdict.errors.contains(&"Standard German form detected: ich habe".to_string()));
    assert!(verdict.errors.contains(&"Standard German form detected: keine".to_string()));
    assert!(verdict.has_errors());
}

#[tokio::test]
async fn test_validate_withRomanshTarget_shouldFlagGermanContamination() {
    let service = ValidationService::new();
    let verdict = service.validate("rm-puter", "Good morning", "Schöne Grüße").await;

    assert_eq!(verdict.status, VerdictStatus::Invalid);
    assert_eq!(verdict.errors, vec!["Possible German contamination".to_string()]);
}

#[tokio::test]
async fn test_validate_withGenericTarget_shouldReportLengthRatio() {
    let service = ValidationService::new();
    let verdict = service
        .validate("fr", "The weather is nice today", "Il fait beau aujourd'hui")
        .await;

    assert!(verdict.is_valid());
    assert!(verdict.extra.contains_key("length_ratio"));
}

#[tokio::test]
async fn test_validate_withRepeatedTokens_shouldWarnOnly() {
    let service = ValidationService::new();
    let verdict = service
        .validate("it", "the cat sleeps on the sofa", "il gatto gatto gatto dorme")
        .await;

    assert_eq!(verdict.status, VerdictStatus::Warning);
    assert_eq!(
        verdict.errors,
        vec!["Token repetition detected (possible hallucination)".to_string()]
    );
}

#[tokio::test]
async fn test_withValidator_shouldReplaceBoundImplementation() {
    let service = ValidationService::new().with_validator(Arc::new(RejectingValidator));
    let verdict = service.validate("cop", "I am", "ⲁⲛⲟⲕ ⲡⲉ").await;

    assert_eq!(verdict.status, VerdictStatus::Invalid);
    assert_eq!(verdict.errors, vec!["Coptic syntax error detected".to_string()]);
}

#[test]
fn test_verdict_serialization_shouldUseLowercaseStatus() {
    let verdict = ValidationVerdict::skipped("fr");
    let json = serde_json::to_value(&verdict).unwrap();

    assert_eq!(json["status"], "skipped");
    assert_eq!(json["language"], "fr");
    assert!(json.get("extra").is_none());
    assert!(!verdict.has_errors());
    assert!(verdict.is_unvalidated());
}

#[test]
fn test_corrector_withCustomTag_shouldPrefixTranslation() {
    let corrector = Corrector::new("[REVIEW]");
    let corrected = corrector.correct("Bun di", &["Missing typical Romansh patterns".to_string()]);
    assert_eq!(corrected, "[REVIEW] Bun di");
}

#[test]
fn test_validationConfig_defaults_shouldMatchGenericThresholds() {
    let config = ValidationConfig::default();
    assert_eq!(config.length_ratio_min, 0.3);
    assert_eq!(config.length_ratio_max, 3.0);
    assert_eq!(config.repetition_window, 3);
    assert_eq!(config.leakage_threshold, 0.5);
}
