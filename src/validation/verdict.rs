/*!
 * Validation verdicts.
 */

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ValidatorKind;

/// Outcome category of a validation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictStatus {
    /// No issues
    Valid,
    /// Hard mismatch
    Invalid,
    /// Minor issues that do not block delivery
    Warning,
    /// The validator did not answer in time
    Timeout,
    /// The validator itself failed
    Error,
    /// Validation was not requested
    Skipped,
}

/// Structured result of a validation pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    pub status: VerdictStatus,
    /// Human readable issues, in check order
    pub errors: Vec<String>,
    /// Target language the translation was checked against
    pub language: String,
    /// Validator that produced the verdict
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validator: Option<ValidatorKind>,
    /// Validator specific details (length ratio, interpreter stderr, ...)
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl ValidationVerdict {
    fn new(status: VerdictStatus, kind: Option<ValidatorKind>, language: &str, errors: Vec<String>) -> Self {
        Self {
            status,
            errors,
            language: language.to_string(),
            validator: kind,
            extra: Map::new(),
        }
    }

    /// Verdict without issues
    pub fn valid(kind: ValidatorKind, language: &str) -> Self {
        Self::new(VerdictStatus::Valid, Some(kind), language, Vec::new())
    }

    /// `Valid` when `errors` is empty, `severity` otherwise
    pub fn from_errors(kind: ValidatorKind, language: &str, errors: Vec<String>, severity: VerdictStatus) -> Self {
        if errors.is_empty() {
            Self::valid(kind, language)
        } else {
            Self::new(severity, Some(kind), language, errors)
        }
    }

    /// Validator ran out of time
    pub fn timeout(kind: ValidatorKind, language: &str, message: impl Into<String>) -> Self {
        Self::new(VerdictStatus::Timeout, Some(kind), language, vec![message.into()])
    }

    /// Validator failed to run
    pub fn error(kind: ValidatorKind, language: &str, message: impl Into<String>) -> Self {
        Self::new(VerdictStatus::Error, Some(kind), language, vec![message.into()])
    }

    /// Marker for a request that did not ask for validation
    pub fn skipped(language: &str) -> Self {
        Self::new(VerdictStatus::Skipped, None, language, Vec::new())
    }

    /// Attach a detail value
    pub fn with_extra(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    pub fn is_valid(&self) -> bool {
        self.status == VerdictStatus::Valid
    }

    /// Whether the translation content was flagged and should be corrected.
    ///
    /// Timeout and Error describe the validator, not the translation, so
    /// they leave the translation unvalidated instead.
    pub fn has_errors(&self) -> bool {
        matches!(self.status, VerdictStatus::Invalid | VerdictStatus::Warning) && !self.errors.is_empty()
    }

    /// Whether no content verdict could be reached
    pub fn is_unvalidated(&self) -> bool {
        matches!(self.status, VerdictStatus::Timeout | VerdictStatus::Error | VerdictStatus::Skipped)
    }
}
