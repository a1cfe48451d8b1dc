/*!
 * Validation module for translation quality checks.
 *
 * A raw translation is routed to one validator depending on the target
 * language:
 * - `symbolic`: Coptic, checked by a Prolog dependency parser run as a subprocess
 * - `patterns`: Romansh and Swiss German marker rules
 * - `generic`: length ratio, empty output, repetition and source leakage for
 *   everything else
 *
 * # Architecture
 *
 * - `verdict`: Structured validation outcome
 * - `service`: Dispatches to the validator bound to each `ValidatorKind`
 * - `correction`: One-shot corrector for flagged translations
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::language_utils::is_language_family;

pub mod correction;
pub mod generic;
pub mod patterns;
pub mod service;
pub mod symbolic;
pub mod verdict;

// Re-export main types
pub use correction::Corrector;
pub use service::{ValidationConfig, ValidationService};
pub use symbolic::{PrologQuery, SymbolicConfig, SymbolicValidator};
pub use verdict::{ValidationVerdict, VerdictStatus};

/// Closed set of validator families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorKind {
    /// External Prolog parser (Coptic)
    Symbolic,
    /// Romansh pattern rules
    Romansh,
    /// Swiss German pattern rules
    SwissGerman,
    /// Language-independent heuristics
    Generic,
}

impl ValidatorKind {
    /// Pick the validator family for a target language code
    pub fn for_language(code: &str) -> Self {
        let code = code.trim().to_lowercase();

        if code == "cop" || code == "coptic" {
            Self::Symbolic
        } else if is_language_family(&code, "rm") {
            Self::Romansh
        } else if code.contains("gsw") {
            Self::SwissGerman
        } else {
            Self::Generic
        }
    }
}

impl std::fmt::Display for ValidatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Symbolic => "symbolic",
            Self::Romansh => "romansh",
            Self::SwissGerman => "swiss_german",
            Self::Generic => "generic",
        };
        write!(f, "{}", name)
    }
}

/// A language-specific translation checker
#[async_trait]
pub trait Validator: Send + Sync + Debug {
    /// Family this validator implements
    fn kind(&self) -> ValidatorKind;

    /// Check a translation of `source` into `language`
    async fn validate(&self, source: &str, translation: &str, language: &str) -> ValidationVerdict;
}
