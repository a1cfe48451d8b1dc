/*!
 * Engine selection.
 *
 * Decides which backend handles a language pair. The decision only looks at
 * static language tables, never at a loaded model, and is recomputed for
 * every request.
 */

use log::debug;
use serde::Serialize;
use std::collections::HashSet;

use crate::language_utils::{is_known_code, is_language_family};
use crate::providers::BackendId;

/// Source and target language of a request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LanguagePair {
    pub source: String,
    pub target: String,
}

impl LanguagePair {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

impl std::fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

/// Static description of a backend as seen by the selector
///
/// Codes are matched exactly against `languages`. A profile with open
/// coverage also accepts any other ISO 639 code or Romansh idiom.
#[derive(Debug, Clone)]
pub struct BackendProfile {
    pub id: BackendId,
    pub languages: HashSet<String>,
    pub open_coverage: bool,
}

impl BackendProfile {
    pub fn new(id: BackendId, languages: HashSet<String>) -> Self {
        Self {
            id,
            languages,
            open_coverage: false,
        }
    }

    pub fn with_open_coverage(mut self, open_coverage: bool) -> Self {
        self.open_coverage = open_coverage;
        self
    }

    fn lists(&self, code: &str) -> bool {
        self.languages.contains(code)
    }

    fn supports(&self, code: &str) -> bool {
        self.lists(code) || (self.open_coverage && is_known_code(code))
    }
}

/// Everything the selector needs to know about the available backends
#[derive(Debug, Clone)]
pub struct BackendCatalog {
    /// Fast backend covering many common languages
    pub broad: BackendProfile,
    /// Slower backend specialised in a low-resource family
    pub specialist: BackendProfile,
    /// Family prefix handled by the specialist, e.g. `rm`
    pub specialist_family: String,
    /// Partner languages for which the specialist is preferred
    pub preferred_for_specialist: HashSet<String>,
}

impl BackendCatalog {
    fn in_family(&self, code: &str) -> bool {
        is_language_family(code, &self.specialist_family)
    }

    /// Whether a backend can translate a code
    ///
    /// The specialist accepts every member of its family in addition to its
    /// own coverage; the broad backend only accepts its own coverage.
    pub fn supports(&self, id: BackendId, code: &str) -> bool {
        if id == self.specialist.id {
            self.specialist.supports(code) || self.in_family(code)
        } else if id == self.broad.id {
            self.broad.supports(code)
        } else {
            false
        }
    }

    /// Whether a backend can translate both sides of a pair
    pub fn supports_pair(&self, id: BackendId, pair: &LanguagePair) -> bool {
        self.supports(id, &pair.source) && self.supports(id, &pair.target)
    }

    /// Languages of the union of both backends, sorted
    pub fn all_languages(&self) -> Vec<String> {
        let mut codes: Vec<String> = self
            .broad
            .languages
            .union(&self.specialist.languages)
            .cloned()
            .collect();
        codes.sort();
        codes
    }
}

/// Which rule produced a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionReason {
    /// Specialist family paired with a preferred partner language
    SpecialistPreferred,
    /// Specialist family with another partner the broad backend covers
    SpecialistViaBroadCoverage,
    /// Specialist family the broad backend cannot handle
    SpecialistFallback,
    /// Common pair covered by the broad backend
    BroadCoverage,
    /// Anything else goes to the specialist
    CatchAll,
    /// The caller picked the backend
    Forced,
    /// No backend covers the pair
    Unsupported,
}

/// Outcome of engine selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineDecision {
    pub backend: Option<BackendId>,
    pub reason: SelectionReason,
}

impl EngineDecision {
    fn chosen(backend: BackendId, reason: SelectionReason) -> Self {
        Self {
            backend: Some(backend),
            reason,
        }
    }

    fn unsupported() -> Self {
        Self {
            backend: None,
            reason: SelectionReason::Unsupported,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.backend.is_some()
    }
}

/// Pick the backend for a language pair.
///
/// Rules, first match wins:
/// 1. specialist family on one side, preferred partner on the other: specialist
/// 2. specialist family otherwise: broad backend if it has both codes, else specialist
/// 3. both codes in the broad table: broad backend
/// 4. specialist as catch-all
///
/// The winner must support both codes, otherwise the pair is unsupported.
pub fn select_engine(pair: &LanguagePair, catalog: &BackendCatalog) -> EngineDecision {
    let source_special = catalog.in_family(&pair.source);
    let target_special = catalog.in_family(&pair.target);
    let preferred = |code: &str| catalog.preferred_for_specialist.contains(code);

    let (backend, reason) = if (source_special && preferred(&pair.target))
        || (target_special && preferred(&pair.source))
    {
        (catalog.specialist.id, SelectionReason::SpecialistPreferred)
    } else if source_special || target_special {
        if catalog.broad.lists(&pair.source) && catalog.broad.lists(&pair.target) {
            (catalog.broad.id, SelectionReason::SpecialistViaBroadCoverage)
        } else {
            (catalog.specialist.id, SelectionReason::SpecialistFallback)
        }
    } else if catalog.broad.lists(&pair.source) && catalog.broad.lists(&pair.target) {
        (catalog.broad.id, SelectionReason::BroadCoverage)
    } else {
        (catalog.specialist.id, SelectionReason::CatchAll)
    };

    if !catalog.supports_pair(backend, pair) {
        debug!("No backend supports {} (rule {:?} picked {})", pair, reason, backend);
        return EngineDecision::unsupported();
    }

    debug!("Selected {} for {} ({:?})", backend, pair, reason);
    EngineDecision::chosen(backend, reason)
}

/// Use a caller-chosen backend, checking that it supports the pair
pub fn force_engine(pair: &LanguagePair, catalog: &BackendCatalog, backend: BackendId) -> EngineDecision {
    if catalog.supports_pair(backend, pair) {
        EngineDecision::chosen(backend, SelectionReason::Forced)
    } else {
        EngineDecision::unsupported()
    }
}
