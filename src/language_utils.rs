/*!
 * Language utilities for language code handling.
 *
 * Codes are mostly ISO 639-1 or ISO 639-3, plus the Romansh idiom
 * subtags (`rm-sursilv`, `rm-vallader`, ...) that isolang does not know.
 */

use anyhow::{Result, anyhow};
use isolang::Language;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Romansh idioms and their display names
static ROMANSH_VARIANTS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("rm", "Romansh"),
        ("rm-rumgr", "Romansh (Rumantsch Grischun)"),
        ("rm-sursilv", "Romansh (Sursilvan)"),
        ("rm-sutsilv", "Romansh (Sutsilvan)"),
        ("rm-surmiran", "Romansh (Surmiran)"),
        ("rm-puter", "Romansh (Puter)"),
        ("rm-vallader", "Romansh (Vallader)"),
    ])
});

/// Check whether a code belongs to a language family given by its prefix.
///
/// A code is a member when it equals the prefix or extends it with a
/// `-` subtag, so `rm` covers `rm-vallader` but not `rmy`. The comparison
/// is exact: `RM-Puter` is not a member of `rm`.
pub fn is_language_family(code: &str, family: &str) -> bool {
    if family.is_empty() {
        return false;
    }

    code == family
        || code
            .strip_prefix(family)
            .is_some_and(|rest| rest.starts_with('-'))
}

/// Whether a code is, as written, a Romansh idiom or an ISO 639 code
///
/// Unlike `validate_language_code` nothing is trimmed or lowercased, and
/// regional subtags are not stripped.
pub fn is_known_code(code: &str) -> bool {
    ROMANSH_VARIANTS.contains_key(code) || lookup(code).is_some()
}

/// Look up a language from an ISO 639-1 or ISO 639-3 code
fn lookup(code: &str) -> Option<Language> {
    match code.len() {
        2 => Language::from_639_1(code),
        3 => Language::from_639_3(code),
        _ => None,
    }
}

/// Validate a language code, accepting ISO codes and Romansh idioms
pub fn validate_language_code(code: &str) -> Result<()> {
    get_language_name(code).map(|_| ())
}

/// Get the language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized = code.trim().to_lowercase();

    if let Some(name) = ROMANSH_VARIANTS.get(normalized.as_str()) {
        return Ok(name.to_string());
    }

    // Primary subtag only, so regional tags like `de-CH` still resolve
    let primary = normalized.split('-').next().unwrap_or_default();
    let lang = lookup(primary)
        .ok_or_else(|| anyhow!("Invalid language code: {}", code))?;

    Ok(lang.to_name().to_string())
}

/// Get a display name for a code, falling back to the code itself
pub fn display_name(code: &str) -> String {
    get_language_name(code).unwrap_or_else(|_| code.to_string())
}

/// All known Romansh idiom codes, sorted
pub fn romansh_variants() -> Vec<&'static str> {
    let mut codes: Vec<&'static str> = ROMANSH_VARIANTS.keys().copied().collect();
    codes.sort_unstable();
    codes
}
