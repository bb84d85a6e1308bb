/*!
 * Language utilities for ISO language code handling.
 *
 * Digest languages arrive as ISO 639-1 (2-letter) or ISO 639-2 (3-letter)
 * codes from the CLI or config file. This module validates them, compares
 * them across the two formats, and resolves the English language name used
 * in AI prompts.
 */

use isolang::Language;

use crate::errors::ConfigurationError;

// ISO 639-2/B codes that differ from the /T code isolang resolves
const PART2B_ALIASES: &[(&str, &str)] = &[
    ("fre", "fra"), // French
    ("ger", "deu"), // German
    ("dut", "nld"), // Dutch
    ("gre", "ell"), // Greek
    ("chi", "zho"), // Chinese
    ("cze", "ces"), // Czech
    ("per", "fas"), // Persian
    ("rum", "ron"), // Romanian
    ("slo", "slk"), // Slovak
];

/// Resolve a 2- or 3-letter code to its ISO 639-3 form
fn to_part3(code: &str) -> Option<String> {
    let normalized = code.trim().to_lowercase();
    match normalized.len() {
        2 => Language::from_639_1(&normalized).map(|lang| lang.to_639_3().to_string()),
        3 => {
            if Language::from_639_3(&normalized).is_some() {
                return Some(normalized);
            }
            PART2B_ALIASES
                .iter()
                .find(|(b, _)| *b == normalized)
                .map(|(_, t)| (*t).to_string())
        }
        _ => None,
    }
}

/// Validate that a code is a known ISO 639-1 or ISO 639-2 language code
pub fn validate_language_code(code: &str) -> Result<(), ConfigurationError> {
    to_part3(code)
        .map(|_| ())
        .ok_or_else(|| ConfigurationError::InvalidLanguage(code.to_string()))
}

/// Check whether two codes name the same language ("en" matches "eng")
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (to_part3(code1), to_part3(code2)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// English name of a language, for AI prompts.
///
/// Codes are validated before the pipeline starts, so an unknown code here
/// just echoes back unchanged instead of failing the prompt build.
pub fn language_name(code: &str) -> String {
    to_part3(code)
        .and_then(|part3| Language::from_639_3(&part3))
        .map(|lang| lang.to_name().to_string())
        .unwrap_or_else(|| code.to_string())
}
