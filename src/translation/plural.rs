/*!
 * Plural form policy.
 *
 * Gettext catalogs carry a language-specific number of plural forms. The
 * engine asks the model for exactly that many forms and normalizes whatever
 * comes back, so downstream code can rely on every translated entry having
 * the right form count.
 */

use crate::language_utils::normalize_locale;

/// Number of grammatical plural forms the target language requires.
///
/// Keyed by the normalized primary subtag; unknown languages fall back to
/// the common singular/plural split.
pub fn required_forms(language: &str) -> usize {
    match normalize_locale(language).as_str() {
        // Analytic languages without grammatical plural
        "ja" | "zh" | "ko" | "th" | "vi" | "id" | "ms" => 1,
        // Slavic-family three-way split (one/few/many)
        "ru" | "uk" | "be" | "pl" | "cs" | "sk" | "sr" | "hr" | "bs" | "lt" => 3,
        // Slovenian adds a dual
        "sl" => 4,
        // Arabic numeric classes
        "ar" => 6,
        _ => 2,
    }
}

/// Forms normalized to the expected count, with the issues found on the way
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedForms {
    /// Forms padded or truncated to exactly the expected count
    pub forms: Vec<String>,

    /// The reply carried fewer forms than expected (padded with empties)
    pub insufficient: bool,

    /// The reply carried more forms than expected (truncated from the end)
    pub excess: bool,

    /// Count was correct but some forms were empty, likely a partial answer
    pub incomplete: bool,
}

impl ValidatedForms {
    /// Whether validation recorded any issue
    pub fn has_issues(&self) -> bool {
        self.insufficient || self.excess || self.incomplete
    }
}

/// Normalize a decoded form list to the expected count.
///
/// Padding and truncation are corrective; the incomplete flag is advisory
/// only and leaves content untouched.
pub fn validate_forms(mut forms: Vec<String>, expected: usize) -> ValidatedForms {
    let original_len = forms.len();

    let insufficient = original_len < expected;
    let excess = original_len > expected;
    let incomplete = original_len == expected
        && forms.iter().any(|form| form.is_empty())
        && forms.iter().any(|form| !form.is_empty());

    if insufficient {
        forms.resize(expected, String::new());
    } else if excess {
        forms.truncate(expected);
    }

    ValidatedForms {
        forms,
        insufficient,
        excess,
        incomplete,
    }
}
