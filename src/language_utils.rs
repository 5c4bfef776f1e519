use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for locale code handling
///
/// Target languages arrive as ISO 639-1 codes, optionally with a region or
/// script subtag attached ("pt_BR", "zh-Hans"). The engine keys everything
/// off the normalized primary subtag and uses the English language name when
/// building prompts.
/// Normalize a locale code to its lowercased primary subtag.
///
/// "pt_BR" and "pt-br" both normalize to "pt". The input is not validated;
/// unknown codes pass through so callers can apply their own fallback.
pub fn normalize_locale(code: &str) -> String {
    let trimmed = code.trim().to_lowercase();
    trimmed
        .split(['_', '-'])
        .next()
        .unwrap_or(&trimmed)
        .to_string()
}

/// Validate that a locale code has a recognizable ISO 639 primary subtag
pub fn validate_language_code(code: &str) -> Result<()> {
    let primary = normalize_locale(code);

    let known = match primary.len() {
        2 => Language::from_639_1(&primary).is_some(),
        3 => Language::from_639_3(&primary).is_some(),
        _ => false,
    };

    if known {
        Ok(())
    } else {
        Err(anyhow!("Invalid language code: {}", code))
    }
}

/// Get the English language name for a locale code.
///
/// Used in prompts, where "Portuguese" steers the model far better than "pt".
/// Falls back to the raw code for unknown inputs so prompt building never fails.
pub fn language_display_name(code: &str) -> String {
    let primary = normalize_locale(code);

    let language = match primary.len() {
        2 => Language::from_639_1(&primary),
        3 => Language::from_639_3(&primary),
        _ => None,
    };

    match language {
        Some(lang) => lang.to_name().to_string(),
        None => code.to_string(),
    }
}
