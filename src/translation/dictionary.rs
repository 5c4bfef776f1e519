/*!
 * Terminology dictionary matching and priming.
 *
 * A per-language dictionary maps source terms to the translations the
 * project insists on. Entries containing a known term get the term injected
 * into the request as a worked example, and the conversation is primed so
 * the model actually reuses it: structured examples alone are routinely
 * ignored unless reinforced by an explicit natural-language directive.
 */

use anyhow::{Context, Result};
use log::{debug, warn};
use std::collections::HashSet;
use std::path::Path;

use crate::catalog::CatalogEntry;
use crate::language_utils::normalize_locale;
use crate::providers::ChatMessage;
use crate::translation::protocol;

/// Ordered source→target term list for one language
pub type Dictionary = Vec<(String, String)>;

/// Cap on injected examples per batch, bounding prompt growth
pub const MAX_MATCHES_PER_BATCH: usize = 10;

/// One term pair selected for a batch
#[derive(Debug, Clone, PartialEq)]
pub struct DictionaryMatch {
    /// Source-language term
    pub source: String,

    /// Required target-language translation
    pub target: String,
}

/// Find the dictionary terms that occur in a batch.
///
/// Matching is case-sensitive substring containment over msgid and
/// msgid_plural; token boundaries are deliberately not required, trading
/// precision for recall and trusting the model's judgement. Results keep
/// dictionary order, deduplicated by source term and capped at
/// [`MAX_MATCHES_PER_BATCH`].
pub fn find_matches(batch: &[CatalogEntry], dictionary: &Dictionary) -> Vec<DictionaryMatch> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut matches = Vec::new();

    for (source, target) in dictionary {
        if matches.len() >= MAX_MATCHES_PER_BATCH {
            break;
        }
        if source.is_empty() || !seen.insert(source.as_str()) {
            continue;
        }

        let occurs = batch.iter().any(|entry| {
            entry.msgid.contains(source)
                || entry
                    .msgid_plural
                    .as_deref()
                    .is_some_and(|plural| plural.contains(source))
        });

        if occurs {
            matches.push(DictionaryMatch {
                source: source.clone(),
                target: target.clone(),
            });
        }
    }

    matches
}

/// Load the dictionary for a language from `<dir>/<language>.json`.
///
/// Falls back to the normalized primary subtag file; a missing file is an
/// empty dictionary, not an error.
pub fn load_dictionary(dir: &Path, language: &str) -> Result<Dictionary> {
    let exact = dir.join(format!("{}.json", language));
    let normalized = dir.join(format!("{}.json", normalize_locale(language)));

    let path = if exact.exists() {
        exact
    } else if normalized.exists() {
        normalized
    } else {
        debug!("No dictionary file for {} in {}", language, dir.display());
        return Ok(Vec::new());
    };

    let content = crate::file_utils::read_text(&path)?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse dictionary: {}", path.display()))?;

    let object = value
        .as_object()
        .with_context(|| format!("Dictionary is not a JSON object: {}", path.display()))?;

    let mut dictionary = Vec::with_capacity(object.len());
    for (source, target) in object {
        match target.as_str() {
            Some(target) => dictionary.push((source.clone(), target.to_string())),
            None => warn!(
                "Ignoring non-string dictionary value for \"{}\" in {}",
                source,
                path.display()
            ),
        }
    }

    Ok(dictionary)
}

/// Synthesize the priming exchange for a batch's dictionary matches.
///
/// Two messages: the assistant's "answer" for the example indices, then an
/// instruction demanding exact reuse, naming one or two of the terms.
pub fn priming_messages(matches: &[DictionaryMatch]) -> Vec<ChatMessage> {
    if matches.is_empty() {
        return Vec::new();
    }

    let echo = protocol::encode_dictionary_echo(matches);

    let mut instruction = format!(
        "The first {} entries are glossary terms you already translated above. \
         Reuse those exact translations wherever the terms appear",
        matches.len()
    );
    for example in matches.iter().take(2) {
        instruction.push_str(&format!(
            "; for example, always render \"{}\" as \"{}\"",
            example.source, example.target
        ));
    }
    instruction.push_str(". Now translate the remaining entries in the same tagged format.");

    vec![
        ChatMessage::assistant(echo),
        ChatMessage::user(instruction),
    ]
}
