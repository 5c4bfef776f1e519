/*!
 * Tagged-block request/reply codec.
 *
 * Requests render each translatable entry as an indexed `<string>` block;
 * replies are scanned leniently for the same blocks. The producer of the
 * reply is a language model, so the decoder tolerates chatter around the
 * blocks, echoed examples, bad indices and missing forms. Decoding never
 * fails; degraded replies come back as empty forms plus validation stats,
 * and the retry layer decides what to do with them.
 *
 * Scanning and index resolution are split: `ReplyScanner` finds raw blocks,
 * `decode_reply` maps them onto batch positions. A stricter scanner can be
 * substituted without touching retry or budget logic.
 */

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::catalog::CatalogEntry;
use crate::translation::ValidationStats;
use crate::translation::dictionary::DictionaryMatch;

static BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<string\b[^>]*?\bid\s*=\s*"?(\d+)"?[^>]*>(.*?)</string>"#).unwrap()
});

static FORM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<f(\d+)>(.*?)</f\d+>").unwrap());

/// Escape text for embedding in a request block.
///
/// Only the five XML-special characters are transformed; everything else,
/// including placeholders and newlines, passes through untouched.
pub fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Decode the five entities back to literal characters.
///
/// `&amp;` is decoded last so model-injected double escapes like
/// `&amp;lt;` come back as `&lt;` rather than `<`.
pub fn unescape_text(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Render the request document for one batch.
///
/// Dictionary examples occupy indices `1..=D`; batch entries follow at
/// `D+1..`. Entries with a plural source carry it in a `plural` attribute,
/// which the instructions tie to the `<f0>..<fN>` reply format.
pub fn encode_request(
    batch: &[CatalogEntry],
    dictionary: &[DictionaryMatch],
    plural_forms: usize,
) -> String {
    let mut out = String::new();

    for (i, example) in dictionary.iter().enumerate() {
        out.push_str(&format!(
            "<string id=\"{}\">{}</string>\n",
            i + 1,
            escape_text(&example.source)
        ));
    }

    for (i, entry) in batch.iter().enumerate() {
        let index = dictionary.len() + i + 1;
        out.push_str(&format!("<string id=\"{}\"", index));

        if let Some(context) = &entry.msgctxt {
            out.push_str(&format!(" context=\"{}\"", escape_text(context)));
        }
        if let Some(plural) = &entry.msgid_plural {
            out.push_str(&format!(" plural=\"{}\"", escape_text(plural)));
            // Plural reply shape is repeated inline; models follow per-entry
            // reminders far more reliably than a single global instruction.
            out.push_str(&format!(" forms=\"{}\"", plural_forms));
        }

        out.push_str(&format!(">{}</string>\n", escape_text(&entry.msgid)));
    }

    out
}

/// Render the expected reply blocks for the dictionary examples.
///
/// Used as the assistant half of the priming exchange.
pub fn encode_dictionary_echo(dictionary: &[DictionaryMatch]) -> String {
    let mut out = String::new();
    for (i, example) in dictionary.iter().enumerate() {
        out.push_str(&format!(
            "<string id=\"{}\">{}</string>\n",
            i + 1,
            escape_text(&example.target)
        ));
    }
    out
}

/// A tagged block as found in a reply, before index resolution
#[derive(Debug, Clone, PartialEq)]
pub struct RawBlock {
    /// 1-based index from the block's id attribute
    pub index: usize,

    /// Unprocessed block body
    pub body: String,
}

/// Strategy for finding tagged blocks in a model reply
pub trait ReplyScanner: Send + Sync {
    /// Extract every recognizable block, in reply order
    fn scan(&self, reply: &str) -> Vec<RawBlock>;
}

/// Regex-based scanner that tolerates chatter and attribute noise
#[derive(Debug, Default, Clone, Copy)]
pub struct LenientTagScanner;

impl ReplyScanner for LenientTagScanner {
    fn scan(&self, reply: &str) -> Vec<RawBlock> {
        BLOCK_RE
            .captures_iter(reply)
            .filter_map(|caps| {
                let index = caps.get(1)?.as_str().parse().ok()?;
                Some(RawBlock {
                    index,
                    body: caps.get(2)?.as_str().to_string(),
                })
            })
            .collect()
    }
}

/// Result of decoding one reply against its batch
#[derive(Debug, Clone)]
pub struct DecodedBatch {
    /// One form list per batch entry, in batch order. Form counts are as
    /// found in the reply; plural validation normalizes them afterwards.
    pub forms: Vec<Vec<String>>,

    /// Issues found while decoding
    pub stats: ValidationStats,
}

impl DecodedBatch {
    /// True when the reply contained no usable block at all
    pub fn is_unparseable(&self) -> bool {
        self.stats.unparseable_replies > 0
    }
}

/// Decode a reply with the default lenient scanner
pub fn decode_reply(
    reply: &str,
    batch: &[CatalogEntry],
    dictionary_count: usize,
    plural_forms: usize,
) -> DecodedBatch {
    decode_reply_with(&LenientTagScanner, reply, batch, dictionary_count, plural_forms)
}

/// Decode a reply using the given scanner.
///
/// Blocks inside the dictionary range are the model's echo of the primed
/// examples and are discarded. Block index `D+k` maps to batch position
/// `k-1`; anything out of range is logged and ignored.
pub fn decode_reply_with(
    scanner: &dyn ReplyScanner,
    reply: &str,
    batch: &[CatalogEntry],
    dictionary_count: usize,
    plural_forms: usize,
) -> DecodedBatch {
    let mut stats = ValidationStats::default();
    let mut decoded: Vec<Option<Vec<String>>> = vec![None; batch.len()];

    let blocks = scanner.scan(reply);

    if blocks.is_empty() && !batch.is_empty() {
        warn!(
            "Reply contained no tagged blocks ({} chars); emitting empty forms for {} entries",
            reply.len(),
            batch.len()
        );
        stats.unparseable_replies += 1;
        stats.missing_entries += batch.len() as u64;
        return DecodedBatch {
            forms: batch.iter().map(|entry| empty_forms(entry, plural_forms)).collect(),
            stats,
        };
    }

    for block in blocks {
        if block.index >= 1 && block.index <= dictionary_count {
            // Echo of a primed dictionary example
            continue;
        }

        let position = match block
            .index
            .checked_sub(dictionary_count + 1)
            .filter(|position| *position < batch.len())
        {
            Some(position) => position,
            None => {
                warn!(
                    "Discarding reply block with out-of-range index {} (batch size {}, {} dictionary examples)",
                    block.index,
                    batch.len(),
                    dictionary_count
                );
                stats.discarded_blocks += 1;
                continue;
            }
        };

        decoded[position] = Some(parse_forms(&block.body, &batch[position], plural_forms));
    }

    let forms = decoded
        .into_iter()
        .zip(batch)
        .map(|(forms, entry)| match forms {
            Some(forms) => forms,
            None => {
                stats.missing_entries += 1;
                empty_forms(entry, plural_forms)
            }
        })
        .collect();

    DecodedBatch { forms, stats }
}

/// Split a block body into translated forms.
///
/// A body with `<f0>..` sub-tags is decoded form by form; positions without
/// a tag stay empty. A plain body for a plural entry degrades into form 0,
/// leaving the rest empty; plural validation flags it afterwards.
fn parse_forms(body: &str, entry: &CatalogEntry, plural_forms: usize) -> Vec<String> {
    let tagged: Vec<(usize, String)> = FORM_RE
        .captures_iter(body)
        .filter_map(|caps| {
            let index: usize = caps.get(1)?.as_str().parse().ok()?;
            Some((index, unescape_text(caps.get(2)?.as_str().trim())))
        })
        .collect();

    if tagged.is_empty() {
        return vec![unescape_text(body.trim())];
    }

    let expected = if entry.has_plural() { plural_forms } else { 1 };
    let len = tagged
        .iter()
        .map(|(index, _)| index + 1)
        .max()
        .unwrap_or(0)
        .max(expected);

    let mut forms = vec![String::new(); len];
    for (index, text) in tagged {
        forms[index] = text;
    }
    forms
}

fn empty_forms(entry: &CatalogEntry, plural_forms: usize) -> Vec<String> {
    let count = if entry.has_plural() { plural_forms } else { 1 };
    vec![String::new(); count]
}
