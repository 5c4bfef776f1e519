/*!
 * Gettext catalog handling.
 *
 * This module contains the catalog data model used by the translation engine,
 * a minimal PO parser/writer, and the merge step that overlays freshly
 * translated entries onto the source catalog.
 *
 * The parser covers the subset of PO emitted by common extraction tools:
 * translator/extracted comments, `msgctxt`, `msgid`, `msgid_plural`,
 * `msgstr`/`msgstr[N]` and multi-line string continuations. Obsolete entries
 * (`#~`) are dropped on load.
 */

use std::collections::HashMap;
use std::path::Path;

use crate::errors::CatalogError;

/// One translatable unit of a catalog.
///
/// Identity for merge purposes is `(msgid, msgctxt)`. The engine never
/// mutates loaded entries; translation produces an overlay that `merge`
/// applies onto a fresh copy.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    /// Source text (msgid)
    pub msgid: String,

    /// Disambiguating context (msgctxt), if any
    pub msgctxt: Option<String>,

    /// Plural source text (msgid_plural), if any
    pub msgid_plural: Option<String>,

    /// Raw comment lines preceding the entry, including the leading `#`
    pub comments: Vec<String>,

    /// Existing translation forms. One element for non-plural entries,
    /// one per plural form otherwise. Empty strings mean untranslated.
    pub msgstr: Vec<String>,
}

impl CatalogEntry {
    /// Create an untranslated entry with just a msgid
    pub fn new(msgid: impl Into<String>) -> Self {
        Self {
            msgid: msgid.into(),
            msgctxt: None,
            msgid_plural: None,
            comments: Vec::new(),
            msgstr: vec![String::new()],
        }
    }

    /// Merge identity of this entry
    pub fn key(&self) -> (String, Option<String>) {
        (self.msgid.clone(), self.msgctxt.clone())
    }

    /// Whether the entry already carries a complete non-empty translation
    pub fn is_translated(&self) -> bool {
        !self.msgstr.is_empty() && self.msgstr.iter().all(|form| !form.is_empty())
    }

    /// Whether the entry has a plural source
    pub fn has_plural(&self) -> bool {
        self.msgid_plural.is_some()
    }
}

/// Translation produced for one entry during a run
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationResult {
    /// Source text of the translated entry
    pub msgid: String,

    /// Context of the translated entry, if any
    pub msgctxt: Option<String>,

    /// Translated forms, already normalized to the target language's
    /// plural form count
    pub forms: Vec<String>,
}

/// A parsed message catalog: the header entry plus translatable entries
/// in file order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    /// The header entry (empty msgid), passed through on write
    pub header: Option<CatalogEntry>,

    /// Translatable entries in original file order
    pub entries: Vec<CatalogEntry>,
}

/// Which logical string a continuation line appends to
#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    Msgctxt,
    Msgid,
    MsgidPlural,
    Msgstr(usize),
}

/// Accumulator for the entry currently being parsed
#[derive(Default)]
struct EntryBuilder {
    comments: Vec<String>,
    msgctxt: Option<String>,
    msgid: Option<String>,
    msgid_plural: Option<String>,
    msgstr: Vec<(usize, String)>,
    current: Option<Field>,
}

impl EntryBuilder {
    fn is_empty(&self) -> bool {
        self.comments.is_empty() && self.msgid.is_none() && self.current.is_none()
    }

    /// True once any msgstr has been seen, meaning a following keyword
    /// starts the next entry.
    fn in_msgstr(&self) -> bool {
        matches!(self.current, Some(Field::Msgstr(_)))
    }

    fn append(&mut self, chunk: String, line: usize) -> Result<(), CatalogError> {
        let field = self.current.ok_or(CatalogError::Parse {
            line,
            message: "string continuation without a preceding keyword".to_string(),
        })?;

        match field {
            Field::Msgctxt => self.msgctxt.get_or_insert_with(String::new).push_str(&chunk),
            Field::Msgid => self.msgid.get_or_insert_with(String::new).push_str(&chunk),
            Field::MsgidPlural => self
                .msgid_plural
                .get_or_insert_with(String::new)
                .push_str(&chunk),
            Field::Msgstr(index) => match self.msgstr.iter_mut().find(|(i, _)| *i == index) {
                Some((_, text)) => text.push_str(&chunk),
                None => self.msgstr.push((index, chunk)),
            },
        }
        Ok(())
    }

    fn build(mut self, line: usize) -> Result<Option<CatalogEntry>, CatalogError> {
        if self.is_empty() {
            return Ok(None);
        }

        let msgid = self.msgid.ok_or(CatalogError::Parse {
            line,
            message: "entry without msgid".to_string(),
        })?;

        self.msgstr.sort_by_key(|(index, _)| *index);
        let form_count = self
            .msgstr
            .iter()
            .map(|(index, _)| index + 1)
            .max()
            .unwrap_or(1);

        let mut forms = vec![String::new(); form_count];
        for (index, text) in self.msgstr {
            forms[index] = text;
        }

        Ok(Some(CatalogEntry {
            msgid,
            msgctxt: self.msgctxt,
            msgid_plural: self.msgid_plural,
            comments: self.comments,
            msgstr: forms,
        }))
    }
}

impl Catalog {
    /// Parse catalog content in PO format
    pub fn parse(content: &str) -> Result<Self, CatalogError> {
        let mut catalog = Catalog::default();
        let mut builder = EntryBuilder::default();

        for (line_index, raw_line) in content.lines().enumerate() {
            let line_no = line_index + 1;
            let line = raw_line.trim();

            if line.is_empty() {
                catalog.push_built(std::mem::take(&mut builder).build(line_no)?);
                continue;
            }

            if line.starts_with("#~") {
                // Obsolete entry, dropped on load
                continue;
            }

            if line.starts_with('#') {
                if builder.in_msgstr() {
                    catalog.push_built(std::mem::take(&mut builder).build(line_no)?);
                }
                builder.comments.push(line.to_string());
                continue;
            }

            if let Some(rest) = line.strip_prefix("msgctxt ") {
                if builder.in_msgstr() {
                    catalog.push_built(std::mem::take(&mut builder).build(line_no)?);
                }
                builder.current = Some(Field::Msgctxt);
                builder.append(parse_quoted(rest, line_no)?, line_no)?;
            } else if let Some(rest) = line.strip_prefix("msgid_plural ") {
                builder.current = Some(Field::MsgidPlural);
                builder.append(parse_quoted(rest, line_no)?, line_no)?;
            } else if let Some(rest) = line.strip_prefix("msgid ") {
                if builder.in_msgstr() {
                    catalog.push_built(std::mem::take(&mut builder).build(line_no)?);
                }
                builder.current = Some(Field::Msgid);
                builder.append(parse_quoted(rest, line_no)?, line_no)?;
            } else if let Some(rest) = line.strip_prefix("msgstr[") {
                let close = rest.find(']').ok_or(CatalogError::Parse {
                    line: line_no,
                    message: "unterminated msgstr index".to_string(),
                })?;
                let index: usize =
                    rest[..close].parse().map_err(|_| CatalogError::Parse {
                        line: line_no,
                        message: format!("invalid msgstr index: {}", &rest[..close]),
                    })?;
                builder.current = Some(Field::Msgstr(index));
                builder.append(parse_quoted(&rest[close + 1..], line_no)?, line_no)?;
            } else if let Some(rest) = line.strip_prefix("msgstr ") {
                builder.current = Some(Field::Msgstr(0));
                builder.append(parse_quoted(rest, line_no)?, line_no)?;
            } else if line.starts_with('"') {
                builder.append(parse_quoted(line, line_no)?, line_no)?;
            } else {
                return Err(CatalogError::Parse {
                    line: line_no,
                    message: format!("unexpected line: {}", line),
                });
            }
        }

        let final_line = content.lines().count();
        catalog.push_built(builder.build(final_line)?);

        Ok(catalog)
    }

    /// Load a catalog from a PO file
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    fn push_built(&mut self, entry: Option<CatalogEntry>) {
        let Some(entry) = entry else { return };

        if entry.msgid.is_empty() && self.header.is_none() && self.entries.is_empty() {
            self.header = Some(entry);
        } else {
            self.entries.push(entry);
        }
    }

    /// Render the catalog back to PO text.
    ///
    /// When `language` is given the header's `Language:` field is rewritten
    /// (or appended) for the target language; everything else in the header
    /// passes through untouched.
    pub fn render(&self, language: Option<&str>) -> String {
        let mut out = String::new();

        if let Some(header) = &self.header {
            let mut header = header.clone();
            if let (Some(lang), Some(text)) = (language, header.msgstr.first_mut()) {
                *text = set_header_language(text, lang);
            }
            render_entry(&mut out, &header);
            out.push('\n');
        }

        for (i, entry) in self.entries.iter().enumerate() {
            render_entry(&mut out, entry);
            if i + 1 < self.entries.len() {
                out.push('\n');
            }
        }

        out
    }

    /// Overlay translation results onto this catalog, preserving entry order.
    ///
    /// An entry is replaced only when a result exists for its key and the
    /// entry either has no complete translation yet or `force_translate`
    /// is set. Existing translations are never silently dropped otherwise.
    pub fn merge(&self, results: &[TranslationResult], force_translate: bool) -> Catalog {
        let by_key: HashMap<(&str, Option<&str>), &TranslationResult> = results
            .iter()
            .map(|result| ((result.msgid.as_str(), result.msgctxt.as_deref()), result))
            .collect();

        let entries = self
            .entries
            .iter()
            .map(|entry| {
                let mut merged = entry.clone();
                let key = (entry.msgid.as_str(), entry.msgctxt.as_deref());
                if let Some(result) = by_key.get(&key) {
                    if (force_translate || !entry.is_translated()) && !result.forms.is_empty() {
                        merged.msgstr = result.forms.clone();
                    }
                }
                merged
            })
            .collect();

        Catalog {
            header: self.header.clone(),
            entries,
        }
    }

    /// Count of entries without a complete translation
    pub fn untranslated_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_translated()).count()
    }
}

/// Parse the quoted remainder of a PO line into its unescaped content
fn parse_quoted(raw: &str, line: usize) -> Result<String, CatalogError> {
    let trimmed = raw.trim();
    if trimmed.len() < 2 || !trimmed.starts_with('"') || !trimmed.ends_with('"') {
        return Err(CatalogError::Parse {
            line,
            message: format!("expected quoted string, got: {}", raw),
        });
    }
    Ok(unescape_po(&trimmed[1..trimmed.len() - 1]))
}

fn unescape_po(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                // Unknown escape, keep it verbatim
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}

fn escape_po(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\t', "\\t")
        .replace('\r', "\\r")
}

fn render_entry(out: &mut String, entry: &CatalogEntry) {
    for comment in &entry.comments {
        out.push_str(comment);
        out.push('\n');
    }

    if let Some(context) = &entry.msgctxt {
        out.push_str(&format!("msgctxt \"{}\"\n", escape_po(context)));
    }

    out.push_str(&format!("msgid \"{}\"\n", escape_po(&entry.msgid)));

    match &entry.msgid_plural {
        Some(plural) => {
            out.push_str(&format!("msgid_plural \"{}\"\n", escape_po(plural)));
            for (index, form) in entry.msgstr.iter().enumerate() {
                out.push_str(&format!("msgstr[{}] \"{}\"\n", index, escape_po(form)));
            }
        }
        None => {
            let form = entry.msgstr.first().map(String::as_str).unwrap_or("");
            out.push_str(&format!("msgstr \"{}\"\n", escape_po(form)));
        }
    }
}

/// Rewrite or append the `Language:` field of a header block
fn set_header_language(header: &str, language: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut replaced = false;

    for line in header.lines() {
        if line.starts_with("Language:") {
            lines.push(format!("Language: {}", language));
            replaced = true;
        } else {
            lines.push(line.to_string());
        }
    }

    if !replaced {
        lines.push(format!("Language: {}", language));
    }

    let mut out = lines.join("\n");
    if header.ends_with('\n') || !replaced {
        out.push('\n');
    }
    out
}
