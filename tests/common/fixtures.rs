/*!
 * Shared fixtures: catalog builders, fast engine settings, and a mock
 * responder that answers any request document correctly.
 */

use regex::Regex;

use potrans::app_config::TranslationSettings;
use potrans::catalog::{Catalog, CatalogEntry};
use potrans::providers::ChatRequest;

/// Route engine logs through env_logger so RUST_LOG works in test runs
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// An untranslated singular entry
pub fn entry(msgid: &str) -> CatalogEntry {
    CatalogEntry::new(msgid)
}

/// An untranslated plural entry
pub fn plural_entry(msgid: &str, plural: &str) -> CatalogEntry {
    let mut e = CatalogEntry::new(msgid);
    e.msgid_plural = Some(plural.to_string());
    e.msgstr = vec![String::new(), String::new()];
    e
}

/// An entry that already carries a translation
pub fn translated_entry(msgid: &str, translation: &str) -> CatalogEntry {
    let mut e = CatalogEntry::new(msgid);
    e.msgstr = vec![translation.to_string()];
    e
}

/// A catalog without a header, built from the given entries
pub fn catalog_of(entries: Vec<CatalogEntry>) -> Catalog {
    Catalog {
        header: None,
        entries,
    }
}

/// A catalog of `count` generated untranslated entries
pub fn catalog_with_entries(count: usize) -> Catalog {
    catalog_of((0..count).map(|i| entry(&format!("String number {}", i))).collect())
}

/// Engine settings tuned for fast tests: tiny retry delay, no remote model
/// assumptions. Individual tests override what they exercise.
pub fn fast_settings() -> TranslationSettings {
    TranslationSettings {
        retry_delay_ms: 25,
        request_timeout_secs: 5,
        ..TranslationSettings::default()
    }
}

/// Build a responder that answers every block of the request document,
/// prefixing translations with `prefix`. Plural entries get the full set of
/// forms their `forms` attribute asks for. Dictionary example blocks are
/// answered too, as a real model echoing its primed examples would.
pub fn echo_responder(
    prefix: &'static str,
) -> impl Fn(&ChatRequest) -> String + Send + Sync + 'static {
    move |request: &ChatRequest| {
        let block_re = Regex::new(r#"(?s)<string id="(\d+)"([^>]*)>(.*?)</string>"#).unwrap();
        let forms_re = Regex::new(r#"forms="(\d+)""#).unwrap();

        let document = request
            .messages
            .iter()
            .find(|message| message.role == "user")
            .map(|message| message.content.clone())
            .unwrap_or_default();

        let mut reply = String::new();
        for caps in block_re.captures_iter(&document) {
            let id = &caps[1];
            let attrs = &caps[2];
            let body = &caps[3];

            match forms_re.captures(attrs) {
                Some(forms) => {
                    let count: usize = forms[1].parse().unwrap();
                    reply.push_str(&format!("<string id=\"{}\">", id));
                    for form in 0..count {
                        reply.push_str(&format!("<f{}>{} {} #{}</f{}>", form, prefix, body, form, form));
                    }
                    reply.push_str("</string>\n");
                }
                None => {
                    reply.push_str(&format!(
                        "<string id=\"{}\">{} {}</string>\n",
                        id, prefix, body
                    ));
                }
            }
        }
        reply
    }
}

/// A responder that only answers when the system prompt mentions
/// `language_name`; other languages get chatter with no tagged blocks,
/// which the pipeline treats as a failed attempt.
pub fn language_gated_responder(
    language_name: &'static str,
    prefix: &'static str,
) -> impl Fn(&ChatRequest) -> String + Send + Sync + 'static {
    let echo = echo_responder(prefix);
    move |request: &ChatRequest| {
        let targets_language = request
            .messages
            .iter()
            .any(|message| message.role == "system" && message.content.contains(language_name));

        if targets_language {
            echo(request)
        } else {
            "I would rather not translate this.".to_string()
        }
    }
}
