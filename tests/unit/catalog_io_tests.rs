/*!
 * Catalog file loading and writing tests
 */

use std::path::Path;

use potrans::catalog::{Catalog, TranslationResult};
use potrans::file_utils;

const SAMPLE: &str = r#"msgid ""
msgstr ""
"Project-Id-Version: sample 1.0\n"
"Content-Type: text/plain; charset=UTF-8\n"
"Language: en\n"

#. The application entry point
msgid "Welcome"
msgstr ""

msgid "%d unread message"
msgid_plural "%d unread messages"
msgstr[0] ""
msgstr[1] ""
"#;

#[test]
fn test_load_withTempFile_shouldParseEntries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("messages.po");
    std::fs::write(&path, SAMPLE).unwrap();

    let catalog = Catalog::load(&path).unwrap();
    assert_eq!(catalog.entries.len(), 2);
    assert_eq!(catalog.untranslated_count(), 2);
}

#[test]
fn test_load_withMissingFile_shouldFail() {
    assert!(Catalog::load(Path::new("does/not/exist.po")).is_err());
}

#[test]
fn test_write_then_load_shouldRoundTripTranslations() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("messages.po");
    std::fs::write(&input, SAMPLE).unwrap();

    let catalog = Catalog::load(&input).unwrap();
    let results = vec![
        TranslationResult {
            msgid: "Welcome".to_string(),
            msgctxt: None,
            forms: vec!["Bienvenue".to_string()],
        },
        TranslationResult {
            msgid: "%d unread message".to_string(),
            msgctxt: None,
            forms: vec!["%d message non lu".to_string(), "%d messages non lus".to_string()],
        },
    ];

    let merged = catalog.merge(&results, false);
    let output = file_utils::translated_catalog_path(&input, "fr", None);
    file_utils::write_text(&output, &merged.render(Some("fr"))).unwrap();

    let reloaded = Catalog::load(&output).unwrap();
    assert_eq!(reloaded.entries[0].msgstr, vec!["Bienvenue"]);
    assert_eq!(
        reloaded.entries[1].msgstr,
        vec!["%d message non lu", "%d messages non lus"]
    );
    assert_eq!(reloaded.untranslated_count(), 0);

    let header = reloaded.header.unwrap();
    assert!(header.msgstr[0].contains("Language: fr"));
    assert!(header.msgstr[0].contains("Project-Id-Version: sample 1.0"));
}

#[test]
fn test_render_shouldKeepExtractedComments() {
    let catalog = Catalog::parse(SAMPLE).unwrap();
    let rendered = catalog.render(None);
    assert!(rendered.contains("#. The application entry point"));
}
