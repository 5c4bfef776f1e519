/*!
 * Round-trip tests for the protocol codec: encode a batch, synthesize a
 * reply, decode it back.
 */

use crate::common::fixtures::{entry, plural_entry};
use potrans::translation::dictionary::DictionaryMatch;
use potrans::translation::protocol::{decode_reply, encode_request};

#[test]
fn test_roundtrip_withSingleFormEntries_shouldRecoverEveryValue() {
    let batch: Vec<_> = (0..8).map(|i| entry(&format!("Message {}", i))).collect();
    let document = encode_request(&batch, &[], 2);

    // Every request index answered with a recognizable value
    let reply: String = (0..8)
        .map(|i| format!("<string id=\"{}\">valeur {}</string>\n", i + 1, i))
        .collect();

    let decoded = decode_reply(&reply, &batch, 0, 2);
    for (i, forms) in decoded.forms.iter().enumerate() {
        assert_eq!(forms, &vec![format!("valeur {}", i)]);
    }
    assert!(!decoded.stats.has_issues());
    assert!(document.contains("<string id=\"8\">Message 7</string>"));
}

#[test]
fn test_roundtrip_withDictionaryExamples_shouldOffsetIndices() {
    let batch = vec![entry("alpha"), entry("beta"), entry("gamma")];
    let dictionary = vec![
        DictionaryMatch {
            source: "alpha".to_string(),
            target: "alpha-fr".to_string(),
        },
        DictionaryMatch {
            source: "beta".to_string(),
            target: "beta-fr".to_string(),
        },
    ];

    let document = encode_request(&batch, &dictionary, 2);
    // Dictionary occupies 1..=2, entries start at 3
    assert!(document.contains("<string id=\"1\">alpha</string>"));
    assert!(document.contains("<string id=\"3\">alpha</string>"));

    // The model echoes the examples and answers the real entries
    let reply = "\
<string id=\"1\">alpha-fr</string>
<string id=\"2\">beta-fr</string>
<string id=\"3\">un</string>
<string id=\"4\">deux</string>
<string id=\"5\">trois</string>";

    let decoded = decode_reply(reply, &batch, dictionary.len(), 2);
    assert_eq!(
        decoded.forms,
        vec![vec!["un"], vec!["deux"], vec!["trois"]]
    );
    assert!(!decoded.stats.has_issues());
}

#[test]
fn test_roundtrip_withEscapableCharacters_shouldSurviveBothDirections() {
    let batch = vec![entry(r#"Use <b> & "quotes" carefully"#)];
    let document = encode_request(&batch, &[], 2);
    assert!(document.contains("&lt;b&gt; &amp; &quot;quotes&quot;"));

    let reply = "<string id=\"1\">Utilisez &lt;b&gt; &amp; les &quot;guillemets&quot;</string>";
    let decoded = decode_reply(reply, &batch, 0, 2);
    assert_eq!(
        decoded.forms[0][0],
        r#"Utilisez <b> & les "guillemets""#
    );
}

#[test]
fn test_roundtrip_withPluralEntry_shouldCarryFormCountInRequest() {
    let batch = vec![plural_entry("%d apple", "%d apples")];
    let document = encode_request(&batch, &[], 3);
    assert!(document.contains("plural=\"%d apples\""));
    assert!(document.contains("forms=\"3\""));

    let reply = "<string id=\"1\"><f0>%d jablko</f0><f1>%d jablka</f1><f2>%d jablek</f2></string>";
    let decoded = decode_reply(reply, &batch, 0, 3);
    assert_eq!(
        decoded.forms[0],
        vec!["%d jablko", "%d jablka", "%d jablek"]
    );
}
