use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::io;

use proptest::prelude::*;

use super::*;
use crate::charclass::{CharClass, XmlVersion};
use crate::error::Error;

const VERSIONS: [XmlVersion; 2] = [XmlVersion::V1_0, XmlVersion::V1_1];

const CLASSES: [CharClass; 5] = [
    CharClass::ElementName,
    CharClass::AttributeName,
    CharClass::AttributeValue,
    CharClass::Text,
    CharClass::CData,
];

fn quiet(_: &str, _: &BTreeSet<char>) {}

fn mask(
    version: XmlVersion,
    class: CharClass,
    policy: IncorrectCharPolicy<'_>,
    text: &str,
) -> String {
    masked_xml_text(version, class, policy, text).into_owned()
}

fn mask_to(
    version: XmlVersion,
    class: CharClass,
    policy: IncorrectCharPolicy<'_>,
    text: &str,
) -> String {
    let mut out = Vec::new();
    mask_xml_text_to(version, class, policy, text, &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

/// Notifier that records every call.
#[derive(Default)]
struct Recorder {
    calls: RefCell<Vec<(String, BTreeSet<char>)>>,
}

impl InvalidCharNotifier for Recorder {
    fn notify(&self, text: &str, invalid: &BTreeSet<char>) {
        self.calls.borrow_mut().push((text.to_string(), invalid.clone()));
    }
}

impl Recorder {
    fn count(&self) -> usize {
        self.calls.borrow().len()
    }
}

// === Built-in tables ===

#[test]
fn test_table_shapes() {
    // NUL + 5 reserved
    assert_eq!(XML10.len(), 6);
    // plus 28 C0 controls, DEL and 31 C1 controls
    assert_eq!(XML11.len(), 66);
    assert_eq!(ALL_EMPTY.len(), 66);
    for table in [&*XML10, &*XML11, &*ALL_EMPTY] {
        assert_eq!(table.patterns()[0], '\0');
        assert_eq!(table.replacement(0), "");
        assert_eq!(table.patterns()[1..6], ['&', '<', '>', '"', '\'']);
    }
    assert!(std::ptr::eq(masking_table(XmlVersion::V1_0), &*XML10));
    assert!(std::ptr::eq(masking_table(XmlVersion::V1_1), &*XML11));
}

#[test]
fn test_xml11_controls_become_char_refs() {
    let v = XmlVersion::V1_1;
    let p = IncorrectCharPolicy::PASS_THROUGH;
    assert_eq!(mask(v, CharClass::Text, p, "\u{1}"), "&#1;");
    assert_eq!(mask(v, CharClass::Text, p, "\u{1F}"), "&#31;");
    assert_eq!(mask(v, CharClass::Text, p, "\u{7F}\u{9F}"), "&#127;&#159;");
    // TAB, LF, CR and NEL stay
    assert_eq!(mask(v, CharClass::Text, p, "\t\n\r\u{85}"), "\t\n\r\u{85}");
}

#[test]
fn test_xml10_leaves_controls_when_not_stripping() {
    let p = IncorrectCharPolicy::PASS_THROUGH;
    assert_eq!(mask(XmlVersion::V1_0, CharClass::Text, p, "a\u{1}b"), "a\u{1}b");
}

#[test]
fn test_nul_is_deleted() {
    for version in VERSIONS {
        let p = IncorrectCharPolicy::PASS_THROUGH;
        assert_eq!(mask(version, CharClass::Text, p, "a\0b\0"), "ab");
    }
}

// === Reserved characters ===

#[test]
fn test_reserved_escaping_xml10() {
    let out = mask(
        XmlVersion::V1_0,
        CharClass::Text,
        IncorrectCharPolicy::PASS_THROUGH,
        "Hello <b>&\"'</b>",
    );
    assert_eq!(out, "Hello &lt;b&gt;&amp;&quot;&#39;&lt;/b&gt;");
}

#[test]
fn test_reserved_escaping_every_class() {
    for version in VERSIONS {
        for class in CLASSES {
            let out = mask(version, class, IncorrectCharPolicy::PASS_THROUGH, "a<b");
            assert_eq!(out, "a&lt;b", "{version} {class}");
        }
    }
}

#[test]
fn test_clean_text_is_borrowed() {
    let recorder = Recorder::default();
    let policy = IncorrectCharPolicy::STRIP_AND_REPORT.with_notifier(&recorder);
    let out = masked_xml_text(XmlVersion::V1_0, CharClass::Text, policy, "plain text");
    assert!(matches!(out, Cow::Borrowed("plain text")));
    assert_eq!(recorder.count(), 0);
}

// === Empty input ===

#[test]
fn test_empty_text() {
    let recorder = Recorder::default();
    let policy = IncorrectCharPolicy::REPORT.with_notifier(&recorder);
    for version in VERSIONS {
        for class in CLASSES {
            assert_eq!(masked_xml_text(version, class, policy, ""), "");
            assert_eq!(masked_xml_text_len(version, class, policy, ""), 0);
            assert_eq!(mask_to(version, class, policy, ""), "");
        }
    }
    // Absent text is passed as the empty string
    let absent: Option<&str> = None;
    assert_eq!(
        masked_xml_text(XmlVersion::V1_0, CharClass::Text, policy, absent.unwrap_or_default()),
        ""
    );
    assert_eq!(recorder.count(), 0);
}

// === Stripping ===

#[test]
fn test_strip_deletes_control_characters() {
    let p = IncorrectCharPolicy::STRIP;
    assert_eq!(mask(XmlVersion::V1_0, CharClass::Text, p, "a\u{1}b"), "ab");
}

#[test]
fn test_strip_deletes_c0_in_attributes_for_both_versions() {
    let p = IncorrectCharPolicy::new(true, false, true);
    for version in VERSIONS {
        for class in [CharClass::AttributeValue, CharClass::CData] {
            let out = mask(version, class, p, "a\u{1}b");
            assert_eq!(out, "ab", "{version} {class}");
            assert_eq!(masked_xml_text_len(version, class, p, "a\u{1}b"), 2);
            assert_eq!(mask_to(version, class, p, "a\u{1}b"), "ab");
        }
    }
}

#[test]
fn test_strip_table_ignores_version() {
    // 0x01 triggers the scan under either version; the deleting table then
    // drops 0x80 too, even under 1.0 where it is legal
    let p = IncorrectCharPolicy::STRIP;
    for version in VERSIONS {
        let out = mask(version, CharClass::AttributeValue, p, "a\u{1}b\u{80}c");
        assert_eq!(out, "abc", "{version}");
    }
}

#[test]
fn test_strip_still_escapes_markup() {
    let p = IncorrectCharPolicy::STRIP;
    let out = mask(XmlVersion::V1_0, CharClass::Text, p, "<\u{2}&>");
    assert_eq!(out, "&lt;&amp;&gt;");
}

#[test]
fn test_strip_keeps_non_control_invalid_chars() {
    // U+FFFE is reported but has no replacement
    let p = IncorrectCharPolicy::STRIP;
    let out = mask(XmlVersion::V1_0, CharClass::Text, p, "a\u{1}\u{FFFE}");
    assert_eq!(out, "a\u{FFFE}");
}

#[test]
fn test_strip_without_findings_uses_version_table() {
    // Text only: 0x01 is legal 1.1 text, so the scan finds nothing and the
    // control is escaped rather than deleted
    let p = IncorrectCharPolicy::STRIP;
    assert_eq!(mask(XmlVersion::V1_1, CharClass::Text, p, "a\u{1}b"), "a&#1;b");
}

#[test]
fn test_xml11_numeric_escape_without_strip() {
    let recorder = Recorder::default();
    let p = IncorrectCharPolicy::REPORT.with_notifier(&recorder);
    assert_eq!(mask(XmlVersion::V1_1, CharClass::Text, p, "a\u{1}b"), "a&#1;b");
    // 0x01 is legal 1.1 text
    assert_eq!(recorder.count(), 0);
}

// === Notification ===

#[test]
fn test_notify_fires_once_with_distinct_set() {
    let recorder = Recorder::default();
    let policy = IncorrectCharPolicy::REPORT.with_notifier(&recorder);
    let text = "\u{1}x\u{FFFE}y\u{1}\u{FFFE}";
    mask(XmlVersion::V1_0, CharClass::Text, policy, text);

    let calls = recorder.calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, text);
    assert_eq!(calls[0].1, BTreeSet::from(['\u{1}', '\u{FFFE}']));
}

#[test]
fn test_notify_from_each_entry_point() {
    let recorder = Recorder::default();
    let policy = IncorrectCharPolicy::REPORT.with_notifier(&recorder);
    let v = XmlVersion::V1_0;
    masked_xml_text(v, CharClass::Text, policy, "\u{1}");
    masked_xml_text_len(v, CharClass::Text, policy, "\u{1}");
    mask_to(v, CharClass::Text, policy, "\u{1}");
    assert_eq!(recorder.count(), 3);
}

#[test]
fn test_closure_notifier() {
    let seen = RefCell::new(BTreeSet::<char>::new());
    let notifier = |_: &str, invalid: &BTreeSet<char>| seen.borrow_mut().extend(invalid);
    let policy = IncorrectCharPolicy::STRIP_AND_REPORT.with_notifier(&notifier);
    let out = mask(XmlVersion::V1_1, CharClass::AttributeValue, policy, "x\u{86}");
    assert_eq!(out, "x");
    assert_eq!(*seen.borrow(), BTreeSet::from(['\u{86}']));
}

#[test]
fn test_name_classes_report_bad_start() {
    let recorder = Recorder::default();
    let policy = IncorrectCharPolicy::REPORT.with_notifier(&recorder);
    for class in [CharClass::ElementName, CharClass::AttributeName] {
        mask(XmlVersion::V1_0, class, policy, "1ab");
    }
    mask(XmlVersion::V1_0, CharClass::ElementName, policy, "ab1");
    let calls = recorder.calls.borrow();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|(_, set)| *set == BTreeSet::from(['1'])));
}

struct Failing;

impl InvalidCharNotifier for Failing {
    fn notify(&self, _text: &str, _invalid: &BTreeSet<char>) {
        panic!("notifier failed");
    }
}

#[test]
#[should_panic(expected = "notifier failed")]
fn test_notifier_panic_propagates() {
    let policy = IncorrectCharPolicy::REPORT.with_notifier(&Failing);
    mask(XmlVersion::V1_0, CharClass::Text, policy, "\u{1}");
}

#[test]
fn test_policy_flag_combinations() {
    let text = "<\u{1}>";
    for test_required in [false, true] {
        for notify_required in [false, true] {
            for replace_with_nothing in [false, true] {
                let recorder = Recorder::default();
                let policy =
                    IncorrectCharPolicy::new(test_required, notify_required, replace_with_nothing)
                        .with_notifier(&recorder);
                let out = mask(XmlVersion::V1_0, CharClass::Text, policy, text);
                let expected = if test_required && replace_with_nothing {
                    "&lt;&gt;"
                } else {
                    "&lt;\u{1}&gt;"
                };
                assert_eq!(out, expected, "{policy:?}");
                let expected_calls = usize::from(test_required && notify_required);
                assert_eq!(recorder.count(), expected_calls, "{policy:?}");
            }
        }
    }
}

#[test]
fn test_default_policy() {
    let p = IncorrectCharPolicy::default();
    assert!(p.test_required && p.notify_required && p.replace_with_nothing);
    assert!(p.notifier.is_none());
}

#[test]
fn test_format_code_points() {
    let set = BTreeSet::from(['\u{FFFE}', '\u{1}', '😀']);
    assert_eq!(format_code_points(&set), "U+0001, U+FFFE, U+1F600");
    assert_eq!(format_code_points(&BTreeSet::new()), "");
}

// === Length and streaming ===

#[test]
fn test_length_without_building() {
    let p = IncorrectCharPolicy::PASS_THROUGH;
    let v = XmlVersion::V1_0;
    assert_eq!(masked_xml_text_len(v, CharClass::Text, p, "<"), 4);
    assert_eq!(masked_xml_text_len(v, CharClass::Text, p, "plain"), 5);
    assert_eq!(masked_xml_text_len(v, CharClass::Text, p, "\0"), 0);
    assert_eq!(masked_xml_text_len(XmlVersion::V1_1, CharClass::Text, p, "\u{7F}"), 6);
}

struct ClosedSink;

impl io::Write for ClosedSink {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::other("sink closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_stream_write_failure() {
    let p = IncorrectCharPolicy::PASS_THROUGH;
    let result = mask_xml_text_to(XmlVersion::V1_0, CharClass::Text, p, "a<b", &mut ClosedSink);
    assert!(matches!(result, Err(Error::Write(_))));
}

// === Properties ===

const ALPHABET: &[char] = &[
    'a', 'Z', '1', '-', ':', ' ', '\t', '<', '>', '&', '"', '\'', '\0', '\u{1}', '\u{B}',
    '\u{1F}', '\u{7F}', '\u{85}', '\u{90}', '·', 'é', '\u{FFFE}', '日', '😀',
];

fn text_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(ALPHABET), 0..48)
        .prop_map(|chars| chars.into_iter().collect())
}

fn call_strategy() -> impl Strategy<Value = (XmlVersion, CharClass, (bool, bool, bool))> {
    (
        prop::sample::select(VERSIONS.to_vec()),
        prop::sample::select(CLASSES.to_vec()),
        any::<(bool, bool, bool)>(),
    )
}

proptest! {
    #[test]
    fn prop_length_matches_content(text in text_strategy(), (version, class, flags) in call_strategy()) {
        let policy = IncorrectCharPolicy::new(flags.0, flags.1, flags.2).with_notifier(&quiet);
        let out = masked_xml_text(version, class, policy, &text);
        prop_assert_eq!(masked_xml_text_len(version, class, policy, &text), out.len());
    }

    #[test]
    fn prop_streaming_matches_batch(text in text_strategy(), (version, class, flags) in call_strategy()) {
        let policy = IncorrectCharPolicy::new(flags.0, flags.1, flags.2).with_notifier(&quiet);
        let batch = mask(version, class, policy, &text);
        prop_assert_eq!(mask_to(version, class, policy, &text), batch);
    }

    #[test]
    fn prop_output_has_no_raw_markup(text in text_strategy(), (version, class, flags) in call_strategy()) {
        let policy = IncorrectCharPolicy::new(flags.0, flags.1, flags.2).with_notifier(&quiet);
        let out = mask(version, class, policy, &text);
        prop_assert!(!out.contains(['<', '>', '"', '\'', '\0']));
    }
}
