use std::sync::LazyLock;

use crate::charclass::XmlVersion;
use crate::replace::ReplacementTable;

/// Markup characters and their entity references. NUL is always listed
/// ahead of these and deleted.
const RESERVED: [(char, &str); 5] = [
    ('&', "&amp;"),
    ('<', "&lt;"),
    ('>', "&gt;"),
    ('"', "&quot;"),
    ('\'', "&#39;"),
];

/// C0 controls other than TAB, LF and CR, then C1 controls other than NEL.
const CONTROL_RANGES: [(u8, u8); 5] = [
    (0x01, 0x08),
    (0x0B, 0x0C),
    (0x0E, 0x1F),
    (0x7F, 0x84),
    (0x86, 0x9F),
];

fn control_chars() -> impl Iterator<Item = char> {
    CONTROL_RANGES
        .iter()
        .flat_map(|&(lo, hi)| lo..=hi)
        .map(char::from)
}

fn build(with_controls: Option<fn(char) -> String>) -> ReplacementTable {
    let mut patterns = vec!['\0'];
    let mut replacements = vec![String::new()];
    for (c, entity) in RESERVED {
        patterns.push(c);
        replacements.push(entity.to_string());
    }
    if let Some(mask) = with_controls {
        for c in control_chars() {
            patterns.push(c);
            replacements.push(mask(c));
        }
    }
    ReplacementTable::new(patterns, replacements)
        .expect("built-in masking table has one replacement per pattern")
}

/// XML 1.0: delete NUL, escape markup.
pub static XML10: LazyLock<ReplacementTable> = LazyLock::new(|| build(None));

/// XML 1.1: delete NUL, escape markup, write controls as decimal character
/// references.
pub static XML11: LazyLock<ReplacementTable> =
    LazyLock::new(|| build(Some(|c: char| format!("&#{};", c as u32))));

/// Used when invalid characters were found and the policy asks for them to
/// be removed. Markup is still escaped; NUL and controls are deleted.
pub static ALL_EMPTY: LazyLock<ReplacementTable> =
    LazyLock::new(|| build(Some(|_: char| String::new())));

/// The reserved-character table for `version`.
#[inline]
pub fn masking_table(version: XmlVersion) -> &'static ReplacementTable {
    match version {
        XmlVersion::V1_0 => &XML10,
        XmlVersion::V1_1 => &XML11,
    }
}

/// The version-independent table that deletes instead of escaping controls.
#[inline]
pub fn empty_replacement_table() -> &'static ReplacementTable {
    &ALL_EMPTY
}
