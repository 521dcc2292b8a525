use std::borrow::Cow;
use std::io::Write;

use super::policy::IncorrectCharPolicy;
use super::tables::{empty_replacement_table, masking_table};
use crate::charclass::{CharClass, XmlVersion, contains_invalid, invalid_chars};
use crate::error::Result;
use crate::replace::{self, ReplacementTable};

/// Run the policy's scan and pick the table to mask `text` with.
/// `text` must be non-empty.
fn select_table(
    version: XmlVersion,
    class: CharClass,
    policy: &IncorrectCharPolicy<'_>,
    text: &str,
) -> &'static ReplacementTable {
    if policy.test_required && contains_invalid(version, class, text) {
        if policy.notify_required {
            let found = invalid_chars(version, class, text);
            policy.notifier().notify(text, &found);
        }
        if policy.replace_with_nothing {
            return empty_replacement_table();
        }
    }
    masking_table(version)
}

/// Mask `text` for output at a `class` position of an XML `version`
/// document.
///
/// Markup characters become entity references and NUL is deleted. Under
/// XML 1.1 the remaining controls become numeric character references.
/// When the policy scans and finds invalid characters it may report them
/// and, with `replace_with_nothing`, delete controls instead.
///
/// Borrows `text` when nothing needed masking.
pub fn masked_xml_text<'a>(
    version: XmlVersion,
    class: CharClass,
    policy: IncorrectCharPolicy<'_>,
    text: &'a str,
) -> Cow<'a, str> {
    if text.is_empty() {
        return Cow::Borrowed(text);
    }
    let table = select_table(version, class, &policy, text);
    replace::replace(text, table)
}

/// Byte length of what [`masked_xml_text`] would return, without building
/// it. Runs the same scan and notification.
pub fn masked_xml_text_len(
    version: XmlVersion,
    class: CharClass,
    policy: IncorrectCharPolicy<'_>,
    text: &str,
) -> usize {
    if text.is_empty() {
        return 0;
    }
    let table = select_table(version, class, &policy, text);
    replace::compute_result_length(text, table).unwrap_or(text.len())
}

/// Stream the masked form of `text` to `sink`.
pub fn mask_xml_text_to(
    version: XmlVersion,
    class: CharClass,
    policy: IncorrectCharPolicy<'_>,
    text: &str,
    sink: &mut impl Write,
) -> Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    let table = select_table(version, class, &policy, text);
    replace::replace_to(text, table, sink)?;
    Ok(())
}
