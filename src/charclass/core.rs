use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use super::ranges::{
    BASE_CHAR, COMBINING_CHAR, DIGIT, EXTENDER, IDEOGRAPHIC, NONCHARACTERS, SURROGATES,
    XML10_CONTROLS, XML10_NAME_EXTRA, XML10_NAME_START_EXTRA, XML11_RESTRICTED,
    XML11_NAME_CHAR_EXTRA, XML11_NAME_START_CHAR,
};
use crate::error::Error;

/// XML specification version. Selects the validity tables and whether
/// control characters may be written as numeric character references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum XmlVersion {
    #[default]
    V1_0,
    V1_1,
}

impl XmlVersion {
    pub fn as_str(self) -> &'static str {
        match self {
            XmlVersion::V1_0 => "1.0",
            XmlVersion::V1_1 => "1.1",
        }
    }
}

impl fmt::Display for XmlVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for XmlVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1.0" => Ok(XmlVersion::V1_0),
            "1.1" => Ok(XmlVersion::V1_1),
            other => Err(Error::UnknownVersion(other.to_string())),
        }
    }
}

/// Where in a document a piece of text will be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CharClass {
    ElementName,
    AttributeName,
    AttributeValue,
    #[default]
    Text,
    CData,
}

impl CharClass {
    /// Name classes check their first character against NameStartChar.
    #[inline]
    pub fn is_name(self) -> bool {
        matches!(self, CharClass::ElementName | CharClass::AttributeName)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CharClass::ElementName => "element-name",
            CharClass::AttributeName => "attribute-name",
            CharClass::AttributeValue => "attribute-value",
            CharClass::Text => "text",
            CharClass::CData => "cdata",
        }
    }
}

impl fmt::Display for CharClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CharClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "element-name" | "element" => Ok(CharClass::ElementName),
            "attribute-name" => Ok(CharClass::AttributeName),
            "attribute-value" | "attribute" => Ok(CharClass::AttributeValue),
            "text" => Ok(CharClass::Text),
            "cdata" => Ok(CharClass::CData),
            _ => Err(Error::UnknownCharClass(s.to_string())),
        }
    }
}

// ============================================================================
// Validity tables
// ============================================================================

/// Code points covered by a table: the whole 16-bit code unit space.
const TABLE_BITS: usize = 0x10000;
const TABLE_WORDS: usize = TABLE_BITS / 64;

/// One bit per BMP code point; a set bit marks the code point invalid.
pub struct ValidityTable {
    bits: Box<[u64; TABLE_WORDS]>,
}

impl ValidityTable {
    fn empty() -> Self {
        ValidityTable {
            bits: Box::new([0u64; TABLE_WORDS]),
        }
    }

    #[inline(always)]
    fn insert(&mut self, cp: u16) {
        self.bits[cp as usize >> 6] |= 1u64 << (cp & 63);
    }

    /// Returns true if `cp` is marked invalid.
    #[inline(always)]
    pub fn contains(&self, cp: u16) -> bool {
        (self.bits[cp as usize >> 6] >> (cp & 63)) & 1 != 0
    }

    /// Number of invalid code points in the table.
    pub fn count(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }
}

/// The four kinds of table kept per XML version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableKind {
    NameStart = 0,
    Name = 1,
    Text = 2,
    AttrOrCData = 3,
}

const TABLES_PER_VERSION: usize = 4;

#[inline(always)]
fn slot(version: XmlVersion, kind: TableKind) -> usize {
    let base = match version {
        XmlVersion::V1_0 => 0,
        XmlVersion::V1_1 => TABLES_PER_VERSION,
    };
    base + kind as usize
}

#[inline]
fn in_ranges(cp: u16, ranges: &[(u16, u16)]) -> bool {
    ranges.iter().any(|&(lo, hi)| lo <= cp && cp <= hi)
}

fn xml10_letter(cp: u16) -> bool {
    in_ranges(cp, BASE_CHAR) || in_ranges(cp, IDEOGRAPHIC)
}

fn xml10_invalid_name_start(cp: u16) -> bool {
    !(xml10_letter(cp) || in_ranges(cp, XML10_NAME_START_EXTRA))
}

fn xml10_invalid_name(cp: u16) -> bool {
    !(xml10_letter(cp)
        || in_ranges(cp, DIGIT)
        || in_ranges(cp, COMBINING_CHAR)
        || in_ranges(cp, EXTENDER)
        || in_ranges(cp, XML10_NAME_EXTRA))
}

fn xml10_invalid_char_data(cp: u16) -> bool {
    in_ranges(cp, XML10_CONTROLS) || in_ranges(cp, SURROGATES) || in_ranges(cp, NONCHARACTERS)
}

fn xml11_invalid_name_start(cp: u16) -> bool {
    !in_ranges(cp, XML11_NAME_START_CHAR)
}

fn xml11_invalid_name(cp: u16) -> bool {
    xml11_invalid_name_start(cp) && !in_ranges(cp, XML11_NAME_CHAR_EXTRA)
}

fn xml11_invalid_text(cp: u16) -> bool {
    cp == 0 || in_ranges(cp, SURROGATES) || in_ranges(cp, NONCHARACTERS)
}

fn xml11_invalid_attr_or_cdata(cp: u16) -> bool {
    xml11_invalid_text(cp) || in_ranges(cp, XML11_RESTRICTED)
}

/// Invalid-character predicates in slot order (see [`slot`]).
const INVALID_RULES: [fn(u16) -> bool; 2 * TABLES_PER_VERSION] = [
    xml10_invalid_name_start,
    xml10_invalid_name,
    xml10_invalid_char_data,
    xml10_invalid_char_data,
    xml11_invalid_name_start,
    xml11_invalid_name,
    xml11_invalid_text,
    xml11_invalid_attr_or_cdata,
];

/// All eight validity tables, indexed by (version, kind).
pub struct ValidityTables {
    tables: [ValidityTable; 2 * TABLES_PER_VERSION],
}

impl ValidityTables {
    /// Evaluate every rule once per BMP code point.
    pub fn build() -> Self {
        let mut tables: [ValidityTable; 2 * TABLES_PER_VERSION] =
            std::array::from_fn(|_| ValidityTable::empty());
        for cp in 0..=u16::MAX {
            for (table, rule) in tables.iter_mut().zip(INVALID_RULES) {
                if rule(cp) {
                    table.insert(cp);
                }
            }
        }
        ValidityTables { tables }
    }

    #[inline(always)]
    fn get(&self, version: XmlVersion, kind: TableKind) -> &ValidityTable {
        &self.tables[slot(version, kind)]
    }

    /// The table consulted for `class`; name classes map to NameStartChar.
    pub fn for_class(&self, version: XmlVersion, class: CharClass) -> &ValidityTable {
        let kind = match class {
            CharClass::ElementName | CharClass::AttributeName => TableKind::NameStart,
            CharClass::Text => TableKind::Text,
            CharClass::AttributeValue | CharClass::CData => TableKind::AttrOrCData,
        };
        self.get(version, kind)
    }

    /// The NameChar table used after the first character of a name.
    pub fn name_char(&self, version: XmlVersion) -> &ValidityTable {
        self.get(version, TableKind::Name)
    }
}

static TABLES: LazyLock<ValidityTables> = LazyLock::new(ValidityTables::build);

/// The process-wide tables, built on first use.
pub fn tables() -> &'static ValidityTables {
    &TABLES
}

/// Build the validity tables now instead of on first lookup.
/// Safe to call any number of times from any thread.
pub fn init() {
    LazyLock::force(&TABLES);
}

// ============================================================================
// Per code point classification
// ============================================================================

/// Names outside the BMP: XML 1.1 allows [#x10000-#xEFFFF], Appendix B none.
#[inline]
fn is_invalid_supplementary_name(version: XmlVersion, cp: u32) -> bool {
    match version {
        XmlVersion::V1_0 => true,
        XmlVersion::V1_1 => !(0x10000..=0xEFFFF).contains(&cp),
    }
}

#[inline]
fn is_invalid_supplementary_char_data(cp: u32) -> bool {
    cp > 0x10FFFF
}

#[inline(always)]
fn lookup(version: XmlVersion, kind: TableKind, cp: u32) -> bool {
    match u16::try_from(cp) {
        Ok(unit) => TABLES.get(version, kind).contains(unit),
        Err(_) => match kind {
            TableKind::NameStart | TableKind::Name => is_invalid_supplementary_name(version, cp),
            TableKind::Text | TableKind::AttrOrCData => is_invalid_supplementary_char_data(cp),
        },
    }
}

/// Returns true if `cp` may not start an element or attribute name.
#[inline]
pub fn is_invalid_name_start_char(version: XmlVersion, cp: u32) -> bool {
    lookup(version, TableKind::NameStart, cp)
}

/// Returns true if `cp` may not appear after the first character of a name.
#[inline]
pub fn is_invalid_name_char(version: XmlVersion, cp: u32) -> bool {
    lookup(version, TableKind::Name, cp)
}

/// Returns true if `cp` may not appear in element text content.
#[inline]
pub fn is_invalid_text_char(version: XmlVersion, cp: u32) -> bool {
    lookup(version, TableKind::Text, cp)
}

/// Returns true if `cp` may not appear in an attribute value or CDATA section.
#[inline]
pub fn is_invalid_attribute_or_cdata_char(version: XmlVersion, cp: u32) -> bool {
    lookup(version, TableKind::AttrOrCData, cp)
}

/// Table-level lookup for `class`. Name classes answer for the first
/// position of a name; use [`is_invalid_name_char`] for the rest.
#[inline]
pub fn is_invalid(version: XmlVersion, class: CharClass, cp: u32) -> bool {
    match class {
        CharClass::ElementName | CharClass::AttributeName => {
            is_invalid_name_start_char(version, cp)
        }
        CharClass::Text => is_invalid_text_char(version, cp),
        CharClass::AttributeValue | CharClass::CData => {
            is_invalid_attribute_or_cdata_char(version, cp)
        }
    }
}

// ============================================================================
// Whole-text scans
// ============================================================================

/// Iterate over the characters of `text` that are invalid for `class`,
/// in input order and with repeats.
pub fn invalid_char_iter(
    version: XmlVersion,
    class: CharClass,
    text: &str,
) -> impl Iterator<Item = char> + '_ {
    let kind = match class {
        CharClass::ElementName | CharClass::AttributeName => TableKind::Name,
        CharClass::Text => TableKind::Text,
        CharClass::AttributeValue | CharClass::CData => TableKind::AttrOrCData,
    };
    let mut first = class.is_name();
    text.chars().filter(move |&c| {
        if first {
            first = false;
            is_invalid_name_start_char(version, c as u32)
        } else {
            lookup(version, kind, c as u32)
        }
    })
}

/// Returns true as soon as one invalid character is found.
pub fn contains_invalid(version: XmlVersion, class: CharClass, text: &str) -> bool {
    invalid_char_iter(version, class, text).next().is_some()
}

/// The distinct invalid characters of `text`, in code point order.
pub fn invalid_chars(version: XmlVersion, class: CharClass, text: &str) -> BTreeSet<char> {
    invalid_char_iter(version, class, text).collect()
}

/// Returns true if `text` is a non-empty, well-formed XML name.
pub fn is_valid_name(version: XmlVersion, text: &str) -> bool {
    !text.is_empty() && !contains_invalid(version, CharClass::ElementName, text)
}
