use std::borrow::Cow;
use std::io::Write;

use crate::error::{Error, Result};

/// Marks an ASCII byte with no pattern in `ReplacementTable::ascii_index`.
const NO_PATTERN: usize = usize::MAX;

/// How a table looks for its next match. Chosen once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Searcher {
    /// No patterns at all.
    Empty,
    /// One to three distinct ASCII patterns: SIMD memchr.
    Memchr1(u8),
    Memchr2(u8, u8),
    Memchr3(u8, u8, u8),
    /// ASCII-only patterns: byte scan. UTF-8 continuation and lead bytes
    /// are all >= 0x80 so they can never match.
    AsciiScan,
    /// At least one non-ASCII pattern: decode chars.
    CharScan,
}

/// A list of single-character search patterns and one replacement string
/// per pattern. For each input character the first pattern in table order
/// wins.
#[derive(Debug, Clone)]
pub struct ReplacementTable {
    patterns: Vec<char>,
    replacements: Vec<String>,
    ascii_index: [usize; 128],
    /// Non-ASCII patterns sorted by char, earliest table index kept.
    wide_index: Vec<(char, usize)>,
    searcher: Searcher,
}

impl ReplacementTable {
    /// Build a table. Fails if the two lists differ in length.
    pub fn new<S: Into<String>>(patterns: Vec<char>, replacements: Vec<S>) -> Result<Self> {
        if patterns.len() != replacements.len() {
            return Err(Error::TableLengthMismatch {
                patterns: patterns.len(),
                replacements: replacements.len(),
            });
        }
        let replacements: Vec<String> = replacements.into_iter().map(Into::into).collect();

        let mut ascii_index = [NO_PATTERN; 128];
        let mut wide_index = Vec::new();
        let mut ascii_bytes: Vec<u8> = Vec::new();
        for (i, &c) in patterns.iter().enumerate() {
            if c.is_ascii() {
                let slot = &mut ascii_index[c as usize];
                if *slot == NO_PATTERN {
                    *slot = i;
                    ascii_bytes.push(c as u8);
                }
            } else {
                wide_index.push((c, i));
            }
        }
        // Stable sort keeps table order among duplicates; dedup keeps the first.
        wide_index.sort_by_key(|&(c, _)| c);
        wide_index.dedup_by_key(|&mut (c, _)| c);

        let searcher = if patterns.is_empty() {
            Searcher::Empty
        } else if !wide_index.is_empty() {
            Searcher::CharScan
        } else {
            match ascii_bytes[..] {
                [a] => Searcher::Memchr1(a),
                [a, b] => Searcher::Memchr2(a, b),
                [a, b, c] => Searcher::Memchr3(a, b, c),
                _ => Searcher::AsciiScan,
            }
        };

        Ok(ReplacementTable {
            patterns,
            replacements,
            ascii_index,
            wide_index,
            searcher,
        })
    }

    /// Build a table from `(pattern, replacement)` pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (char, S)>,
        S: Into<String>,
    {
        let (patterns, replacements): (Vec<char>, Vec<String>) =
            pairs.into_iter().map(|(c, s)| (c, s.into())).unzip();
        match Self::new(patterns, replacements) {
            Ok(table) => table,
            // unzip always yields two lists of equal length
            Err(_) => unreachable!(),
        }
    }

    /// A table with no patterns; replacing with it is the identity.
    pub fn empty() -> Self {
        Self::from_pairs(std::iter::empty::<(char, String)>())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn patterns(&self) -> &[char] {
        &self.patterns
    }

    pub fn replacements(&self) -> &[String] {
        &self.replacements
    }

    #[inline]
    pub fn replacement(&self, index: usize) -> &str {
        &self.replacements[index]
    }

    /// Table index of the first pattern equal to `c`.
    #[inline]
    pub fn pattern_index(&self, c: char) -> Option<usize> {
        if c.is_ascii() {
            let i = self.ascii_index[c as usize];
            (i != NO_PATTERN).then_some(i)
        } else {
            self.wide_index
                .binary_search_by_key(&c, |&(p, _)| p)
                .ok()
                .map(|pos| self.wide_index[pos].1)
        }
    }

    /// Iterate over every match in `text`, left to right.
    pub fn find_iter<'t, 'a>(&'t self, text: &'a str) -> Matches<'t, 'a> {
        Matches {
            table: self,
            text,
            pos: 0,
        }
    }
}

/// One matched character: its byte span in the input and the index of the
/// pattern that matched it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub start: usize,
    pub end: usize,
    pub index: usize,
}

/// Iterator returned by [`ReplacementTable::find_iter`].
pub struct Matches<'t, 'a> {
    table: &'t ReplacementTable,
    text: &'a str,
    pos: usize,
}

impl Matches<'_, '_> {
    #[inline]
    fn ascii_match(&mut self, at: usize) -> Match {
        let byte = self.text.as_bytes()[at];
        self.pos = at + 1;
        Match {
            start: at,
            end: at + 1,
            index: self.table.ascii_index[byte as usize],
        }
    }
}

impl Iterator for Matches<'_, '_> {
    type Item = Match;

    fn next(&mut self) -> Option<Match> {
        let text = self.text;
        let table = self.table;
        let bytes = text.as_bytes();
        if self.pos >= bytes.len() {
            return None;
        }
        let rest = &bytes[self.pos..];
        let found = match table.searcher {
            Searcher::Empty => None,
            Searcher::Memchr1(a) => memchr::memchr(a, rest),
            Searcher::Memchr2(a, b) => memchr::memchr2(a, b, rest),
            Searcher::Memchr3(a, b, c) => memchr::memchr3(a, b, c, rest),
            Searcher::AsciiScan => rest
                .iter()
                .position(|&b| b < 0x80 && table.ascii_index[b as usize] != NO_PATTERN),
            Searcher::CharScan => {
                let base = self.pos;
                for (off, c) in text[base..].char_indices() {
                    if let Some(index) = table.pattern_index(c) {
                        let start = base + off;
                        let end = start + c.len_utf8();
                        self.pos = end;
                        return Some(Match { start, end, index });
                    }
                }
                self.pos = bytes.len();
                return None;
            }
        };
        match found {
            Some(off) => Some(self.ascii_match(self.pos + off)),
            None => {
                self.pos = bytes.len();
                None
            }
        }
    }
}

// ============================================================================
// Replacement contracts
// ============================================================================

/// Length in bytes of the replaced output, or `None` if no character of
/// `input` matches any pattern.
pub fn compute_result_length(input: &str, table: &ReplacementTable) -> Option<usize> {
    let mut matched = false;
    let mut len = input.len();
    for m in table.find_iter(input) {
        matched = true;
        len = len - (m.end - m.start) + table.replacement(m.index).len();
    }
    matched.then_some(len)
}

/// Replace every matched character of `input`.
///
/// Borrows `input` when nothing matched; otherwise allocates exactly the
/// length reported by [`compute_result_length`] and fills it in one pass.
pub fn replace<'a>(input: &'a str, table: &ReplacementTable) -> Cow<'a, str> {
    if input.is_empty() || table.is_empty() {
        return Cow::Borrowed(input);
    }
    let Some(len) = compute_result_length(input, table) else {
        return Cow::Borrowed(input);
    };

    let mut out = String::with_capacity(len);
    let mut last = 0;
    for m in table.find_iter(input) {
        out.push_str(&input[last..m.start]);
        out.push_str(table.replacement(m.index));
        last = m.end;
    }
    out.push_str(&input[last..]);
    debug_assert_eq!(out.len(), len);
    Cow::Owned(out)
}

/// Stream the replaced output of `input` to `sink` without materializing
/// it. Unmatched runs are written in bulk. Returns the number of
/// substitutions made.
pub fn replace_to(input: &str, table: &ReplacementTable, sink: &mut impl Write) -> Result<usize> {
    let bytes = input.as_bytes();
    let mut last = 0;
    let mut count = 0;
    for m in table.find_iter(input) {
        if m.start > last {
            sink.write_all(&bytes[last..m.start])?;
        }
        let replacement = table.replacement(m.index);
        if !replacement.is_empty() {
            sink.write_all(replacement.as_bytes())?;
        }
        last = m.end;
        count += 1;
    }
    if last < bytes.len() {
        sink.write_all(&bytes[last..])?;
    }
    Ok(count)
}
