use std::io;

use thiserror::Error;

/// Errors surfaced by table construction, streaming output, and parsing of
/// version/class names.
///
/// Finding invalid characters in the input is not an error; it is reported
/// through [`crate::mask::InvalidCharNotifier`].
#[derive(Debug, Error)]
pub enum Error {
    /// A replacement table was built with a different number of patterns
    /// and replacement strings.
    #[error("replacement table has {patterns} patterns but {replacements} replacements")]
    TableLengthMismatch { patterns: usize, replacements: usize },

    /// Writing masked output to the caller's sink failed.
    #[error("write failed: {0}")]
    Write(#[from] io::Error),

    #[error("unknown XML version '{0}' (expected 1.0 or 1.1)")]
    UnknownVersion(String),

    #[error(
        "unknown character class '{0}' (expected element-name, attribute-name, attribute-value, text or cdata)"
    )]
    UnknownCharClass(String),
}

pub type Result<T> = std::result::Result<T, Error>;
