//! Character validity tables and masking for XML 1.0 and 1.1 output.
//!
//! [`charclass`] answers whether a code point may appear in a name, in text
//! content, or in an attribute value or CDATA section. [`replace`] is the
//! single-character multi-pattern replacer the masker is built on, and
//! [`mask`] ties the two together behind an [`mask::IncorrectCharPolicy`].
//!
//! ```
//! use xmlmask::mask::{IncorrectCharPolicy, masked_xml_text};
//! use xmlmask::{CharClass, XmlVersion};
//!
//! let out = masked_xml_text(
//!     XmlVersion::V1_0,
//!     CharClass::Text,
//!     IncorrectCharPolicy::PASS_THROUGH,
//!     "a < b & c",
//! );
//! assert_eq!(out, "a &lt; b &amp; c");
//! ```

pub mod charclass;
pub mod common;
pub mod error;
pub mod mask;
pub mod replace;

pub use charclass::{CharClass, XmlVersion};
pub use error::{Error, Result};
