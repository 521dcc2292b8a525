mod core;
mod policy;
mod tables;

#[cfg(test)]
mod tests;

pub use self::core::{mask_xml_text_to, masked_xml_text, masked_xml_text_len};
pub use self::policy::{
    IncorrectCharPolicy, InvalidCharNotifier, StderrNotifier, format_code_points,
};
pub use self::tables::{ALL_EMPTY, XML10, XML11, empty_replacement_table, masking_table};
