mod core;
mod ranges;


pub use self::core::{CharClass, ValidityTable, ValidityTables, XmlVersion};
pub use self::core::{
    contains_invalid, init, invalid_char_iter, invalid_chars, is_invalid,
    is_invalid_attribute_or_cdata_char, is_invalid_name_char, is_invalid_name_start_char,
    is_invalid_text_char, is_valid_name, tables,
};
