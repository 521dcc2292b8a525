mod core;


pub use self::core::{Match, Matches, ReplacementTable};
pub use self::core::{compute_result_length, replace, replace_to};
