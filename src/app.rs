pub mod approot;
pub mod input_parse;
pub mod outfmt;

pub use self::approot::*;
