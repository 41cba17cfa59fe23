//! The KGTK value model: classification, validation, repair, and
//! structured field extraction for single cell values.

pub mod datatype;
pub mod fields;
pub mod options;
pub mod value;

pub use datatype::{classify, has_list_separator, split_list, KgtkDatatype};
pub use fields::{ParsedValue, ValueFields};
pub use options::ValueOptions;
pub use value::{units_compatible, validate_cell, KgtkValue};
