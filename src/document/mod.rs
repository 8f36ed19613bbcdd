//! Document model: typed field values and the document envelope.

pub mod document;
pub mod field_value;

pub use document::Document;
pub use field_value::{FieldType, FieldValue};
