//! Raw records and their field values.
//!
//! - [`record::Record`]: field-name-indexed raw instance
//! - [`field_value::FieldValue`]: the value of a single field

#[allow(clippy::module_inception)]
pub mod record;
pub mod field_value;

pub use field_value::FieldValue;
pub use record::{Record, RecordBuilder};
