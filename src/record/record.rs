//! Record structure: one raw instance of the corpus.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::field_value::FieldValue;

/// A mapping from field name to raw value.
///
/// Records are built once (by the dataset loader or a [`RecordBuilder`]) and
/// only read afterwards. Their identity is their position in the corpus.
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct Record {
    fields: HashMap<String, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Record {
            fields: HashMap::new(),
        }
    }

    pub fn builder() -> RecordBuilder {
        RecordBuilder::new()
    }

    pub fn add_field<S: Into<String>>(&mut self, name: S, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Field names in sorted order.
    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.fields.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Builder for [`Record`].
///
/// ```
/// use clickbait::record::Record;
///
/// let record = Record::builder()
///     .add_text_list("postText", vec!["You won't believe this".to_string()])
///     .add_text_list("postMedia", vec![])
///     .build();
/// assert!(record.has_field("postMedia"));
/// ```
#[derive(Debug, Default)]
pub struct RecordBuilder {
    record: Record,
}

impl RecordBuilder {
    pub fn new() -> Self {
        RecordBuilder {
            record: Record::new(),
        }
    }

    pub fn add_text<S: Into<String>, T: Into<String>>(mut self, name: S, value: T) -> Self {
        self.record.add_field(name, FieldValue::Text(value.into()));
        self
    }

    pub fn add_text_list<S: Into<String>>(mut self, name: S, value: Vec<String>) -> Self {
        self.record.add_field(name, FieldValue::TextList(value));
        self
    }

    pub fn add_integer<S: Into<String>>(mut self, name: S, value: i64) -> Self {
        self.record.add_field(name, FieldValue::Integer(value));
        self
    }

    pub fn add_float<S: Into<String>>(mut self, name: S, value: f64) -> Self {
        self.record.add_field(name, FieldValue::Float(value));
        self
    }

    pub fn add_boolean<S: Into<String>>(mut self, name: S, value: bool) -> Self {
        self.record.add_field(name, FieldValue::Boolean(value));
        self
    }

    pub fn add_datetime<S: Into<String>>(mut self, name: S, value: DateTime<Utc>) -> Self {
        self.record.add_field(name, FieldValue::DateTime(value));
        self
    }

    pub fn add_field<S: Into<String>>(mut self, name: S, value: FieldValue) -> Self {
        self.record.add_field(name, value);
        self
    }

    pub fn build(self) -> Record {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_builder_fields() {
        let ts = Utc.with_ymd_and_hms(2017, 6, 8, 12, 10, 44).unwrap();
        let record = Record::builder()
            .add_text("id", "608310377143799810")
            .add_datetime("postTimestamp", ts)
            .add_integer("shares", 3)
            .build();

        assert_eq!(record.len(), 3);
        assert_eq!(
            record.get("postTimestamp").and_then(|v| v.as_datetime()),
            Some(&ts)
        );
        assert_eq!(record.field_names(), vec!["id", "postTimestamp", "shares"]);
        assert!(record.get("missing").is_none());
    }

    #[test]
    fn test_add_field_overwrites() {
        let mut record = Record::new();
        record.add_field("a", FieldValue::Null);
        record.add_field("a", FieldValue::Boolean(true));
        assert_eq!(record.len(), 1);
        assert_eq!(record.get("a"), Some(&FieldValue::Boolean(true)));
    }
}
