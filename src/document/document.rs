//! Document structure.
//!
//! A [`Document`] is a single indexable item: a string ID, a map of typed
//! field values, a version for optimistic concurrency, and creation/update
//! timestamps. Documents serialize to the JSON envelope stored in segments
//! and WAL entries.
//!
//! # Examples
//!
//! ```
//! use minnow::document::{Document, FieldValue};
//!
//! let mut doc = Document::new("1");
//! doc.set_field("title", FieldValue::Text("Rust Book".to_string()));
//! doc.set_field("year", FieldValue::Numeric(2024.0));
//!
//! assert_eq!(doc.len(), 2);
//! assert!(doc.has_field("title"));
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::field_value::FieldValue;

/// A document to be stored and indexed.
///
/// Field names are case-sensitive; setting a field that already exists
/// overwrites the previous value. Fields beyond those declared in the schema
/// are allowed (flexible schema); declared fields must match their declared
/// type when the document is validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique document identifier within an index.
    pub id: String,
    /// The field values for this document.
    pub fields: HashMap<String, FieldValue>,
    /// Version for optimistic concurrency control, starting at 1.
    pub version: i64,
    /// Creation timestamp.
    pub created: DateTime<Utc>,
    /// Last-update timestamp.
    pub updated: DateTime<Utc>,
}

impl Document {
    /// Create a new empty document with the given ID.
    pub fn new<S: Into<String>>(id: S) -> Self {
        let now = Utc::now();
        Document {
            id: id.into(),
            fields: HashMap::new(),
            version: 1,
            created: now,
            updated: now,
        }
    }

    /// Set a field value, refreshing the update timestamp.
    pub fn set_field<S: Into<String>>(&mut self, name: S, value: FieldValue) {
        self.fields.insert(name.into(), value);
        self.updated = Utc::now();
    }

    /// Get a field value.
    pub fn get_field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Check if the document has a field.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Remove a field, returning its value if it existed.
    pub fn remove_field(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    /// Get all field names. The order is not guaranteed.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(|s| s.as_str()).collect()
    }

    /// Get the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the document has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document() {
        let doc = Document::new("42");
        assert_eq!(doc.id, "42");
        assert_eq!(doc.version, 1);
        assert!(doc.is_empty());
        assert_eq!(doc.created, doc.updated);
    }

    #[test]
    fn test_field_access() {
        let mut doc = Document::new("1");
        doc.set_field("title", FieldValue::Text("Rust".to_string()));
        doc.set_field("count", FieldValue::Numeric(3.0));

        assert_eq!(doc.len(), 2);
        assert!(doc.has_field("title"));
        assert!(!doc.has_field("missing"));
        assert_eq!(doc.get_field("title").unwrap().as_text(), Some("Rust"));

        let removed = doc.remove_field("count");
        assert_eq!(removed, Some(FieldValue::Numeric(3.0)));
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn test_set_field_overwrites() {
        let mut doc = Document::new("1");
        doc.set_field("title", FieldValue::Text("old".to_string()));
        doc.set_field("title", FieldValue::Text("new".to_string()));

        assert_eq!(doc.len(), 1);
        assert_eq!(doc.get_field("title").unwrap().as_text(), Some("new"));
    }

    #[test]
    fn test_json_envelope_shape() {
        let mut doc = Document::new("7");
        doc.set_field("title", FieldValue::Text("Hello".to_string()));

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["id"], "7");
        assert_eq!(json["version"], 1);
        assert_eq!(json["fields"]["title"]["type"], "text");
        assert_eq!(json["fields"]["title"]["value"], "Hello");
        assert!(json["created"].is_string());
        assert!(json["updated"].is_string());
    }

    #[test]
    fn test_json_round_trip() {
        let mut doc = Document::new("9");
        doc.set_field("title", FieldValue::Text("Gatsby".to_string()));
        doc.set_field("author", FieldValue::Keyword("Fitzgerald".to_string()));
        doc.set_field("rating", FieldValue::Numeric(4.5));
        doc.set_field("available", FieldValue::Boolean(true));
        doc.set_field("embedding", FieldValue::vector(vec![0.25, 0.5]));

        let json = serde_json::to_string(&doc).unwrap();
        let back: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);
    }
}
