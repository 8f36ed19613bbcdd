//! Schema: named field definitions and document validation.
//!
//! A schema declares the fields an index knows about. Validation is
//! permissive: documents may carry undeclared fields, but every declared
//! field they do carry must match its declared type (and, for vectors, the
//! declared dimension).
//!
//! # Examples
//!
//! ```
//! use minnow::document::{Document, FieldType, FieldValue};
//! use minnow::schema::{FieldDef, Schema};
//!
//! let mut schema = Schema::new("books");
//! schema.add_field("title", FieldDef::new(FieldType::Text));
//! schema.add_field("author", FieldDef::new(FieldType::Keyword));
//!
//! let mut doc = Document::new("1");
//! doc.set_field("title", FieldValue::Text("Gatsby".to_string()));
//! assert!(schema.validate_document(&doc).is_ok());
//! ```

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::document::{Document, FieldType, FieldValue};
use crate::error::{MinnowError, Result};

/// Definition of a single field in a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    /// The declared type of the field.
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Whether the field is indexed.
    pub indexed: bool,
    /// Whether the field is stored for retrieval.
    pub stored: bool,
    /// Whether the field is analyzed (text fields default to analyzed).
    pub analyzed: bool,
    /// Dimension for vector fields.
    pub vector_dim: usize,
    /// Boost factor for scoring.
    pub boost: f64,
    /// Optional description.
    pub description: String,
}

impl FieldDef {
    /// Create a field definition with default flags: indexed and stored,
    /// analyzed only for text fields, boost 1.0.
    pub fn new(field_type: FieldType) -> Self {
        FieldDef {
            field_type,
            indexed: true,
            stored: true,
            analyzed: field_type == FieldType::Text,
            vector_dim: 0,
            boost: 1.0,
            description: String::new(),
        }
    }

    /// Set whether the field is indexed.
    pub fn with_indexed(mut self, indexed: bool) -> Self {
        self.indexed = indexed;
        self
    }

    /// Set whether the field is stored.
    pub fn with_stored(mut self, stored: bool) -> Self {
        self.stored = stored;
        self
    }

    /// Set whether the field is analyzed.
    pub fn with_analyzed(mut self, analyzed: bool) -> Self {
        self.analyzed = analyzed;
        self
    }

    /// Set the dimension for a vector field.
    pub fn with_vector_dim(mut self, dim: usize) -> Self {
        self.vector_dim = dim;
        self
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f64) -> Self {
        self.boost = boost;
        self
    }

    /// Set the description.
    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }
}

/// A named set of field definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Schema name.
    pub name: String,
    /// Field definitions by field name.
    pub fields: HashMap<String, FieldDef>,
    /// Field name used as the document ID when one is not provided.
    pub primary_key: Option<String>,
    /// Creation time (unix seconds).
    pub created: i64,
    /// Schema version for migrations.
    pub version: u32,
}

impl Schema {
    /// Create a new empty schema with the given name.
    pub fn new<S: Into<String>>(name: S) -> Self {
        Schema {
            name: name.into(),
            fields: HashMap::new(),
            primary_key: None,
            created: Utc::now().timestamp(),
            version: 1,
        }
    }

    /// Add a field definition to the schema.
    pub fn add_field<S: Into<String>>(&mut self, name: S, def: FieldDef) -> &mut Self {
        self.fields.insert(name.into(), def);
        self
    }

    /// Get the definition for a field, if declared.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.get(name)
    }

    /// Get the number of declared fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the schema declares no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Validate a document against this schema.
    ///
    /// Undeclared fields are allowed. Every declared field the document
    /// carries must match its declared type; vector fields must also match
    /// the declared dimension.
    pub fn validate_document(&self, doc: &Document) -> Result<()> {
        for (name, value) in &doc.fields {
            let Some(def) = self.fields.get(name) else {
                continue;
            };

            if value.field_type() != def.field_type {
                return Err(MinnowError::schema_validation(format!(
                    "field {name:?} expects type {} but got {}",
                    def.field_type,
                    value.field_type()
                )));
            }

            if let FieldValue::Vector { dim, .. } = value {
                if *dim != def.vector_dim {
                    return Err(MinnowError::schema_validation(format!(
                        "field {name:?} expects vector dimension {} but got {dim}",
                        def.vector_dim
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_def_defaults() {
        let def = FieldDef::new(FieldType::Text);
        assert!(def.indexed);
        assert!(def.stored);
        assert!(def.analyzed);
        assert_eq!(def.boost, 1.0);

        let def = FieldDef::new(FieldType::Keyword);
        assert!(!def.analyzed);
    }

    #[test]
    fn test_field_def_builder() {
        let def = FieldDef::new(FieldType::Vector)
            .with_indexed(false)
            .with_vector_dim(128)
            .with_boost(2.0)
            .with_description("embedding");

        assert!(!def.indexed);
        assert_eq!(def.vector_dim, 128);
        assert_eq!(def.boost, 2.0);
        assert_eq!(def.description, "embedding");
    }

    #[test]
    fn test_validate_matching_document() {
        let mut schema = Schema::new("books");
        schema.add_field("title", FieldDef::new(FieldType::Text));
        schema.add_field("author", FieldDef::new(FieldType::Keyword));

        let mut doc = Document::new("1");
        doc.set_field("title", FieldValue::Text("Gatsby".to_string()));
        doc.set_field("author", FieldValue::Keyword("Fitzgerald".to_string()));

        assert!(schema.validate_document(&doc).is_ok());
    }

    #[test]
    fn test_validate_type_mismatch() {
        let mut schema = Schema::new("books");
        schema.add_field("title", FieldDef::new(FieldType::Text));

        let mut doc = Document::new("1");
        doc.set_field("title", FieldValue::Numeric(5.0));

        let err = schema.validate_document(&doc).unwrap_err();
        assert!(matches!(err, MinnowError::SchemaValidation(_)));
    }

    #[test]
    fn test_validate_vector_dimension() {
        let mut schema = Schema::new("embeddings");
        schema.add_field(
            "vec",
            FieldDef::new(FieldType::Vector).with_vector_dim(3),
        );

        let mut ok = Document::new("1");
        ok.set_field("vec", FieldValue::vector(vec![1.0, 2.0, 3.0]));
        assert!(schema.validate_document(&ok).is_ok());

        let mut bad = Document::new("2");
        bad.set_field("vec", FieldValue::vector(vec![1.0, 2.0]));
        assert!(schema.validate_document(&bad).is_err());
    }

    #[test]
    fn test_validate_allows_extra_fields() {
        let mut schema = Schema::new("books");
        schema.add_field("title", FieldDef::new(FieldType::Text));

        let mut doc = Document::new("1");
        doc.set_field("title", FieldValue::Text("Gatsby".to_string()));
        doc.set_field("undeclared", FieldValue::Boolean(true));

        assert!(schema.validate_document(&doc).is_ok());
    }
}
