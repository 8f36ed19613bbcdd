//! # Minnow
//!
//! The persistent core of a minimal search engine.
//!
//! Minnow accepts schema-validated documents, appends them durably to disk,
//! and maintains an in-memory inverted index that answers single-term,
//! multi-term conjunctive, and field-scoped lookups.
//!
//! ## Features
//!
//! - Write-ahead log with crash recovery and replay
//! - Append-only document segments with a tail lookup index
//! - Positional inverted index with AND intersection
//! - Text analysis pipeline (tokenizer, stop words, optional stemming)
//! - Typed field model with schema validation
//!
//! ## Example
//!
//! ```
//! use minnow::document::{Document, FieldType, FieldValue};
//! use minnow::schema::{FieldDef, Schema};
//! use minnow::storage::IndexManager;
//!
//! let dir = tempfile::tempdir().unwrap();
//!
//! let mut schema = Schema::new("books");
//! schema.add_field("title", FieldDef::new(FieldType::Text));
//!
//! let manager = IndexManager::open("books", dir.path(), schema).unwrap();
//!
//! let mut doc = Document::new("1");
//! doc.set_field("title", FieldValue::Text("Hello World".to_string()));
//! manager.write_document(&doc).unwrap();
//!
//! let stored = manager.read_document("1").unwrap();
//! assert_eq!(stored.get_field("title").unwrap().as_text(), Some("Hello World"));
//! manager.close().unwrap();
//! ```

pub mod analysis;
pub mod document;
pub mod error;
pub mod index;
pub mod schema;
pub mod storage;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
