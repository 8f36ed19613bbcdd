//! Text analysis: tokenization and token filtering.
//!
//! The analysis pipeline turns raw field text into the normalized terms the
//! inverted index stores: lowercase, split on non-alphanumeric characters,
//! and (by default) drop common English stop words.

pub mod analyzer;
pub mod tokenizer;

pub use analyzer::Analyzer;
pub use tokenizer::Tokenizer;
