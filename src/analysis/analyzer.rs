//! Analyzer implementation.
//!
//! The analyzer chains the tokenizer with a stop-word filter and an optional
//! naive stemmer. Stop-word filtering is on by default; stemming is off.
//!
//! # Examples
//!
//! ```
//! use minnow::analysis::Analyzer;
//!
//! let analyzer = Analyzer::new();
//! let tokens = analyzer.analyze("The Great Gatsby is a classic novel");
//! assert_eq!(tokens, vec!["great", "gatsby", "classic", "novel"]);
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use crate::analysis::tokenizer::Tokenizer;

/// An analyzer that normalizes text into index terms.
#[derive(Debug, Clone)]
pub struct Analyzer {
    tokenizer: Tokenizer,
    /// The set of stop words to remove
    stop_words: Arc<HashSet<String>>,
    filter_stop_words: bool,
    enable_stemming: bool,
}

impl Analyzer {
    /// Create a new analyzer with stop-word filtering enabled and stemming
    /// disabled.
    pub fn new() -> Self {
        Self::with_options(true, false)
    }

    /// Create an analyzer with explicit stop-word and stemming settings.
    pub fn with_options(filter_stop_words: bool, enable_stemming: bool) -> Self {
        Analyzer {
            tokenizer: Tokenizer::new(),
            stop_words: Arc::new(default_stop_words()),
            filter_stop_words,
            enable_stemming,
        }
    }

    /// Check if a word is a stop word.
    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }

    /// Normalize text into tokens: tokenize, filter stop words, and stem if
    /// enabled.
    pub fn analyze(&self, text: &str) -> Vec<String> {
        let mut tokens = self.tokenizer.tokenize(text);

        if self.filter_stop_words {
            tokens.retain(|t| !self.stop_words.contains(t));
        }

        if self.enable_stemming {
            tokens = tokens.iter().map(|t| stem_word(t).to_string()).collect();
        }

        tokens
    }

    /// Normalize text into tokens with byte positions, filtering stop words
    /// while keeping each surviving token's original position.
    pub fn analyze_with_positions(&self, text: &str) -> (Vec<String>, Vec<i64>) {
        let (tokens, positions) = self.tokenizer.tokenize_with_positions(text);

        if !self.filter_stop_words {
            return (tokens, positions);
        }

        let mut filtered_tokens = Vec::with_capacity(tokens.len());
        let mut filtered_positions = Vec::with_capacity(positions.len());

        for (token, position) in tokens.into_iter().zip(positions) {
            if !self.stop_words.contains(&token) {
                filtered_tokens.push(token);
                filtered_positions.push(position);
            }
        }

        (filtered_tokens, filtered_positions)
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Default English stop words.
fn default_stop_words() -> HashSet<String> {
    let words = [
        "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is",
        "it", "its", "of", "on", "that", "the", "to", "was", "were", "will", "with",
    ];

    words.iter().map(|&s| s.to_string()).collect()
}

/// Strip a common suffix from a word, only when the word is longer than the
/// suffix plus one character.
fn stem_word(word: &str) -> &str {
    if word.len() > 4 && word.ends_with("ing") {
        &word[..word.len() - 3]
    } else if word.len() > 3 && word.ends_with("ed") {
        &word[..word.len() - 2]
    } else if word.len() > 2 && word.ends_with('s') {
        &word[..word.len() - 1]
    } else {
        word
    }
}
