//! Tokenizer implementation.
//!
//! Splits text into lowercase tokens on non-alphanumeric boundaries. Every
//! Unicode letter-or-digit code point is part of a token; everything else is
//! a separator and is dropped.
//!
//! # Examples
//!
//! ```
//! use minnow::analysis::Tokenizer;
//!
//! let tokenizer = Tokenizer::new();
//! let tokens = tokenizer.tokenize("Hello, World!");
//! assert_eq!(tokens, vec!["hello", "world"]);
//! ```

/// A tokenizer that splits text into runs of alphanumeric characters.
///
/// Input is lowercased first, so search is case-insensitive by construction.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tokenizer;

impl Tokenizer {
    /// Create a new tokenizer.
    pub fn new() -> Self {
        Tokenizer
    }

    /// Split text into lowercase tokens.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let text = text.to_lowercase();

        let mut tokens = Vec::new();
        let mut current = String::new();

        for ch in text.chars() {
            if ch.is_alphanumeric() {
                current.push(ch);
            } else if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        }

        if !current.is_empty() {
            tokens.push(current);
        }

        tokens
    }

    /// Split text into lowercase tokens, returning for each token the byte
    /// offset in the lowercased input at which it began.
    pub fn tokenize_with_positions(&self, text: &str) -> (Vec<String>, Vec<i64>) {
        let text = text.to_lowercase();

        let mut tokens = Vec::new();
        let mut positions = Vec::new();
        let mut current = String::new();
        let mut start = 0i64;

        for (i, ch) in text.char_indices() {
            if ch.is_alphanumeric() {
                if current.is_empty() {
                    start = i as i64;
                }
                current.push(ch);
            } else if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
                positions.push(start);
            }
        }

        if !current.is_empty() {
            tokens.push(current);
            positions.push(start);
        }

        (tokens, positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_basic() {
        let tokenizer = Tokenizer::new();
        let tokens = tokenizer.tokenize("The Quick Brown Fox");
        assert_eq!(tokens, vec!["the", "quick", "brown", "fox"]);
    }

    #[test]
    fn test_tokenize_punctuation() {
        let tokenizer = Tokenizer::new();
        let tokens = tokenizer.tokenize("hello, world! foo-bar_baz");
        assert_eq!(tokens, vec!["hello", "world", "foo", "bar", "baz"]);
    }

    #[test]
    fn test_tokenize_digits() {
        let tokenizer = Tokenizer::new();
        let tokens = tokenizer.tokenize("area 51 and route66");
        assert_eq!(tokens, vec!["area", "51", "and", "route66"]);
    }

    #[test]
    fn test_tokenize_empty_and_separators_only() {
        let tokenizer = Tokenizer::new();
        assert!(tokenizer.tokenize("").is_empty());
        assert!(tokenizer.tokenize("  ,.!?  ").is_empty());
    }

    #[test]
    fn test_tokenize_unicode() {
        let tokenizer = Tokenizer::new();
        let tokens = tokenizer.tokenize("Café Résumé 日本語");
        assert_eq!(tokens, vec!["café", "résumé", "日本語"]);
    }

    #[test]
    fn test_tokenize_is_total() {
        let tokenizer = Tokenizer::new();
        for input in ["", "a", "!!", "Mixed CASE 123", "\u{1F600} emoji"] {
            for token in tokenizer.tokenize(input) {
                assert!(!token.is_empty());
                assert!(token.chars().all(|c| c.is_alphanumeric()));
                assert_eq!(token, token.to_lowercase());
            }
        }
    }

    #[test]
    fn test_tokenize_with_positions() {
        let tokenizer = Tokenizer::new();
        let (tokens, positions) = tokenizer.tokenize_with_positions("Hello, World");
        assert_eq!(tokens, vec!["hello", "world"]);
        // "hello" starts at byte 0, "world" after "hello, " at byte 7.
        assert_eq!(positions, vec![0, 7]);
    }

    #[test]
    fn test_tokenize_with_positions_trailing_token() {
        let tokenizer = Tokenizer::new();
        let (tokens, positions) = tokenizer.tokenize_with_positions("one two");
        assert_eq!(tokens, vec!["one", "two"]);
        assert_eq!(positions, vec![0, 4]);
    }

    #[test]
    fn test_positions_are_byte_offsets() {
        let tokenizer = Tokenizer::new();
        // "é" is two bytes in UTF-8, so "b" starts at byte 3.
        let (tokens, positions) = tokenizer.tokenize_with_positions("é b");
        assert_eq!(tokens, vec!["é", "b"]);
        assert_eq!(positions, vec![0, 3]);
    }
}
