//! In-memory inverted index.
//!
//! Maps field-qualified terms (`"field:token"`) to posting lists and answers
//! single-term, field-scoped, and multi-term conjunctive lookups. All state
//! lives behind a readers-writer lock, so the index can be shared across
//! threads.
//!
//! # Examples
//!
//! ```
//! use minnow::index::inverted::InvertedIndex;
//!
//! let index = InvertedIndex::new();
//! index.index_document("1", "title", "The Great Gatsby");
//! index.index_document("2", "title", "Great Expectations");
//!
//! let results = index.search("great").unwrap();
//! assert_eq!(results.doc_freq, 2);
//! ```

pub mod posting;
pub mod segment;

use std::collections::BTreeSet;

use ahash::AHashMap;
use parking_lot::RwLock;

pub use posting::{Posting, PostingList};
pub use segment::IndexSegment;

use crate::analysis::Analyzer;

/// Index statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    /// Total number of token occurrences indexed.
    pub total_terms: u64,
    /// Number of `index_document` calls. Indexing two fields of the same
    /// document counts twice.
    pub total_docs: u64,
    /// Number of distinct field-qualified terms in the dictionary.
    pub unique_terms: usize,
}

#[derive(Default, Debug)]
pub(crate) struct InvertedIndexInner {
    pub(crate) term_dict: AHashMap<String, PostingList>,
    pub(crate) total_terms: u64,
    pub(crate) total_docs: u64,
}

/// A concurrent inverted index over field-qualified terms.
#[derive(Debug)]
pub struct InvertedIndex {
    inner: RwLock<InvertedIndexInner>,
    analyzer: Analyzer,
}

impl InvertedIndex {
    /// Create a new inverted index with the default analyzer.
    pub fn new() -> Self {
        Self::with_analyzer(Analyzer::new())
    }

    /// Create an inverted index with a custom analyzer.
    pub fn with_analyzer(analyzer: Analyzer) -> Self {
        InvertedIndex {
            inner: RwLock::new(InvertedIndexInner::default()),
            analyzer,
        }
    }

    pub(crate) fn from_term_dict(term_dict: AHashMap<String, PostingList>) -> Self {
        InvertedIndex {
            inner: RwLock::new(InvertedIndexInner {
                term_dict,
                total_terms: 0,
                total_docs: 0,
            }),
            analyzer: Analyzer::new(),
        }
    }

    pub(crate) fn with_terms<R>(
        &self,
        f: impl FnOnce(&AHashMap<String, PostingList>) -> R,
    ) -> R {
        let inner = self.inner.read();
        f(&inner.term_dict)
    }

    /// Index one text field of a document.
    ///
    /// The text is analyzed, and every surviving token is recorded under the
    /// key `"<field_name>:<token>"` with its byte position.
    pub fn index_document(&self, doc_id: &str, field_name: &str, text: &str) {
        let (tokens, positions) = self.analyzer.analyze_with_positions(text);

        let mut inner = self.inner.write();

        inner.total_terms += tokens.len() as u64;
        for (token, position) in tokens.into_iter().zip(positions) {
            let term_key = format!("{field_name}:{token}");
            inner
                .term_dict
                .entry(term_key)
                .or_default()
                .add_posting(doc_id, position);
        }

        inner.total_docs += 1;
    }

    /// Find documents containing a term in any field.
    ///
    /// The term is analyzed and its first token looked up under every field
    /// present in the dictionary, in lexicographic field order; the first
    /// match wins. Returns `None` if the term analyzes to nothing or no
    /// field contains it.
    pub fn search(&self, term: &str) -> Option<PostingList> {
        let tokens = self.analyzer.analyze(term);
        let token = tokens.first()?;

        let inner = self.inner.read();
        for field_name in field_names(&inner.term_dict) {
            let term_key = format!("{field_name}:{token}");
            if let Some(list) = inner.term_dict.get(&term_key) {
                return Some(list.clone());
            }
        }

        None
    }

    /// Find documents containing a term in a specific field.
    pub fn search_in_field(&self, field_name: &str, term: &str) -> Option<PostingList> {
        let tokens = self.analyzer.analyze(term);
        let token = tokens.first()?;

        let inner = self.inner.read();
        let term_key = format!("{field_name}:{token}");
        inner.term_dict.get(&term_key).cloned()
    }

    /// Find documents containing all of the given terms (AND query).
    ///
    /// Each term is resolved with the any-field rule of [`search`]; terms
    /// that analyze to nothing are skipped, and a term with no match makes
    /// the result empty. The retained postings mirror the first term's list.
    ///
    /// [`search`]: InvertedIndex::search
    pub fn search_multiple_terms(&self, terms: &[&str]) -> PostingList {
        if terms.is_empty() {
            return PostingList::new();
        }

        let inner = self.inner.read();
        let fields = field_names(&inner.term_dict);

        let mut lists: Vec<&PostingList> = Vec::with_capacity(terms.len());
        for term in terms {
            let tokens = self.analyzer.analyze(term);
            let Some(token) = tokens.first() else {
                continue;
            };

            let mut found = None;
            for field_name in &fields {
                let term_key = format!("{field_name}:{token}");
                if let Some(list) = inner.term_dict.get(&term_key) {
                    found = Some(list);
                    break;
                }
            }

            match found {
                Some(list) => lists.push(list),
                None => return PostingList::new(),
            }
        }

        intersect_posting_lists(&lists)
    }

    /// Get index statistics.
    ///
    /// `total_docs` counts `index_document` calls, not unique documents.
    pub fn stats(&self) -> IndexStats {
        let inner = self.inner.read();
        IndexStats {
            total_terms: inner.total_terms,
            total_docs: inner.total_docs,
            unique_terms: inner.term_dict.len(),
        }
    }

    /// Remove all indexed data.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.term_dict.clear();
        inner.total_terms = 0;
        inner.total_docs = 0;
    }
}

impl Default for InvertedIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Distinct field prefixes in the dictionary, in lexicographic order so that
/// first-match-wins lookups are deterministic.
fn field_names(term_dict: &AHashMap<String, PostingList>) -> BTreeSet<String> {
    term_dict
        .keys()
        .filter_map(|key| key.split_once(':').map(|(field, _)| field.to_string()))
        .collect()
}

/// Intersect posting lists: keep postings of the first list whose document
/// appears in every other list, preserving the first list's metadata.
fn intersect_posting_lists(lists: &[&PostingList]) -> PostingList {
    let Some((first, rest)) = lists.split_first() else {
        return PostingList::new();
    };

    if rest.is_empty() {
        return (*first).clone();
    }

    let mut result = PostingList::new();
    for posting in &first.postings {
        let in_all = rest.iter().all(|list| list.get_posting(&posting.doc_id).is_some());
        if in_all {
            result.postings.push(posting.clone());
            result.doc_freq += 1;
        }
    }

    result
}
