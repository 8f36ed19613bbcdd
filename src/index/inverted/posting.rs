//! Posting lists: the core data structure of the inverted index.
//!
//! For each term the index keeps a [`PostingList`]: one [`Posting`] per
//! document containing the term, with the term frequency and the byte
//! positions at which the term occurred.

/// A single entry in a posting list.
#[derive(Debug, Clone, PartialEq)]
pub struct Posting {
    /// Document ID.
    pub doc_id: String,
    /// How many times the term appears in the document.
    pub term_freq: u32,
    /// Positions where the term appears, in insertion order.
    pub positions: Vec<i64>,
}

/// All documents containing a term, ordered by first occurrence.
///
/// Document IDs within a list are unique; `doc_freq` always equals the
/// number of postings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostingList {
    /// The postings in this list.
    pub postings: Vec<Posting>,
    /// Number of distinct documents containing the term.
    pub doc_freq: u32,
}

impl PostingList {
    /// Create a new empty posting list.
    pub fn new() -> Self {
        PostingList::default()
    }

    /// Record an occurrence of the term in a document.
    ///
    /// If the document already has a posting, the position is appended and
    /// the term frequency incremented; otherwise a new posting is added.
    /// The lookup is a linear scan, which is fine for the corpus sizes this
    /// core targets; a hash side-index keyed by doc ID would be a drop-in
    /// replacement.
    pub fn add_posting(&mut self, doc_id: &str, position: i64) {
        for posting in &mut self.postings {
            if posting.doc_id == doc_id {
                posting.term_freq += 1;
                posting.positions.push(position);
                return;
            }
        }

        self.postings.push(Posting {
            doc_id: doc_id.to_string(),
            term_freq: 1,
            positions: vec![position],
        });
        self.doc_freq += 1;
    }

    /// Find the posting for a document, if present.
    pub fn get_posting(&self, doc_id: &str) -> Option<&Posting> {
        self.postings.iter().find(|p| p.doc_id == doc_id)
    }

    /// All document IDs in this list, in first-occurrence order.
    pub fn doc_ids(&self) -> Vec<String> {
        self.postings.iter().map(|p| p.doc_id.clone()).collect()
    }

    /// Number of postings in the list.
    pub fn len(&self) -> usize {
        self.postings.len()
    }

    /// Check if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }
}
