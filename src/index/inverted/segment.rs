//! Persisted inverted-index snapshots.
//!
//! An [`IndexSegment`] serializes an [`InvertedIndex`] term dictionary to a
//! single binary file and reads it back. This is a durable snapshot
//! primitive: nothing in the core persists or reloads an index
//! automatically.
//!
//! File layout (little-endian):
//!
//! ```text
//! magic[4]="NINV" | version:u16 | term_count:u32 | reserved[8]
//! term_count x ( term_len:u16 | term | doc_freq:u32
//!                doc_freq x ( id_len:u16 | id | term_freq:u32 |
//!                             pos_count:u32 | positions[pos_count]:i64 ) )
//! ```

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use ahash::AHashMap;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{MinnowError, Result};
use crate::index::inverted::posting::{Posting, PostingList};
use crate::index::inverted::InvertedIndex;

const INDEX_SEGMENT_MAGIC: &[u8; 4] = b"NINV";
const INDEX_SEGMENT_VERSION: u16 = 1;

/// A persisted segment of the inverted index.
#[derive(Debug, Clone)]
pub struct IndexSegment {
    id: String,
    path: PathBuf,
}

impl IndexSegment {
    /// Create a handle for the index segment `index_segment_<id>.dat` under
    /// the given directory.
    pub fn new<P: AsRef<Path>>(id: &str, base_path: P) -> Self {
        let path = base_path.as_ref().join(format!("index_segment_{id}.dat"));
        IndexSegment {
            id: id.to_string(),
            path,
        }
    }

    /// The segment ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The segment file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a snapshot of the index to disk, replacing any previous file.
    pub fn write(&self, index: &InvertedIndex) -> Result<()> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)?;
        let mut writer = BufWriter::new(file);

        index.with_terms(|term_dict| -> Result<()> {
            writer.write_all(INDEX_SEGMENT_MAGIC)?;
            writer.write_u16::<LittleEndian>(INDEX_SEGMENT_VERSION)?;
            writer.write_u32::<LittleEndian>(term_dict.len() as u32)?;
            writer.write_all(&[0u8; 8])?;

            // Sorted term order keeps snapshot files deterministic.
            let mut terms: Vec<&String> = term_dict.keys().collect();
            terms.sort();

            for term in terms {
                let list = &term_dict[term];
                writer.write_u16::<LittleEndian>(term.len() as u16)?;
                writer.write_all(term.as_bytes())?;
                write_posting_list(&mut writer, list)?;
            }

            Ok(())
        })?;

        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    }

    /// Read a snapshot back into a fresh index.
    ///
    /// The snapshot stores structure only; the returned index starts with
    /// zeroed stat counters.
    pub fn read(&self) -> Result<InvertedIndex> {
        let file = File::open(&self.path)?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != INDEX_SEGMENT_MAGIC {
            return Err(MinnowError::corruption(format!(
                "invalid index segment magic in {}",
                self.path.display()
            )));
        }

        let _version = reader.read_u16::<LittleEndian>()?;
        let term_count = reader.read_u32::<LittleEndian>()?;
        let mut reserved = [0u8; 8];
        reader.read_exact(&mut reserved)?;

        let mut term_dict = AHashMap::with_capacity(term_count as usize);
        for _ in 0..term_count {
            let term_len = reader.read_u16::<LittleEndian>()?;
            let term = read_string(&mut reader, term_len as usize)?;
            let list = read_posting_list(&mut reader)?;
            term_dict.insert(term, list);
        }

        Ok(InvertedIndex::from_term_dict(term_dict))
    }
}

fn write_posting_list<W: Write>(writer: &mut W, list: &PostingList) -> Result<()> {
    writer.write_u32::<LittleEndian>(list.doc_freq)?;

    for posting in &list.postings {
        writer.write_u16::<LittleEndian>(posting.doc_id.len() as u16)?;
        writer.write_all(posting.doc_id.as_bytes())?;
        writer.write_u32::<LittleEndian>(posting.term_freq)?;
        writer.write_u32::<LittleEndian>(posting.positions.len() as u32)?;
        for &position in &posting.positions {
            writer.write_i64::<LittleEndian>(position)?;
        }
    }

    Ok(())
}

fn read_posting_list<R: Read>(reader: &mut R) -> Result<PostingList> {
    let doc_freq = reader.read_u32::<LittleEndian>()?;

    let mut postings = Vec::with_capacity(doc_freq as usize);
    for _ in 0..doc_freq {
        let id_len = reader.read_u16::<LittleEndian>()?;
        let doc_id = read_string(reader, id_len as usize)?;
        let term_freq = reader.read_u32::<LittleEndian>()?;
        let pos_count = reader.read_u32::<LittleEndian>()?;

        let mut positions = Vec::with_capacity(pos_count as usize);
        for _ in 0..pos_count {
            positions.push(reader.read_i64::<LittleEndian>()?);
        }

        postings.push(Posting {
            doc_id,
            term_freq,
            positions,
        });
    }

    Ok(PostingList { postings, doc_freq })
}

fn read_string<R: Read>(reader: &mut R, len: usize) -> Result<String> {
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| MinnowError::corruption(format!("invalid utf-8: {e}")))
}
