//! Document store segments.
//!
//! A [`Segment`] is one append-only file of length-prefixed JSON document
//! records. The header tracks the document count and, once the segment has
//! been flushed, the offset of a tail index mapping document IDs to record
//! offsets. Appending after a reopen truncates the stale tail index first;
//! flush/close rewrite it.
//!
//! File layout (little-endian):
//!
//! ```text
//! magic[4]="NSEG" | version:u16 | doc_count:u32 | created:i64 |
//! index_offset:i64 | reserved[8]
//! records: ( doc_len:u32 | doc_json )*      starting at byte 34
//! tail index at index_offset when > 0:
//!   count:u32 | count x ( id_len:u16 | id | offset:i64 )
//! ```

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use ahash::AHashMap;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::Utc;
use parking_lot::RwLock;

use crate::document::Document;
use crate::error::{MinnowError, Result};
use crate::storage::read_exact_at;

const SEGMENT_MAGIC: &[u8; 4] = b"NSEG";
const SEGMENT_VERSION: u16 = 1;
/// magic + version + doc_count + created + index_offset + reserved
const HEADER_SIZE: u64 = 4 + 2 + 4 + 8 + 8 + 8;

#[derive(Debug, Clone, Copy)]
struct SegmentHeader {
    version: u16,
    doc_count: u32,
    created: i64,
    index_offset: i64,
}

#[derive(Debug)]
struct SegmentInner {
    file: Option<File>,
    /// Document ID -> record offset in the file.
    doc_index: AHashMap<String, i64>,
    doc_count: u32,
    created: i64,
    version: u16,
    initialized: bool,
}

/// A storage segment containing documents.
#[derive(Debug)]
pub struct Segment {
    id: String,
    path: PathBuf,
    inner: RwLock<SegmentInner>,
}

impl Segment {
    /// Create a handle for the segment `segment_<id>.dat` under the given
    /// directory. The file is not touched until [`open`](Segment::open).
    pub fn new<P: AsRef<Path>>(id: &str, base_path: P) -> Self {
        let path = base_path.as_ref().join(format!("segment_{id}.dat"));
        Segment {
            id: id.to_string(),
            path,
            inner: RwLock::new(SegmentInner {
                file: None,
                doc_index: AHashMap::new(),
                doc_count: 0,
                created: Utc::now().timestamp(),
                version: SEGMENT_VERSION,
                initialized: false,
            }),
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

    /// Open or create the segment file.
    ///
    /// An empty file gets a fresh header. An existing file has its header
    /// validated and, when a tail index has been flushed, the document map
    /// loaded from it.
    pub fn open(&self) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.initialized {
            return Ok(());
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&self.path)?;

        let size = file.metadata()?.len();
        if size == 0 {
            let header = SegmentHeader {
                version: inner.version,
                doc_count: inner.doc_count,
                created: inner.created,
                index_offset: 0,
            };
            write_header(&mut file, &header)?;
        } else {
            let header = read_header(&mut file, &self.path)?;
            inner.version = header.version;
            inner.doc_count = header.doc_count;
            inner.created = header.created;

            if header.index_offset > 0 {
                inner.doc_index = read_tail_index(&mut file, header.index_offset)?;
            }
        }

        inner.file = Some(file);
        inner.initialized = true;
        Ok(())
    }

    /// Append a document record and update the in-memory offset map.
    ///
    /// If a tail index is present (the segment was reopened after a flush),
    /// the file is truncated back to the index offset first, so records stay
    /// contiguous; the tail index is rewritten on the next flush or close.
    pub fn write_document(&self, doc: &Document) -> Result<()> {
        let doc_bytes = serde_json::to_vec(doc)?;

        let mut inner = self.inner.write();
        let SegmentInner {
            file,
            doc_index,
            doc_count,
            created,
            version,
            initialized,
        } = &mut *inner;

        if !*initialized {
            return Err(MinnowError::invariant(format!(
                "segment {} is not open",
                self.id
            )));
        }
        let file = file
            .as_mut()
            .ok_or_else(|| MinnowError::invariant(format!("segment {} is not open", self.id)))?;

        let size = file.metadata()?.len();
        let write_offset = if size == HEADER_SIZE {
            HEADER_SIZE as i64
        } else {
            let header = read_header(file, &self.path)?;
            if header.index_offset > 0 {
                // Drop the stale tail index; it is rewritten on flush.
                file.set_len(header.index_offset as u64)?;
                header.index_offset
            } else {
                size as i64
            }
        };

        file.seek(SeekFrom::Start(write_offset as u64))?;
        file.write_u32::<LittleEndian>(doc_bytes.len() as u32)?;
        file.write_all(&doc_bytes)?;

        doc_index.insert(doc.id.clone(), write_offset);
        *doc_count += 1;

        let header = SegmentHeader {
            version: *version,
            doc_count: *doc_count,
            created: *created,
            index_offset: 0,
        };
        update_header(file, &header)?;

        file.sync_all()?;
        Ok(())
    }

    /// Read a document by ID.
    pub fn read_document(&self, id: &str) -> Result<Document> {
        let inner = self.inner.read();

        let file = inner
            .file
            .as_ref()
            .ok_or_else(|| MinnowError::invariant(format!("segment {} is not open", self.id)))?;

        let offset = *inner
            .doc_index
            .get(id)
            .ok_or_else(|| MinnowError::not_found(id))?;

        let mut len_bytes = [0u8; 4];
        read_exact_at(file, &mut len_bytes, offset as u64)?;
        let doc_len = u32::from_le_bytes(len_bytes);

        let mut doc_bytes = vec![0u8; doc_len as usize];
        read_exact_at(file, &mut doc_bytes, offset as u64 + 4)?;

        serde_json::from_slice(&doc_bytes).map_err(|e| {
            MinnowError::corruption(format!(
                "document {id:?} in segment {}: {e}",
                self.id
            ))
        })
    }

    /// Write the tail index and point the header at it.
    pub fn flush(&self) -> Result<()> {
        let mut inner = self.inner.write();
        if !inner.initialized {
            return Ok(());
        }

        let SegmentInner {
            file,
            doc_index,
            doc_count,
            created,
            version,
            ..
        } = &mut *inner;

        match file.as_mut() {
            Some(file) => write_tail_index(file, doc_index, *doc_count, *created, *version),
            None => Ok(()),
        }
    }

    /// Flush the tail index and release the file handle.
    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.write();

        let result = {
            let SegmentInner {
                file,
                doc_index,
                doc_count,
                created,
                version,
                initialized,
            } = &mut *inner;

            match file.as_mut() {
                Some(file) if *initialized => {
                    write_tail_index(file, doc_index, *doc_count, *created, *version)
                }
                _ => Ok(()),
            }
        };

        inner.file = None;
        inner.initialized = false;
        result
    }

    /// Number of documents in the segment.
    pub fn doc_count(&self) -> u64 {
        self.inner.read().doc_count as u64
    }

    /// All document IDs in the segment. The order is not guaranteed.
    pub fn all_doc_ids(&self) -> Vec<String> {
        self.inner.read().doc_index.keys().cloned().collect()
    }
}

fn write_header(file: &mut File, header: &SegmentHeader) -> Result<()> {
    file.seek(SeekFrom::Start(0))?;
    file.write_all(SEGMENT_MAGIC)?;
    file.write_u16::<LittleEndian>(header.version)?;
    file.write_u32::<LittleEndian>(header.doc_count)?;
    file.write_i64::<LittleEndian>(header.created)?;
    file.write_i64::<LittleEndian>(header.index_offset)?;
    file.write_all(&[0u8; 8])?;
    Ok(())
}

fn read_header(file: &mut File, path: &Path) -> Result<SegmentHeader> {
    file.seek(SeekFrom::Start(0))?;

    let mut magic = [0u8; 4];
    file.read_exact(&mut magic)?;
    if &magic != SEGMENT_MAGIC {
        return Err(MinnowError::corruption(format!(
            "invalid segment magic in {}",
            path.display()
        )));
    }

    let version = file.read_u16::<LittleEndian>()?;
    let doc_count = file.read_u32::<LittleEndian>()?;
    let created = file.read_i64::<LittleEndian>()?;
    let index_offset = file.read_i64::<LittleEndian>()?;
    let mut reserved = [0u8; 8];
    file.read_exact(&mut reserved)?;

    Ok(SegmentHeader {
        version,
        doc_count,
        created,
        index_offset,
    })
}

/// Rewrite the header, restoring the file cursor afterwards.
fn update_header(file: &mut File, header: &SegmentHeader) -> Result<()> {
    let pos = file.stream_position()?;
    write_header(file, header)?;
    file.seek(SeekFrom::Start(pos))?;
    Ok(())
}

fn read_tail_index(file: &mut File, index_offset: i64) -> Result<AHashMap<String, i64>> {
    file.seek(SeekFrom::Start(index_offset as u64))?;

    let count = file.read_u32::<LittleEndian>()?;
    let mut doc_index = AHashMap::with_capacity(count as usize);

    for _ in 0..count {
        let id_len = file.read_u16::<LittleEndian>()?;
        let mut id_bytes = vec![0u8; id_len as usize];
        file.read_exact(&mut id_bytes)?;
        let id = String::from_utf8(id_bytes)
            .map_err(|e| MinnowError::corruption(format!("invalid doc id in tail index: {e}")))?;
        let offset = file.read_i64::<LittleEndian>()?;
        doc_index.insert(id, offset);
    }

    Ok(doc_index)
}

/// Append the tail index at the end of the file and point the header at it,
/// restoring the cursor afterwards.
fn write_tail_index(
    file: &mut File,
    doc_index: &AHashMap<String, i64>,
    doc_count: u32,
    created: i64,
    version: u16,
) -> Result<()> {
    let index_offset = file.seek(SeekFrom::End(0))?;

    file.write_u32::<LittleEndian>(doc_index.len() as u32)?;

    // Sorted entries keep segment files deterministic.
    let mut ids: Vec<&String> = doc_index.keys().collect();
    ids.sort();

    for id in ids {
        file.write_u16::<LittleEndian>(id.len() as u16)?;
        file.write_all(id.as_bytes())?;
        file.write_i64::<LittleEndian>(doc_index[id])?;
    }

    let header = SegmentHeader {
        version,
        doc_count,
        created,
        index_offset: index_offset as i64,
    };
    update_header(file, &header)?;

    file.sync_all()?;
    Ok(())
}
