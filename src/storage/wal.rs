//! Write-ahead log.
//!
//! Every accepted mutation is appended to the WAL and fsync'd before the
//! document store is touched, so a crash never loses an acknowledged write.
//! Entries carry a strictly increasing sequence number; the header records
//! the highest sequence written and is rewritten after every append. On open
//! the log is scanned to recover the true maximum, tolerating a torn final
//! frame, which is truncated away so the next append starts clean.
//!
//! File layout (little-endian):
//!
//! ```text
//! magic[4]="NWAL" | version:u16 | sequence:u64 | reserved[8]
//! entries: ( entry_len:u32 | entry )*
//! entry: type:u8 | sequence:u64 | timestamp_ns:i64 |
//!        index_len:u16 | index | doc_id_len:u16 | doc_id |
//!        doc_len:u32 | doc_json          (doc_len may be 0)
//! ```

use std::fs::{File, OpenOptions};
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::Utc;
use log::{debug, warn};
use parking_lot::Mutex;

use crate::document::Document;
use crate::error::{MinnowError, Result};

const WAL_MAGIC: &[u8; 4] = b"NWAL";
const WAL_VERSION: u16 = 1;
/// magic + version + sequence + reserved
const HEADER_SIZE: u64 = 4 + 2 + 8 + 8;

/// The kind of a WAL entry.
///
/// `Delete` and `Update` are reserved kinds: they serialize and replay like
/// any other entry, but the segment store currently has no apply path for
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WalEntryKind {
    /// Document write.
    Write = 1,
    /// Document deletion (reserved).
    Delete = 2,
    /// Document update (reserved).
    Update = 3,
}

impl WalEntryKind {
    fn from_u8(value: u8) -> Result<Self> {
        match value {
            1 => Ok(WalEntryKind::Write),
            2 => Ok(WalEntryKind::Delete),
            3 => Ok(WalEntryKind::Update),
            other => Err(MinnowError::corruption(format!(
                "invalid WAL entry kind: {other}"
            ))),
        }
    }
}

/// A single entry in the write-ahead log.
#[derive(Debug, Clone, PartialEq)]
pub struct WalEntry {
    /// Entry kind.
    pub kind: WalEntryKind,
    /// Strictly increasing sequence number, starting at 1.
    pub sequence: u64,
    /// Nanoseconds since the unix epoch at append time.
    pub timestamp: i64,
    /// Name of the index the entry belongs to.
    pub index: String,
    /// Target document ID.
    pub doc_id: String,
    /// Document payload, absent for kinds that carry none.
    pub document: Option<Document>,
}

#[derive(Debug)]
struct WalInner {
    file: Option<File>,
    sequence: u64,
    initialized: bool,
}

/// An append-only write-ahead log with crash recovery.
#[derive(Debug)]
pub struct Wal {
    path: PathBuf,
    inner: Mutex<WalInner>,
}

impl Wal {
    /// Create a handle for `wal.dat` under the given directory. The file is
    /// not touched until [`open`](Wal::open) or the first append.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Wal {
            path: base_path.as_ref().join("wal.dat"),
            inner: Mutex::new(WalInner {
                file: None,
                sequence: 0,
                initialized: false,
            }),
        }
    }

    /// The WAL file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open or create the WAL file and recover the sequence counter.
    pub fn open(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        ensure_open(&mut inner, &self.path)
    }

    /// Append an entry, returning its assigned sequence number.
    ///
    /// The entry bytes are fsync'd before the header is rewritten with the
    /// new sequence; the header itself is not separately fsync'd, and
    /// recovery recomputes the maximum from the entries on open.
    pub fn write_entry(
        &self,
        kind: WalEntryKind,
        index: &str,
        doc_id: &str,
        document: Option<&Document>,
    ) -> Result<u64> {
        let mut inner = self.inner.lock();
        ensure_open(&mut inner, &self.path)?;

        inner.sequence += 1;
        let entry = WalEntry {
            kind,
            sequence: inner.sequence,
            timestamp: Utc::now().timestamp_nanos_opt().unwrap_or_default(),
            index: index.to_string(),
            doc_id: doc_id.to_string(),
            document: document.cloned(),
        };

        let entry_bytes = serialize_entry(&entry)?;
        let sequence = inner.sequence;

        let file = inner
            .file
            .as_mut()
            .ok_or_else(|| MinnowError::invariant("WAL file handle missing after open"))?;

        file.write_u32::<LittleEndian>(entry_bytes.len() as u32)?;
        file.write_all(&entry_bytes)?;
        file.sync_all()?;

        update_header(file, sequence)?;

        Ok(sequence)
    }

    /// Replay all entries in order, invoking the callback for each.
    ///
    /// A callback error aborts the replay and is surfaced. EOF, or a torn
    /// trailing frame, terminates normally.
    pub fn replay<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&WalEntry) -> Result<()>,
    {
        let mut inner = self.inner.lock();
        ensure_open(&mut inner, &self.path)?;

        let file = inner
            .file
            .as_mut()
            .ok_or_else(|| MinnowError::invariant("WAL file handle missing after open"))?;

        file.seek(SeekFrom::Start(HEADER_SIZE))?;
        while let Some(entry) = read_entry(file)? {
            f(&entry)?;
        }

        // Leave the cursor at the end of the log for subsequent appends.
        file.seek(SeekFrom::End(0))?;
        Ok(())
    }

    /// The highest sequence number assigned so far.
    pub fn sequence(&self) -> u64 {
        self.inner.lock().sequence
    }

    /// Force a sync to disk.
    pub fn flush(&self) -> Result<()> {
        let inner = self.inner.lock();
        if let Some(file) = inner.file.as_ref() {
            file.sync_all()?;
        }
        Ok(())
    }

    /// Close the WAL file.
    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.file = None;
        inner.initialized = false;
        Ok(())
    }
}

fn ensure_open(inner: &mut WalInner, path: &Path) -> Result<()> {
    if inner.initialized {
        return Ok(());
    }

    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(path)?;

    let size = file.metadata()?.len();
    if size == 0 {
        write_header(&mut file, inner.sequence)?;
        inner.file = Some(file);
        inner.initialized = true;
        return Ok(());
    }

    inner.sequence = read_header(&mut file, path)?;
    recover_sequence(&mut file, inner, path)?;

    inner.file = Some(file);
    inner.initialized = true;
    Ok(())
}

/// Scan the log for the highest entry sequence, truncating any torn tail so
/// the next append starts at a clean frame boundary.
fn recover_sequence(file: &mut File, inner: &mut WalInner, path: &Path) -> Result<()> {
    file.seek(SeekFrom::Start(HEADER_SIZE))?;

    let mut max_sequence = inner.sequence;
    let mut valid_end = HEADER_SIZE;

    while let Some(entry) = read_entry(file)? {
        if entry.sequence > max_sequence {
            max_sequence = entry.sequence;
        }
        valid_end = file.stream_position()?;
    }

    let size = file.metadata()?.len();
    if valid_end < size {
        warn!(
            "truncating torn WAL tail in {}: {} -> {} bytes",
            path.display(),
            size,
            valid_end
        );
        file.set_len(valid_end)?;
    }
    file.seek(SeekFrom::Start(valid_end))?;

    debug!(
        "recovered WAL {} at sequence {max_sequence}",
        path.display()
    );
    inner.sequence = max_sequence;
    Ok(())
}

/// Read one length-prefixed entry at the cursor. Returns `None` at EOF or at
/// the first framing/parse failure (torn tail).
fn read_entry(file: &mut File) -> Result<Option<WalEntry>> {
    let entry_len = match file.read_u32::<LittleEndian>() {
        Ok(len) => len,
        Err(_) => return Ok(None),
    };

    let mut entry_bytes = vec![0u8; entry_len as usize];
    if file.read_exact(&mut entry_bytes).is_err() {
        return Ok(None);
    }

    match deserialize_entry(&entry_bytes) {
        Ok(entry) => Ok(Some(entry)),
        Err(_) => Ok(None),
    }
}

fn serialize_entry(entry: &WalEntry) -> Result<Vec<u8>> {
    let doc_bytes = match &entry.document {
        Some(doc) => serde_json::to_vec(doc)?,
        None => Vec::new(),
    };

    let mut buf = Vec::with_capacity(
        1 + 8 + 8 + 2 + entry.index.len() + 2 + entry.doc_id.len() + 4 + doc_bytes.len(),
    );

    buf.write_u8(entry.kind as u8)?;
    buf.write_u64::<LittleEndian>(entry.sequence)?;
    buf.write_i64::<LittleEndian>(entry.timestamp)?;

    buf.write_u16::<LittleEndian>(entry.index.len() as u16)?;
    buf.write_all(entry.index.as_bytes())?;

    buf.write_u16::<LittleEndian>(entry.doc_id.len() as u16)?;
    buf.write_all(entry.doc_id.as_bytes())?;

    buf.write_u32::<LittleEndian>(doc_bytes.len() as u32)?;
    buf.write_all(&doc_bytes)?;

    Ok(buf)
}

fn deserialize_entry(data: &[u8]) -> Result<WalEntry> {
    let mut cursor = Cursor::new(data);

    let kind = WalEntryKind::from_u8(cursor.read_u8()?)?;
    let sequence = cursor.read_u64::<LittleEndian>()?;
    let timestamp = cursor.read_i64::<LittleEndian>()?;

    let index_len = cursor.read_u16::<LittleEndian>()?;
    let index = read_string(&mut cursor, index_len as usize)?;

    let doc_id_len = cursor.read_u16::<LittleEndian>()?;
    let doc_id = read_string(&mut cursor, doc_id_len as usize)?;

    let doc_len = cursor.read_u32::<LittleEndian>()?;
    let document = if doc_len > 0 {
        let mut doc_bytes = vec![0u8; doc_len as usize];
        cursor.read_exact(&mut doc_bytes)?;
        let doc = serde_json::from_slice(&doc_bytes)
            .map_err(|e| MinnowError::corruption(format!("WAL document payload: {e}")))?;
        Some(doc)
    } else {
        None
    };

    Ok(WalEntry {
        kind,
        sequence,
        timestamp,
        index,
        doc_id,
        document,
    })
}

fn read_string(cursor: &mut Cursor<&[u8]>, len: usize) -> Result<String> {
    let mut buf = vec![0u8; len];
    cursor.read_exact(&mut buf)?;
    String::from_utf8(buf)
        .map_err(|e| MinnowError::corruption(format!("invalid utf-8 in WAL entry: {e}")))
}

fn write_header(file: &mut File, sequence: u64) -> Result<()> {
    file.seek(SeekFrom::Start(0))?;
    file.write_all(WAL_MAGIC)?;
    file.write_u16::<LittleEndian>(WAL_VERSION)?;
    file.write_u64::<LittleEndian>(sequence)?;
    file.write_all(&[0u8; 8])?;
    Ok(())
}

fn read_header(file: &mut File, path: &Path) -> Result<u64> {
    file.seek(SeekFrom::Start(0))?;

    let mut magic = [0u8; 4];
    file.read_exact(&mut magic)?;
    if &magic != WAL_MAGIC {
        return Err(MinnowError::corruption(format!(
            "invalid WAL magic in {}",
            path.display()
        )));
    }

    let _version = file.read_u16::<LittleEndian>()?;
    let sequence = file.read_u64::<LittleEndian>()?;
    let mut reserved = [0u8; 8];
    file.read_exact(&mut reserved)?;

    Ok(sequence)
}

/// Rewrite the header with a new sequence, restoring the cursor afterwards.
fn update_header(file: &mut File, sequence: u64) -> Result<()> {
    let pos = file.stream_position()?;
    write_header(file, sequence)?;
    file.seek(SeekFrom::Start(pos))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::FieldValue;

    fn doc(id: &str) -> Document {
        let mut doc = Document::new(id);
        doc.set_field("title", FieldValue::Text(format!("title {id}")));
        doc
    }

    fn collect_entries(wal: &Wal) -> Vec<WalEntry> {
        let mut entries = Vec::new();
        wal.replay(|entry| {
            entries.push(entry.clone());
            Ok(())
        })
        .unwrap();
        entries
    }

    #[test]
    fn test_empty_wal_gets_fresh_header() {
        let dir = tempfile::tempdir().unwrap();
        let wal = Wal::new(dir.path());
        wal.open().unwrap();

        assert_eq!(wal.sequence(), 0);

        let bytes = std::fs::read(wal.path()).unwrap();
        assert_eq!(bytes.len() as u64, HEADER_SIZE);
        assert_eq!(&bytes[0..4], b"NWAL");
        assert_eq!(u64::from_le_bytes(bytes[6..14].try_into().unwrap()), 0);
    }

    #[test]
    fn test_sequences_are_contiguous_from_one() {
        let dir = tempfile::tempdir().unwrap();
        let wal = Wal::new(dir.path());
        wal.open().unwrap();

        for i in 1..=5u64 {
            let seq = wal
                .write_entry(WalEntryKind::Write, "idx", &i.to_string(), Some(&doc(&i.to_string())))
                .unwrap();
            assert_eq!(seq, i);
        }

        let entries = collect_entries(&wal);
        let sequences: Vec<u64> = entries.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_header_tracks_max_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let wal = Wal::new(dir.path());
        wal.open().unwrap();
        wal.write_entry(WalEntryKind::Write, "idx", "1", Some(&doc("1"))).unwrap();
        wal.write_entry(WalEntryKind::Write, "idx", "2", Some(&doc("2"))).unwrap();
        wal.close().unwrap();

        let bytes = std::fs::read(dir.path().join("wal.dat")).unwrap();
        assert_eq!(u64::from_le_bytes(bytes[6..14].try_into().unwrap()), 2);
    }

    #[test]
    fn test_replay_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let original = doc("1");

        let wal = Wal::new(dir.path());
        wal.open().unwrap();
        wal.write_entry(WalEntryKind::Write, "books", "1", Some(&original)).unwrap();
        wal.write_entry(WalEntryKind::Delete, "books", "1", None).unwrap();
        wal.close().unwrap();

        let reopened = Wal::new(dir.path());
        reopened.open().unwrap();
        assert_eq!(reopened.sequence(), 2);

        let entries = collect_entries(&reopened);
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].kind, WalEntryKind::Write);
        assert_eq!(entries[0].index, "books");
        assert_eq!(entries[0].doc_id, "1");
        assert_eq!(entries[0].document.as_ref(), Some(&original));

        assert_eq!(entries[1].kind, WalEntryKind::Delete);
        assert!(entries[1].document.is_none());
    }

    #[test]
    fn test_recovers_sequence_from_stale_header() {
        let dir = tempfile::tempdir().unwrap();

        let wal = Wal::new(dir.path());
        wal.open().unwrap();
        wal.write_entry(WalEntryKind::Write, "idx", "1", Some(&doc("1"))).unwrap();
        wal.close().unwrap();

        // Simulate a crash between the entry fsync and the header rewrite by
        // zeroing the header's sequence field.
        let path = dir.path().join("wal.dat");
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[6..14].copy_from_slice(&0u64.to_le_bytes());
        std::fs::write(&path, &bytes).unwrap();

        let reopened = Wal::new(dir.path());
        reopened.open().unwrap();
        assert_eq!(reopened.sequence(), 1);

        let entries = collect_entries(&reopened);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].sequence, 1);

        // The next append continues the run.
        let seq = reopened
            .write_entry(WalEntryKind::Write, "idx", "2", Some(&doc("2")))
            .unwrap();
        assert_eq!(seq, 2);
    }

    #[test]
    fn test_torn_tail_is_truncated() {
        let dir = tempfile::tempdir().unwrap();

        let wal = Wal::new(dir.path());
        wal.open().unwrap();
        wal.write_entry(WalEntryKind::Write, "idx", "1", Some(&doc("1"))).unwrap();
        wal.close().unwrap();

        // Append half a frame: a length prefix promising more than exists.
        let path = dir.path().join("wal.dat");
        let intact_len = std::fs::metadata(&path).unwrap().len();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&500u32.to_le_bytes()).unwrap();
        file.write_all(b"partial").unwrap();
        drop(file);

        let reopened = Wal::new(dir.path());
        reopened.open().unwrap();
        assert_eq!(reopened.sequence(), 1);
        assert_eq!(collect_entries(&reopened).len(), 1);

        // The torn bytes are gone and the next append lands cleanly.
        assert_eq!(std::fs::metadata(&path).unwrap().len(), intact_len);
        reopened
            .write_entry(WalEntryKind::Write, "idx", "2", Some(&doc("2")))
            .unwrap();
        assert_eq!(collect_entries(&reopened).len(), 2);
    }

    #[test]
    fn test_replay_callback_error_aborts() {
        let dir = tempfile::tempdir().unwrap();

        let wal = Wal::new(dir.path());
        wal.open().unwrap();
        wal.write_entry(WalEntryKind::Write, "idx", "1", None).unwrap();
        wal.write_entry(WalEntryKind::Write, "idx", "2", None).unwrap();

        let mut seen = 0;
        let result = wal.replay(|_| {
            seen += 1;
            Err(MinnowError::invariant("stop"))
        });

        assert!(result.is_err());
        assert_eq!(seen, 1);
    }

    #[test]
    fn test_rejects_bad_magic() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("wal.dat"), b"XXXXxxxxxxxxxxxxxxxxxx").unwrap();

        let wal = Wal::new(dir.path());
        let err = wal.open().unwrap_err();
        assert!(matches!(err, MinnowError::Corruption(_)));
    }
}
