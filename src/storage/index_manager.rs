//! Index manager: the storage glue for one index.
//!
//! An [`IndexManager`] owns a schema, a write-ahead log, and an ordered list
//! of document segments under `<base>/<name>/`. Writes are validated against
//! the schema, made durable in the WAL, then appended to the active (last)
//! segment; reads scan segments newest-first.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use parking_lot::RwLock;

use crate::document::Document;
use crate::error::{MinnowError, Result};
use crate::schema::Schema;
use crate::storage::segment::Segment;
use crate::storage::wal::{Wal, WalEntryKind};

const SEGMENT_PREFIX: &str = "segment_";
const SEGMENT_SUFFIX: &str = ".dat";

struct ManagerInner {
    segments: Vec<Segment>,
    next_seg_id: u32,
}

/// Manages the durable storage for a single index.
pub struct IndexManager {
    name: String,
    base_path: PathBuf,
    schema: Schema,
    wal: Wal,
    inner: RwLock<ManagerInner>,
}

impl IndexManager {
    /// Open the index named `name` under `base_path`, creating its directory
    /// and first segment as needed.
    ///
    /// Existing segment files are discovered by file name and opened in
    /// sorted order; files that fail to open are skipped.
    pub fn open<P: AsRef<Path>>(name: &str, base_path: P, schema: Schema) -> Result<Self> {
        let index_path = base_path.as_ref().join(name);
        fs::create_dir_all(&index_path)?;

        let wal = Wal::new(&index_path);
        wal.open()?;

        let manager = IndexManager {
            name: name.to_string(),
            base_path: index_path,
            schema,
            wal,
            inner: RwLock::new(ManagerInner {
                segments: Vec::new(),
                next_seg_id: 0,
            }),
        };

        {
            let mut inner = manager.inner.write();
            manager.load_segments(&mut inner)?;

            if inner.segments.is_empty() {
                let segment = manager.create_segment(&mut inner)?;
                inner.segments.push(segment);
            }
        }

        Ok(manager)
    }

    /// The index name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The index directory.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// The schema this index validates against.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The write-ahead log for this index.
    pub fn wal(&self) -> &Wal {
        &self.wal
    }

    fn load_segments(&self, inner: &mut ManagerInner) -> Result<()> {
        let mut names: Vec<String> = fs::read_dir(&self.base_path)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.starts_with(SEGMENT_PREFIX) && name.ends_with(SEGMENT_SUFFIX))
            .collect();
        names.sort();

        for name in names {
            let id = &name[SEGMENT_PREFIX.len()..name.len() - SEGMENT_SUFFIX.len()];
            if id.is_empty() {
                continue;
            }

            let segment = Segment::new(id, &self.base_path);
            match segment.open() {
                Ok(()) => inner.segments.push(segment),
                Err(e) => warn!("skipping unopenable segment {name}: {e}"),
            }
        }

        debug!(
            "index {} loaded {} segment(s)",
            self.name,
            inner.segments.len()
        );
        Ok(())
    }

    fn create_segment(&self, inner: &mut ManagerInner) -> Result<Segment> {
        inner.next_seg_id += 1;
        let id = format!("seg{}", inner.next_seg_id);

        let segment = Segment::new(&id, &self.base_path);
        segment.open()?;
        Ok(segment)
    }

    /// Write a document: validate, log, then append to the active segment.
    ///
    /// The WAL entry is fsync'd before the segment is touched, so replay
    /// never loses an accepted write.
    pub fn write_document(&self, doc: &Document) -> Result<()> {
        let inner = self.inner.write();

        self.schema.validate_document(doc)?;

        self.wal
            .write_entry(WalEntryKind::Write, &self.name, &doc.id, Some(doc))?;

        let segment = inner
            .segments
            .last()
            .ok_or_else(|| MinnowError::invariant("no segments available"))?;
        segment.write_document(doc)?;
        segment.flush()?;

        Ok(())
    }

    /// Read a document by ID, scanning segments newest-first.
    pub fn read_document(&self, id: &str) -> Result<Document> {
        let inner = self.inner.read();

        for segment in inner.segments.iter().rev() {
            match segment.read_document(id) {
                Ok(doc) => return Ok(doc),
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            }
        }

        Err(MinnowError::not_found(id))
    }

    /// Total number of documents across all segments.
    pub fn document_count(&self) -> u64 {
        let inner = self.inner.read();
        inner.segments.iter().map(|s| s.doc_count()).sum()
    }

    /// Close all segments (flushing their tail indexes) and the WAL.
    pub fn close(&self) -> Result<()> {
        let inner = self.inner.write();

        for segment in &inner.segments {
            segment.close()?;
        }

        self.wal.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{FieldType, FieldValue};
    use crate::schema::FieldDef;

    fn books_schema() -> Schema {
        let mut schema = Schema::new("books");
        schema.add_field("title", FieldDef::new(FieldType::Text));
        schema.add_field("author", FieldDef::new(FieldType::Keyword));
        schema
    }

    fn doc(id: &str, title: &str) -> Document {
        let mut doc = Document::new(id);
        doc.set_field("title", FieldValue::Text(title.to_string()));
        doc
    }

    #[test]
    fn test_write_and_read_document() {
        let dir = tempfile::tempdir().unwrap();
        let manager = IndexManager::open("demo", dir.path(), books_schema()).unwrap();

        manager.write_document(&doc("1", "Hello World")).unwrap();

        assert_eq!(manager.document_count(), 1);
        let stored = manager.read_document("1").unwrap();
        assert_eq!(
            stored.get_field("title").unwrap().as_text(),
            Some("Hello World")
        );
        manager.close().unwrap();
    }

    #[test]
    fn test_creates_directory_and_first_segment() {
        let dir = tempfile::tempdir().unwrap();
        let manager = IndexManager::open("demo", dir.path(), books_schema()).unwrap();

        assert!(dir.path().join("demo").join("wal.dat").exists());
        assert!(dir.path().join("demo").join("segment_seg1.dat").exists());
        manager.close().unwrap();
    }

    #[test]
    fn test_schema_validation_rejects_bad_write() {
        let dir = tempfile::tempdir().unwrap();
        let manager = IndexManager::open("demo", dir.path(), books_schema()).unwrap();

        let mut bad = Document::new("1");
        bad.set_field("title", FieldValue::Numeric(1.0));

        let err = manager.write_document(&bad).unwrap_err();
        assert!(matches!(err, MinnowError::SchemaValidation(_)));

        // The rejected write left nothing behind.
        assert_eq!(manager.document_count(), 0);
        assert_eq!(manager.wal().sequence(), 0);
        manager.close().unwrap();
    }

    #[test]
    fn test_read_missing_document() {
        let dir = tempfile::tempdir().unwrap();
        let manager = IndexManager::open("demo", dir.path(), books_schema()).unwrap();

        let err = manager.read_document("ghost").unwrap_err();
        assert!(err.is_not_found());
        manager.close().unwrap();
    }

    #[test]
    fn test_close_reopen_round_trip() {
        let dir = tempfile::tempdir().unwrap();

        let manager = IndexManager::open("demo", dir.path(), books_schema()).unwrap();
        for i in 1..=10 {
            manager
                .write_document(&doc(&i.to_string(), &format!("Book {i}")))
                .unwrap();
        }
        manager.close().unwrap();

        let reopened = IndexManager::open("demo", dir.path(), books_schema()).unwrap();
        assert_eq!(reopened.document_count(), 10);
        for i in 1..=10 {
            let stored = reopened.read_document(&i.to_string()).unwrap();
            assert_eq!(
                stored.get_field("title").unwrap().as_text(),
                Some(format!("Book {i}").as_str())
            );
        }
        reopened.close().unwrap();
    }

    #[test]
    fn test_wal_records_every_write() {
        let dir = tempfile::tempdir().unwrap();

        let manager = IndexManager::open("demo", dir.path(), books_schema()).unwrap();
        let original = doc("1", "Durable");
        manager.write_document(&original).unwrap();

        let mut entries = Vec::new();
        manager
            .wal()
            .replay(|entry| {
                entries.push(entry.clone());
                Ok(())
            })
            .unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, WalEntryKind::Write);
        assert_eq!(entries[0].index, "demo");
        assert_eq!(entries[0].doc_id, "1");
        assert_eq!(entries[0].document.as_ref(), Some(&original));
        manager.close().unwrap();
    }

    #[test]
    fn test_reads_scan_newest_segment_first() {
        let dir = tempfile::tempdir().unwrap();
        let index_path = dir.path().join("demo");
        fs::create_dir_all(&index_path).unwrap();

        // Two pre-existing segments with the same document ID; the newer
        // (later-sorting) segment must win.
        let old = Segment::new("seg1", &index_path);
        old.open().unwrap();
        old.write_document(&doc("1", "old")).unwrap();
        old.close().unwrap();

        let new = Segment::new("seg2", &index_path);
        new.open().unwrap();
        new.write_document(&doc("1", "new")).unwrap();
        new.close().unwrap();

        let manager = IndexManager::open("demo", dir.path(), books_schema()).unwrap();
        let stored = manager.read_document("1").unwrap();
        assert_eq!(stored.get_field("title").unwrap().as_text(), Some("new"));
        assert_eq!(manager.document_count(), 2);
        manager.close().unwrap();
    }

    #[test]
    fn test_skips_unopenable_segment_files() {
        let dir = tempfile::tempdir().unwrap();
        let index_path = dir.path().join("demo");
        fs::create_dir_all(&index_path).unwrap();
        fs::write(index_path.join("segment_junk.dat"), b"not a segment").unwrap();

        let manager = IndexManager::open("demo", dir.path(), books_schema()).unwrap();
        manager.write_document(&doc("1", "fine")).unwrap();
        assert_eq!(manager.document_count(), 1);
        manager.close().unwrap();
    }

    #[test]
    fn test_document_with_only_undeclared_fields_is_stored() {
        let dir = tempfile::tempdir().unwrap();
        let manager = IndexManager::open("demo", dir.path(), books_schema()).unwrap();

        let mut doc = Document::new("free");
        doc.set_field("note", FieldValue::Text("unindexed but stored".to_string()));
        manager.write_document(&doc).unwrap();

        let stored = manager.read_document("free").unwrap();
        assert_eq!(stored, doc);
        manager.close().unwrap();
    }
}
