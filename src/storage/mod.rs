//! Durable storage: document segments, the write-ahead log, and the index
//! manager that glues them together.

pub mod index_manager;
pub mod segment;
pub mod wal;

pub use index_manager::IndexManager;
pub use segment::Segment;
pub use wal::{Wal, WalEntry, WalEntryKind};

use std::fs::File;
use std::io;

/// Read exactly `buf.len()` bytes at `offset` without moving the file
/// cursor, so concurrent readers cannot interleave on a shared handle.
#[cfg(unix)]
pub(crate) fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

/// Read exactly `buf.len()` bytes at `offset` without moving the file
/// cursor, so concurrent readers cannot interleave on a shared handle.
#[cfg(windows)]
pub(crate) fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "failed to fill whole buffer",
                ));
            }
            Ok(n) => {
                buf = &mut buf[n..];
                offset += n as u64;
            }
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
