use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

use crate::errors::ShuffleError;
use crate::types::SpillOffset;

/// Anonymous temporary file holding record bytes drained from a
/// non-seekable source's buffer.
///
/// The backing file is unlinked at creation, so it disappears on process
/// exit regardless of how the process terminates. One store belongs to
/// exactly one stream and is created on first spill; dropping the stream
/// closes it.
#[derive(Debug)]
pub struct SpillStore {
    file: File,
    len: SpillOffset,
}

impl SpillStore {
    /// Create an empty store backed by a fresh anonymous file.
    pub fn new() -> Result<Self, ShuffleError> {
        let file = tempfile::tempfile().map_err(|error| ShuffleError::Spill { error })?;
        Ok(Self { file, len: 0 })
    }

    /// Append `bytes` and return the offset they were written at.
    pub fn append(&mut self, bytes: &[u8]) -> Result<SpillOffset, ShuffleError> {
        let offset = self.len;
        self.file
            .seek(SeekFrom::Start(offset))
            .and_then(|_| self.file.write_all(bytes))
            .map_err(|error| ShuffleError::Spill { error })?;
        self.len += bytes.len() as SpillOffset;
        Ok(offset)
    }

    /// Read back exactly `buf.len()` bytes starting at `offset`.
    pub fn read_at(&mut self, offset: SpillOffset, buf: &mut [u8]) -> Result<(), ShuffleError> {
        debug_assert!(offset + buf.len() as SpillOffset <= self.len);
        self.file
            .seek(SeekFrom::Start(offset))
            .and_then(|_| self.file.read_exact(buf))
            .map_err(|error| ShuffleError::Spill { error })
    }

    /// Total bytes appended so far.
    pub fn len(&self) -> SpillOffset {
        self.len
    }

    /// Returns `true` when nothing has been spilled yet.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_returns_sequential_offsets() {
        let mut store = SpillStore::new().expect("spill store");
        assert!(store.is_empty());
        assert_eq!(store.append(b"alpha").expect("append"), 0);
        assert_eq!(store.append(b"beta").expect("append"), 5);
        assert_eq!(store.len(), 9);
    }

    #[test]
    fn read_at_returns_appended_ranges() {
        let mut store = SpillStore::new().expect("spill store");
        store.append(b"first record;").expect("append");
        let offset = store.append(b"second record;").expect("append");
        let mut buf = vec![0u8; 14];
        store.read_at(offset, &mut buf).expect("read back");
        assert_eq!(&buf, b"second record;");
        let mut head = vec![0u8; 5];
        store.read_at(0, &mut head).expect("read head");
        assert_eq!(&head, b"first");
    }
}
