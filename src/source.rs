//! Input-source abstraction.
//!
//! A source is a plain byte reader plus a seekability capability. Seekable
//! sources additionally support positioned read-back, which lets the
//! output pass rematerialize records straight from the source file with no
//! spill store at all.

use std::fs::{File, Metadata};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use crate::types::SpillOffset;

/// One input byte stream.
pub trait ByteSource {
    /// Read up to `buf.len()` bytes; `Ok(0)` signals end of input.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Whether `read_at` works on this source.
    ///
    /// Seekable sources are never spilled or kept resident: surviving
    /// records are read back by offset during the output pass.
    fn is_seekable(&self) -> bool {
        false
    }

    /// Read back exactly `buf.len()` bytes from an absolute offset.
    ///
    /// Only called when [`is_seekable`](ByteSource::is_seekable) returned
    /// `true`.
    fn read_at(&mut self, _offset: SpillOffset, _buf: &mut [u8]) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "source does not support positioned reads",
        ))
    }
}

/// A file on disk; seekable when it is a regular file.
///
/// Non-regular files (FIFOs, character devices) still work but behave like
/// [`ReaderSource`]: their records spill instead of being read back.
#[derive(Debug)]
pub struct FileSource {
    file: File,
    seekable: bool,
}

impl FileSource {
    /// Open the file at `path` for sequential reading.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::open(path)?;
        let metadata = file.metadata()?;
        Ok(Self::with_metadata(file, &metadata))
    }

    /// Wrap an already-open file, probing its metadata for seekability.
    pub fn from_file(file: File) -> io::Result<Self> {
        let metadata = file.metadata()?;
        Ok(Self::with_metadata(file, &metadata))
    }

    fn with_metadata(file: File, metadata: &Metadata) -> Self {
        Self {
            seekable: metadata.is_file(),
            file,
        }
    }
}

impl ByteSource for FileSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }

    fn is_seekable(&self) -> bool {
        self.seekable
    }

    fn read_at(&mut self, offset: SpillOffset, buf: &mut [u8]) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)
        // The sequential read position is not restored: by the time the
        // output pass reads back records, ingestion has exhausted the
        // source and never reads sequentially again.
    }
}

/// Any [`io::Read`] treated as a non-seekable stream (pipes, sockets,
/// in-memory test input).
#[derive(Debug)]
pub struct ReaderSource<R> {
    reader: R,
}

impl<R: Read> ReaderSource<R> {
    /// Wrap `reader` as a non-seekable source.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: Read> ByteSource for ReaderSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}
