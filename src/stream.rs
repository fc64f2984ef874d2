//! Incremental record tokenization with bounded-memory retention.
//!
//! Ownership model:
//! - `RecordStream` owns one source, its read buffer, and (for
//!   non-seekable sources) a lazily created spill store.
//! - `Record` is a handle to one delimited unit; its bytes live in exactly
//!   one place (resident buffer, spill store, or the seekable source
//!   itself). Resident records credit the memory budget on drop, so every
//!   code path releases a record's storage exactly once.

use std::io;
use std::sync::Arc;

use tracing::debug;

use crate::budget::MemoryBudget;
use crate::constants::{budget as budget_consts, stream as stream_consts};
use crate::errors::ShuffleError;
use crate::pattern::Pattern;
use crate::source::ByteSource;
use crate::spill::SpillStore;
use crate::types::{SourceIndex, SpillOffset};

/// Where one record's bytes live. Exactly one variant per record, decided
/// once when the record is resolved.
#[derive(Debug)]
pub(crate) enum ContentLocation {
    /// Owned copy in memory; the budget was debited for it.
    Resident(ResidentPayload),
    /// Range in the owning stream's spill store.
    Spilled { offset: SpillOffset },
    /// Range in the seekable source itself; nothing was copied.
    InSource { offset: SpillOffset },
}

/// Resident record content plus the budget debt it carries.
#[derive(Debug)]
pub(crate) struct ResidentPayload {
    bytes: Vec<u8>,
    cost: usize,
    budget: MemoryBudget,
}

impl ResidentPayload {
    pub(crate) fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Drop for ResidentPayload {
    fn drop(&mut self) {
        // The single release point for resident storage; dropping a
        // rejected, evicted, or written record all funnel through here.
        self.budget.credit(self.cost);
    }
}

/// Handle to one delimited unit of input.
///
/// The span covers the record content plus the delimiter bytes the matcher
/// consumed to find it; [`body_len`](Record::body_len) excludes the
/// delimiter. Dropping the record releases its storage.
#[derive(Debug)]
pub struct Record {
    source: SourceIndex,
    len: usize,
    delim_len: usize,
    last_in_source: bool,
    location: ContentLocation,
}

impl Record {
    /// Index of the stream that produced this record.
    pub fn source(&self) -> SourceIndex {
        self.source
    }

    /// Full span length: content plus consumed delimiter bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` for a zero-length span (never produced in practice;
    /// zero-width boundary matches are rejected as degenerate).
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Length of the delimiter consumed to find this record; 0 for an
    /// unterminated final record.
    pub fn delim_len(&self) -> usize {
        self.delim_len
    }

    /// Content length, excluding the consumed delimiter.
    pub fn body_len(&self) -> usize {
        self.len - self.delim_len
    }

    /// True when this record was resolved at observed end-of-input, i.e.
    /// the only case where an end-anchored boundary match was permitted.
    ///
    /// A record whose delimiter arrived in the same read as the last byte
    /// of its source may carry `false`; the flag exists for anchoring
    /// decisions, not as a general position marker.
    pub fn is_last_in_source(&self) -> bool {
        self.last_in_source
    }

    /// True when the record's bytes are held resident against the budget.
    pub fn is_resident(&self) -> bool {
        matches!(self.location, ContentLocation::Resident(_))
    }

    /// True when the record's bytes were written to a spill store.
    pub fn is_spilled(&self) -> bool {
        matches!(self.location, ContentLocation::Spilled { .. })
    }

    pub(crate) fn location(&self) -> &ContentLocation {
        &self.location
    }
}

/// Pull-based tokenizer over one input source.
///
/// Buffer regions, in offset order: `[0, consumed)` is flushed and
/// reusable, `[consumed, filled)` is unprocessed input, `[filled, cap)` is
/// free space. Retention decisions are made eagerly when a record
/// resolves, so there is never a backlog of resolved-but-undecided bytes.
pub struct RecordStream {
    index: SourceIndex,
    source: Box<dyn ByteSource>,
    pattern: Arc<dyn Pattern>,
    budget: MemoryBudget,
    seekable: bool,
    spill: Option<SpillStore>,
    buf: Vec<u8>,
    consumed: usize,
    filled: usize,
    /// Absolute source offset of `buf[0]`; advanced by compaction.
    base_offset: u64,
    exhausted: bool,
    bytes_read: u64,
    records_seen: u64,
}

impl RecordStream {
    /// Wrap `source` as a record stream.
    pub fn new(
        index: SourceIndex,
        source: Box<dyn ByteSource>,
        pattern: Arc<dyn Pattern>,
        budget: MemoryBudget,
        initial_buffer_size: usize,
    ) -> Result<Self, ShuffleError> {
        if initial_buffer_size == 0 {
            return Err(ShuffleError::Configuration(
                "initial buffer size must be non-zero".to_string(),
            ));
        }
        let seekable = source.is_seekable();
        Ok(Self {
            index,
            source,
            pattern,
            budget,
            seekable,
            spill: None,
            buf: vec![0; initial_buffer_size.min(stream_consts::MAX_BUFFER_SIZE)],
            consumed: 0,
            filled: 0,
            base_offset: 0,
            exhausted: false,
            bytes_read: 0,
            records_seen: 0,
        })
    }

    /// Resolve and return the next record, or `Ok(None)` at end of source.
    pub fn next_record(&mut self) -> Result<Option<Record>, ShuffleError> {
        loop {
            debug_assert!(self.consumed <= self.filled && self.filled <= self.buf.len());
            if self.consumed < self.filled {
                let found =
                    self.pattern
                        .find_at(&self.buf[..self.filled], self.consumed, self.exhausted)?;
                if let Some(boundary) = found {
                    debug_assert!(boundary.start >= self.consumed);
                    debug_assert!(boundary.end <= self.filled);
                    if boundary.end == self.consumed {
                        // A zero-width match here would never advance.
                        return Err(ShuffleError::DegeneratePattern {
                            offset: self.base_offset + self.consumed as u64,
                        });
                    }
                    let len = boundary.end - self.consumed;
                    let delim_len = boundary.end - boundary.start;
                    let last = self.exhausted && boundary.end == self.filled;
                    return self.resolve(len, delim_len, last).map(Some);
                }
            }
            if self.exhausted {
                if self.consumed < self.filled {
                    // Unterminated final record.
                    let len = self.filled - self.consumed;
                    return self.resolve(len, 0, true).map(Some);
                }
                return Ok(None);
            }
            self.refill()?;
        }
    }

    /// Decide retention for the resolved span `[consumed, consumed + len)`
    /// and advance past it.
    fn resolve(
        &mut self,
        len: usize,
        delim_len: usize,
        last: bool,
    ) -> Result<Record, ShuffleError> {
        let matched = self.consumed + len;
        let location = if self.seekable {
            ContentLocation::InSource {
                offset: self.base_offset + self.consumed as u64,
            }
        } else {
            let cost = len + budget_consts::RECORD_OVERHEAD_BYTES;
            if self.budget.try_debit(cost) {
                let bytes = self.buf[self.consumed..matched].to_vec();
                ContentLocation::Resident(ResidentPayload {
                    bytes,
                    cost,
                    budget: self.budget.clone(),
                })
            } else {
                if self.spill.is_none() {
                    debug!(source = self.index, "creating spill store");
                    self.spill = Some(SpillStore::new()?);
                }
                let spill = self.spill.as_mut().expect("spill store just created");
                let offset = spill.append(&self.buf[self.consumed..matched])?;
                ContentLocation::Spilled { offset }
            }
        };
        self.consumed = matched;
        self.records_seen += 1;
        Ok(Record {
            source: self.index,
            len,
            delim_len,
            last_in_source: last,
            location,
        })
    }

    /// Make room if the buffer is full, then read more input. Marks the
    /// stream exhausted on a zero-byte read.
    fn refill(&mut self) -> Result<(), ShuffleError> {
        if self.filled == self.buf.len() {
            let unprocessed = self.filled - self.consumed;
            if self.consumed > 0 && unprocessed < self.buf.len() / stream_consts::COMPACT_DIVISOR {
                self.buf.copy_within(self.consumed..self.filled, 0);
            } else {
                let capacity = self.buf.len();
                if capacity >= stream_consts::MAX_BUFFER_SIZE {
                    return Err(ShuffleError::BufferLimit {
                        limit: stream_consts::MAX_BUFFER_SIZE,
                    });
                }
                let doubled = capacity
                    .saturating_mul(2)
                    .min(stream_consts::MAX_BUFFER_SIZE);
                debug!(
                    source = self.index,
                    from = capacity,
                    to = doubled,
                    "growing record buffer"
                );
                self.buf.resize(doubled, 0);
                if self.consumed > 0 {
                    self.buf.copy_within(self.consumed..self.filled, 0);
                }
            }
            self.base_offset += self.consumed as u64;
            self.filled = unprocessed;
            self.consumed = 0;
        }
        loop {
            match self.source.read(&mut self.buf[self.filled..]) {
                Ok(0) => {
                    self.exhausted = true;
                    debug!(
                        source = self.index,
                        bytes = self.bytes_read,
                        records = self.records_seen,
                        "source exhausted"
                    );
                    return Ok(());
                }
                Ok(n) => {
                    self.filled += n;
                    self.bytes_read += n as u64;
                    return Ok(());
                }
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => {
                    return Err(ShuffleError::SourceRead {
                        index: self.index,
                        error,
                    })
                }
            }
        }
    }

    /// Materialize a record's full span (content plus consumed delimiter).
    ///
    /// Resident records are returned in place; spilled and in-source
    /// records are read back into `scratch`.
    pub fn record_bytes<'a>(
        &mut self,
        record: &'a Record,
        scratch: &'a mut Vec<u8>,
    ) -> Result<&'a [u8], ShuffleError> {
        debug_assert_eq!(record.source, self.index);
        match &record.location {
            ContentLocation::Resident(payload) => Ok(payload.bytes()),
            ContentLocation::Spilled { offset } => {
                scratch.resize(record.len, 0);
                match self.spill.as_mut() {
                    Some(spill) => spill.read_at(*offset, scratch)?,
                    None => {
                        return Err(ShuffleError::Configuration(
                            "record references a spill store that was never created".to_string(),
                        ))
                    }
                }
                Ok(&scratch[..record.len])
            }
            ContentLocation::InSource { offset } => {
                scratch.resize(record.len, 0);
                self.source
                    .read_at(*offset, scratch)
                    .map_err(|error| ShuffleError::SourceRead {
                        index: self.index,
                        error,
                    })?;
                Ok(&scratch[..record.len])
            }
        }
    }

    /// Total bytes read from the source so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Records resolved from this stream so far.
    pub fn records_seen(&self) -> u64 {
        self.records_seen
    }

    /// Bytes written to this stream's spill store, if one exists.
    pub fn spilled_bytes(&self) -> u64 {
        self.spill.as_ref().map(SpillStore::len).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{LiteralPattern, RegexPattern};
    use crate::source::ReaderSource;

    fn stream_over(input: impl Into<Vec<u8>>, pattern: Arc<dyn Pattern>, cap: usize) -> RecordStream {
        RecordStream::new(
            0,
            Box::new(ReaderSource::new(std::io::Cursor::new(input.into()))),
            pattern,
            MemoryBudget::new(cap),
            16,
        )
        .expect("stream")
    }

    fn drain(stream: &mut RecordStream) -> Vec<(Vec<u8>, usize, bool)> {
        let mut out = Vec::new();
        let mut scratch = Vec::new();
        while let Some(record) = stream.next_record().expect("next") {
            let bytes = stream
                .record_bytes(&record, &mut scratch)
                .expect("materialize")
                .to_vec();
            out.push((bytes, record.delim_len(), record.is_last_in_source()));
        }
        out
    }

    #[test]
    fn splits_on_literal_delimiter() {
        let mut stream = stream_over(b"x;y;z".to_vec(), Arc::new(LiteralPattern::new(b";")), 1024);
        let records = drain(&mut stream);
        assert_eq!(
            records,
            vec![
                (b"x;".to_vec(), 1, false),
                (b"y;".to_vec(), 1, false),
                (b"z".to_vec(), 0, true),
            ]
        );
    }

    #[test]
    fn trailing_delimiter_produces_no_empty_record() {
        let mut stream = stream_over(b"a\nb\nc\n".to_vec(), Arc::new(LiteralPattern::new(b"\n")), 1024);
        let records = drain(&mut stream);
        assert_eq!(records.len(), 3);
        // Resolved before the zero-byte read, so not flagged last; the
        // flag only reports that end-of-input had been observed.
        assert_eq!(records[2], (b"c\n".to_vec(), 1, false));
    }

    #[test]
    fn empty_input_yields_no_records() {
        let mut stream = stream_over(b"".to_vec(), Arc::new(LiteralPattern::new(b"\n")), 1024);
        assert!(stream.next_record().expect("next").is_none());
    }

    #[test]
    fn buffer_grows_past_long_records() {
        // Records far larger than the 16-byte initial buffer.
        let input = format!("{}|{}|tail", "a".repeat(300), "b".repeat(500));
        let mut stream = stream_over(input.into_bytes(), Arc::new(LiteralPattern::new(b"|")), 1 << 20);
        let records = drain(&mut stream);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].0.len(), 301);
        assert_eq!(records[1].0.len(), 501);
        assert_eq!(records[2].0, b"tail".to_vec());
    }

    #[test]
    fn regex_delimiter_spanning_refills_is_found() {
        let input = b"first--second--third".to_vec();
        let mut stream = stream_over(input, Arc::new(RegexPattern::compile("--").expect("re")), 1024);
        let records = drain(&mut stream);
        assert_eq!(
            records,
            vec![
                (b"first--".to_vec(), 2, false),
                (b"second--".to_vec(), 2, false),
                (b"third".to_vec(), 0, true),
            ]
        );
    }

    #[test]
    fn degenerate_pattern_is_rejected() {
        let pattern = RegexPattern::compile("x*").expect("re");
        let mut stream = stream_over(b"yyy".to_vec(), Arc::new(pattern), 1024);
        let err = stream.next_record().expect_err("degenerate");
        assert!(matches!(err, ShuffleError::DegeneratePattern { offset: 0 }));
    }

    #[test]
    fn zero_budget_spills_every_record() {
        let mut stream = stream_over(b"a;b;c;".to_vec(), Arc::new(LiteralPattern::new(b";")), 0);
        let mut spilled = 0;
        let mut records = Vec::new();
        while let Some(record) = stream.next_record().expect("next") {
            assert!(record.is_spilled());
            spilled += 1;
            records.push(record);
        }
        assert_eq!(spilled, 3);
        assert_eq!(stream.spilled_bytes(), 6);
        let mut scratch = Vec::new();
        let bytes = stream
            .record_bytes(&records[1], &mut scratch)
            .expect("read back");
        assert_eq!(bytes, b"b;");
    }

    #[test]
    fn resident_records_restore_budget_on_drop() {
        let budget = MemoryBudget::new(1024);
        let mut stream = RecordStream::new(
            0,
            Box::new(ReaderSource::new(&b"a;b;"[..])),
            Arc::new(LiteralPattern::new(b";")),
            budget.clone(),
            16,
        )
        .expect("stream");
        let first = stream.next_record().expect("next").expect("record");
        assert!(first.is_resident());
        assert!(budget.available() < 1024);
        drop(first);
        let second = stream.next_record().expect("next").expect("record");
        drop(second);
        assert!(stream.next_record().expect("next").is_none());
        assert_eq!(budget.available(), 1024);
    }
}
