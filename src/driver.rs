//! Run orchestration: feed every source's records through the reservoir,
//! then materialize the survivors for the output sink.

use std::io::Write;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use crate::budget::MemoryBudget;
use crate::config::{SampleSize, ShuffleConfig};
use crate::errors::ShuffleError;
use crate::metrics::RunStats;
use crate::pattern::Pattern;
use crate::reservoir::Reservoir;
use crate::source::ByteSource;
use crate::stream::{Record, RecordStream};
use crate::types::SourceIndex;

/// Advisory progress callback invoked between blocking operations.
///
/// Purely opportunistic: no periodicity or delivery guarantee. Callers can
/// wire it to a signal flag or a status line.
pub type ProgressCallback = Box<dyn FnMut(&RunStats)>;

/// Consumer of the output pass.
///
/// Receives each surviving record's content (delimiter bytes stripped)
/// in final order. Delimiter formatting, capture-group substitution, and
/// escape handling belong to implementations, not the core.
pub trait RecordSink {
    /// Write one record. `is_last_in_source` is true for a record that was
    /// the final one read from its source, which is the only case where an
    /// end-anchored boundary match may have been forced.
    fn emit(&mut self, body: &[u8], is_last_in_source: bool) -> Result<(), ShuffleError>;
}

/// Sink writing each record followed by a fixed delimiter byte string.
///
/// Does not flush; callers using buffered writers flush after the run.
pub struct WriterSink<W> {
    writer: W,
    delimiter: Vec<u8>,
}

impl<W: Write> WriterSink<W> {
    /// Write records to `writer`, each terminated by `delimiter`.
    pub fn new(writer: W, delimiter: &[u8]) -> Self {
        Self {
            writer,
            delimiter: delimiter.to_vec(),
        }
    }

    /// Unwrap the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RecordSink for WriterSink<W> {
    fn emit(&mut self, body: &[u8], _is_last_in_source: bool) -> Result<(), ShuffleError> {
        self.writer.write_all(body)?;
        self.writer.write_all(&self.delimiter)?;
        Ok(())
    }
}

/// Single-run orchestrator over one or more record streams.
pub struct ShuffleDriver {
    config: ShuffleConfig,
    pattern: Arc<dyn Pattern>,
    budget: MemoryBudget,
    streams: Vec<RecordStream>,
    reservoir: Reservoir,
    rng: StdRng,
    stats: RunStats,
    progress: Option<ProgressCallback>,
}

impl ShuffleDriver {
    /// Create a driver with the given configuration and boundary pattern.
    pub fn new(config: ShuffleConfig, pattern: Arc<dyn Pattern>) -> Result<Self, ShuffleError> {
        if config.initial_buffer_size == 0 {
            return Err(ShuffleError::Configuration(
                "initial buffer size must be non-zero".to_string(),
            ));
        }
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self {
            budget: MemoryBudget::new(config.memory_budget),
            reservoir: Reservoir::new(config.sample),
            pattern,
            rng,
            config,
            streams: Vec::new(),
            stats: RunStats::default(),
            progress: None,
        })
    }

    /// Register an input source; returns its index. Sources are ingested
    /// in registration order, though all records compete for the same
    /// reservoir slots regardless of source.
    pub fn add_source(&mut self, source: Box<dyn ByteSource>) -> Result<SourceIndex, ShuffleError> {
        let index = self.streams.len();
        let stream = RecordStream::new(
            index,
            source,
            Arc::clone(&self.pattern),
            self.budget.clone(),
            self.config.initial_buffer_size,
        )?;
        self.streams.push(stream);
        Ok(index)
    }

    /// Install an advisory progress callback.
    pub fn set_progress(&mut self, callback: ProgressCallback) {
        self.progress = Some(callback);
    }

    /// Handle to the run's memory budget, for observing headroom.
    pub fn budget(&self) -> MemoryBudget {
        self.budget.clone()
    }

    /// Ingest every source, then emit the selected records to `sink`.
    ///
    /// In [`SampleSize::All`] mode the retained records are shuffled once
    /// before output; in bounded mode they are emitted in reservoir order.
    /// Records already emitted before a failure stay emitted; all retained
    /// storage is released either way.
    pub fn run(mut self, sink: &mut dyn RecordSink) -> Result<RunStats, ShuffleError> {
        for index in 0..self.streams.len() {
            while let Some(record) = self.streams[index].next_record()? {
                self.stats.records_seen += 1;
                self.note_retained(&record);
                if let Some(displaced) = self.reservoir.offer(record, &mut self.rng) {
                    self.note_released(&displaced);
                }
                self.report_progress();
            }
        }
        debug!(
            seen = self.reservoir.seen(),
            kept = self.reservoir.len(),
            "ingest complete"
        );
        if matches!(self.config.sample, SampleSize::All) {
            self.reservoir.shuffle(&mut self.rng);
        }
        let survivors =
            std::mem::replace(&mut self.reservoir, Reservoir::new(self.config.sample))
                .into_slots();
        let mut scratch = Vec::new();
        for record in survivors {
            let stream = &mut self.streams[record.source()];
            let bytes = stream.record_bytes(&record, &mut scratch)?;
            let body = &bytes[..record.body_len()];
            sink.emit(body, record.is_last_in_source())?;
            self.stats.records_written += 1;
            self.stats.bytes_written += record.body_len() as u64;
            self.note_released(&record);
            self.report_progress();
        }
        self.refresh_io_stats();
        Ok(self.stats)
    }

    fn note_retained(&mut self, record: &Record) {
        if record.is_resident() {
            self.stats.records_resident += 1;
        } else if record.is_spilled() {
            self.stats.records_spilled += 1;
        }
    }

    fn note_released(&mut self, record: &Record) {
        if record.is_resident() {
            self.stats.records_resident -= 1;
        } else if record.is_spilled() {
            self.stats.records_spilled -= 1;
        }
    }

    fn refresh_io_stats(&mut self) {
        self.stats.bytes_read = self.streams.iter().map(RecordStream::bytes_read).sum();
        self.stats.spilled_bytes = self.streams.iter().map(RecordStream::spilled_bytes).sum();
    }

    fn report_progress(&mut self) {
        if self.progress.is_none() {
            return;
        }
        self.refresh_io_stats();
        if let Some(callback) = self.progress.as_mut() {
            callback(&self.stats);
        }
    }
}
