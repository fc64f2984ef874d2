use std::io;

use thiserror::Error;

use crate::types::SourceIndex;

/// Error type for configuration, tokenization, and spill/IO failures.
///
/// Interrupted reads and writes are retried before any of these surface;
/// every variant here is fatal to the run.
#[derive(Debug, Error)]
pub enum ShuffleError {
    /// Reading from an input source failed.
    #[error("error reading from source {index}: {error}")]
    SourceRead {
        /// Index of the failing source in the driver's collection.
        index: SourceIndex,
        /// Underlying read error.
        #[source]
        error: io::Error,
    },
    /// Writing to or reading back from a spill store failed. Sampling
    /// cannot proceed without durable backing for drained bytes.
    #[error("spill store failure: {error}")]
    Spill {
        /// Underlying spill file error.
        #[source]
        error: io::Error,
    },
    /// The boundary pattern matched a zero-length span at the start of a
    /// record and would never advance.
    #[error("degenerate delimiter pattern: empty match at offset {offset} makes no progress")]
    DegeneratePattern {
        /// Absolute stream offset at which the empty match occurred.
        offset: u64,
    },
    /// The pattern engine reported an internal error (as opposed to
    /// finding no match).
    #[error("pattern engine error: {0}")]
    PatternEngine(String),
    /// A record could not be delimited within the buffer growth cap.
    #[error("record exceeds the {limit}-byte buffer limit")]
    BufferLimit {
        /// The configured maximum buffer size.
        limit: usize,
    },
    /// Invalid configuration detected before processing started.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Any other IO failure.
    #[error(transparent)]
    Io(#[from] io::Error),
}
