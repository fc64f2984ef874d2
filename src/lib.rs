#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Memory-budget accounting for resident record content.
pub mod budget;
/// Shuffle and sampling configuration types.
pub mod config;
/// Centralized constants used across streams and budget accounting.
pub mod constants;
/// Run orchestration and output sinks.
pub mod driver;
mod errors;
/// Run statistics surfaced through the progress callback.
pub mod metrics;
/// Record-boundary matching engines.
pub mod pattern;
/// Reservoir sampling and full-shuffle selection.
pub mod reservoir;
/// Input-source abstraction and built-in sources.
pub mod source;
/// Spill stores backing non-seekable sources.
pub mod spill;
/// Incremental record tokenization.
pub mod stream;
/// Shared type aliases.
pub mod types;

pub use budget::MemoryBudget;
pub use config::{SampleSize, ShuffleConfig};
pub use driver::{ProgressCallback, RecordSink, ShuffleDriver, WriterSink};
pub use errors::ShuffleError;
pub use metrics::RunStats;
pub use pattern::{LiteralPattern, Pattern, PatternMatch, RegexPattern};
pub use reservoir::Reservoir;
pub use source::{ByteSource, FileSource, ReaderSource};
pub use spill::SpillStore;
pub use stream::{Record, RecordStream};
pub use types::{SourceIndex, SpillOffset};
