use crate::constants::{budget, stream};

/// How many records the reservoir retains.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleSize {
    /// Keep every record and emit a full random permutation.
    ///
    /// The reservoir appends unconditionally and the driver performs one
    /// in-place shuffle before the output pass. This is a distinct mode
    /// rather than a large `AtMost`: eviction-style sampling does not
    /// produce a uniform ordering.
    All,
    /// Keep a uniform without-replacement sample of at most this many
    /// records (Algorithm R). Output order is reservoir order.
    AtMost(usize),
}

/// Top-level shuffle/sample configuration.
#[derive(Clone, Debug)]
pub struct ShuffleConfig {
    /// Sample size, or [`SampleSize::All`] for a full shuffle.
    pub sample: SampleSize,
    /// Cap on bytes of record content held resident instead of spilled.
    ///
    /// Accounting includes a fixed per-record overhead estimate, so the
    /// real high-water mark stays near this value. Zero forces every
    /// record from a non-seekable source to spill.
    pub memory_budget: usize,
    /// Initial read-buffer size per source. The buffer doubles as needed
    /// up to [`crate::constants::stream::MAX_BUFFER_SIZE`].
    pub initial_buffer_size: usize,
    /// RNG seed for deterministic selection and shuffling; `None` seeds
    /// from the operating system.
    pub seed: Option<u64>,
}

impl Default for ShuffleConfig {
    fn default() -> Self {
        Self {
            sample: SampleSize::All,
            memory_budget: budget::DEFAULT_MEMORY_BUDGET,
            initial_buffer_size: stream::DEFAULT_BUFFER_SIZE,
            seed: None,
        }
    }
}
