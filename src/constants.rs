/// Constants used by stream buffering and tokenization.
pub mod stream {
    /// Default size of a stream's read buffer before any growth.
    pub const DEFAULT_BUFFER_SIZE: usize = 4096;
    /// Hard cap on a single stream's read buffer.
    ///
    /// A record that cannot be delimited within this many bytes aborts the
    /// run rather than growing without bound.
    pub const MAX_BUFFER_SIZE: usize = 1 << 30;
    /// Compaction threshold divisor: when the unprocessed tail occupies
    /// less than `capacity / COMPACT_DIVISOR`, the buffer is compacted in
    /// place instead of doubled.
    pub const COMPACT_DIVISOR: usize = 4;
}

/// Constants used by memory-budget accounting.
pub mod budget {
    /// Default cap on resident record content, in bytes.
    pub const DEFAULT_MEMORY_BUDGET: usize = 64 * 1024 * 1024;
    /// Estimated allocator and handle overhead charged per resident record
    /// on top of its content length (two pointers plus two sizes).
    pub const RECORD_OVERHEAD_BYTES: usize = 32;
}
