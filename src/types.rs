/// Position of a stream within the driver's source collection.
///
/// Records carry this so the output pass can find the stream (and spill
/// store, if any) that owns their bytes. Indices are dense and assigned in
/// `add_source` order.
pub type SourceIndex = usize;

/// Byte offset into a spill store or a seekable source file.
pub type SpillOffset = u64;
