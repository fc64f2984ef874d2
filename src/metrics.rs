/// Live counters for one shuffle/sample run.
///
/// Snapshots of this are handed to the driver's progress callback between
/// blocking operations; the final value is returned from the run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Records resolved across all sources, kept or not.
    pub records_seen: u64,
    /// Bytes read from all sources.
    pub bytes_read: u64,
    /// Records currently retained with resident content.
    pub records_resident: u64,
    /// Records currently retained in spill stores.
    pub records_spilled: u64,
    /// Bytes written to spill stores across all sources.
    pub spilled_bytes: u64,
    /// Records emitted to the sink so far.
    pub records_written: u64,
    /// Record content bytes emitted to the sink so far.
    pub bytes_written: u64,
}

impl RunStats {
    /// Fraction of retained records whose content stayed resident, or
    /// `None` before anything was retained.
    pub fn resident_share(&self) -> Option<f64> {
        let retained = self.records_resident + self.records_spilled;
        if retained == 0 {
            return None;
        }
        Some(self.records_resident as f64 / retained as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resident_share_reports_split() {
        let stats = RunStats {
            records_resident: 3,
            records_spilled: 1,
            ..RunStats::default()
        };
        let share = stats.resident_share().expect("share");
        assert!((share - 0.75).abs() < 1e-9);
    }

    #[test]
    fn resident_share_is_none_before_retention() {
        assert!(RunStats::default().resident_share().is_none());
    }
}
