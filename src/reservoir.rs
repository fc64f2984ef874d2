//! Online record selection: Algorithm R for fixed-size samples, append-all
//! plus a final Fisher–Yates pass for full shuffles.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::SampleSize;
use crate::stream::Record;

/// The sampling/shuffling structure records are offered to.
///
/// The two modes are deliberately separate: eviction-style sampling with a
/// cap equal to the stream length does not yield a uniform *ordering*,
/// only a uniform subset, so the unbounded case appends everything and is
/// shuffled once before output.
pub struct Reservoir {
    sample: SampleSize,
    slots: Vec<Record>,
    seen: u64,
}

impl Reservoir {
    /// Create an empty reservoir for the given sample size.
    pub fn new(sample: SampleSize) -> Self {
        let slots = match sample {
            SampleSize::All => Vec::new(),
            SampleSize::AtMost(n) => Vec::with_capacity(n),
        };
        Self {
            sample,
            slots,
            seen: 0,
        }
    }

    /// Offer one record; returns the record displaced by the offer, which
    /// the caller must release immediately.
    ///
    /// With `AtMost(n)` and a full reservoir, a uniform draw from
    /// `[0, seen]` (the count *before* this offer) decides: below `n`, the
    /// record replaces that slot and the old occupant is returned; at or
    /// above `n`, the offered record itself is returned. Every offered
    /// record counts toward `seen`, kept or not; swapping the draw and the
    /// increment would change the distribution.
    pub fn offer(&mut self, record: Record, rng: &mut StdRng) -> Option<Record> {
        let displaced = match self.sample {
            SampleSize::All => {
                self.slots.push(record);
                None
            }
            SampleSize::AtMost(n) => {
                if self.slots.len() < n {
                    self.slots.push(record);
                    None
                } else {
                    let draw = rng.random_range(0..=self.seen);
                    if draw < n as u64 {
                        Some(std::mem::replace(&mut self.slots[draw as usize], record))
                    } else {
                        Some(record)
                    }
                }
            }
        };
        self.seen += 1;
        displaced
    }

    /// Permute the retained slots in place (Fisher–Yates).
    ///
    /// Required before output in [`SampleSize::All`] mode; the driver does
    /// not call it for bounded samples.
    pub fn shuffle(&mut self, rng: &mut StdRng) {
        self.slots.shuffle(rng);
    }

    /// Total records offered so far, kept or not.
    pub fn seen(&self) -> u64 {
        self.seen
    }

    /// Number of records currently retained.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` when no records are retained.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Consume the reservoir, yielding the retained records in slot order.
    pub fn into_slots(self) -> Vec<Record> {
        self.slots
    }
}
