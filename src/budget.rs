use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared counter bounding how many bytes of record content stay resident.
///
/// One budget is shared by every stream of a run; clones refer to the same
/// counter. A record debits its estimated cost when retained in memory and
/// credits the same amount exactly once when released, so at quiescence
/// the available headroom equals the initial cap.
#[derive(Clone, Debug)]
pub struct MemoryBudget {
    inner: Arc<BudgetInner>,
}

#[derive(Debug)]
struct BudgetInner {
    cap: usize,
    available: AtomicUsize,
}

impl MemoryBudget {
    /// Create a budget with `cap` bytes of headroom.
    pub fn new(cap: usize) -> Self {
        Self {
            inner: Arc::new(BudgetInner {
                cap,
                available: AtomicUsize::new(cap),
            }),
        }
    }

    /// Reserve `cost` bytes. Returns `false` without side effects when the
    /// remaining headroom is insufficient; the caller must spill instead.
    pub fn try_debit(&self, cost: usize) -> bool {
        let available = &self.inner.available;
        let mut current = available.load(Ordering::Relaxed);
        loop {
            if current < cost {
                return false;
            }
            match available.compare_exchange_weak(
                current,
                current - cost,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
    }

    /// Return `cost` bytes of headroom.
    ///
    /// Crediting past the initial cap is a release-twice logic error; it
    /// trips a debug assertion and saturates in release builds.
    pub fn credit(&self, cost: usize) {
        let previous = self.inner.available.fetch_add(cost, Ordering::Relaxed);
        let over = previous.saturating_add(cost) > self.inner.cap;
        debug_assert!(!over, "memory budget credited past its cap");
        if over {
            self.inner.available.store(self.inner.cap, Ordering::Relaxed);
        }
    }

    /// Current headroom in bytes.
    pub fn available(&self) -> usize {
        self.inner.available.load(Ordering::Relaxed)
    }

    /// Configured cap in bytes.
    pub fn cap(&self) -> usize {
        self.inner.cap
    }
}
