use std::sync::atomic::{AtomicUsize, Ordering};

pub const DEFAULT_LIMIT_BYTES: usize = 1024 * 1024 * 1024;

/// Byte budget shared by every table in the store
#[derive(Debug)]
pub struct MemoryBudget {
    used: AtomicUsize,
    peak: AtomicUsize,
    limit: usize,
}

impl MemoryBudget {
    pub fn new(limit: usize) -> Self {
        Self {
            used: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            limit,
        }
    }

    /// Swap a table's previous footprint for its new one.
    /// Returns false, leaving usage unchanged, if the result exceeds the limit.
    pub fn try_replace(&self, old_bytes: usize, new_bytes: usize) -> bool {
        let swapped = self
            .used
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
                let next = used.saturating_sub(old_bytes) + new_bytes;
                (next <= self.limit).then_some(next)
            });
        match swapped {
            Ok(prev) => {
                self.peak
                    .fetch_max(prev.saturating_sub(old_bytes) + new_bytes, Ordering::SeqCst);
                true
            }
            Err(_) => false,
        }
    }

    pub fn release(&self, bytes: usize) {
        let _ = self
            .used
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
                Some(used.saturating_sub(bytes))
            });
    }

    pub fn used(&self) -> usize {
        self.used.load(Ordering::SeqCst)
    }

    pub fn usage_ratio(&self) -> f64 {
        if self.limit == 0 {
            return 0.0;
        }
        self.used() as f64 / self.limit as f64
    }

    /// More than 80% of the budget in use
    pub fn is_under_pressure(&self) -> bool {
        self.usage_ratio() > 0.8
    }

    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            used_bytes: self.used(),
            peak_bytes: self.peak.load(Ordering::SeqCst),
            limit_bytes: self.limit,
            usage_ratio: self.usage_ratio(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MemoryStats {
    pub used_bytes: usize,
    pub peak_bytes: usize,
    pub limit_bytes: usize,
    pub usage_ratio: f64,
}
