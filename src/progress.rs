//! Thread-safe progress counter shared between the worker and its observers.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Episodes processed so far out of the total in the manifest
#[derive(Debug, Default)]
pub struct ProgressCounter {
    current: AtomicUsize,
    total: AtomicUsize,
}

impl ProgressCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a run over `total` episode entries
    pub(crate) fn start(&self, total: usize) {
        self.current.store(0, Ordering::SeqCst);
        self.total.store(total, Ordering::SeqCst);
    }

    /// Advances by `count` entries, never beyond the total
    ///
    /// Returns the new `(current, total)` pair.
    pub(crate) fn advance(&self, count: usize) -> (usize, usize) {
        let total = self.total.load(Ordering::SeqCst);
        let previous = self
            .current
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some((current + count).min(total))
            })
            .unwrap_or_else(|current| current);
        ((previous + count).min(total), total)
    }

    /// Returns `(current, total)`
    pub fn snapshot(&self) -> (usize, usize) {
        (
            self.current.load(Ordering::SeqCst),
            self.total.load(Ordering::SeqCst),
        )
    }

    pub fn is_complete(&self) -> bool {
        let (current, total) = self.snapshot();
        current == total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_advance_is_capped() {
        let progress = ProgressCounter::new();
        progress.start(3);
        assert_eq!(progress.advance(1), (1, 3));
        assert_eq!(progress.advance(5), (3, 3));
        assert!(progress.is_complete());
    }

    #[test]
    fn test_start_resets() {
        let progress = ProgressCounter::new();
        progress.start(2);
        progress.advance(2);
        progress.start(4);
        assert_eq!(progress.snapshot(), (0, 4));
    }

    #[test]
    fn test_observable_from_other_thread() {
        let progress = Arc::new(ProgressCounter::new());
        progress.start(100);

        let worker = {
            let progress = Arc::clone(&progress);
            thread::spawn(move || {
                for _ in 0..100 {
                    progress.advance(1);
                }
            })
        };
        worker.join().unwrap();

        assert_eq!(progress.snapshot(), (100, 100));
    }
}
