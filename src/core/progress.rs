//! Progress reporting for executors

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Progress callback function type, receives `(done, total)` pair counts
pub type ProgressCallback = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Shared counter that forwards to an optional callback.
///
/// Safe to advance from any worker thread. A total of 0 means the total is
/// not known up front, as in a streaming run.
pub struct Progress {
    callback: Option<ProgressCallback>,
    total: u64,
    done: AtomicU64,
}

impl Progress {
    pub fn new(callback: Option<ProgressCallback>, total: usize) -> Self {
        Self {
            callback,
            total: total as u64,
            done: AtomicU64::new(0),
        }
    }

    /// Progress that reports nowhere
    pub fn silent(total: usize) -> Self {
        Self::new(None, total)
    }

    /// Record `n` more finished pairs
    pub fn advance(&self, n: u64) {
        let done = self.done.fetch_add(n, Ordering::Relaxed) + n;
        if let Some(callback) = &self.callback {
            let reported = if self.total > 0 {
                done.min(self.total)
            } else {
                done
            };
            callback(reported, self.total);
        }
    }

    pub fn done(&self) -> u64 {
        self.done.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}
