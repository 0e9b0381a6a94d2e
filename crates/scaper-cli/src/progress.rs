//! Lock-free per-agent progress counting.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts completed and failed agent tasks across the worker pool and logs
/// every `log_every` completions.  Per-agent failures never abort the run;
/// the final tally reports them.
pub struct Progress {
    done: AtomicUsize,
    failed: AtomicUsize,
    total: usize,
    log_every: usize,
}

impl Progress {
    pub fn new(total: usize) -> Self {
        Self {
            done: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            total,
            log_every: (total / 20).max(100),
        }
    }

    pub fn success(&self) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        if done % self.log_every == 0 {
            log::info!("{done}/{} agents done", self.total);
        }
    }

    pub fn failure(&self) {
        self.done.fetch_add(1, Ordering::Relaxed);
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    /// Log the final tally.
    pub fn finish(&self, what: &str) {
        let done = self.done.load(Ordering::Relaxed);
        let failed = self.failed();
        if failed > 0 {
            log::warn!("{what}: {} of {done} agents skipped", failed);
        } else {
            log::info!("{what}: {done} agents done");
        }
    }
}
