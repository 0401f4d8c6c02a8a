//! Progress reporting and cooperative abort.
//!
//! Algorithms never write progress into themselves; they report through the
//! `ProgressSink` handed to them in their execution context. During parallel
//! composite execution that sink is a [`ProgressAggregator`], so concurrent
//! workers only ever touch atomics.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Receives progress fractions in `[0, 1]`.
#[cfg_attr(test, mockall::automock)]
pub trait ProgressSink: Send + Sync {
    fn report(&self, fraction: f64);
}

/// Last reported progress of one executive.
#[derive(Debug, Default)]
pub struct ExecutiveProgress {
    bits: AtomicU64,
}

impl ExecutiveProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }

    pub fn reset(&self) {
        self.bits.store(0f64.to_bits(), Ordering::Relaxed);
    }
}

impl ProgressSink for ExecutiveProgress {
    fn report(&self, fraction: f64) {
        self.bits
            .store(fraction.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }
}

/// Cloneable abort flag, settable from any thread.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Folds per-block progress from concurrent workers into one monotonic value.
pub struct ProgressAggregator<'a> {
    target: &'a dyn ProgressSink,
    total: usize,
    completed: AtomicUsize,
    reported: AtomicU64,
}

impl<'a> ProgressAggregator<'a> {
    pub fn new(target: &'a dyn ProgressSink, total: usize) -> Self {
        Self {
            target,
            total: total.max(1),
            completed: AtomicUsize::new(0),
            reported: AtomicU64::new(0f64.to_bits()),
        }
    }

    /// Record one finished block.
    pub fn block_finished(&self) {
        let done = self.completed.fetch_add(1, Ordering::AcqRel) + 1;
        self.forward(done as f64 / self.total as f64);
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Acquire)
    }

    fn forward(&self, fraction: f64) {
        let fraction = fraction.clamp(0.0, 1.0);
        // Non-negative floats order the same as their bit patterns.
        let previous = self.reported.fetch_max(fraction.to_bits(), Ordering::AcqRel);
        if fraction.to_bits() > previous {
            self.target.report(fraction);
        }
    }
}

impl ProgressSink for ProgressAggregator<'_> {
    /// Progress inside the current block, scaled into the overall range.
    fn report(&self, fraction: f64) {
        let done = self.completed.load(Ordering::Acquire) as f64;
        self.forward((done + fraction.clamp(0.0, 1.0)) / self.total as f64);
    }
}
