//! Fork-join worker pool used by the parallel composite executive.
//!
//! `parallel_for` returns only after every index has been processed. Each
//! worker may keep one lazily created context in a [`PerThread`] slot keyed
//! by its rayon thread index.

use crate::pipeline::error::{PipelineError, PipelineResult};
use parking_lot::Mutex;
use rayon::prelude::*;
use std::fmt;

/// A fixed-size rayon thread pool.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    threads: usize,
}

impl WorkerPool {
    /// Build a pool with `threads` workers; 0 uses the available parallelism.
    pub fn new(threads: usize) -> PipelineResult<Self> {
        let threads = if threads == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            threads
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("vispipe-worker-{i}"))
            .build()
            .map_err(|e| PipelineError::WorkerPool(e.to_string()))?;

        tracing::debug!("Worker pool started with {} threads", threads);
        Ok(Self { pool, threads })
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Index of the calling worker, or `None` off the pool.
    pub fn current_thread_index(&self) -> Option<usize> {
        self.pool.current_thread_index()
    }

    /// Run `f(index, &mut items[index])` for every item and wait for all of them.
    pub fn parallel_for<T, F>(&self, items: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize, &mut T) + Send + Sync,
    {
        self.pool.install(|| {
            items
                .par_iter_mut()
                .enumerate()
                .for_each(|(i, item)| f(i, item));
        });
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("threads", &self.threads)
            .finish()
    }
}

/// One lazily initialized value per worker thread.
pub struct PerThread<T> {
    slots: Vec<Mutex<Option<T>>>,
}

impl<T> PerThread<T> {
    pub fn new(threads: usize) -> Self {
        Self {
            slots: (0..threads).map(|_| Mutex::new(None)).collect(),
        }
    }

    /// Run `f` with the calling thread's value, creating it with `init` on
    /// first use. Callers off the pool, or re-entering while their slot is
    /// busy, get a temporary value instead.
    pub fn with<R>(
        &self,
        thread: Option<usize>,
        init: impl FnOnce() -> T,
        f: impl FnOnce(&mut T) -> R,
    ) -> R {
        let slot = thread.and_then(|i| self.slots.get(i));
        match slot.and_then(|s| s.try_lock()) {
            Some(mut guard) => {
                let value = guard.get_or_insert_with(init);
                f(value)
            }
            None => {
                let mut value = init();
                f(&mut value)
            }
        }
    }

    /// Number of threads that created their value.
    pub fn initialized(&self) -> usize {
        self.slots.iter().filter(|s| s.lock().is_some()).count()
    }
}
