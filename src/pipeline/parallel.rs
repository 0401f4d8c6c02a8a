//! Block loop of the parallel composite executive.
//!
//! Leaves are packed into a dense array and processed with one
//! `parallel_for` over it. Every worker lazily forks its own block context
//! and writes into its own result slot; nothing shared is mutated until the
//! join, after which results are inserted in traversal order on the calling
//! thread. Output structure therefore never depends on scheduling.

use crate::data::LeafSlot;
use crate::pipeline::algorithm::ExecutionContext;
use crate::pipeline::composite::{insert_block, report_block_failure, BlockContext, BlockOutput};
use crate::pipeline::executive::Executive;
use crate::pipeline::information::InformationVector;
use crate::pipeline::progress::ProgressAggregator;
use crate::pipeline::worker_pool::{PerThread, WorkerPool};
use std::sync::atomic::{AtomicUsize, Ordering};

pub(crate) fn execute_each(
    exec: &Executive,
    pool: &WorkerPool,
    template: &BlockContext,
    leaves: &[LeafSlot],
    outputs: &InformationVector,
    ctx: &ExecutionContext<'_>,
) -> bool {
    // Traversal position -> dense index; empty leaves map to None
    let mut dense: Vec<&LeafSlot> = Vec::with_capacity(leaves.len());
    let index_map: Vec<Option<usize>> = leaves
        .iter()
        .map(|leaf| {
            leaf.object.as_ref().map(|_| {
                dense.push(leaf);
                dense.len() - 1
            })
        })
        .collect();

    let mut results: Vec<Option<BlockOutput>> = vec![None; dense.len()];
    let contexts: PerThread<BlockContext> = PerThread::new(pool.threads());
    let progress = ProgressAggregator::new(ctx.progress(), dense.len());
    let failures = AtomicUsize::new(0);
    let skipped = AtomicUsize::new(0);

    pool.parallel_for(&mut results, |i, slot| {
        if ctx.is_aborted() {
            skipped.fetch_add(1, Ordering::Relaxed);
            return;
        }
        let leaf = dense[i];
        *slot = contexts.with(
            pool.current_thread_index(),
            || template.fork(),
            |block| exec.run_block(block, leaf, ctx, &progress),
        );
        if slot.is_none() {
            failures.fetch_add(1, Ordering::Relaxed);
            report_block_failure(exec, leaf.index, ctx);
        }
        progress.block_finished();
    });

    let skipped = skipped.load(Ordering::Relaxed);
    if skipped > 0 {
        tracing::debug!(
            "{}: abort requested, {} of {} blocks not dispatched",
            exec.name(),
            skipped,
            dense.len()
        );
    }

    for (leaf, dense_index) in leaves.iter().zip(&index_map) {
        let Some(d) = dense_index else {
            continue;
        };
        if let Some(objects) = results[*d].take() {
            insert_block(outputs, leaf.index, objects);
        }
    }

    failures.load(Ordering::Relaxed) == 0
}
