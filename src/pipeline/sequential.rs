//! Block loop of the sequential composite executive.

use crate::data::LeafSlot;
use crate::pipeline::algorithm::ExecutionContext;
use crate::pipeline::composite::{insert_block, report_block_failure, BlockContext};
use crate::pipeline::executive::Executive;
use crate::pipeline::information::InformationVector;
use crate::pipeline::progress::ProgressAggregator;

/// Run every non-empty leaf in traversal order, reusing one block context,
/// and insert each result as soon as it is produced.
///
/// A failed block leaves its slot empty and the loop continues. An abort
/// stops the loop before the next block. Returns false if any block failed.
pub(crate) fn execute_each(
    exec: &Executive,
    mut block: BlockContext,
    leaves: &[LeafSlot],
    outputs: &InformationVector,
    ctx: &ExecutionContext<'_>,
) -> bool {
    let present = leaves.iter().filter(|leaf| leaf.object.is_some()).count();
    let progress = ProgressAggregator::new(ctx.progress(), present);
    let mut ok = true;

    for leaf in leaves.iter().filter(|leaf| leaf.object.is_some()) {
        if ctx.is_aborted() {
            tracing::debug!(
                "{}: abort requested, stopping before block {}",
                exec.name(),
                leaf.index.0
            );
            break;
        }

        match exec.run_block(&mut block, leaf, ctx, &progress) {
            Some(objects) => insert_block(outputs, leaf.index, objects),
            None => {
                report_block_failure(exec, leaf.index, ctx);
                ok = false;
            }
        }
        progress.block_finished();
    }
    ok
}
