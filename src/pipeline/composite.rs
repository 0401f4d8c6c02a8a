//! Composite iteration: running a non-composite-aware algorithm once per
//! leaf of a composite input.
//!
//! The decision is made per request from the input port declarations and
//! the data actually connected. When iterating, the output is a composite
//! mirroring the input's structure and every non-empty input leaf is pushed
//! through a private DataObject → Information → UpdateExtent → Data
//! sub-execution on cloned information. The loop itself lives in
//! [`sequential`](super::sequential) and [`parallel`](super::parallel).

use crate::data::{types, DataObjectRef, FlatIndex, LeafSlot, MultiBlockDataSet, UniformGrid};
use crate::pipeline::algorithm::ExecutionContext;
use crate::pipeline::bridge::PipelineEvent;
use crate::pipeline::executive::{
    current_data_objects, reset_pipeline_information, Executive, ExecutiveKind,
};
use crate::pipeline::information::{
    keys, InfoKey, InfoValue, Information, InformationVector, SharedInformation,
};
use crate::pipeline::port::PortInfo;
use crate::pipeline::progress::ProgressSink;
use crate::pipeline::request::{Request, RequestKind};
use crate::pipeline::{parallel, sequential};

/// Port whose composite input must be iterated, if any.
///
/// Only single-connection ports with a non-empty requirement list are
/// considered, ports declaring any composite type never iterate, and the
/// lowest matching port wins.
pub fn should_iterate_over_input(
    port_infos: &[PortInfo],
    inputs: &[InformationVector],
) -> Option<usize> {
    for (port, declared) in port_infos.iter().enumerate() {
        let Some(vector) = inputs.get(port) else {
            continue;
        };
        if vector.len() != 1 || declared.required_data_types.is_empty() {
            continue;
        }
        if declared.declares_composite() {
            continue;
        }
        let Some(object) = vector.get(0).and_then(|info| info.data_object()) else {
            continue;
        };
        if object.is_composite() && !declared.accepts(&object) {
            return Some(port);
        }
    }
    None
}

/// Whether every element of sorted `requested` appears in sorted `delivered`.
///
/// Linear merge scan; neither slice is re-sorted.
pub fn is_sorted_subset(requested: &[i64], delivered: &[i64]) -> bool {
    let mut j = 0;
    for &wanted in requested {
        while j < delivered.len() && delivered[j] < wanted {
            j += 1;
        }
        if j == delivered.len() || delivered[j] != wanted {
            return false;
        }
        j += 1;
    }
    true
}

/// Whether a composite output lacks blocks that are now requested.
///
/// No delivered list means every block was delivered; no requested list
/// means every block is wanted.
pub(crate) fn needs_composite_blocks(info: &Information) -> bool {
    match (
        info.get_integer_vector(keys::UPDATE_COMPOSITE_INDICES),
        info.get_integer_vector(keys::DATA_COMPOSITE_INDICES),
    ) {
        (Some(requested), Some(delivered)) => !is_sorted_subset(requested, delivered),
        (None, Some(_)) => true,
        _ => false,
    }
}

/// Keys forced on a block's outputs so blockwise execution ignores outer partitioning.
const BLOCK_FORCED_KEYS: &[InfoKey] = &[
    keys::UPDATE_EXTENT,
    keys::UPDATE_PIECE_NUMBER,
    keys::UPDATE_NUMBER_OF_PIECES,
];

/// Cloned request and information for running single blocks.
pub(crate) struct BlockContext {
    request: Request,
    inputs: Vec<InformationVector>,
    outputs: InformationVector,
    port: usize,
}

impl BlockContext {
    pub(crate) fn new(
        request: &Request,
        inputs: &[InformationVector],
        outputs: &InformationVector,
        port: usize,
    ) -> Self {
        let outputs = outputs.deep_clone();
        for info in &outputs {
            info.set_data_object(None);
        }
        Self {
            request: request.clone(),
            inputs: inputs.iter().map(InformationVector::deep_clone).collect(),
            outputs,
            port,
        }
    }

    /// Independent copy for another worker.
    pub(crate) fn fork(&self) -> Self {
        Self {
            request: self.request.clone(),
            inputs: self.inputs.iter().map(InformationVector::deep_clone).collect(),
            outputs: self.outputs.deep_clone(),
            port: self.port,
        }
    }
}

/// The output holds a composite of its own. An algorithm that publishes its
/// composite input as its output does not count: blocks are written into the
/// output, never into the input.
fn holds_separate_composite(info: &SharedInformation, input: &DataObjectRef) -> bool {
    info.data_object()
        .is_some_and(|output| output.is_composite() && !output.ptr_eq(input))
}

/// Produced output objects of one block, one per output port.
pub(crate) type BlockOutput = Vec<Option<DataObjectRef>>;

/// Store a block's outputs at `index` in every composite output.
pub(crate) fn insert_block(outputs: &InformationVector, index: FlatIndex, objects: BlockOutput) {
    for (info, object) in outputs.iter().zip(objects) {
        let Some(output) = info.data_object() else {
            continue;
        };
        let mut guard = output.write();
        if let Some(composite) = guard.as_composite_mut() {
            if !composite.set_leaf(index, object) {
                tracing::warn!("Output composite has no leaf slot {:?}", index);
            }
        }
    }
}

pub(crate) fn report_block_failure(
    exec: &Executive,
    index: FlatIndex,
    ctx: &ExecutionContext<'_>,
) {
    tracing::warn!(
        "{}: block {} failed, leaving its output empty",
        exec.name(),
        index.0
    );
    ctx.pipeline().emit(PipelineEvent::BlockFailed {
        algorithm: ctx.algorithm_id(),
        block: index,
    });
}

impl Executive {
    /// Data-object phase while iterating: give the algorithm its normal call,
    /// then make sure every output holds a composite.
    pub(crate) fn execute_composite_data_object(
        &self,
        request: &mut Request,
        inputs: &[InformationVector],
        outputs: &InformationVector,
        ctx: &ExecutionContext<'_>,
        port: usize,
    ) -> bool {
        let before = current_data_objects(outputs);
        if !self.algorithm.process_request(request, inputs, outputs, ctx) {
            return false;
        }
        self.reset_replaced_outputs(&before, outputs, ctx);

        let Some(input) = inputs
            .get(port)
            .and_then(|vector| vector.get(0))
            .and_then(|info| info.data_object())
        else {
            return false;
        };

        for (index, info) in outputs.iter().enumerate() {
            if holds_separate_composite(info, &input) {
                continue;
            }
            let output = self.create_output_composite_data_set(&input, port, request, inputs, ctx);
            tracing::debug!(
                "{}: output port {} becomes {} while iterating over port {}",
                self.name(),
                index,
                output.type_name(),
                port
            );
            info.set_data_object(Some(output));
            reset_pipeline_information(&mut info.lock());
        }
        true
    }

    /// Composite container for an iterated output.
    ///
    /// A hierarchical box input keeps its type when the algorithm turns a
    /// uniform grid into a uniform grid; everything else becomes a generic
    /// multi-block.
    pub(crate) fn create_output_composite_data_set(
        &self,
        input: &DataObjectRef,
        port: usize,
        request: &Request,
        inputs: &[InformationVector],
        ctx: &ExecutionContext<'_>,
    ) -> DataObjectRef {
        let accepts_grid = self
            .input_port_information()
            .get(port)
            .is_some_and(|declared| declared.accepts_type(types::UNIFORM_GRID));

        if input.is_a(types::HIERARCHICAL_BOX_DATA_SET)
            && accepts_grid
            && self.probe_produces_uniform_grid(port, request, inputs, ctx)
        {
            return input.new_instance();
        }
        DataObjectRef::new(MultiBlockDataSet::new())
    }

    /// One trial data-object call with a single uniform-grid input.
    ///
    /// Runs on deep copies of the information, so nothing the trial call
    /// writes reaches the real inputs or outputs.
    fn probe_produces_uniform_grid(
        &self,
        port: usize,
        request: &Request,
        inputs: &[InformationVector],
        ctx: &ExecutionContext<'_>,
    ) -> bool {
        let trial_inputs: Vec<InformationVector> =
            inputs.iter().map(InformationVector::deep_clone).collect();
        let trial_outputs = InformationVector::with_len(self.number_of_output_ports());
        let Some(trial_input) = trial_inputs.get(port).and_then(|vector| vector.get(0)) else {
            return false;
        };
        trial_input.set_data_object(Some(DataObjectRef::new(UniformGrid::default())));

        let mut trial = request.clone();
        trial.retarget(RequestKind::DataObject);
        let probe_ctx = ctx.for_block(ctx.progress(), None);
        if !self.execute_data_object(&mut trial, &trial_inputs, &trial_outputs, &probe_ctx) {
            return false;
        }

        !trial_outputs.is_empty()
            && trial_outputs.iter().all(|info| {
                info.data_object()
                    .is_some_and(|object| object.is_a(types::UNIFORM_GRID))
            })
    }

    /// Data phase while iterating over the composite on `port`.
    pub(crate) fn execute_simple_algorithm(
        &self,
        request: &mut Request,
        inputs: &[InformationVector],
        outputs: &InformationVector,
        ctx: &ExecutionContext<'_>,
        port: usize,
    ) -> bool {
        let Some(input) = inputs
            .get(port)
            .and_then(|vector| vector.get(0))
            .and_then(|info| info.data_object())
        else {
            return false;
        };

        for info in outputs {
            if !holds_separate_composite(info, &input) {
                let output =
                    self.create_output_composite_data_set(&input, port, request, inputs, ctx);
                info.set_data_object(Some(output));
            }
        }

        let leaves: Vec<LeafSlot> = {
            let guard = input.read();
            let Some(source) = guard.as_composite() else {
                return false;
            };
            for info in outputs {
                let Some(output) = info.data_object() else {
                    continue;
                };
                let mut out = output.write();
                if let Some(target) = out.as_composite_mut() {
                    target.initialize();
                    target.copy_structure(source);
                }
            }
            source.leaves()
        };

        tracing::debug!(
            "{}: iterating over {} blocks of input port {}",
            self.name(),
            leaves.len(),
            port
        );

        self.data_start(outputs, ctx);
        let template = BlockContext::new(request, inputs, outputs, port);
        let ok = match &self.kind {
            ExecutiveKind::ParallelComposite(pool) => {
                parallel::execute_each(self, pool, &template, &leaves, outputs, ctx)
            }
            _ => sequential::execute_each(self, template, &leaves, outputs, ctx),
        };

        if ok || ctx.is_aborted() {
            self.data_end(outputs, ctx);
        }
        ok
    }

    /// Run the sub-execution for one leaf. Returns the produced outputs, or
    /// `None` if any phase failed.
    pub(crate) fn run_block(
        &self,
        block: &mut BlockContext,
        leaf: &LeafSlot,
        ctx: &ExecutionContext<'_>,
        progress: &dyn ProgressSink,
    ) -> Option<BlockOutput> {
        let object = leaf.object.as_ref()?;
        let input = block.inputs.get(block.port)?.get(0)?.clone();
        {
            let mut info = input.lock();
            info.set(keys::DATA_OBJECT, object.clone());
            info.remove(keys::WHOLE_EXTENT);
            object.read().copy_information_to_pipeline(&mut info);
        }
        for info in &block.outputs {
            info.set_data_object(None);
        }

        tracing::trace!("{}: running block {}", self.name(), leaf.index.0);
        let block_ctx = ctx.for_block(progress, Some(leaf.index));
        let request = &mut block.request;

        request.retarget(RequestKind::DataObject);
        if !self.execute_data_object(request, &block.inputs, &block.outputs, &block_ctx) {
            return None;
        }

        request.retarget(RequestKind::Information);
        if !self.execute_information(request, &block.inputs, &block.outputs, &block_ctx) {
            return None;
        }

        let saved = force_whole_extent(&block.outputs);
        request.retarget(RequestKind::UpdateExtent);
        let mut ok =
            self.execute_update_extent(request, &block.inputs, &block.outputs, &block_ctx);
        if ok {
            request.retarget(RequestKind::Data);
            ok = self
                .algorithm
                .process_request(request, &block.inputs, &block.outputs, &block_ctx);
        }
        restore_keys(&block.outputs, saved);

        if !ok {
            return None;
        }
        Some(
            block
                .outputs
                .iter()
                .map(|info| info.data_object().map(|object| object.shallow_clone()))
                .collect(),
        )
    }
}

/// Request the whole extent as a single piece. Returns the previous values.
fn force_whole_extent(outputs: &InformationVector) -> Vec<Vec<Option<InfoValue>>> {
    outputs
        .iter()
        .map(|info| {
            let mut info = info.lock();
            let saved = BLOCK_FORCED_KEYS
                .iter()
                .map(|key| info.get(*key).cloned())
                .collect();
            match info.get_extent(keys::WHOLE_EXTENT) {
                Some(whole) => info.set(keys::UPDATE_EXTENT, whole),
                None => {
                    info.remove(keys::UPDATE_EXTENT);
                }
            }
            info.set(keys::UPDATE_PIECE_NUMBER, 0);
            info.set(keys::UPDATE_NUMBER_OF_PIECES, 1);
            saved
        })
        .collect()
}

fn restore_keys(outputs: &InformationVector, saved: Vec<Vec<Option<InfoValue>>>) {
    for (info, values) in outputs.iter().zip(saved) {
        let mut info = info.lock();
        for (key, value) in BLOCK_FORCED_KEYS.iter().zip(values) {
            match value {
                Some(value) => info.set(*key, value),
                None => {
                    info.remove(*key);
                }
            }
        }
    }
}
