//! The algorithm extension point.
//!
//! An algorithm declares its ports and answers requests. Every hook takes
//! `&self`: algorithms cannot change their own persistent state while a
//! request is running, which is what lets the parallel executive call the
//! same instance from several worker threads. Progress goes through the
//! [`ExecutionContext`] instead.

use crate::data::FlatIndex;
use crate::pipeline::executor::Pipeline;
use crate::pipeline::id::AlgorithmId;
use crate::pipeline::information::InformationVector;
use crate::pipeline::port::PortInfo;
use crate::pipeline::progress::{AbortHandle, ProgressSink};
use crate::pipeline::request::{ModifyWhen, Request, RequestKind};

/// Per-call state handed to algorithm hooks.
pub struct ExecutionContext<'a> {
    pipeline: &'a Pipeline,
    algorithm: AlgorithmId,
    progress: &'a dyn ProgressSink,
    abort: &'a AbortHandle,
    iterating: bool,
    suppress_reset: bool,
    block: Option<FlatIndex>,
}

impl<'a> ExecutionContext<'a> {
    pub(crate) fn new(
        pipeline: &'a Pipeline,
        algorithm: AlgorithmId,
        progress: &'a dyn ProgressSink,
        abort: &'a AbortHandle,
    ) -> Self {
        Self {
            pipeline,
            algorithm,
            progress,
            abort,
            iterating: false,
            suppress_reset: false,
            block: None,
        }
    }

    /// Context for a sub-execution over one block (or a trial block) of a
    /// composite input.
    pub(crate) fn for_block<'b>(
        &'b self,
        progress: &'b dyn ProgressSink,
        block: Option<FlatIndex>,
    ) -> ExecutionContext<'b> {
        ExecutionContext {
            pipeline: self.pipeline,
            algorithm: self.algorithm,
            progress,
            abort: self.abort,
            iterating: true,
            suppress_reset: true,
            block,
        }
    }

    pub fn pipeline(&self) -> &'a Pipeline {
        self.pipeline
    }

    pub fn algorithm_id(&self) -> AlgorithmId {
        self.algorithm
    }

    pub fn update_progress(&self, fraction: f64) {
        self.progress.report(fraction);
    }

    pub(crate) fn progress(&self) -> &dyn ProgressSink {
        self.progress
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.is_aborted()
    }

    /// True while running one block of a composite input.
    pub fn is_iterating(&self) -> bool {
        self.iterating
    }

    pub fn suppresses_reset(&self) -> bool {
        self.suppress_reset
    }

    /// Flat index of the block being processed, if iterating.
    pub fn block(&self) -> Option<FlatIndex> {
        self.block
    }
}

/// A processing stage with input and output ports.
pub trait Algorithm: Send + Sync {
    fn name(&self) -> &str;

    fn number_of_input_ports(&self) -> usize {
        1
    }

    fn number_of_output_ports(&self) -> usize {
        1
    }

    /// Requirements of input port `port`. Must not have side effects.
    fn fill_input_port_information(&self, _port: usize) -> PortInfo {
        PortInfo::default()
    }

    /// Capabilities of output port `port`. Must not have side effects.
    fn fill_output_port_information(&self, _port: usize) -> PortInfo {
        PortInfo::default()
    }

    /// Single dispatch point for every request. Returns false on failure.
    fn process_request(
        &self,
        request: &mut Request,
        inputs: &[InformationVector],
        outputs: &InformationVector,
        ctx: &ExecutionContext<'_>,
    ) -> bool {
        match request.kind {
            RequestKind::DataObject => self.request_data_object(request, inputs, outputs, ctx),
            RequestKind::Information => self.request_information(request, inputs, outputs, ctx),
            RequestKind::UpdateExtent => {
                self.request_update_extent(request, inputs, outputs, ctx)
            }
            RequestKind::Data => self.request_data(request, inputs, outputs, ctx),
            RequestKind::TimeDependentInformation => {
                self.request_time_dependent_information(request, inputs, outputs, ctx)
            }
            RequestKind::Generic(_) => self.request_default(request, inputs, outputs, ctx),
        }
    }

    fn request_data_object(
        &self,
        _request: &Request,
        _inputs: &[InformationVector],
        _outputs: &InformationVector,
        _ctx: &ExecutionContext<'_>,
    ) -> bool {
        true
    }

    fn request_information(
        &self,
        _request: &Request,
        _inputs: &[InformationVector],
        _outputs: &InformationVector,
        _ctx: &ExecutionContext<'_>,
    ) -> bool {
        true
    }

    fn request_update_extent(
        &self,
        _request: &Request,
        _inputs: &[InformationVector],
        _outputs: &InformationVector,
        _ctx: &ExecutionContext<'_>,
    ) -> bool {
        true
    }

    fn request_data(
        &self,
        _request: &Request,
        _inputs: &[InformationVector],
        _outputs: &InformationVector,
        _ctx: &ExecutionContext<'_>,
    ) -> bool {
        true
    }

    fn request_time_dependent_information(
        &self,
        _request: &Request,
        _inputs: &[InformationVector],
        _outputs: &InformationVector,
        _ctx: &ExecutionContext<'_>,
    ) -> bool {
        true
    }

    /// Fallback for request kinds without a dedicated hook.
    fn request_default(
        &self,
        _request: &mut Request,
        _inputs: &[InformationVector],
        _outputs: &InformationVector,
        _ctx: &ExecutionContext<'_>,
    ) -> bool {
        true
    }

    /// Called by the executive right before and right after forwarding upstream.
    fn modify_request(&self, _request: &mut Request, _when: ModifyWhen) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types;

    struct Bare;

    impl Algorithm for Bare {
        fn name(&self) -> &str {
            "Bare"
        }
    }

    struct MeshOnly;

    impl Algorithm for MeshOnly {
        fn name(&self) -> &str {
            "MeshOnly"
        }

        fn fill_input_port_information(&self, _port: usize) -> PortInfo {
            PortInfo::requiring(types::MESH)
        }
    }

    #[test]
    fn test_default_declarations() {
        let algorithm = Bare;
        assert_eq!(algorithm.number_of_input_ports(), 1);
        assert_eq!(algorithm.number_of_output_ports(), 1);
        assert_eq!(algorithm.fill_input_port_information(0), PortInfo::default());
    }

    #[test]
    fn test_fill_is_idempotent() {
        let algorithm = MeshOnly;
        assert_eq!(
            algorithm.fill_input_port_information(0),
            algorithm.fill_input_port_information(0)
        );
    }

    #[test]
    fn test_default_dispatch_succeeds() {
        let pipeline = Pipeline::new();
        let progress = crate::pipeline::progress::ExecutiveProgress::new();
        let abort = AbortHandle::new();
        let ctx = ExecutionContext::new(&pipeline, AlgorithmId(0), &progress, &abort);
        let outputs = InformationVector::with_len(1);

        for mut request in [
            Request::data_object(),
            Request::information(),
            Request::update_extent(),
            Request::data(),
            Request::time_dependent_information(),
            Request::generic("custom"),
        ] {
            assert!(Bare.process_request(&mut request, &[], &outputs, &ctx));
        }
        assert!(Bare.modify_request(&mut Request::data(), ModifyWhen::Before));
    }

    #[test]
    fn test_block_context_flags() {
        let pipeline = Pipeline::new();
        let progress = crate::pipeline::progress::ExecutiveProgress::new();
        let abort = AbortHandle::new();
        let ctx = ExecutionContext::new(&pipeline, AlgorithmId(1), &progress, &abort);
        assert!(!ctx.is_iterating());

        let block = ctx.for_block(&progress, Some(FlatIndex(3)));
        assert!(block.is_iterating());
        assert!(block.suppresses_reset());
        assert_eq!(block.block(), Some(FlatIndex(3)));
        assert_eq!(block.algorithm_id(), AlgorithmId(1));

        abort.abort();
        assert!(block.is_aborted());
    }
}
