//! Test algorithms with observable side effects

use parking_lot::Mutex;
use std::collections::hash_map::RandomState;
use std::hash::BuildHasher;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use vispipe::data::{types, DataObjectRef, Mesh, UniformGrid};
use vispipe::pipeline::algorithms::input_data_object;
use vispipe::pipeline::{
    Algorithm, ExecutionContext, InformationVector, PipelineError, PortInfo, Request,
};

/// Shared visitation log.
pub type VisitLog = Arc<Mutex<Vec<String>>>;

pub fn visit_log() -> VisitLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Mesh source that records every information request it answers.
pub struct RecordingSource {
    name: String,
    log: VisitLog,
    fail: bool,
}

impl RecordingSource {
    pub fn new(name: &str, log: &VisitLog) -> Self {
        Self {
            name: name.to_string(),
            log: Arc::clone(log),
            fail: false,
        }
    }

    /// Report failure for every information request.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

impl Algorithm for RecordingSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn number_of_input_ports(&self) -> usize {
        0
    }

    fn fill_output_port_information(&self, _port: usize) -> PortInfo {
        PortInfo::producing(types::MESH)
    }

    fn request_information(
        &self,
        _request: &Request,
        _inputs: &[InformationVector],
        _outputs: &InformationVector,
        _ctx: &ExecutionContext<'_>,
    ) -> bool {
        self.log.lock().push(self.name.clone());
        !self.fail
    }
}

/// Sink with `ports` repeatable input ports accepting anything.
pub struct FanInSink {
    ports: usize,
}

impl FanInSink {
    pub fn new(ports: usize) -> Self {
        Self { ports }
    }
}

impl Algorithm for FanInSink {
    fn name(&self) -> &str {
        "FanInSink"
    }

    fn number_of_input_ports(&self) -> usize {
        self.ports
    }

    fn number_of_output_ports(&self) -> usize {
        0
    }

    fn fill_input_port_information(&self, _port: usize) -> PortInfo {
        PortInfo::new().repeatable()
    }
}

/// Filter whose data hook calls back into its own executive.
pub struct ReentrantFilter {
    pub outcome: Arc<Mutex<Option<PipelineError>>>,
}

impl ReentrantFilter {
    pub fn new() -> Self {
        Self {
            outcome: Arc::new(Mutex::new(None)),
        }
    }
}

impl Algorithm for ReentrantFilter {
    fn name(&self) -> &str {
        "ReentrantFilter"
    }

    fn fill_input_port_information(&self, _port: usize) -> PortInfo {
        PortInfo::requiring(types::MESH)
    }

    fn fill_output_port_information(&self, _port: usize) -> PortInfo {
        PortInfo::producing(types::MESH)
    }

    fn request_data(
        &self,
        _request: &Request,
        _inputs: &[InformationVector],
        _outputs: &InformationVector,
        ctx: &ExecutionContext<'_>,
    ) -> bool {
        let mut nested = Request::data();
        if let Err(err) = ctx.pipeline().process_request(ctx.algorithm_id(), &mut nested) {
            *self.outcome.lock() = Some(err);
        }
        true
    }
}

/// How long `SlowMeshFilter` works on one block.
#[derive(Debug, Clone, Copy)]
pub enum WorkDuration {
    Fixed(Duration),
    /// Uniform-ish random duration up to the given number of milliseconds.
    Random(u64),
}

/// Mesh filter that copies its input after simulated work.
///
/// Counts blocks started and finished; blocks whose label matches
/// `fail_label` report failure.
pub struct SlowMeshFilter {
    work: WorkDuration,
    hasher: RandomState,
    pub started: Arc<AtomicUsize>,
    pub finished: Arc<AtomicUsize>,
    fail_label: Option<String>,
}

impl SlowMeshFilter {
    pub fn new(work: WorkDuration) -> Self {
        Self {
            work,
            hasher: RandomState::new(),
            started: Arc::new(AtomicUsize::new(0)),
            finished: Arc::new(AtomicUsize::new(0)),
            fail_label: None,
        }
    }

    pub fn failing_on(mut self, label: &str) -> Self {
        self.fail_label = Some(label.to_string());
        self
    }

    fn work_for(&self, label: &str) -> Duration {
        match self.work {
            WorkDuration::Fixed(duration) => duration,
            WorkDuration::Random(max_ms) => {
                Duration::from_millis(self.hasher.hash_one(label) % (max_ms + 1))
            }
        }
    }
}

impl Algorithm for SlowMeshFilter {
    fn name(&self) -> &str {
        "SlowMeshFilter"
    }

    fn fill_input_port_information(&self, _port: usize) -> PortInfo {
        PortInfo::requiring(types::MESH)
    }

    fn fill_output_port_information(&self, _port: usize) -> PortInfo {
        PortInfo::producing(types::MESH)
    }

    fn request_data(
        &self,
        _request: &Request,
        inputs: &[InformationVector],
        outputs: &InformationVector,
        _ctx: &ExecutionContext<'_>,
    ) -> bool {
        let (Some(input), Some(output)) = (
            input_data_object(inputs, 0),
            outputs.get(0).and_then(|info| info.data_object()),
        ) else {
            return false;
        };
        self.started.fetch_add(1, Ordering::SeqCst);

        let label = input
            .with(|m: &Mesh| m.label().to_string())
            .unwrap_or_default();
        std::thread::sleep(self.work_for(&label));
        let ok = self.fail_label.as_deref() != Some(label.as_str());
        if ok {
            output.shallow_copy_from(&input);
        }

        self.finished.fetch_add(1, Ordering::SeqCst);
        ok
    }
}

/// Uniform-grid filter adding `offset` to every scalar.
pub struct GridShift {
    offset: f64,
    pub data_object_calls: Arc<AtomicUsize>,
}

impl GridShift {
    pub fn new(offset: f64) -> Self {
        Self {
            offset,
            data_object_calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Algorithm for GridShift {
    fn name(&self) -> &str {
        "GridShift"
    }

    fn fill_input_port_information(&self, _port: usize) -> PortInfo {
        PortInfo::requiring(types::UNIFORM_GRID)
    }

    fn request_data_object(
        &self,
        _request: &Request,
        _inputs: &[InformationVector],
        outputs: &InformationVector,
        _ctx: &ExecutionContext<'_>,
    ) -> bool {
        self.data_object_calls.fetch_add(1, Ordering::SeqCst);
        let Some(output) = outputs.get(0) else {
            return false;
        };
        if !output
            .data_object()
            .is_some_and(|o| o.is_a(types::UNIFORM_GRID))
        {
            output.set_data_object(Some(DataObjectRef::new(UniformGrid::default())));
        }
        true
    }

    fn request_data(
        &self,
        _request: &Request,
        inputs: &[InformationVector],
        outputs: &InformationVector,
        _ctx: &ExecutionContext<'_>,
    ) -> bool {
        let (Some(input), Some(output)) = (
            input_data_object(inputs, 0),
            outputs.get(0).and_then(|info| info.data_object()),
        ) else {
            return false;
        };
        let Some(shifted) = input.with(|grid: &UniformGrid| {
            UniformGrid::new(
                grid.extent(),
                grid.spacing(),
                grid.scalars().iter().map(|s| s + self.offset).collect(),
            )
        }) else {
            return false;
        };
        output.shallow_copy_from(&DataObjectRef::new(shifted));
        true
    }
}

/// Mesh filter that publishes its input object as its output instead of
/// creating one, and leaves it untouched in the data pass.
pub struct AliasingFilter;

impl Algorithm for AliasingFilter {
    fn name(&self) -> &str {
        "AliasingFilter"
    }

    fn fill_input_port_information(&self, _port: usize) -> PortInfo {
        PortInfo::requiring(types::MESH)
    }

    fn request_data_object(
        &self,
        _request: &Request,
        inputs: &[InformationVector],
        outputs: &InformationVector,
        _ctx: &ExecutionContext<'_>,
    ) -> bool {
        match (input_data_object(inputs, 0), outputs.get(0)) {
            (Some(input), Some(output)) => {
                output.set_data_object(Some(input));
                true
            }
            _ => false,
        }
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
}
