//! Executives: the per-algorithm controllers of the request protocol.
//!
//! An `Executive` owns one algorithm, its cached port declarations and its
//! input/output information vectors. The graph-level parts of the protocol
//! (upstream forwarding, `update`) live on `Pipeline`; this module holds the
//! per-phase work an executive does around its algorithm's hooks.

use crate::config::{ExecutiveConfig, ExecutiveKindConfig};
use crate::data;
use crate::pipeline::algorithm::{Algorithm, ExecutionContext};
use crate::pipeline::composite;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::id::OutputPort;
use crate::pipeline::information::{
    keys, InfoKey, Information, InformationVector, SharedInformation,
};
use crate::pipeline::port::PortInfo;
use crate::pipeline::progress::{AbortHandle, ExecutiveProgress};
use crate::pipeline::request::{ForwardDirection, Request, RequestKind};
use crate::pipeline::worker_pool::WorkerPool;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

/// Execution strategy of an executive.
#[derive(Clone)]
pub enum ExecutiveKind {
    /// Plain demand-driven executive; composite inputs are handed to the
    /// algorithm as they are.
    DemandDriven,
    /// Iterates non-composite-aware algorithms over composite leaves in order.
    SequentialComposite,
    /// Iterates over composite leaves on a worker pool.
    ParallelComposite(Arc<WorkerPool>),
}

impl ExecutiveKind {
    /// Parallel composite executive on a fresh pool.
    pub fn parallel(threads: usize) -> PipelineResult<Self> {
        Ok(ExecutiveKind::ParallelComposite(Arc::new(WorkerPool::new(
            threads,
        )?)))
    }

    pub fn is_composite(&self) -> bool {
        !matches!(self, ExecutiveKind::DemandDriven)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExecutiveKind::DemandDriven => "demand_driven",
            ExecutiveKind::SequentialComposite => "sequential_composite",
            ExecutiveKind::ParallelComposite(_) => "parallel_composite",
        }
    }
}

impl fmt::Debug for ExecutiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutiveKind::ParallelComposite(pool) => {
                write!(f, "ParallelComposite({} threads)", pool.threads())
            }
            other => f.write_str(other.name()),
        }
    }
}

/// Chooses the executive kind for newly added algorithms.
///
/// Built once and owned by a `Pipeline`; there is no process-wide default.
#[derive(Debug, Clone)]
pub struct ExecutiveFactory {
    default_kind: ExecutiveKind,
}

impl ExecutiveFactory {
    pub fn new(default_kind: ExecutiveKind) -> Self {
        Self { default_kind }
    }

    /// Build from configuration. A parallel default starts its pool here and
    /// every executive created by this factory shares it.
    pub fn from_config(config: &ExecutiveConfig) -> PipelineResult<Self> {
        let default_kind = match config.default_kind {
            ExecutiveKindConfig::DemandDriven => ExecutiveKind::DemandDriven,
            ExecutiveKindConfig::SequentialComposite => ExecutiveKind::SequentialComposite,
            ExecutiveKindConfig::ParallelComposite => {
                ExecutiveKind::parallel(config.worker_threads)?
            }
        };
        Ok(Self { default_kind })
    }

    pub fn create(&self) -> ExecutiveKind {
        self.default_kind.clone()
    }
}

impl Default for ExecutiveFactory {
    fn default() -> Self {
        Self::new(ExecutiveKind::SequentialComposite)
    }
}

/// Connections of one input port and their information handles.
///
/// `info[i]` belongs to `connections[i]`. For a producer connection it is the
/// producer's output information handle itself.
#[derive(Debug, Clone, Default)]
pub struct InputPort {
    /// `None` marks an input set directly with a data object.
    pub connections: Vec<Option<OutputPort>>,
    pub info: InformationVector,
}

/// Clears the busy flag when the request finishes.
pub(crate) struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owner of one algorithm and its per-port information.
pub struct Executive {
    pub(crate) algorithm: Box<dyn Algorithm>,
    pub(crate) kind: ExecutiveKind,
    pub(crate) inputs: Vec<InputPort>,
    pub(crate) outputs: InformationVector,
    number_of_input_ports: usize,
    number_of_output_ports: usize,
    input_port_info: OnceLock<Vec<PortInfo>>,
    output_port_info: OnceLock<Vec<PortInfo>>,
    busy: AtomicBool,
    used: AtomicBool,
    modified: AtomicU64,
    pub(crate) abort: AbortHandle,
    pub(crate) progress: ExecutiveProgress,
}

impl Executive {
    pub(crate) fn new(algorithm: Box<dyn Algorithm>, kind: ExecutiveKind, now: u64) -> Self {
        let number_of_input_ports = algorithm.number_of_input_ports();
        let number_of_output_ports = algorithm.number_of_output_ports();
        Self {
            algorithm,
            kind,
            inputs: vec![InputPort::default(); number_of_input_ports],
            outputs: InformationVector::with_len(number_of_output_ports),
            number_of_input_ports,
            number_of_output_ports,
            input_port_info: OnceLock::new(),
            output_port_info: OnceLock::new(),
            busy: AtomicBool::new(false),
            used: AtomicBool::new(false),
            modified: AtomicU64::new(now),
            abort: AbortHandle::new(),
            progress: ExecutiveProgress::new(),
        }
    }

    pub fn algorithm(&self) -> &dyn Algorithm {
        self.algorithm.as_ref()
    }

    pub fn name(&self) -> &str {
        self.algorithm.name()
    }

    pub fn kind(&self) -> &ExecutiveKind {
        &self.kind
    }

    pub fn number_of_input_ports(&self) -> usize {
        self.number_of_input_ports
    }

    pub fn number_of_output_ports(&self) -> usize {
        self.number_of_output_ports
    }

    /// Whether a request has been processed since creation.
    pub fn is_used(&self) -> bool {
        self.used.load(Ordering::Acquire)
    }

    pub fn modified_time(&self) -> u64 {
        self.modified.load(Ordering::Acquire)
    }

    pub(crate) fn touch(&self, now: u64) {
        self.modified.store(now, Ordering::Release);
    }

    /// Cached input port declarations, filled on first query.
    pub fn input_port_information(&self) -> &[PortInfo] {
        self.input_port_info.get_or_init(|| {
            (0..self.number_of_input_ports)
                .map(|port| self.algorithm.fill_input_port_information(port))
                .collect()
        })
    }

    /// Cached output port declarations, filled on first query.
    pub fn output_port_information(&self) -> &[PortInfo] {
        self.output_port_info.get_or_init(|| {
            (0..self.number_of_output_ports)
                .map(|port| self.algorithm.fill_output_port_information(port))
                .collect()
        })
    }

    pub(crate) fn set_number_of_input_ports(&mut self, count: usize) -> PipelineResult<()> {
        self.check_unused("number of input ports")?;
        self.number_of_input_ports = count;
        self.inputs.resize_with(count, InputPort::default);
        self.input_port_info = OnceLock::new();
        Ok(())
    }

    pub(crate) fn set_number_of_output_ports(&mut self, count: usize) -> PipelineResult<()> {
        self.check_unused("number of output ports")?;
        self.number_of_output_ports = count;
        self.outputs.resize(count);
        self.output_port_info = OnceLock::new();
        Ok(())
    }

    fn check_unused(&self, what: &str) -> PipelineResult<()> {
        if self.is_used() {
            return Err(PipelineError::configuration(
                self.name(),
                format!("cannot change the {what} after a request has been processed"),
            ));
        }
        Ok(())
    }

    /// Swap in a new algorithm, keeping connections and output handles for
    /// ports that still exist.
    pub(crate) fn replace_algorithm(
        &mut self,
        algorithm: Box<dyn Algorithm>,
        now: u64,
    ) -> Box<dyn Algorithm> {
        self.number_of_input_ports = algorithm.number_of_input_ports();
        self.number_of_output_ports = algorithm.number_of_output_ports();
        self.inputs
            .resize_with(self.number_of_input_ports, InputPort::default);
        self.outputs.resize(self.number_of_output_ports);
        for info in &self.outputs {
            info.lock().clear();
        }
        self.input_port_info = OnceLock::new();
        self.output_port_info = OnceLock::new();
        self.used.store(false, Ordering::Release);
        self.touch(now);
        std::mem::replace(&mut self.algorithm, algorithm)
    }

    /// Mark the executive busy. Fails if a request is already in progress.
    pub(crate) fn enter(&self) -> PipelineResult<BusyGuard<'_>> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(PipelineError::Reentrancy {
                algorithm: self.name().to_string(),
            });
        }
        self.used.store(true, Ordering::Release);
        Ok(BusyGuard(&self.busy))
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Shallow copies of the input information vectors, one per port.
    pub(crate) fn input_vectors(&self) -> Vec<InformationVector> {
        self.inputs.iter().map(|port| port.info.clone()).collect()
    }

    /// Every non-optional port is connected; single-connection ports hold at most one.
    pub(crate) fn check_required_inputs(&self) -> PipelineResult<()> {
        for (port, info) in self.input_port_information().iter().enumerate() {
            let count = self.inputs.get(port).map_or(0, |p| p.connections.len());
            if count == 0 && !info.optional {
                return Err(PipelineError::configuration(
                    self.name(),
                    format!("input port {port} requires a connection"),
                ));
            }
            if count > 1 && !info.repeatable {
                return Err(PipelineError::configuration(
                    self.name(),
                    format!("input port {port} accepts one connection, found {count}"),
                ));
            }
        }
        Ok(())
    }

    // ── Phase execution ──

    /// Run the local part of `request`: the executive's own bookkeeping for
    /// the phase plus the algorithm hook.
    pub(crate) fn execute_phase(
        &self,
        request: &mut Request,
        inputs: &[InformationVector],
        outputs: &InformationVector,
        ctx: &ExecutionContext<'_>,
    ) -> bool {
        match request.kind {
            RequestKind::DataObject => self.execute_data_object(request, inputs, outputs, ctx),
            RequestKind::Information => self.execute_information(request, inputs, outputs, ctx),
            RequestKind::UpdateExtent => {
                self.execute_update_extent(request, inputs, outputs, ctx)
            }
            RequestKind::Data => self.execute_data(request, inputs, outputs, ctx),
            RequestKind::TimeDependentInformation | RequestKind::Generic(_) => {
                self.algorithm.process_request(request, inputs, outputs, ctx)
            }
        }
    }

    pub(crate) fn execute_data_object(
        &self,
        request: &mut Request,
        inputs: &[InformationVector],
        outputs: &InformationVector,
        ctx: &ExecutionContext<'_>,
    ) -> bool {
        if self.kind.is_composite() && !ctx.is_iterating() {
            if let Some(port) =
                composite::should_iterate_over_input(self.input_port_information(), inputs)
            {
                return self.execute_composite_data_object(request, inputs, outputs, ctx, port);
            }
        }

        let before = current_data_objects(outputs);
        if !self.algorithm.process_request(request, inputs, outputs, ctx) {
            return false;
        }
        self.reset_replaced_outputs(&before, outputs, ctx);
        self.check_data_object(outputs, ctx)
    }

    /// Make sure every output port holds a data object of its declared type.
    pub(crate) fn check_data_object(
        &self,
        outputs: &InformationVector,
        ctx: &ExecutionContext<'_>,
    ) -> bool {
        let mut ok = true;
        for (port, info) in outputs.iter().enumerate() {
            let declared = self
                .output_port_information()
                .get(port)
                .and_then(|p| p.data_type.as_deref());
            let current = info.data_object();

            match (current, declared) {
                (Some(object), Some(data_type)) if object.is_a(data_type) => {}
                (Some(_), None) => {}
                (_, Some(data_type)) => match data::new_data_object(data_type) {
                    Some(object) => {
                        info.set_data_object(Some(object));
                        if !ctx.suppresses_reset() {
                            reset_pipeline_information(&mut info.lock());
                        }
                    }
                    None => {
                        tracing::error!(
                            "{}: cannot create output of abstract type '{}' on port {}",
                            self.name(),
                            data_type,
                            port
                        );
                        ok = false;
                    }
                },
                (None, None) => {
                    tracing::error!(
                        "{}: no data object was created for output port {}",
                        self.name(),
                        port
                    );
                    ok = false;
                }
            }
        }
        ok
    }

    /// Forget data-state keys for outputs whose data object was replaced.
    pub(crate) fn reset_replaced_outputs(
        &self,
        before: &[Option<data::DataObjectRef>],
        outputs: &InformationVector,
        ctx: &ExecutionContext<'_>,
    ) {
        if ctx.suppresses_reset() {
            return;
        }
        for (info, previous) in outputs.iter().zip(before) {
            let current = info.data_object();
            let same = match (&current, previous) {
                (Some(a), Some(b)) => a.ptr_eq(b),
                (None, None) => true,
                _ => false,
            };
            if !same {
                reset_pipeline_information(&mut info.lock());
            }
        }
    }

    pub(crate) fn execute_information(
        &self,
        request: &mut Request,
        inputs: &[InformationVector],
        outputs: &InformationVector,
        ctx: &ExecutionContext<'_>,
    ) -> bool {
        copy_default_information(request, ForwardDirection::Downstream, inputs, outputs);
        if !self.algorithm.process_request(request, inputs, outputs, ctx) {
            return false;
        }

        let upstream = inputs
            .iter()
            .flat_map(|vector| vector.iter())
            .filter_map(|info| info.get_integer(keys::PIPELINE_MODIFIED_TIME))
            .max()
            .unwrap_or(0) as u64;
        let pipeline_mtime = upstream.max(self.modified_time());
        for info in outputs {
            info.set(keys::PIPELINE_MODIFIED_TIME, pipeline_mtime as i64);
        }
        true
    }

    pub(crate) fn execute_update_extent(
        &self,
        request: &mut Request,
        inputs: &[InformationVector],
        outputs: &InformationVector,
        ctx: &ExecutionContext<'_>,
    ) -> bool {
        copy_default_information(request, ForwardDirection::Upstream, inputs, outputs);
        self.algorithm.process_request(request, inputs, outputs, ctx)
    }

    pub(crate) fn execute_data(
        &self,
        request: &mut Request,
        inputs: &[InformationVector],
        outputs: &InformationVector,
        ctx: &ExecutionContext<'_>,
    ) -> bool {
        if !self.need_to_execute_data(request.from_output_port, inputs, outputs) {
            tracing::trace!("{}: output is up to date", self.name());
            return true;
        }

        if self.kind.is_composite() && !ctx.is_iterating() {
            if let Some(port) =
                composite::should_iterate_over_input(self.input_port_information(), inputs)
            {
                return self.execute_simple_algorithm(request, inputs, outputs, ctx, port);
            }
        }

        if !self.inputs_match_requirements(inputs) {
            return false;
        }

        self.data_start(outputs, ctx);
        let ok = self.algorithm.process_request(request, inputs, outputs, ctx);
        if ok {
            self.data_end(outputs, ctx);
        }
        ok
    }

    /// Every connected input carries a data object its port accepts.
    fn inputs_match_requirements(&self, inputs: &[InformationVector]) -> bool {
        for (port, (vector, declared)) in inputs
            .iter()
            .zip(self.input_port_information())
            .enumerate()
        {
            for (index, info) in vector.iter().enumerate() {
                match info.data_object() {
                    Some(object) if declared.accepts(&object) => {}
                    Some(object) => {
                        tracing::error!(
                            "{}: input port {} connection {} has type {}, expected one of {:?}",
                            self.name(),
                            port,
                            index,
                            object.type_name(),
                            declared.required_data_types
                        );
                        return false;
                    }
                    None if declared.optional => {}
                    None => {
                        tracing::error!(
                            "{}: input port {} connection {} has no data",
                            self.name(),
                            port,
                            index
                        );
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Whether the output for `port` (all ports when `None`) is stale.
    pub(crate) fn need_to_execute_data(
        &self,
        port: Option<usize>,
        inputs: &[InformationVector],
        outputs: &InformationVector,
    ) -> bool {
        if outputs.is_empty() {
            return true;
        }

        let newest_input = inputs
            .iter()
            .flat_map(|vector| vector.iter())
            .filter_map(|info| info.get_integer(keys::DATA_UPDATE_TIME))
            .max();

        let ports: Vec<usize> = match port {
            Some(port) => vec![port],
            None => (0..outputs.len()).collect(),
        };
        ports.into_iter().any(|port| match outputs.get(port) {
            Some(info) => output_needs_data(&info.lock(), newest_input),
            None => true,
        })
    }

    /// Prepare outputs for a data execution. Outside block iteration this
    /// also clears a pending abort, so an executive aborted during an
    /// earlier update runs again when a consumer asks for its data.
    pub(crate) fn data_start(&self, outputs: &InformationVector, ctx: &ExecutionContext<'_>) {
        if !ctx.suppresses_reset() {
            self.abort.clear();
        }
        for info in outputs {
            let mut info = info.lock();
            info.remove(keys::DATA_GENERATED);
            info.remove(keys::DATA_ABORTED);
        }
        ctx.update_progress(0.0);
    }

    /// Record what was produced. An aborted run is marked instead of generated.
    pub(crate) fn data_end(&self, outputs: &InformationVector, ctx: &ExecutionContext<'_>) {
        let aborted = ctx.is_aborted();
        let now = ctx.pipeline().tick();
        for info in outputs {
            let mut info = info.lock();
            if aborted {
                info.set(keys::DATA_ABORTED, true);
                info.remove(keys::DATA_GENERATED);
                continue;
            }
            info.set(keys::DATA_GENERATED, true);
            info.remove(keys::DATA_ABORTED);
            info.set(keys::DATA_UPDATE_TIME, now as i64);
            for (from, to) in DATA_MIRRORS {
                mirror(&mut info, *from, *to);
            }
        }
        if !aborted {
            ctx.update_progress(1.0);
        }
    }
}

/// Request keys recorded as delivered-data keys when execution ends.
const DATA_MIRRORS: &[(InfoKey, InfoKey)] = &[
    (keys::UPDATE_PIECE_NUMBER, keys::DATA_PIECE_NUMBER),
    (keys::UPDATE_NUMBER_OF_PIECES, keys::DATA_NUMBER_OF_PIECES),
    (keys::UPDATE_NUMBER_OF_GHOST_LEVELS, keys::DATA_NUMBER_OF_GHOST_LEVELS),
    (keys::UPDATE_EXTENT, keys::DATA_EXTENT),
    (keys::UPDATE_TIME_STEP, keys::DATA_TIME_STEP),
    (keys::UPDATE_COMPOSITE_INDICES, keys::DATA_COMPOSITE_INDICES),
];

fn mirror(info: &mut Information, from: InfoKey, to: InfoKey) {
    match info.get(from).cloned() {
        Some(value) => info.set(to, value),
        None => {
            info.remove(to);
        }
    }
}

/// Keys describing the data currently held by an output.
const DATA_STATE_KEYS: &[InfoKey] = &[
    keys::DATA_GENERATED,
    keys::DATA_ABORTED,
    keys::DATA_UPDATE_TIME,
    keys::DATA_EXTENT,
    keys::DATA_PIECE_NUMBER,
    keys::DATA_NUMBER_OF_PIECES,
    keys::DATA_NUMBER_OF_GHOST_LEVELS,
    keys::DATA_TIME_STEP,
    keys::DATA_COMPOSITE_INDICES,
];

pub(crate) fn reset_pipeline_information(info: &mut Information) {
    for key in DATA_STATE_KEYS {
        info.remove(*key);
    }
}

pub(crate) fn current_data_objects(outputs: &InformationVector) -> Vec<Option<data::DataObjectRef>> {
    outputs.iter().map(SharedInformation::data_object).collect()
}

/// Staleness test for one output's information.
fn output_needs_data(info: &Information, newest_input: Option<i64>) -> bool {
    let Some(object) = info.get_data_object(keys::DATA_OBJECT) else {
        return true;
    };
    if !info.get_flag(keys::DATA_GENERATED) {
        return true;
    }

    let update_time = info.get_integer(keys::DATA_UPDATE_TIME).unwrap_or(0);
    if info.get_integer(keys::PIPELINE_MODIFIED_TIME).unwrap_or(0) > update_time {
        return true;
    }
    if newest_input.is_some_and(|t| t > update_time) {
        return true;
    }

    let pair = |update: InfoKey, data: InfoKey| (info.get_integer(update), info.get_integer(data));

    let (update_pieces, data_pieces) =
        pair(keys::UPDATE_NUMBER_OF_PIECES, keys::DATA_NUMBER_OF_PIECES);
    if let (Some(u), Some(d)) = (update_pieces, data_pieces) {
        if u != d {
            return true;
        }
    }

    let (update_ghosts, data_ghosts) = pair(
        keys::UPDATE_NUMBER_OF_GHOST_LEVELS,
        keys::DATA_NUMBER_OF_GHOST_LEVELS,
    );
    if let (Some(u), Some(d)) = (update_ghosts, data_ghosts) {
        if update_pieces.unwrap_or(1) > 1 && d < u {
            return true;
        }
    }

    let (update_piece, data_piece) = pair(keys::UPDATE_PIECE_NUMBER, keys::DATA_PIECE_NUMBER);
    if data_pieces.unwrap_or(1) != 1 {
        if let (Some(u), Some(d)) = (update_piece, data_piece) {
            if u != d {
                return true;
            }
        }
    }

    let composite = object.is_composite();
    if !composite {
        if let (Some(u), Some(d)) = (
            info.get_extent(keys::UPDATE_EXTENT),
            info.get_extent(keys::DATA_EXTENT),
        ) {
            if u != d {
                return true;
            }
        }
    }

    if info.get_double(keys::UPDATE_TIME_STEP) != info.get_double(keys::DATA_TIME_STEP) {
        return true;
    }

    composite && composite::needs_composite_blocks(info)
}

/// Copy the request's key list across the executive.
///
/// `Downstream` copies from the first connection of input port 0 to every
/// output; `Upstream` copies from the request's output port (default 0) to
/// every input connection. Keys missing at the source are removed at the
/// destination.
pub fn copy_default_information(
    request: &Request,
    direction: ForwardDirection,
    inputs: &[InformationVector],
    outputs: &InformationVector,
) {
    let keys = request.keys_to_copy();
    if keys.is_empty() {
        return;
    }

    match direction {
        ForwardDirection::Downstream => {
            let Some(source) = inputs.first().and_then(|vector| vector.get(0)) else {
                return;
            };
            for info in outputs {
                info.copy_entries_from(source, keys);
            }
        }
        ForwardDirection::Upstream => {
            let Some(source) = outputs.get(request.output_port_or_default()) else {
                return;
            };
            for info in inputs.iter().flat_map(|vector| vector.iter()) {
                info.copy_entries_from(source, keys);
            }
        }
        ForwardDirection::None => {}
    }
}
