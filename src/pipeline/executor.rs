//! Pipeline graph and request driver.
//!
//! `Pipeline` owns every executive in an arena indexed by `AlgorithmId` and
//! implements the graph-level protocol:
//! 1. `update` validates the upstream graph, then runs the DataObject,
//!    Information, UpdateExtent and Data phases in order.
//! 2. `process_request` runs one request on one executive: local phase
//!    before forwarding, `forward_upstream`, local phase after forwarding.
//! 3. `forward_upstream` visits every connection port-then-index and keeps
//!    going after a failed producer.
//!
//! Execution takes `&self`; topology changes take `&mut self`, so the graph
//! cannot change underneath a running request.

use crate::config::PipelineConfig;
use crate::data::DataObjectRef;
use crate::pipeline::algorithm::{Algorithm, ExecutionContext};
use crate::pipeline::bridge::{
    AlgorithmSnapshot, ConnectionSnapshot, EventBus, PipelineEvent, TopologySnapshot,
};
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::executive::{Executive, ExecutiveFactory, ExecutiveKind};
use crate::pipeline::id::{AlgorithmId, OutputPort};
use crate::pipeline::information::{keys, InformationVector, SharedInformation};
use crate::pipeline::progress::AbortHandle;
use crate::pipeline::request::{ForwardDirection, ModifyWhen, Request, RequestKind};
use crossbeam_channel::Receiver;
use std::sync::atomic::{AtomicU64, Ordering};

/// The phases `update` runs, in order.
const UPDATE_PHASES: [RequestKind; 4] = [
    RequestKind::DataObject,
    RequestKind::Information,
    RequestKind::UpdateExtent,
    RequestKind::Data,
];

/// The pipeline graph and executor.
pub struct Pipeline {
    executives: Vec<Option<Executive>>,
    factory: ExecutiveFactory,
    /// Monotonic modification clock.
    clock: AtomicU64,
    events: EventBus,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::with_factory(ExecutiveFactory::default())
    }

    pub fn with_factory(factory: ExecutiveFactory) -> Self {
        Self {
            executives: Vec::new(),
            factory,
            clock: AtomicU64::new(0),
            events: EventBus::default(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> PipelineResult<Self> {
        Ok(Self::with_factory(ExecutiveFactory::from_config(
            &config.executive,
        )?))
    }

    pub fn factory(&self) -> &ExecutiveFactory {
        &self.factory
    }

    /// Advance the modification clock.
    pub(crate) fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn emit(&self, event: PipelineEvent) {
        self.events.emit(event);
    }

    /// Receive events from now on.
    pub fn subscribe(&mut self) -> Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    // ── Graph building ──

    /// Add an algorithm with the factory's default executive.
    pub fn add_algorithm<A: Algorithm + 'static>(&mut self, algorithm: A) -> AlgorithmId {
        let kind = self.factory.create();
        self.insert(Box::new(algorithm), kind)
    }

    /// Add an algorithm with an explicit executive kind.
    pub fn add_algorithm_with<A: Algorithm + 'static>(
        &mut self,
        algorithm: A,
        kind: ExecutiveKind,
    ) -> AlgorithmId {
        self.insert(Box::new(algorithm), kind)
    }

    fn insert(&mut self, algorithm: Box<dyn Algorithm>, kind: ExecutiveKind) -> AlgorithmId {
        let id = AlgorithmId(self.executives.len() as u32);
        tracing::info!("Added algorithm '{}' as {} ({:?})", algorithm.name(), id, kind);
        let now = self.tick();
        self.executives
            .push(Some(Executive::new(algorithm, kind, now)));
        id
    }

    /// Remove an algorithm and every connection fed by it. Returns the
    /// algorithm. Ids of other algorithms stay valid.
    pub fn remove_algorithm(&mut self, id: AlgorithmId) -> PipelineResult<Box<dyn Algorithm>> {
        let exec = self
            .executives
            .get_mut(id.index())
            .and_then(Option::take)
            .ok_or(PipelineError::InvalidAlgorithm(id))?;
        let now = self.tick();
        self.disconnect_consumers(id, 0, now);
        tracing::info!("Removed algorithm '{}' ({})", exec.name(), id);
        Ok(exec.algorithm)
    }

    /// Give an executive a new algorithm, releasing the old one.
    ///
    /// Connections to output ports the new algorithm no longer has are dropped.
    pub fn replace_algorithm<A: Algorithm + 'static>(
        &mut self,
        id: AlgorithmId,
        algorithm: A,
    ) -> PipelineResult<Box<dyn Algorithm>> {
        let now = self.tick();
        let exec = self.executive_mut(id)?;
        let old = exec.replace_algorithm(Box::new(algorithm), now);
        let outputs = exec.number_of_output_ports();
        tracing::info!("Replaced '{}' with '{}' ({})", old.name(), exec.name(), id);
        self.disconnect_consumers(id, outputs, now);
        Ok(old)
    }

    /// Swap the execution strategy of one executive.
    pub fn set_executive(&mut self, id: AlgorithmId, kind: ExecutiveKind) -> PipelineResult<()> {
        let now = self.tick();
        let exec = self.executive_mut(id)?;
        tracing::info!("{} now runs as {:?}", exec.name(), kind);
        exec.kind = kind;
        exec.touch(now);
        Ok(())
    }

    /// Change the number of input ports. Fails once a request has run.
    pub fn set_number_of_input_ports(&mut self, id: AlgorithmId, count: usize) -> PipelineResult<()> {
        let now = self.tick();
        let exec = self.executive_mut(id)?;
        exec.set_number_of_input_ports(count)?;
        exec.touch(now);
        Ok(())
    }

    /// Change the number of output ports. Fails once a request has run.
    pub fn set_number_of_output_ports(
        &mut self,
        id: AlgorithmId,
        count: usize,
    ) -> PipelineResult<()> {
        let now = self.tick();
        let exec = self.executive_mut(id)?;
        exec.set_number_of_output_ports(count)?;
        exec.touch(now);
        self.disconnect_consumers(id, count, now);
        Ok(())
    }

    /// Drop every connection fed by `producer` from port `first_port` upward.
    fn disconnect_consumers(&mut self, producer: AlgorithmId, first_port: usize, now: u64) {
        for exec in self.executives.iter_mut().flatten() {
            let mut changed = false;
            for input in &mut exec.inputs {
                let mut i = 0;
                while i < input.connections.len() {
                    let fed = matches!(
                        input.connections[i],
                        Some(c) if c.algorithm == producer && c.port >= first_port
                    );
                    if fed {
                        input.connections.remove(i);
                        input.info.remove(i);
                        changed = true;
                    } else {
                        i += 1;
                    }
                }
            }
            if changed {
                exec.touch(now);
            }
        }
    }

    // ── Connections ──

    /// Make `producer` the only connection of `consumer`'s input `port`.
    pub fn set_input_connection(
        &mut self,
        consumer: AlgorithmId,
        port: usize,
        producer: OutputPort,
    ) -> PipelineResult<()> {
        self.connect(consumer, port, producer, false)
    }

    /// Append a connection. Only repeatable ports accept more than one.
    pub fn add_input_connection(
        &mut self,
        consumer: AlgorithmId,
        port: usize,
        producer: OutputPort,
    ) -> PipelineResult<()> {
        self.connect(consumer, port, producer, true)
    }

    fn connect(
        &mut self,
        consumer: AlgorithmId,
        port: usize,
        producer: OutputPort,
        append: bool,
    ) -> PipelineResult<()> {
        self.check_input_port(consumer, port)?;
        let info = self.output_information(producer.algorithm, producer.port)?;
        if self.would_create_cycle(consumer, producer.algorithm) {
            return Err(PipelineError::CycleDetected(format!(
                "{:?} -> {} input {}",
                producer, consumer, port
            )));
        }

        let now = self.tick();
        let exec = self.executive_mut(consumer)?;
        let repeatable = exec.input_port_information()[port].repeatable;
        let name = exec.name().to_string();
        let input = &mut exec.inputs[port];
        if append {
            if !input.connections.is_empty() && !repeatable {
                return Err(PipelineError::configuration(
                    name,
                    format!("input port {port} is not repeatable"),
                ));
            }
        } else {
            input.connections.clear();
            input.info = InformationVector::new();
        }
        input.connections.push(Some(producer));
        input.info.push(info);
        exec.touch(now);

        tracing::info!("Connected {:?} -> '{}' input {}", producer, name, port);
        Ok(())
    }

    /// Remove connection `index` of `consumer`'s input `port`.
    pub fn remove_input_connection(
        &mut self,
        consumer: AlgorithmId,
        port: usize,
        index: usize,
    ) -> PipelineResult<()> {
        self.check_input_port(consumer, port)?;
        let now = self.tick();
        let exec = self.executive_mut(consumer)?;
        let name = exec.name().to_string();
        let input = &mut exec.inputs[port];
        if index >= input.connections.len() {
            return Err(PipelineError::configuration(
                name,
                format!("input port {port} has no connection {index}"),
            ));
        }
        input.connections.remove(index);
        input.info.remove(index);
        exec.touch(now);
        tracing::info!("Removed connection {} from '{}' input {}", index, name, port);
        Ok(())
    }

    /// Feed `data` into `consumer`'s input `port` without a producer.
    pub fn set_input_data(
        &mut self,
        consumer: AlgorithmId,
        port: usize,
        data: DataObjectRef,
    ) -> PipelineResult<()> {
        self.check_input_port(consumer, port)?;
        let now = self.tick();

        let info = SharedInformation::new();
        {
            let mut entries = info.lock();
            data.read().copy_information_to_pipeline(&mut entries);
            entries.set(keys::DATA_OBJECT, data);
            entries.set(keys::PIPELINE_MODIFIED_TIME, now as i64);
        }

        let exec = self.executive_mut(consumer)?;
        let input = &mut exec.inputs[port];
        input.connections = vec![None];
        input.info = InformationVector::new();
        input.info.push(info);
        exec.touch(now);
        Ok(())
    }

    fn check_input_port(&self, id: AlgorithmId, port: usize) -> PipelineResult<()> {
        let exec = self.executive(id)?;
        if port >= exec.number_of_input_ports() {
            return Err(PipelineError::configuration(
                exec.name(),
                format!(
                    "invalid input port {port} (algorithm has {})",
                    exec.number_of_input_ports()
                ),
            ));
        }
        Ok(())
    }

    /// True if `producer` is `consumer` or already depends on it.
    fn would_create_cycle(&self, consumer: AlgorithmId, producer: AlgorithmId) -> bool {
        let mut visited = vec![false; self.executives.len()];
        let mut stack = vec![producer];
        while let Some(current) = stack.pop() {
            if current == consumer {
                return true;
            }
            let idx = current.index();
            if idx >= visited.len() || visited[idx] {
                continue;
            }
            visited[idx] = true;
            if let Ok(exec) = self.executive(current) {
                stack.extend(
                    exec.inputs
                        .iter()
                        .flat_map(|input| input.connections.iter().flatten())
                        .map(|c| c.algorithm),
                );
            }
        }
        false
    }

    // ── Queries ──

    pub fn executive(&self, id: AlgorithmId) -> PipelineResult<&Executive> {
        self.executives
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(PipelineError::InvalidAlgorithm(id))
    }

    fn executive_mut(&mut self, id: AlgorithmId) -> PipelineResult<&mut Executive> {
        self.executives
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(PipelineError::InvalidAlgorithm(id))
    }

    /// Ids of all live algorithms, in insertion order.
    pub fn algorithm_ids(&self) -> impl Iterator<Item = AlgorithmId> + '_ {
        self.executives
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(i, _)| AlgorithmId(i as u32))
    }

    pub fn len(&self) -> usize {
        self.executives.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn number_of_input_connections(&self, id: AlgorithmId, port: usize) -> PipelineResult<usize> {
        self.check_input_port(id, port)?;
        Ok(self.executive(id)?.inputs[port].connections.len())
    }

    /// Producer of a connection; `None` for data set directly.
    pub fn input_connection(
        &self,
        id: AlgorithmId,
        port: usize,
        index: usize,
    ) -> PipelineResult<Option<OutputPort>> {
        self.check_input_port(id, port)?;
        let exec = self.executive(id)?;
        exec.inputs[port]
            .connections
            .get(index)
            .copied()
            .ok_or_else(|| {
                PipelineError::configuration(
                    exec.name(),
                    format!("input port {port} has no connection {index}"),
                )
            })
    }

    /// Output information handle of `port`.
    pub fn output_information(&self, id: AlgorithmId, port: usize) -> PipelineResult<SharedInformation> {
        let exec = self.executive(id)?;
        exec.outputs.get(port).cloned().ok_or_else(|| {
            PipelineError::configuration(
                exec.name(),
                format!(
                    "invalid output port {port} (algorithm has {})",
                    exec.number_of_output_ports()
                ),
            )
        })
    }

    /// Input information handle of connection `index` on `port`.
    pub fn input_information(
        &self,
        id: AlgorithmId,
        port: usize,
        index: usize,
    ) -> PipelineResult<SharedInformation> {
        self.check_input_port(id, port)?;
        let exec = self.executive(id)?;
        exec.inputs[port].info.get(index).cloned().ok_or_else(|| {
            PipelineError::configuration(
                exec.name(),
                format!("input port {port} has no connection {index}"),
            )
        })
    }

    pub fn output_data(&self, id: AlgorithmId, port: usize) -> PipelineResult<Option<DataObjectRef>> {
        Ok(self.output_information(id, port)?.data_object())
    }

    /// Abort flag of an executive; may be set from any thread.
    pub fn abort_handle(&self, id: AlgorithmId) -> PipelineResult<AbortHandle> {
        Ok(self.executive(id)?.abort.clone())
    }

    pub fn progress(&self, id: AlgorithmId) -> PipelineResult<f64> {
        Ok(self.executive(id)?.progress.get())
    }

    pub fn topology_snapshot(&self) -> TopologySnapshot {
        let mut algorithms = Vec::new();
        let mut connections = Vec::new();

        for id in self.algorithm_ids() {
            let Ok(exec) = self.executive(id) else {
                continue;
            };
            algorithms.push(AlgorithmSnapshot {
                id,
                name: exec.name().to_string(),
                executive: exec.kind().name().to_string(),
                input_ports: exec.input_port_information().to_vec(),
                output_ports: exec.output_port_information().to_vec(),
            });
            for (port, input) in exec.inputs.iter().enumerate() {
                for (index, connection) in input.connections.iter().enumerate() {
                    connections.push(ConnectionSnapshot {
                        producer: connection.map(|c| c.algorithm),
                        producer_port: connection.map(|c| c.port),
                        consumer: id,
                        consumer_port: port,
                        index,
                    });
                }
            }
        }

        TopologySnapshot {
            algorithms,
            connections,
        }
    }

    // ── Modification and update requests ──

    /// Mark an algorithm modified so its output re-executes on the next update.
    pub fn modified(&self, id: AlgorithmId) -> PipelineResult<()> {
        let exec = self.executive(id)?;
        exec.touch(self.tick());
        Ok(())
    }

    /// Request a sub-extent of `port`'s whole extent.
    pub fn set_update_extent(&self, id: AlgorithmId, port: usize, extent: [i32; 6]) -> PipelineResult<()> {
        let info = self.output_information(id, port)?;
        let mut info = info.lock();
        info.set(keys::UPDATE_EXTENT, extent);
        info.set(keys::UPDATE_EXTENT_INITIALIZED, true);
        Ok(())
    }

    pub fn set_update_piece(
        &self,
        id: AlgorithmId,
        port: usize,
        piece: i32,
        pieces: i32,
        ghost_levels: i32,
    ) -> PipelineResult<()> {
        let info = self.output_information(id, port)?;
        let mut info = info.lock();
        info.set(keys::UPDATE_PIECE_NUMBER, piece);
        info.set(keys::UPDATE_NUMBER_OF_PIECES, pieces);
        info.set(keys::UPDATE_NUMBER_OF_GHOST_LEVELS, ghost_levels);
        Ok(())
    }

    pub fn set_update_time_step(&self, id: AlgorithmId, port: usize, time: f64) -> PipelineResult<()> {
        self.output_information(id, port)?
            .set(keys::UPDATE_TIME_STEP, time);
        Ok(())
    }

    /// Restrict the composite blocks requested from `port`. Indices are
    /// stored sorted and deduplicated.
    pub fn set_update_composite_indices(
        &self,
        id: AlgorithmId,
        port: usize,
        indices: &[usize],
    ) -> PipelineResult<()> {
        let mut sorted: Vec<i64> = indices.iter().map(|&i| i as i64).collect();
        sorted.sort_unstable();
        sorted.dedup();
        self.output_information(id, port)?
            .set(keys::UPDATE_COMPOSITE_INDICES, sorted);
        Ok(())
    }

    // ── Execution ──

    /// Bring output port 0 (or a sink's inputs) up to date.
    pub fn update(&self, id: AlgorithmId) -> PipelineResult<()> {
        self.update_port(id, 0)
    }

    /// Bring output `port` up to date.
    ///
    /// Configuration problems anywhere upstream are reported before any
    /// request runs. A phase returning failure stops the update; outputs keep
    /// whatever the last successful phase produced. An abort of `id` or of any
    /// executive upstream of it is reported as `Aborted`, naming that
    /// executive, and leaves the outputs of `id` marked aborted.
    pub fn update_port(&self, id: AlgorithmId, port: usize) -> PipelineResult<()> {
        let exec = self.executive(id)?;
        let port = if exec.number_of_output_ports() == 0 {
            None
        } else if port < exec.number_of_output_ports() {
            Some(port)
        } else {
            return Err(PipelineError::configuration(
                exec.name(),
                format!(
                    "invalid output port {port} (algorithm has {})",
                    exec.number_of_output_ports()
                ),
            ));
        };

        self.validate_upstream(id)?;
        exec.abort.clear();
        exec.progress.reset();

        for kind in UPDATE_PHASES {
            if exec.abort.is_aborted() {
                return Err(self.mark_aborted(id, exec, exec.name()));
            }
            if let (RequestKind::UpdateExtent, Some(port)) = (kind, port) {
                if let Some(info) = exec.outputs.get(port) {
                    prepare_update_request(info);
                }
            }

            let mut request = Request::for_kind(kind);
            request.from_output_port = port;
            if !self.process_request(id, &mut request)? {
                let cause = match kind {
                    RequestKind::Data => self.aborted_at_or_above(id),
                    _ if exec.abort.is_aborted() => Some(exec.name()),
                    _ => None,
                };
                if let Some(cause) = cause {
                    return Err(self.mark_aborted(id, exec, cause));
                }
                return Err(PipelineError::AlgorithmFailure {
                    algorithm: exec.name().to_string(),
                    request: kind,
                });
            }
        }

        if let Some(cause) = self.aborted_at_or_above(id) {
            return Err(self.mark_aborted(id, exec, cause));
        }
        Ok(())
    }

    /// Name of the algorithm whose abort cut this update short: `id` itself
    /// if its flag is set, otherwise the first upstream executive whose last
    /// data execution ended aborted.
    fn aborted_at_or_above(&self, id: AlgorithmId) -> Option<&str> {
        let exec = self.executive(id).ok()?;
        if exec.abort.is_aborted() {
            return Some(exec.name());
        }
        let mut visited = vec![false; self.executives.len()];
        let mut stack: Vec<AlgorithmId> = upstream_of(exec).collect();
        while let Some(current) = stack.pop() {
            let idx = current.index();
            if idx >= visited.len() || visited[idx] {
                continue;
            }
            visited[idx] = true;
            let Ok(upstream) = self.executive(current) else {
                continue;
            };
            if upstream
                .outputs
                .iter()
                .any(|info| info.lock().get_flag(keys::DATA_ABORTED))
            {
                return Some(upstream.name());
            }
            stack.extend(upstream_of(upstream));
        }
        None
    }

    /// Marks the outputs of `id` as aborted; `cause` names the algorithm
    /// whose abort flag stopped the update.
    fn mark_aborted(&self, id: AlgorithmId, exec: &Executive, cause: &str) -> PipelineError {
        for info in &exec.outputs {
            let mut info = info.lock();
            info.set(keys::DATA_ABORTED, true);
            info.remove(keys::DATA_GENERATED);
        }
        tracing::info!("Update of '{}' aborted by '{}'", exec.name(), cause);
        self.emit(PipelineEvent::Aborted { algorithm: id });
        PipelineError::Aborted {
            algorithm: cause.to_string(),
        }
    }

    /// Check required connections on `id` and everything upstream of it.
    fn validate_upstream(&self, id: AlgorithmId) -> PipelineResult<()> {
        let mut visited = vec![false; self.executives.len()];
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let idx = current.index();
            if idx >= visited.len() || visited[idx] {
                continue;
            }
            visited[idx] = true;
            let exec = self.executive(current)?;
            exec.check_required_inputs()?;
            stack.extend(upstream_of(exec));
        }
        Ok(())
    }

    /// Process one request on one executive.
    ///
    /// Returns `Ok(false)` when an algorithm reported failure. Reentrant
    /// calls, configuration problems and non-upstream requests are errors.
    pub fn process_request(&self, id: AlgorithmId, request: &mut Request) -> PipelineResult<bool> {
        let exec = self.executive(id)?;
        let _busy = exec.enter()?;
        exec.check_required_inputs()?;
        if request.direction != ForwardDirection::Upstream {
            return Err(PipelineError::NotImplemented {
                algorithm: exec.name().to_string(),
                direction: request.direction,
            });
        }

        tracing::debug!(
            "{}: {:?} request (output port {:?})",
            exec.name(),
            request.kind,
            request.from_output_port
        );
        self.emit(PipelineEvent::RequestStarted {
            algorithm: id,
            kind: request.kind,
        });

        let inputs = exec.input_vectors();
        let outputs = exec.outputs.clone();
        let ctx = ExecutionContext::new(self, id, &exec.progress, &exec.abort);
        let success = self.run_request(id, exec, request, &inputs, &outputs, &ctx)?;

        self.emit(PipelineEvent::RequestFinished {
            algorithm: id,
            kind: request.kind,
            success,
        });
        Ok(success)
    }

    fn run_request(
        &self,
        id: AlgorithmId,
        exec: &Executive,
        request: &mut Request,
        inputs: &[InformationVector],
        outputs: &InformationVector,
        ctx: &ExecutionContext<'_>,
    ) -> PipelineResult<bool> {
        if request.timing.runs_before() && !exec.execute_phase(request, inputs, outputs, ctx) {
            return Ok(false);
        }
        if !self.forward_upstream(id, request)? {
            return Ok(false);
        }
        if request.timing.runs_after() && !exec.execute_phase(request, inputs, outputs, ctx) {
            return Ok(false);
        }
        Ok(true)
    }

    /// Send `request` to the producer of every input connection.
    ///
    /// Connections are visited port by port, then by connection index. Each
    /// producer gets its own copy of the request carrying its output port.
    /// A producer reporting failure does not stop the loop; the result is the
    /// AND over all producers. Errors stop it immediately.
    pub fn forward_upstream(&self, id: AlgorithmId, request: &mut Request) -> PipelineResult<bool> {
        let exec = self.executive(id)?;
        if !exec.algorithm.modify_request(request, ModifyWhen::Before) {
            return Ok(false);
        }

        let mut result = true;
        for (port, input) in exec.inputs.iter().enumerate() {
            for (index, connection) in input.connections.iter().enumerate() {
                let Some(producer) = connection else {
                    continue;
                };
                let mut upstream = request.clone();
                upstream.from_output_port = Some(producer.port);
                if !self.process_request(producer.algorithm, &mut upstream)? {
                    tracing::warn!(
                        "{}: {:?} request failed upstream on input {} connection {}",
                        exec.name(),
                        request.kind,
                        port,
                        index
                    );
                    result = false;
                }
            }
        }

        if !exec.algorithm.modify_request(request, ModifyWhen::After) {
            result = false;
        }
        Ok(result)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Producers feeding any input connection of `exec`.
fn upstream_of(exec: &Executive) -> impl Iterator<Item = AlgorithmId> + '_ {
    exec.inputs
        .iter()
        .flat_map(|input| input.connections.iter().flatten())
        .map(|c| c.algorithm)
}

/// Default the update request of an output before the update-extent pass.
fn prepare_update_request(info: &SharedInformation) {
    let mut info = info.lock();
    if !info.get_flag(keys::UPDATE_EXTENT_INITIALIZED) {
        match info.get_extent(keys::WHOLE_EXTENT) {
            Some(whole) => info.set(keys::UPDATE_EXTENT, whole),
            None => {
                info.remove(keys::UPDATE_EXTENT);
            }
        }
    }
    if !info.has(keys::UPDATE_PIECE_NUMBER) {
        info.set(keys::UPDATE_PIECE_NUMBER, 0);
    }
    if !info.has(keys::UPDATE_NUMBER_OF_PIECES) {
        info.set(keys::UPDATE_NUMBER_OF_PIECES, 1);
    }
    if !info.has(keys::UPDATE_NUMBER_OF_GHOST_LEVELS) {
        info.set(keys::UPDATE_NUMBER_OF_GHOST_LEVELS, 0);
    }
}
