//! Boundary between the pipeline and its observers.
//!
//! Observers receive `PipelineEvent`s over crossbeam channels obtained from
//! `Pipeline::subscribe`, and can ask for a serializable `TopologySnapshot`
//! of the current graph.

use crate::data::FlatIndex;
use crate::pipeline::id::AlgorithmId;
use crate::pipeline::port::PortInfo;
use crate::pipeline::request::RequestKind;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use serde::Serialize;

/// Notifications emitted while requests run.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    RequestStarted {
        algorithm: AlgorithmId,
        kind: RequestKind,
    },
    RequestFinished {
        algorithm: AlgorithmId,
        kind: RequestKind,
        success: bool,
    },
    /// One block of a composite iteration failed; its output slot stays empty.
    BlockFailed {
        algorithm: AlgorithmId,
        block: FlatIndex,
    },
    Aborted {
        algorithm: AlgorithmId,
    },
}

/// Fan-out of events to every subscriber.
#[derive(Debug, Default)]
pub(crate) struct EventBus {
    subscribers: Mutex<Vec<Sender<PipelineEvent>>>,
}

impl EventBus {
    pub fn subscribe(&self) -> Receiver<PipelineEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Sends `event` to every live subscriber and forgets the ones whose
    /// receiver has been dropped.
    pub fn emit(&self, event: PipelineEvent) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.lock().is_empty()
    }
}

/// Snapshot of a single algorithm.
#[derive(Debug, Clone, Serialize)]
pub struct AlgorithmSnapshot {
    pub id: AlgorithmId,
    pub name: String,
    pub executive: String,
    pub input_ports: Vec<PortInfo>,
    pub output_ports: Vec<PortInfo>,
}

/// Snapshot of a single connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionSnapshot {
    /// `None` for inputs set directly with data.
    pub producer: Option<AlgorithmId>,
    pub producer_port: Option<usize>,
    pub consumer: AlgorithmId,
    pub consumer_port: usize,
    pub index: usize,
}

/// Complete topology snapshot of the pipeline graph.
#[derive(Debug, Clone, Serialize)]
pub struct TopologySnapshot {
    pub algorithms: Vec<AlgorithmSnapshot>,
    pub connections: Vec<ConnectionSnapshot>,
}

impl TopologySnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
