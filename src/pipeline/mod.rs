//! Demand-driven pipeline engine.
//!
//! Algorithms are connected into a directed acyclic graph. A consumer asks
//! for data; the request travels upstream through every producer and each
//! executive runs its algorithm's hooks before and/or after forwarding.
//!
//! # Architecture
//!
//! ```text
//! [DataSource] ──► [Passthrough] ──► [MergeBlocks]
//!      ▲                ▲                 ▲
//!      └─── Data request travels upstream ┘
//! ```
//!
//! # Design
//!
//! - **Shared information**: a consumer's input information handle is the
//!   producer's output information handle.
//! - **Four update phases**: DataObject, Information, UpdateExtent, Data.
//! - **Composite iteration**: composite executives run block-unaware
//!   algorithms once per leaf of a composite input, sequentially or on a
//!   rayon worker pool.
//! - **Events**: request and block outcomes are broadcast over crossbeam
//!   channels.

pub mod algorithm;
pub mod algorithms;
pub mod bridge;
pub mod composite;
pub mod error;
pub mod executive;
pub mod executor;
pub mod id;
pub mod information;
mod parallel;
pub mod port;
pub mod progress;
pub mod request;
mod sequential;
pub mod worker_pool;

pub use algorithm::{Algorithm, ExecutionContext};
pub use algorithms::{DataSource, MergeBlocks, Passthrough};
pub use bridge::{AlgorithmSnapshot, ConnectionSnapshot, PipelineEvent, TopologySnapshot};
pub use composite::{is_sorted_subset, should_iterate_over_input};
pub use error::{PipelineError, PipelineResult};
pub use executive::{copy_default_information, Executive, ExecutiveFactory, ExecutiveKind};
pub use executor::Pipeline;
pub use id::{AlgorithmId, OutputPort};
pub use information::{keys, InfoKey, InfoValue, Information, InformationVector, SharedInformation};
pub use port::PortInfo;
pub use progress::{AbortHandle, ProgressSink};
pub use request::{AlgorithmTiming, ForwardDirection, ModifyWhen, Request, RequestKind};
pub use worker_pool::WorkerPool;
