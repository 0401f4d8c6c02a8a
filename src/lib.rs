//! # vispipe: demand-driven visualization pipeline
//!
//! Algorithms are wired into a graph and executed on demand: asking a sink
//! for data sends requests upstream through every producer, and each
//! executive decides whether its algorithm has to run.
//!
//! ## Architecture
//!
//! - **Pipeline**: arena of executives, connections and the request driver
//! - **Executives**: demand-driven, sequential composite and parallel
//!   composite strategies
//! - **Data**: the data-object boundary with leaf and composite datasets
//! - **Communication**: crossbeam channels for pipeline events
//!
//! ## Configuration
//!
//! The default executive strategy, worker pool size and logging are read from
//! a `PipelineConfig` stored under `dev.hxyulin.vispipe` in the platform
//! config directory.
//!
//! ## Example
//!
//! ```ignore
//! use vispipe::data::{DataObjectRef, Mesh, MultiBlockDataSet};
//! use vispipe::pipeline::{DataSource, OutputPort, Passthrough, Pipeline};
//!
//! let blocks = MultiBlockDataSet::from_leaves([
//!     Some(DataObjectRef::new(Mesh::new("a", vec![0.0, 1.0]))),
//!     None,
//!     Some(DataObjectRef::new(Mesh::new("b", vec![2.0]))),
//! ]);
//!
//! let mut pipeline = Pipeline::new();
//! let source = pipeline.add_algorithm(DataSource::new("blocks", DataObjectRef::new(blocks)));
//! let filter = pipeline.add_algorithm(Passthrough::new("copy"));
//! pipeline.set_input_connection(filter, 0, OutputPort::new(source, 0))?;
//! pipeline.update(filter)?;
//!
//! // The mesh-only filter ran once per block and produced a multi-block
//! let output = pipeline.output_data(filter, 0)?;
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;

// Re-export commonly used types
pub use config::{init_logging, PipelineConfig};
pub use data::{DataObject, DataObjectRef};
pub use error::{Result, VisPipeError};
pub use pipeline::{Algorithm, AlgorithmId, OutputPort, Pipeline, PipelineError, Request};
