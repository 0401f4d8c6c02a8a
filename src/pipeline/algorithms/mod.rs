//! Built-in algorithm implementations.

pub mod merge_blocks;
pub mod passthrough;
pub mod source;

pub use merge_blocks::MergeBlocks;
pub use passthrough::Passthrough;
pub use source::DataSource;

use crate::data::DataObjectRef;
use crate::pipeline::information::InformationVector;

/// Data object on the first connection of input `port`.
pub fn input_data_object(inputs: &[InformationVector], port: usize) -> Option<DataObjectRef> {
    inputs
        .get(port)
        .and_then(|vector| vector.get(0))
        .and_then(|info| info.data_object())
}
