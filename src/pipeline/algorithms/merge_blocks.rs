//! MergeBlocks: flattens a composite of meshes into one mesh.
//!
//! Its input port accepts composite data, so composite executives hand it
//! the whole dataset instead of iterating.

use crate::data::{types, DataObjectRef, Mesh};
use crate::pipeline::algorithm::{Algorithm, ExecutionContext};
use crate::pipeline::algorithms::input_data_object;
use crate::pipeline::information::InformationVector;
use crate::pipeline::port::PortInfo;
use crate::pipeline::request::Request;

pub struct MergeBlocks {
    name: String,
}

impl MergeBlocks {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Algorithm for MergeBlocks {
    fn name(&self) -> &str {
        &self.name
    }

    fn fill_input_port_information(&self, _port: usize) -> PortInfo {
        PortInfo::requiring(types::COMPOSITE_DATA_SET)
    }

    fn fill_output_port_information(&self, _port: usize) -> PortInfo {
        PortInfo::producing(types::MESH)
    }

    fn request_data(
        &self,
        _request: &Request,
        inputs: &[InformationVector],
        outputs: &InformationVector,
        ctx: &ExecutionContext<'_>,
    ) -> bool {
        let (Some(input), Some(output)) = (
            input_data_object(inputs, 0),
            outputs.get(0).and_then(|info| info.data_object()),
        ) else {
            return false;
        };

        let leaves = match input.read().as_composite() {
            Some(composite) => composite.leaves(),
            None => return false,
        };

        let mut points = Vec::new();
        let mut merged = 0usize;
        for (i, leaf) in leaves.iter().enumerate() {
            if let Some(object) = &leaf.object {
                if object
                    .with(|mesh: &Mesh| points.extend_from_slice(mesh.points()))
                    .is_some()
                {
                    merged += 1;
                }
            }
            ctx.update_progress((i + 1) as f64 / leaves.len() as f64);
        }

        tracing::debug!("{}: merged {} of {} blocks", self.name, merged, leaves.len());
        output.shallow_copy_from(&DataObjectRef::new(Mesh::new(self.name.clone(), points)));
        true
    }
}
