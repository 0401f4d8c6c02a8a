//! Passthrough: shallow-copies its input to its output.
//!
//! The output object is created as a fresh instance of the input's concrete
//! type, so a passthrough behind a composite executive produces one leaf per
//! input leaf.

use crate::data::types;
use crate::pipeline::algorithm::{Algorithm, ExecutionContext};
use crate::pipeline::algorithms::input_data_object;
use crate::pipeline::information::InformationVector;
use crate::pipeline::port::PortInfo;
use crate::pipeline::request::Request;

pub struct Passthrough {
    name: String,
    accepted: Vec<&'static str>,
}

impl Passthrough {
    /// Passthrough accepting meshes.
    pub fn new(name: impl Into<String>) -> Self {
        Self::accepting(name, &[types::MESH])
    }

    /// Passthrough accepting any of `accepted`.
    pub fn accepting(name: impl Into<String>, accepted: &[&'static str]) -> Self {
        Self {
            name: name.into(),
            accepted: accepted.to_vec(),
        }
    }
}

impl Algorithm for Passthrough {
    fn name(&self) -> &str {
        &self.name
    }

    fn fill_input_port_information(&self, _port: usize) -> PortInfo {
        let mut info = PortInfo::new();
        for data_type in &self.accepted {
            info = info.or_type(data_type);
        }
        info
    }

    fn request_data_object(
        &self,
        _request: &Request,
        inputs: &[InformationVector],
        outputs: &InformationVector,
        _ctx: &ExecutionContext<'_>,
    ) -> bool {
        let (Some(input), Some(output)) = (input_data_object(inputs, 0), outputs.get(0)) else {
            tracing::error!("{}: no input data object", self.name);
            return false;
        };
        let matches = output
            .data_object()
            .is_some_and(|o| o.type_name() == input.type_name());
        if !matches {
            output.set_data_object(Some(input.new_instance()));
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
        output.shallow_copy_from(&input);
        true
    }
}
