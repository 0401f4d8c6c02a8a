//! DataSource: publishes a fixed data object.
//!
//! The output port holds the source's own data object. Structural metadata
//! (whole extent, time steps) is published during the information pass.

use crate::data::DataObjectRef;
use crate::pipeline::algorithm::{Algorithm, ExecutionContext};
use crate::pipeline::information::{keys, InformationVector};
use crate::pipeline::port::PortInfo;
use crate::pipeline::request::Request;

/// Source algorithm with no inputs and one output.
pub struct DataSource {
    name: String,
    data: DataObjectRef,
    time_steps: Vec<f64>,
}

impl DataSource {
    pub fn new(name: impl Into<String>, data: DataObjectRef) -> Self {
        Self {
            name: name.into(),
            data,
            time_steps: Vec::new(),
        }
    }

    /// Advertise the time steps this source can produce.
    pub fn with_time_steps(mut self, steps: Vec<f64>) -> Self {
        self.time_steps = steps;
        self
    }

    pub fn data(&self) -> &DataObjectRef {
        &self.data
    }
}

impl Algorithm for DataSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn number_of_input_ports(&self) -> usize {
        0
    }

    fn fill_output_port_information(&self, _port: usize) -> PortInfo {
        PortInfo::producing(self.data.type_name())
    }

    fn request_data_object(
        &self,
        _request: &Request,
        _inputs: &[InformationVector],
        outputs: &InformationVector,
        _ctx: &ExecutionContext<'_>,
    ) -> bool {
        let Some(output) = outputs.get(0) else {
            return false;
        };
        if !output.data_object().is_some_and(|o| o.ptr_eq(&self.data)) {
            output.set_data_object(Some(self.data.clone()));
        }
        true
    }

    fn request_information(
        &self,
        _request: &Request,
        _inputs: &[InformationVector],
        outputs: &InformationVector,
        _ctx: &ExecutionContext<'_>,
    ) -> bool {
        let Some(output) = outputs.get(0) else {
            return false;
        };
        let mut info = output.lock();
        self.data.read().copy_information_to_pipeline(&mut info);
        if !self.time_steps.is_empty() {
            info.set(keys::TIME_STEPS, self.time_steps.clone());
        }
        true
    }
}
