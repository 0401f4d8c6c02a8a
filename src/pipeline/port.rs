//! Port capability declarations.
//!
//! Each algorithm describes its ports through `PortInfo` values returned from
//! its `fill_*_port_information` hooks. The executive caches them on first
//! query and uses them to validate connections and to decide whether a
//! composite input has to be iterated block by block.

use crate::data::{self, DataObjectRef};
use serde::Serialize;

/// Capability and requirement metadata for one port.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PortInfo {
    /// Accepted input types. Empty accepts anything.
    pub required_data_types: Vec<String>,
    pub optional: bool,
    pub repeatable: bool,
    pub can_produce_sub_extent: bool,
    pub can_handle_piece_request: bool,
    /// Concrete type an output port produces when the algorithm does not
    /// create its own output object.
    pub data_type: Option<String>,
}

impl PortInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Input port accepting `data_type` and its subtypes.
    pub fn requiring(data_type: &str) -> Self {
        Self {
            required_data_types: vec![data_type.to_string()],
            ..Self::default()
        }
    }

    /// Output port producing `data_type`.
    pub fn producing(data_type: &str) -> Self {
        Self {
            data_type: Some(data_type.to_string()),
            ..Self::default()
        }
    }

    /// Also accept `data_type`.
    pub fn or_type(mut self, data_type: &str) -> Self {
        self.required_data_types.push(data_type.to_string());
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn repeatable(mut self) -> Self {
        self.repeatable = true;
        self
    }

    pub fn with_sub_extents(mut self) -> Self {
        self.can_produce_sub_extent = true;
        self
    }

    pub fn with_piece_requests(mut self) -> Self {
        self.can_handle_piece_request = true;
        self
    }

    /// Whether `object` satisfies this port's requirements.
    pub fn accepts(&self, object: &DataObjectRef) -> bool {
        self.required_data_types.is_empty()
            || self.required_data_types.iter().any(|t| object.is_a(t))
    }

    /// Whether an object of type `type_name` satisfies this port's requirements.
    pub fn accepts_type(&self, type_name: &str) -> bool {
        self.required_data_types.is_empty()
            || self
                .required_data_types
                .iter()
                .any(|t| data::type_is_a(type_name, t))
    }

    /// Whether the port declares composite awareness.
    pub fn declares_composite(&self) -> bool {
        self.required_data_types
            .iter()
            .any(|t| data::is_composite_type(t))
    }
}
