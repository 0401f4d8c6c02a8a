//! Leaf data objects.

use super::{types, DataObject};
use crate::pipeline::information::{keys, Information};
use std::any::Any;
use std::sync::Arc;

/// An unstructured block of points.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    label: String,
    points: Arc<Vec<f64>>,
}

impl Mesh {
    pub fn new(label: impl Into<String>, points: Vec<f64>) -> Self {
        Self {
            label: label.into(),
            points: Arc::new(points),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn points(&self) -> &[f64] {
        &self.points
    }

    /// True when both meshes reference the same point buffer.
    pub fn shares_points_with(&self, other: &Mesh) -> bool {
        Arc::ptr_eq(&self.points, &other.points)
    }
}

impl DataObject for Mesh {
    fn type_name(&self) -> &'static str {
        types::MESH
    }

    fn new_instance(&self) -> Box<dyn DataObject> {
        Box::new(Mesh::default())
    }

    fn shallow_copy(&mut self, source: &dyn DataObject) {
        if let Some(src) = source.as_any().downcast_ref::<Mesh>() {
            self.label = src.label.clone();
            self.points = Arc::clone(&src.points);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A structured block on a regular lattice with an index-space extent.
#[derive(Debug, Clone, Default)]
pub struct UniformGrid {
    extent: [i32; 6],
    spacing: [f64; 3],
    scalars: Arc<Vec<f64>>,
}

impl UniformGrid {
    pub fn new(extent: [i32; 6], spacing: [f64; 3], scalars: Vec<f64>) -> Self {
        Self {
            extent,
            spacing,
            scalars: Arc::new(scalars),
        }
    }

    pub fn extent(&self) -> [i32; 6] {
        self.extent
    }

    pub fn spacing(&self) -> [f64; 3] {
        self.spacing
    }

    pub fn scalars(&self) -> &[f64] {
        &self.scalars
    }

    /// Number of lattice points covered by the extent.
    pub fn number_of_points(&self) -> usize {
        let e = self.extent;
        (0..3)
            .map(|axis| (e[2 * axis + 1] - e[2 * axis] + 1).max(0) as usize)
            .product()
    }
}

impl DataObject for UniformGrid {
    fn type_name(&self) -> &'static str {
        types::UNIFORM_GRID
    }

    fn new_instance(&self) -> Box<dyn DataObject> {
        Box::new(UniformGrid::default())
    }

    fn shallow_copy(&mut self, source: &dyn DataObject) {
        if let Some(src) = source.as_any().downcast_ref::<UniformGrid>() {
            self.extent = src.extent;
            self.spacing = src.spacing;
            self.scalars = Arc::clone(&src.scalars);
        }
    }

    fn copy_information_to_pipeline(&self, info: &mut Information) {
        info.set(keys::WHOLE_EXTENT, self.extent);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
