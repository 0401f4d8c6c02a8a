//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use vispipe::data::{CompositeDataSet, DataObjectRef, Mesh};

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// Mesh leaf with a label and points.
pub fn mesh(label: &str, points: &[f64]) -> DataObjectRef {
    DataObjectRef::new(Mesh::new(label, points.to_vec()))
}

/// Label and points of every leaf slot of a composite, empty slots as `None`.
pub fn leaf_contents(object: &DataObjectRef) -> Vec<Option<(String, Vec<f64>)>> {
    let guard = object.read();
    let composite = guard
        .as_composite()
        .expect("expected a composite data object");
    composite
        .leaves()
        .into_iter()
        .map(|slot| {
            slot.object.and_then(|leaf| {
                leaf.with(|m: &Mesh| (m.label().to_string(), m.points().to_vec()))
            })
        })
        .collect()
}

/// Number of points over every mesh leaf of a composite.
pub fn total_points(object: &DataObjectRef) -> usize {
    leaf_contents(object)
        .iter()
        .flatten()
        .map(|(_, points)| points.len())
        .sum()
}

/// Number of points of a mesh output, `None` for anything else.
pub fn mesh_point_count(object: &DataObjectRef) -> Option<usize> {
    object.with(|m: &Mesh| m.points().len())
}

/// Structure of a composite data object.
pub fn shape_of(object: &DataObjectRef) -> Vec<vispipe::data::BlockShape> {
    let guard = object.read();
    guard
        .as_composite()
        .map(|composite| composite.shape())
        .expect("expected a composite data object")
}

/// `DataSource(mesh) -> Passthrough` on the default executive.
pub fn source_mesh_pipeline() -> (
    vispipe::Pipeline,
    vispipe::AlgorithmId,
    vispipe::AlgorithmId,
) {
    builders::source_to_filter(
        mesh("input", &[0.0, 1.0, 2.0]),
        vispipe::pipeline::Passthrough::new("copy"),
        vispipe::pipeline::ExecutiveKind::SequentialComposite,
    )
}
