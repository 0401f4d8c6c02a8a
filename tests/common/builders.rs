//! Test data builders for creating test objects

use super::mesh;
use vispipe::data::{DataObjectRef, HierarchicalBoxDataSet, MultiBlockDataSet, UniformGrid};
use vispipe::pipeline::{
    Algorithm, AlgorithmId, DataSource, ExecutiveKind, MergeBlocks, OutputPort, Pipeline,
};

/// Builder for multi-block composites of mesh leaves
pub struct CompositeBuilder {
    root: MultiBlockDataSet,
}

impl CompositeBuilder {
    pub fn new() -> Self {
        Self {
            root: MultiBlockDataSet::new(),
        }
    }

    /// Mesh leaf labelled `label` with points derived from the label length.
    pub fn leaf(mut self, label: &str) -> Self {
        let points: Vec<f64> = (0..label.len()).map(|i| i as f64).collect();
        self.root.push_leaf(Some(mesh(label, &points)));
        self
    }

    pub fn empty(mut self) -> Self {
        self.root.push_leaf(None);
        self
    }

    pub fn nested(mut self, child: CompositeBuilder) -> Self {
        self.root.push_nested(child.root);
        self
    }

    pub fn build(self) -> MultiBlockDataSet {
        self.root
    }

    pub fn build_ref(self) -> DataObjectRef {
        DataObjectRef::new(self.root)
    }
}

/// `[A, null, B, C]`
pub fn sparse_blocks() -> DataObjectRef {
    CompositeBuilder::new()
        .leaf("A")
        .empty()
        .leaf("B")
        .leaf("C")
        .build_ref()
}

/// Flat composite with `count` labelled mesh leaves.
pub fn numbered_blocks(count: usize) -> DataObjectRef {
    (0..count)
        .fold(CompositeBuilder::new(), |builder, i| {
            builder.leaf(&format!("block-{i}"))
        })
        .build_ref()
}

/// Box hierarchy with `levels[i]` grids on level `i`; `false` leaves a gap.
pub fn box_hierarchy(levels: &[Vec<bool>]) -> DataObjectRef {
    let mut boxes = HierarchicalBoxDataSet::new();
    for (level, present) in levels.iter().enumerate() {
        boxes.add_level(
            present
                .iter()
                .enumerate()
                .map(|(i, &present)| {
                    present.then(|| {
                        let n = (i + 1) as i32;
                        let points = ((n + 1) * (n + 1)) as usize;
                        DataObjectRef::new(UniformGrid::new(
                            [0, n, 0, n, 0, 0],
                            [1.0 / (level + 1) as f64; 3],
                            vec![level as f64; points],
                        ))
                    })
                })
                .collect(),
        );
    }
    DataObjectRef::new(boxes)
}

/// `source -> filter` with the filter on `kind`.
pub fn source_to_filter<A: Algorithm + 'static>(
    input: DataObjectRef,
    filter: A,
    kind: ExecutiveKind,
) -> (Pipeline, AlgorithmId, AlgorithmId) {
    let mut pipeline = Pipeline::new();
    let source = pipeline.add_algorithm(DataSource::new("source", input));
    let filter = pipeline.add_algorithm_with(filter, kind);
    pipeline
        .set_input_connection(filter, 0, OutputPort::new(source, 0))
        .expect("connect source to filter");
    (pipeline, source, filter)
}

/// `source -> filter -> MergeBlocks`; returns the filter and merge ids.
pub fn source_filter_merge<A: Algorithm + 'static>(
    input: DataObjectRef,
    filter: A,
    kind: ExecutiveKind,
) -> (Pipeline, AlgorithmId, AlgorithmId) {
    let (mut pipeline, _, filter) = source_to_filter(input, filter, kind);
    let merge = pipeline.add_algorithm(MergeBlocks::new("merge"));
    pipeline
        .set_input_connection(merge, 0, OutputPort::new(filter, 0))
        .expect("connect filter to merge");
    (pipeline, filter, merge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vispipe::data::CompositeDataSet;

    #[test]
    fn test_composite_builder() {
        let blocks = CompositeBuilder::new()
            .leaf("a")
            .nested(CompositeBuilder::new().empty().leaf("b"))
            .build();
        assert_eq!(blocks.number_of_leaves(), 3);
        assert!(blocks.leaf(vispipe::data::FlatIndex(1)).is_none());
    }
}
