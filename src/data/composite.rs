//! Composite data objects: trees or levels of leaf blocks.
//!
//! Leaves are addressed by a [`FlatIndex`], the leaf's ordinal in traversal
//! order. Empty leaf slots keep their index, so two composites with the same
//! structure always agree on which index names which slot.

use super::{types, DataObject, DataObjectRef};
use serde::Serialize;
use std::any::Any;

/// Ordinal of a leaf slot in traversal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FlatIndex(pub usize);

/// One leaf slot visited during traversal.
#[derive(Debug, Clone)]
pub struct LeafSlot {
    pub index: FlatIndex,
    pub object: Option<DataObjectRef>,
}

/// Structure of a composite, independent of its concrete type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockShape {
    Leaf { present: bool },
    Nested(Vec<BlockShape>),
}

impl BlockShape {
    pub fn count_leaves(shapes: &[BlockShape]) -> usize {
        shapes
            .iter()
            .map(|shape| match shape {
                BlockShape::Leaf { .. } => 1,
                BlockShape::Nested(children) => Self::count_leaves(children),
            })
            .sum()
    }
}

/// Operations the pipeline requires from a composite data object.
pub trait CompositeDataSet: Send + Sync {
    fn shape(&self) -> Vec<BlockShape>;

    /// Every leaf slot in traversal order, empty slots included.
    fn leaves(&self) -> Vec<LeafSlot>;

    fn number_of_leaves(&self) -> usize {
        BlockShape::count_leaves(&self.shape())
    }

    fn leaf(&self, index: FlatIndex) -> Option<DataObjectRef> {
        self.leaves()
            .into_iter()
            .nth(index.0)
            .and_then(|slot| slot.object)
    }

    /// Store `object` at `index`. Returns false if no such slot exists.
    fn set_leaf(&mut self, index: FlatIndex, object: Option<DataObjectRef>) -> bool;

    /// Drop all structure and leaves.
    fn initialize(&mut self);

    /// Take `source`'s structure with every leaf slot empty.
    fn copy_structure(&mut self, source: &dyn CompositeDataSet);
}

/// A child of a multi-block node.
#[derive(Debug, Clone)]
pub enum Block {
    Leaf(Option<DataObjectRef>),
    Nested(MultiBlockDataSet),
}

/// Generic tree-shaped composite.
#[derive(Debug, Clone, Default)]
pub struct MultiBlockDataSet {
    blocks: Vec<Block>,
}

impl MultiBlockDataSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flat composite with one leaf slot per item.
    pub fn from_leaves(leaves: impl IntoIterator<Item = Option<DataObjectRef>>) -> Self {
        Self {
            blocks: leaves.into_iter().map(Block::Leaf).collect(),
        }
    }

    pub fn push_leaf(&mut self, object: Option<DataObjectRef>) {
        self.blocks.push(Block::Leaf(object));
    }

    pub fn push_nested(&mut self, child: MultiBlockDataSet) {
        self.blocks.push(Block::Nested(child));
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    fn from_shape(shape: &[BlockShape]) -> Vec<Block> {
        shape
            .iter()
            .map(|s| match s {
                BlockShape::Leaf { .. } => Block::Leaf(None),
                BlockShape::Nested(children) => Block::Nested(MultiBlockDataSet {
                    blocks: Self::from_shape(children),
                }),
            })
            .collect()
    }
}

fn collect_leaves(blocks: &[Block], out: &mut Vec<LeafSlot>) {
    for block in blocks {
        match block {
            Block::Leaf(object) => out.push(LeafSlot {
                index: FlatIndex(out.len()),
                object: object.clone(),
            }),
            Block::Nested(child) => collect_leaves(&child.blocks, out),
        }
    }
}

fn leaf_slot_mut<'a>(
    blocks: &'a mut [Block],
    target: usize,
    seen: &mut usize,
) -> Option<&'a mut Option<DataObjectRef>> {
    for block in blocks.iter_mut() {
        match block {
            Block::Leaf(slot) => {
                if *seen == target {
                    return Some(slot);
                }
                *seen += 1;
            }
            Block::Nested(child) => {
                if let Some(slot) = leaf_slot_mut(&mut child.blocks, target, seen) {
                    return Some(slot);
                }
            }
        }
    }
    None
}

fn shape_of(blocks: &[Block]) -> Vec<BlockShape> {
    blocks
        .iter()
        .map(|block| match block {
            Block::Leaf(object) => BlockShape::Leaf {
                present: object.is_some(),
            },
            Block::Nested(child) => BlockShape::Nested(shape_of(&child.blocks)),
        })
        .collect()
}

impl CompositeDataSet for MultiBlockDataSet {
    fn shape(&self) -> Vec<BlockShape> {
        shape_of(&self.blocks)
    }

    fn leaves(&self) -> Vec<LeafSlot> {
        let mut out = Vec::new();
        collect_leaves(&self.blocks, &mut out);
        out
    }

    fn set_leaf(&mut self, index: FlatIndex, object: Option<DataObjectRef>) -> bool {
        let mut seen = 0;
        match leaf_slot_mut(&mut self.blocks, index.0, &mut seen) {
            Some(slot) => {
                *slot = object;
                true
            }
            None => false,
        }
    }

    fn initialize(&mut self) {
        self.blocks.clear();
    }

    fn copy_structure(&mut self, source: &dyn CompositeDataSet) {
        self.blocks = Self::from_shape(&source.shape());
    }
}

impl DataObject for MultiBlockDataSet {
    fn type_name(&self) -> &'static str {
        types::MULTI_BLOCK_DATA_SET
    }

    fn new_instance(&self) -> Box<dyn DataObject> {
        Box::new(MultiBlockDataSet::new())
    }

    fn shallow_copy(&mut self, source: &dyn DataObject) {
        if let Some(src) = source.as_any().downcast_ref::<MultiBlockDataSet>() {
            self.blocks = src.blocks.clone();
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_composite(&self) -> Option<&dyn CompositeDataSet> {
        Some(self)
    }

    fn as_composite_mut(&mut self) -> Option<&mut dyn CompositeDataSet> {
        Some(self)
    }
}

/// Level-organized composite of structured blocks (AMR box hierarchy).
#[derive(Debug, Clone, Default)]
pub struct HierarchicalBoxDataSet {
    levels: Vec<Vec<Option<DataObjectRef>>>,
}

impl HierarchicalBoxDataSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_level(&mut self, blocks: Vec<Option<DataObjectRef>>) {
        self.levels.push(blocks);
    }

    pub fn number_of_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn level(&self, level: usize) -> Option<&[Option<DataObjectRef>]> {
        self.levels.get(level).map(Vec::as_slice)
    }
}

impl CompositeDataSet for HierarchicalBoxDataSet {
    fn shape(&self) -> Vec<BlockShape> {
        self.levels
            .iter()
            .map(|level| {
                BlockShape::Nested(
                    level
                        .iter()
                        .map(|object| BlockShape::Leaf {
                            present: object.is_some(),
                        })
                        .collect(),
                )
            })
            .collect()
    }

    fn leaves(&self) -> Vec<LeafSlot> {
        self.levels
            .iter()
            .flatten()
            .enumerate()
            .map(|(i, object)| LeafSlot {
                index: FlatIndex(i),
                object: object.clone(),
            })
            .collect()
    }

    fn set_leaf(&mut self, index: FlatIndex, object: Option<DataObjectRef>) -> bool {
        match self.levels.iter_mut().flatten().nth(index.0) {
            Some(slot) => {
                *slot = object;
                true
            }
            None => false,
        }
    }

    fn initialize(&mut self) {
        self.levels.clear();
    }

    fn copy_structure(&mut self, source: &dyn CompositeDataSet) {
        self.levels = source
            .shape()
            .iter()
            .map(|shape| match shape {
                BlockShape::Leaf { .. } => vec![None],
                BlockShape::Nested(children) => vec![None; BlockShape::count_leaves(children)],
            })
            .collect();
    }
}

impl DataObject for HierarchicalBoxDataSet {
    fn type_name(&self) -> &'static str {
        types::HIERARCHICAL_BOX_DATA_SET
    }

    fn new_instance(&self) -> Box<dyn DataObject> {
        Box::new(HierarchicalBoxDataSet::new())
    }

    fn shallow_copy(&mut self, source: &dyn DataObject) {
        if let Some(src) = source.as_any().downcast_ref::<HierarchicalBoxDataSet>() {
            self.levels = src.levels.clone();
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_composite(&self) -> Option<&dyn CompositeDataSet> {
        Some(self)
    }

    fn as_composite_mut(&mut self) -> Option<&mut dyn CompositeDataSet> {
        Some(self)
    }
}
