//! Data-object boundary consumed by the pipeline.
//!
//! The engine never looks inside a data object. It only needs to create
//! instances of the same concrete type, shallow-copy them, ask whether they
//! are composite, and walk/fill composite leaves. The concrete types in
//! [`leaf`] and [`composite`] are deliberately small stand-ins.
//!
//! Data objects are shared through [`DataObjectRef`], a cloneable handle
//! around a lock. Cloning the handle never copies the payload.

pub mod composite;
pub mod leaf;

pub use composite::{
    Block, BlockShape, CompositeDataSet, FlatIndex, HierarchicalBoxDataSet, LeafSlot,
    MultiBlockDataSet,
};
pub use leaf::{Mesh, UniformGrid};

use crate::pipeline::information::Information;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Well-known data type names.
pub mod types {
    pub const DATA_OBJECT: &str = "DataObject";
    pub const DATA_SET: &str = "DataSet";
    pub const MESH: &str = "Mesh";
    pub const IMAGE_DATA: &str = "ImageData";
    pub const UNIFORM_GRID: &str = "UniformGrid";
    pub const COMPOSITE_DATA_SET: &str = "CompositeDataSet";
    pub const MULTI_BLOCK_DATA_SET: &str = "MultiBlockDataSet";
    pub const HIERARCHICAL_BOX_DATA_SET: &str = "HierarchicalBoxDataSet";
}

/// Type lineages, most derived first. A data object `is_a` every name in its lineage.
const LINEAGES: &[&[&str]] = &[
    &[types::DATA_OBJECT],
    &[types::DATA_SET, types::DATA_OBJECT],
    &[types::MESH, types::DATA_SET, types::DATA_OBJECT],
    &[types::IMAGE_DATA, types::DATA_SET, types::DATA_OBJECT],
    &[
        types::UNIFORM_GRID,
        types::IMAGE_DATA,
        types::DATA_SET,
        types::DATA_OBJECT,
    ],
    &[types::COMPOSITE_DATA_SET, types::DATA_OBJECT],
    &[
        types::MULTI_BLOCK_DATA_SET,
        types::COMPOSITE_DATA_SET,
        types::DATA_OBJECT,
    ],
    &[
        types::HIERARCHICAL_BOX_DATA_SET,
        types::COMPOSITE_DATA_SET,
        types::DATA_OBJECT,
    ],
];

/// Lineage of a registered type name, most derived first.
pub fn type_lineage(type_name: &str) -> Option<&'static [&'static str]> {
    LINEAGES
        .iter()
        .find(|lineage| lineage[0] == type_name)
        .copied()
}

/// Whether `type_name` names a composite type (abstract or concrete).
pub fn is_composite_type(type_name: &str) -> bool {
    type_lineage(type_name)
        .map(|lineage| lineage.contains(&types::COMPOSITE_DATA_SET))
        .unwrap_or(false)
}

/// Whether an object of type `type_name` would satisfy a requirement for `required`.
pub fn type_is_a(type_name: &str, required: &str) -> bool {
    type_lineage(type_name)
        .map(|lineage| lineage.contains(&required))
        .unwrap_or(type_name == required)
}

/// Create a fresh, empty instance of a concrete registered type.
///
/// Abstract names (`DataSet`, `CompositeDataSet`, ...) return `None`.
pub fn new_data_object(type_name: &str) -> Option<DataObjectRef> {
    match type_name {
        types::MESH => Some(DataObjectRef::new(Mesh::default())),
        types::UNIFORM_GRID => Some(DataObjectRef::new(UniformGrid::default())),
        types::MULTI_BLOCK_DATA_SET => Some(DataObjectRef::new(MultiBlockDataSet::new())),
        types::HIERARCHICAL_BOX_DATA_SET => {
            Some(DataObjectRef::new(HierarchicalBoxDataSet::new()))
        }
        _ => None,
    }
}

/// Operations the pipeline requires from a data object.
pub trait DataObject: Send + Sync + fmt::Debug {
    /// Concrete type name.
    fn type_name(&self) -> &'static str;

    /// Lineage of this object's type, most derived first.
    fn type_lineage(&self) -> &'static [&'static str] {
        type_lineage(self.type_name()).unwrap_or(&[types::DATA_OBJECT])
    }

    fn is_a(&self, type_name: &str) -> bool {
        self.type_lineage().contains(&type_name)
    }

    /// Empty object of the same concrete type.
    fn new_instance(&self) -> Box<dyn DataObject>;

    /// Share `source`'s payload. Sources of a different concrete type are ignored.
    fn shallow_copy(&mut self, source: &dyn DataObject);

    /// Publish structural metadata (e.g. whole extent) into pipeline information.
    fn copy_information_to_pipeline(&self, _info: &mut Information) {}

    fn as_any(&self) -> &dyn Any;

    fn as_composite(&self) -> Option<&dyn CompositeDataSet> {
        None
    }

    fn as_composite_mut(&mut self) -> Option<&mut dyn CompositeDataSet> {
        None
    }

    fn is_composite(&self) -> bool {
        self.as_composite().is_some()
    }
}

/// Shared handle to a data object.
#[derive(Clone)]
pub struct DataObjectRef(Arc<RwLock<Box<dyn DataObject>>>);

impl DataObjectRef {
    pub fn new(object: impl DataObject + 'static) -> Self {
        Self::from_box(Box::new(object))
    }

    pub fn from_box(object: Box<dyn DataObject>) -> Self {
        Self(Arc::new(RwLock::new(object)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Box<dyn DataObject>> {
        self.0.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Box<dyn DataObject>> {
        self.0.write()
    }

    pub fn type_name(&self) -> &'static str {
        self.read().type_name()
    }

    pub fn is_a(&self, type_name: &str) -> bool {
        self.read().is_a(type_name)
    }

    pub fn is_composite(&self) -> bool {
        self.read().is_composite()
    }

    pub fn new_instance(&self) -> DataObjectRef {
        DataObjectRef::from_box(self.read().new_instance())
    }

    /// Shallow-copy `source` into this object. Copying an object onto itself is a no-op.
    pub fn shallow_copy_from(&self, source: &DataObjectRef) {
        if self.ptr_eq(source) {
            return;
        }
        let src = source.read();
        self.write().shallow_copy(&**src);
    }

    /// New instance of the same type sharing this object's payload.
    pub fn shallow_clone(&self) -> DataObjectRef {
        let copy = self.new_instance();
        copy.shallow_copy_from(self);
        copy
    }

    pub fn ptr_eq(&self, other: &DataObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Run `f` against the concrete type, if it matches.
    pub fn with<T: 'static, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let guard = self.read();
        guard.as_any().downcast_ref::<T>().map(f)
    }
}

impl PartialEq for DataObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for DataObjectRef {}

impl fmt::Debug for DataObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_read() {
            Some(guard) => write!(f, "DataObjectRef({:?})", guard),
            None => write!(f, "DataObjectRef(<locked>)"),
        }
    }
}
