//! Key-value metadata carried between executives.
//!
//! `Information` is a plain map from opaque [`InfoKey`] tokens to typed
//! [`InfoValue`]s. Executives exchange it through [`SharedInformation`]
//! handles: a consumer's per-connection input information is the very same
//! handle as the producer's output information, so anything one side writes
//! is visible to the other without copying.

use crate::data::DataObjectRef;
use parking_lot::{Mutex, MutexGuard};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Opaque metadata key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct InfoKey(pub &'static str);

impl fmt::Display for InfoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Keys understood by the executives.
pub mod keys {
    use super::InfoKey;

    /// Output data object of a port.
    pub const DATA_OBJECT: InfoKey = InfoKey("DATA_OBJECT");

    pub const WHOLE_EXTENT: InfoKey = InfoKey("WHOLE_EXTENT");
    pub const UPDATE_EXTENT: InfoKey = InfoKey("UPDATE_EXTENT");
    /// Set when the update extent was chosen by a caller rather than defaulted.
    pub const UPDATE_EXTENT_INITIALIZED: InfoKey = InfoKey("UPDATE_EXTENT_INITIALIZED");
    pub const UPDATE_PIECE_NUMBER: InfoKey = InfoKey("UPDATE_PIECE_NUMBER");
    pub const UPDATE_NUMBER_OF_PIECES: InfoKey = InfoKey("UPDATE_NUMBER_OF_PIECES");
    pub const UPDATE_NUMBER_OF_GHOST_LEVELS: InfoKey = InfoKey("UPDATE_NUMBER_OF_GHOST_LEVELS");
    pub const UPDATE_TIME_STEP: InfoKey = InfoKey("UPDATE_TIME_STEP");
    /// Sorted flat indices of the composite blocks a consumer asks for.
    pub const UPDATE_COMPOSITE_INDICES: InfoKey = InfoKey("UPDATE_COMPOSITE_INDICES");

    pub const DATA_EXTENT: InfoKey = InfoKey("DATA_EXTENT");
    pub const DATA_PIECE_NUMBER: InfoKey = InfoKey("DATA_PIECE_NUMBER");
    pub const DATA_NUMBER_OF_PIECES: InfoKey = InfoKey("DATA_NUMBER_OF_PIECES");
    pub const DATA_NUMBER_OF_GHOST_LEVELS: InfoKey = InfoKey("DATA_NUMBER_OF_GHOST_LEVELS");
    pub const DATA_TIME_STEP: InfoKey = InfoKey("DATA_TIME_STEP");
    /// Sorted flat indices of the composite blocks last delivered.
    pub const DATA_COMPOSITE_INDICES: InfoKey = InfoKey("DATA_COMPOSITE_INDICES");

    pub const TIME_STEPS: InfoKey = InfoKey("TIME_STEPS");

    pub const PIPELINE_MODIFIED_TIME: InfoKey = InfoKey("PIPELINE_MODIFIED_TIME");
    pub const DATA_UPDATE_TIME: InfoKey = InfoKey("DATA_UPDATE_TIME");
    pub const DATA_GENERATED: InfoKey = InfoKey("DATA_GENERATED");
    pub const DATA_ABORTED: InfoKey = InfoKey("DATA_ABORTED");
}

/// A typed metadata value.
#[derive(Debug, Clone, PartialEq)]
pub enum InfoValue {
    Integer(i64),
    IntegerVector(Vec<i64>),
    Double(f64),
    DoubleVector(Vec<f64>),
    Extent([i32; 6]),
    String(String),
    DataObject(DataObjectRef),
}

impl From<i64> for InfoValue {
    fn from(v: i64) -> Self {
        InfoValue::Integer(v)
    }
}

impl From<i32> for InfoValue {
    fn from(v: i32) -> Self {
        InfoValue::Integer(v as i64)
    }
}

impl From<bool> for InfoValue {
    fn from(v: bool) -> Self {
        InfoValue::Integer(v as i64)
    }
}

impl From<Vec<i64>> for InfoValue {
    fn from(v: Vec<i64>) -> Self {
        InfoValue::IntegerVector(v)
    }
}

impl From<f64> for InfoValue {
    fn from(v: f64) -> Self {
        InfoValue::Double(v)
    }
}

impl From<Vec<f64>> for InfoValue {
    fn from(v: Vec<f64>) -> Self {
        InfoValue::DoubleVector(v)
    }
}

impl From<[i32; 6]> for InfoValue {
    fn from(v: [i32; 6]) -> Self {
        InfoValue::Extent(v)
    }
}

impl From<String> for InfoValue {
    fn from(v: String) -> Self {
        InfoValue::String(v)
    }
}

impl From<&str> for InfoValue {
    fn from(v: &str) -> Self {
        InfoValue::String(v.to_string())
    }
}

impl From<DataObjectRef> for InfoValue {
    fn from(v: DataObjectRef) -> Self {
        InfoValue::DataObject(v)
    }
}

/// A metadata map. Cloning copies entries; data objects stay shared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Information {
    entries: BTreeMap<InfoKey, InfoValue>,
}

impl Information {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: InfoKey) -> Option<&InfoValue> {
        self.entries.get(&key)
    }

    pub fn set(&mut self, key: InfoKey, value: impl Into<InfoValue>) {
        self.entries.insert(key, value.into());
    }

    pub fn has(&self, key: InfoKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn remove(&mut self, key: InfoKey) -> Option<InfoValue> {
        self.entries.remove(&key)
    }

    /// Copy `key` from `other`. A key absent in `other` is removed here.
    pub fn copy_entry(&mut self, other: &Information, key: InfoKey) {
        match other.get(key) {
            Some(value) => {
                self.entries.insert(key, value.clone());
            }
            None => {
                self.entries.remove(&key);
            }
        }
    }

    pub fn get_integer(&self, key: InfoKey) -> Option<i64> {
        match self.get(key) {
            Some(InfoValue::Integer(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_flag(&self, key: InfoKey) -> bool {
        self.get_integer(key).is_some_and(|v| v != 0)
    }

    pub fn get_integer_vector(&self, key: InfoKey) -> Option<&[i64]> {
        match self.get(key) {
            Some(InfoValue::IntegerVector(v)) => Some(v),
            _ => None,
        }
    }

    pub fn get_double(&self, key: InfoKey) -> Option<f64> {
        match self.get(key) {
            Some(InfoValue::Double(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_double_vector(&self, key: InfoKey) -> Option<&[f64]> {
        match self.get(key) {
            Some(InfoValue::DoubleVector(v)) => Some(v),
            _ => None,
        }
    }

    pub fn get_extent(&self, key: InfoKey) -> Option<[i32; 6]> {
        match self.get(key) {
            Some(InfoValue::Extent(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_string(&self, key: InfoKey) -> Option<&str> {
        match self.get(key) {
            Some(InfoValue::String(v)) => Some(v),
            _ => None,
        }
    }

    pub fn get_data_object(&self, key: InfoKey) -> Option<DataObjectRef> {
        match self.get(key) {
            Some(InfoValue::DataObject(v)) => Some(v.clone()),
            _ => None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = InfoKey> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Shared handle to an [`Information`].
///
/// `Clone` shares the handle; use [`SharedInformation::deep_clone`] for an
/// independent copy. Locks are short-lived and never nested.
#[derive(Clone, Default)]
pub struct SharedInformation(Arc<Mutex<Information>>);

impl SharedInformation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_info(info: Information) -> Self {
        Self(Arc::new(Mutex::new(info)))
    }

    pub fn lock(&self) -> MutexGuard<'_, Information> {
        self.0.lock()
    }

    pub fn get(&self, key: InfoKey) -> Option<InfoValue> {
        self.lock().get(key).cloned()
    }

    pub fn set(&self, key: InfoKey, value: impl Into<InfoValue>) {
        self.lock().set(key, value);
    }

    pub fn has(&self, key: InfoKey) -> bool {
        self.lock().has(key)
    }

    pub fn remove(&self, key: InfoKey) -> Option<InfoValue> {
        self.lock().remove(key)
    }

    pub fn get_integer(&self, key: InfoKey) -> Option<i64> {
        self.lock().get_integer(key)
    }

    pub fn get_extent(&self, key: InfoKey) -> Option<[i32; 6]> {
        self.lock().get_extent(key)
    }

    pub fn get_integer_vector(&self, key: InfoKey) -> Option<Vec<i64>> {
        self.lock().get_integer_vector(key).map(<[i64]>::to_vec)
    }

    pub fn data_object(&self) -> Option<DataObjectRef> {
        self.lock().get_data_object(keys::DATA_OBJECT)
    }

    pub fn set_data_object(&self, object: Option<DataObjectRef>) {
        let mut info = self.lock();
        match object {
            Some(object) => info.set(keys::DATA_OBJECT, object),
            None => {
                info.remove(keys::DATA_OBJECT);
            }
        }
    }

    /// Copy of the current entries.
    pub fn snapshot(&self) -> Information {
        self.lock().clone()
    }

    /// Independent handle with the same entries.
    pub fn deep_clone(&self) -> SharedInformation {
        SharedInformation::from_info(self.snapshot())
    }

    pub fn ptr_eq(&self, other: &SharedInformation) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Copy `keys` from `source`. Copying a handle onto itself is a no-op.
    pub fn copy_entries_from(&self, source: &SharedInformation, keys: &[InfoKey]) {
        if self.ptr_eq(source) {
            return;
        }
        let src = source.snapshot();
        let mut dst = self.lock();
        for &key in keys {
            dst.copy_entry(&src, key);
        }
    }
}

impl fmt::Debug for SharedInformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_lock() {
            Some(info) => write!(f, "SharedInformation({:?})", *info),
            None => write!(f, "SharedInformation(<locked>)"),
        }
    }
}

/// One information handle per port (outputs) or per connection (inputs).
///
/// `Clone` shares the handles.
#[derive(Debug, Clone, Default)]
pub struct InformationVector {
    items: Vec<SharedInformation>,
}

impl InformationVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Vector of `len` fresh, empty handles.
    pub fn with_len(len: usize) -> Self {
        Self {
            items: (0..len).map(|_| SharedInformation::new()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SharedInformation> {
        self.items.get(index)
    }

    pub fn push(&mut self, info: SharedInformation) {
        self.items.push(info);
    }

    pub fn insert(&mut self, index: usize, info: SharedInformation) {
        self.items.insert(index, info);
    }

    pub fn remove(&mut self, index: usize) -> SharedInformation {
        self.items.remove(index)
    }

    pub fn set(&mut self, index: usize, info: SharedInformation) {
        self.items[index] = info;
    }

    /// Grow with fresh handles or shrink to `len`.
    pub fn resize(&mut self, len: usize) {
        if len < self.items.len() {
            self.items.truncate(len);
        } else {
            while self.items.len() < len {
                self.items.push(SharedInformation::new());
            }
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SharedInformation> {
        self.items.iter()
    }

    /// Independent copies of every handle.
    pub fn deep_clone(&self) -> InformationVector {
        Self {
            items: self.items.iter().map(SharedInformation::deep_clone).collect(),
        }
    }
}

impl<'a> IntoIterator for &'a InformationVector {
    type Item = &'a SharedInformation;
    type IntoIter = std::slice::Iter<'a, SharedInformation>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
