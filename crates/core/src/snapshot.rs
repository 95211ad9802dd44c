//! Snapshot types
//!
//! - `ObjectData`: an object plus the edges cut out of it, split by kind
//! - `Snapshot`: what a history store keeps per ordinal
//! - `StoreReceipt`: acknowledgement of a successful append

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::metadata::Metadata;
use crate::object::DetachedObject;
use crate::reference::AttributeAdapter;
use crate::timestamp::Timestamp;
use crate::types::HistoryId;
use crate::value::Value;

/// Attributes held outside the clone, by name
pub type ReferencedData = BTreeMap<String, Value>;

/// An object together with its inside and outside references
///
/// `O` is `ObjectId` for a working copy and [`DetachedObject`] for a clone
/// or a reconstruction. The adapters address edges of `object`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectData<O> {
    /// The object
    pub object: O,
    /// Edges to objects versioned together with this one
    pub inside_refs: Vec<AttributeAdapter>,
    /// Edges to objects outside this snapshot
    pub outside_refs: Vec<AttributeAdapter>,
}

impl<O> ObjectData<O> {
    /// Object with no cut edges
    pub fn new(object: O) -> Self {
        Self {
            object,
            inside_refs: Vec::new(),
            outside_refs: Vec::new(),
        }
    }

    /// Object with cut edges
    pub fn with_refs(
        object: O,
        inside_refs: Vec<AttributeAdapter>,
        outside_refs: Vec<AttributeAdapter>,
    ) -> Self {
        Self {
            object,
            inside_refs,
            outside_refs,
        }
    }
}

/// One stored state of an object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// The clone with its cut edges
    pub clone: ObjectData<DetachedObject>,
    /// Attributes stored outside the clone
    pub referenced_data: ReferencedData,
    /// Metadata envelope
    pub metadata: Metadata,
}

impl Snapshot {
    /// Version id stamped on the clone
    pub fn version_id(&self) -> Option<u64> {
        self.clone.object.object().versioning.version_id
    }

    /// Modification stamp the clone carried when it was taken
    pub fn modified(&self) -> Timestamp {
        self.clone.object.object().modified()
    }
}

/// Acknowledgement of an append
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreReceipt {
    /// History appended to
    pub history_id: HistoryId,
    /// Ordinal of the new snapshot
    pub version_id: u64,
    /// Time of the append
    pub timestamp: Timestamp,
}
