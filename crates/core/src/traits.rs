//! Collaborator traits
//!
//! The archivist depends on these seams rather than on concrete
//! implementations:
//! - `HistoryStore` / `StoredHistory`: append-only snapshot sequences
//! - `ReferenceClassifier`: which attributes are references and how they
//!   are merged on retrieval
//! - `EdgeClassifier`: per-edge decision taken during the clone traversal
//! - `HistoryIdIssuer`: issues history identities on first registration

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::StorageResult;
use crate::object::{DetachedObject, ObjectGraph};
use crate::reference::{AttrPath, AttributeAdapter};
use crate::snapshot::{ReferencedData, Snapshot, StoreReceipt};
use crate::timestamp::Timestamp;
use crate::types::{HistoryId, ObjectId, VersionSelector};
use crate::value::Value;

/// Append-only store of snapshot sequences keyed by history identity
///
/// Thread safety: all methods may be called concurrently. An append must
/// be atomic: a concurrent reader observes the history either before or
/// after it, never a partial snapshot.
pub trait HistoryStore: Send + Sync {
    /// Check if a history exists for the identity
    fn is_registered(&self, history_id: &HistoryId) -> bool;

    /// Create the history with its first snapshot
    ///
    /// # Errors
    ///
    /// `StorageError::AlreadyRegistered` if the history exists,
    /// `StorageError::Conflict` if the snapshot is not stamped with
    /// version 0.
    fn register(&self, history_id: &HistoryId, snapshot: &Snapshot) -> StorageResult<StoreReceipt>;

    /// Append a snapshot to an existing history
    ///
    /// # Errors
    ///
    /// `StorageError::Unregistered` if the history does not exist,
    /// `StorageError::Conflict` if the snapshot's version id is not the
    /// next free ordinal.
    fn save(&self, history_id: &HistoryId, snapshot: &Snapshot) -> StorageResult<StoreReceipt>;

    /// Read-only view over a history
    ///
    /// # Errors
    ///
    /// `StorageError::Unregistered` if the history does not exist.
    fn get_history(&self, history_id: &HistoryId) -> StorageResult<Arc<dyn StoredHistory>>;

    /// Modification stamp recorded in the selected snapshot
    ///
    /// # Errors
    ///
    /// `StorageError::Unregistered` or `StorageError::Retrieve`.
    fn modification_date(
        &self,
        history_id: &HistoryId,
        selector: VersionSelector,
    ) -> StorageResult<Timestamp>;
}

/// Read-only, indexable view over one history
pub trait StoredHistory: Send + Sync {
    /// Identity of the history
    fn history_id(&self) -> HistoryId;

    /// Number of snapshots
    fn len(&self) -> u64;

    /// Check if the history holds no snapshots
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetch a snapshot
    ///
    /// Every call returns a structurally independent copy; mutating it
    /// never affects the store.
    ///
    /// # Errors
    ///
    /// `StorageError::Retrieve` if the selector has no snapshot. Iteration
    /// uses this as its end-of-sequence signal.
    fn get(&self, selector: VersionSelector) -> StorageResult<Snapshot>;
}

/// What the clone traversal does with one outgoing edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeDisposition {
    /// Copy the target into the clone
    Follow,
    /// Cut the edge; the target is saved together with the referrer
    Inside,
    /// Cut the edge; the target is not touched by this save
    Outside,
}

/// Strategy invoked per outgoing `Ref` before the clone descends into it
pub trait EdgeClassifier {
    /// Classify the edge `parent.path -> target`
    fn classify(
        &self,
        graph: &ObjectGraph,
        parent: ObjectId,
        path: &AttrPath,
        target: ObjectId,
    ) -> EdgeDisposition;
}

/// Additional references reported by a before-save hook
///
/// Adapters address edges of the clone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedRefs {
    /// Edges to objects versioned together with the referrer
    pub inside_refs: Vec<AttributeAdapter>,
    /// Edges to objects outside the snapshot
    pub outside_refs: Vec<AttributeAdapter>,
}

impl ClassifiedRefs {
    /// Append another hook's result
    pub fn extend(&mut self, other: ClassifiedRefs) {
        self.inside_refs.extend(other.inside_refs);
        self.outside_refs.extend(other.outside_refs);
    }
}

/// Result of the post-retrieve hook
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrieveOutcome {
    /// Edges of the working copy that do not exist in the retrieved version
    pub refs_to_be_deleted: Vec<AttributeAdapter>,
    /// Edges of the reconstruction that were merged with live state
    pub attr_handling_references: Vec<AttributeAdapter>,
    /// Live values of the preserve list, captured before any merge
    pub preserved_data: BTreeMap<String, Value>,
}

impl RetrieveOutcome {
    /// Append another hook's result
    ///
    /// Preserved values already present are kept.
    pub fn extend(&mut self, other: RetrieveOutcome) {
        self.refs_to_be_deleted.extend(other.refs_to_be_deleted);
        self.attr_handling_references
            .extend(other.attr_handling_references);
        for (name, value) in other.preserved_data {
            self.preserved_data.entry(name).or_insert(value);
        }
    }
}

/// Policy deciding which attributes are references and how they are merged
pub trait ReferenceClassifier: Send + Sync {
    /// Attributes excluded from the clone and stored as referenced data
    fn referenced_attributes(&self, graph: &ObjectGraph, obj: ObjectId) -> ReferencedData;

    /// Edge classifier for the clone of `obj`, if any policy applies
    ///
    /// Without one every edge is followed.
    fn clone_hooks<'a>(
        &'a self,
        graph: &'a ObjectGraph,
        obj: ObjectId,
    ) -> Option<Box<dyn EdgeClassifier + 'a>>;

    /// Adjust the clone before it is stored
    fn before_save(
        &self,
        graph: &ObjectGraph,
        obj: ObjectId,
        clone: &mut DetachedObject,
    ) -> ClassifiedRefs;

    /// Put referenced data back onto a reconstructed object
    fn reattach_referenced_attributes(
        &self,
        clone: &mut DetachedObject,
        referenced_data: &ReferencedData,
    );

    /// Merge a reconstruction with the live working copy
    ///
    /// `live` is `None` when retrieving by history identity and no working
    /// copy exists in the graph.
    fn after_retrieve(
        &self,
        graph: &ObjectGraph,
        live: Option<ObjectId>,
        clone: &mut DetachedObject,
        preserve: &[String],
    ) -> RetrieveOutcome;
}

/// Issues history identities
pub trait HistoryIdIssuer: Send + Sync {
    /// Identity for `obj`
    ///
    /// Returns the object's existing identity if it carries one.
    fn register(&self, graph: &ObjectGraph, obj: ObjectId) -> HistoryId;
}
