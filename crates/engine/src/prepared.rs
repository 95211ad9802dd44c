//! Pending save produced by `Archivist::prepare`

use std::sync::atomic::{AtomicBool, Ordering};

use archivist_core::{
    ArchivistError, ArchivistResult, DetachedObject, HistoryId, Metadata, ObjectData,
    ObjectGraph, ObjectId, ReferencedData, Snapshot,
};

/// Everything needed to write one snapshot
///
/// Built once by `prepare` and consumed by `register` or `save`. The only
/// state that changes afterwards is the registration flag, which flips at
/// most once.
#[derive(Debug)]
pub struct PreparedObject {
    /// History the snapshot belongs to
    pub history_id: HistoryId,
    /// The working copy and its cut edges
    pub original: ObjectData<ObjectId>,
    /// The clone and its cut edges
    pub clone: ObjectData<DetachedObject>,
    /// Attributes stored outside the clone
    pub referenced_data: ReferencedData,
    /// Metadata envelope
    pub metadata: Metadata,
    registered: AtomicBool,
}

impl PreparedObject {
    pub(crate) fn new(
        history_id: HistoryId,
        original: ObjectData<ObjectId>,
        clone: ObjectData<DetachedObject>,
        referenced_data: ReferencedData,
        metadata: Metadata,
        is_registered: bool,
    ) -> Self {
        Self {
            history_id,
            original,
            clone,
            referenced_data,
            metadata,
            registered: AtomicBool::new(is_registered),
        }
    }

    /// Check if the history exists
    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::Acquire)
    }

    /// Version id stamped on the clone
    pub fn version_id(&self) -> Option<u64> {
        self.clone.object.object().versioning.version_id
    }

    /// The working copy
    pub fn object(&self) -> ObjectId {
        self.original.object
    }

    /// Snapshot to hand to the store
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            clone: self.clone.clone(),
            referenced_data: self.referenced_data.clone(),
            metadata: self.metadata.clone(),
        }
    }

    /// Copy the clone's version id onto the working copy
    ///
    /// # Errors
    ///
    /// `ObjectNotFound` if the working copy no longer exists.
    pub fn copy_version_id_from_clone(&self, graph: &mut ObjectGraph) -> ArchivistResult<()> {
        let obj = graph
            .get_mut(self.original.object)
            .ok_or(ArchivistError::ObjectNotFound(self.original.object))?;
        obj.versioning.version_id = self.version_id();
        Ok(())
    }

    /// Flip the flag from unregistered to registered
    ///
    /// Returns `false` if it was already set, so only one caller writes the
    /// first snapshot.
    pub(crate) fn claim_registration(&self) -> bool {
        self.registered
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Undo a claim whose store write failed
    pub(crate) fn release_registration(&self) {
        self.registered.store(false, Ordering::Release);
    }
}
