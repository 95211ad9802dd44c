//! Lazy history and version reconstruction
//!
//! A `LazyHistory` is a read-through view: every access fetches the
//! snapshot from the store again and rebuilds it, because the preserve
//! list and the live working copy may differ between callers.
//!
//! Reconstruction order for one snapshot:
//! 1. fetch (a fresh, independent copy of the stored clone and metadata)
//! 2. reattach referenced data
//! 3. run the post-retrieve hook against the live working copy

use std::sync::Arc;
use tracing::debug;

use archivist_core::{
    ArchivistError, ArchivistResult, AttributeAdapter, DetachedObject, HistoryId, ObjectData,
    ObjectGraph, ObjectId, ReferenceClassifier, StorageError, StoredHistory, Subject, SysMetadata,
    Value, VersionSelector,
};
use std::collections::BTreeMap;

/// One reconstructed version
#[derive(Debug, Clone)]
pub struct VersionData {
    /// The reconstruction and its cut edges
    pub data: ObjectData<DetachedObject>,
    /// Edges of the working copy that do not exist in this version
    pub refs_to_be_deleted: Vec<AttributeAdapter>,
    /// Edges of the reconstruction merged with live state
    pub attr_handling_references: Vec<AttributeAdapter>,
    /// Live values of the preserve list, captured before any merge
    pub preserved_data: BTreeMap<String, Value>,
    /// System metadata
    pub sys_metadata: SysMetadata,
    /// Application metadata
    pub app_metadata: Value,
}

impl VersionData {
    /// The reconstructed object
    pub fn object(&self) -> &DetachedObject {
        &self.data.object
    }

    /// Version id of the reconstruction
    pub fn version_id(&self) -> Option<u64> {
        self.data.object.object().versioning.version_id
    }
}

/// Ordered, indexable view over one history
pub struct LazyHistory<'g> {
    graph: &'g ObjectGraph,
    live: Option<ObjectId>,
    subject: Subject,
    preserve: Vec<String>,
    stored: Option<Arc<dyn StoredHistory>>,
    classifier: Arc<dyn ReferenceClassifier>,
}

impl<'g> LazyHistory<'g> {
    pub(crate) fn new(
        graph: &'g ObjectGraph,
        live: Option<ObjectId>,
        subject: Subject,
        preserve: &[String],
        stored: Arc<dyn StoredHistory>,
        classifier: Arc<dyn ReferenceClassifier>,
    ) -> Self {
        Self {
            graph,
            live,
            subject,
            preserve: preserve.to_vec(),
            stored: Some(stored),
            classifier,
        }
    }

    /// History with no versions
    pub(crate) fn empty(
        graph: &'g ObjectGraph,
        subject: Subject,
        classifier: Arc<dyn ReferenceClassifier>,
    ) -> Self {
        Self {
            graph,
            live: None,
            subject,
            preserve: Vec::new(),
            stored: None,
            classifier,
        }
    }

    /// Identity of the history; `None` for an empty stand-in
    pub fn history_id(&self) -> Option<HistoryId> {
        self.stored.as_ref().map(|s| s.history_id())
    }

    /// Number of versions
    pub fn len(&self) -> u64 {
        self.stored.as_ref().map_or(0, |s| s.len())
    }

    /// Check if there are no versions
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reconstruct the selected version
    ///
    /// # Errors
    ///
    /// `ArchivistError::Retrieve` if the selector has no snapshot; other
    /// store failures are wrapped as `ArchivistError::Storage`.
    pub fn at(&self, selector: VersionSelector) -> ArchivistResult<VersionData> {
        let out_of_range = ArchivistError::Retrieve {
            subject: self.subject,
            selector,
        };
        let Some(stored) = self.stored.as_ref() else {
            return Err(out_of_range);
        };
        let snapshot = stored.get(selector).map_err(|e| match e {
            StorageError::Retrieve { .. } => out_of_range,
            other => ArchivistError::Storage(other),
        })?;

        let ObjectData {
            object: mut reconstructed,
            inside_refs,
            outside_refs,
        } = snapshot.clone;
        self.classifier
            .reattach_referenced_attributes(&mut reconstructed, &snapshot.referenced_data);
        let outcome =
            self.classifier
                .after_retrieve(self.graph, self.live, &mut reconstructed, &self.preserve);

        debug!(
            target: "archivist::retrieve",
            subject = %self.subject,
            selector = %selector,
            to_delete = outcome.refs_to_be_deleted.len(),
            preserved = outcome.preserved_data.len(),
            "Version reconstructed"
        );

        Ok(VersionData {
            data: ObjectData::with_refs(reconstructed, inside_refs, outside_refs),
            refs_to_be_deleted: outcome.refs_to_be_deleted,
            attr_handling_references: outcome.attr_handling_references,
            preserved_data: outcome.preserved_data,
            sys_metadata: snapshot.metadata.sys_metadata,
            app_metadata: snapshot.metadata.app_metadata,
        })
    }

    /// Iterate versions from the oldest
    pub fn iter(&self) -> HistoryIter<'_, 'g> {
        HistoryIter {
            history: self,
            next: 0,
            done: false,
        }
    }
}

impl std::fmt::Debug for LazyHistory<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyHistory")
            .field("subject", &self.subject)
            .field("len", &self.len())
            .field("preserve", &self.preserve)
            .finish()
    }
}

/// Forward iterator over a `LazyHistory`
///
/// Ends when the store reports that the next index has no snapshot. A
/// store failure is yielded once and ends the iteration. To start over,
/// create a new iterator.
pub struct HistoryIter<'h, 'g> {
    history: &'h LazyHistory<'g>,
    next: u64,
    done: bool,
}

impl Iterator for HistoryIter<'_, '_> {
    type Item = ArchivistResult<VersionData>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.history.at(VersionSelector::Index(self.next)) {
            Ok(version) => {
                self.next += 1;
                Some(Ok(version))
            }
            Err(e) if e.is_retrieve_range() => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<'h, 'g> IntoIterator for &'h LazyHistory<'g> {
    type Item = ArchivistResult<VersionData>;
    type IntoIter = HistoryIter<'h, 'g>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
