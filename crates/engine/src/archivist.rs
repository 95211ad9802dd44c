//! The archivist: prepare, register, save and retrieve
//!
//! ## Lifecycle of an object
//!
//! ```text
//! Unregistered --prepare+register--> Registered --prepare+save--> Registered
//! ```
//!
//! There is no way back to unregistered. `prepare` has no storage side
//! effects; `register` writes the first snapshot of a history and `save`
//! appends every later one.
//!
//! ## Concurrency
//!
//! Writes to one history must be serialized. Callers hold the guard from
//! `lock` across a prepare and the following register or save. The store
//! additionally rejects any snapshot whose version id is not the next free
//! ordinal, so a missed lock surfaces as `StorageError::Conflict` instead
//! of a corrupted history.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use archivist_core::{
    ArchivistError, ArchivistResult, ClassifiedRefs, DetachedObject, HistoryId, HistoryIdIssuer,
    HistoryStore, Metadata, ObjectData, ObjectGraph, ObjectId, ReferenceClassifier,
    ReferencedData, SecurityContext, StorageError, StoreReceipt, Subject, SysMetadataInput, Value,
    VersionSelector, DEFAULT_LOCATION_ID,
};

use crate::clone::CloneEngine;
use crate::config::ArchivistConfig;
use crate::history::{LazyHistory, VersionData};
use crate::locks::{HistoryGuard, HistoryLocks};
use crate::prepared::PreparedObject;

/// Orchestrates versioning of working copies
pub struct Archivist {
    store: Arc<dyn HistoryStore>,
    classifier: Arc<dyn ReferenceClassifier>,
    issuer: Arc<dyn HistoryIdIssuer>,
    cloner: CloneEngine,
    locks: HistoryLocks,
}

impl Archivist {
    /// Create an archivist with default limits
    pub fn new(
        store: Arc<dyn HistoryStore>,
        classifier: Arc<dyn ReferenceClassifier>,
        issuer: Arc<dyn HistoryIdIssuer>,
    ) -> Self {
        Self::with_config(store, classifier, issuer, &ArchivistConfig::default())
    }

    /// Create an archivist using the limits of `config`
    pub fn with_config(
        store: Arc<dyn HistoryStore>,
        classifier: Arc<dyn ReferenceClassifier>,
        issuer: Arc<dyn HistoryIdIssuer>,
        config: &ArchivistConfig,
    ) -> Self {
        Self {
            store,
            classifier,
            issuer,
            cloner: CloneEngine::new(config.max_clone_nodes),
            locks: HistoryLocks::new(Duration::from_millis(config.lock_timeout_ms)),
        }
    }

    /// The history store
    pub fn store(&self) -> &Arc<dyn HistoryStore> {
        &self.store
    }

    /// The reference classifier
    pub fn classifier(&self) -> &Arc<dyn ReferenceClassifier> {
        &self.classifier
    }

    /// The clone engine
    pub fn cloner(&self) -> &CloneEngine {
        &self.cloner
    }

    /// Enter the write section of a history
    pub fn lock(&self, history_id: &HistoryId) -> ArchivistResult<HistoryGuard> {
        self.locks.acquire(history_id)
    }

    /// Per-history lock table
    pub fn locks(&self) -> &HistoryLocks {
        &self.locks
    }

    /// Prepare a snapshot of `obj`
    ///
    /// An unregistered object gets its history identity here, and its
    /// working copy is stamped with version 0 at location 0. A registered
    /// object's clone is stamped with the current history length.
    ///
    /// # Errors
    ///
    /// `ObjectNotFound`, any clone failure, or `InconsistentClassification`
    /// if the classifier's sets overlap. Nothing is written to the working
    /// copy when an error is returned.
    pub fn prepare(
        &self,
        graph: &mut ObjectGraph,
        obj: ObjectId,
        app_metadata: Value,
        sys_metadata: SysMetadataInput,
        ctx: &SecurityContext,
    ) -> ArchivistResult<PreparedObject> {
        let current = graph.get(obj).ok_or(ArchivistError::ObjectNotFound(obj))?;
        let registered = current
            .versioning
            .history_id
            .filter(|h| self.store.is_registered(h));
        let (history_id, version_id, is_registered) = match registered {
            Some(history_id) => {
                let len = self.store.get_history(&history_id)?.len();
                (history_id, len, true)
            }
            None => (self.issuer.register(graph, obj), 0, false),
        };

        let referenced_data = self.classifier.referenced_attributes(graph, obj);
        let exclude: BTreeSet<String> = referenced_data.keys().cloned().collect();
        let output = {
            let hooks = self.classifier.clone_hooks(graph, obj);
            self.cloner
                .clone_object(graph, obj, &exclude, hooks.as_deref())?
        };

        let mut clone = output.clone;
        let mut clone_refs = output.clone_refs;
        clone_refs.extend(self.classifier.before_save(graph, obj, &mut clone));
        validate_classification(obj, &clone, &clone_refs, &referenced_data)?;

        {
            let root = clone.object_mut();
            root.versioning.history_id = Some(history_id);
            root.versioning.version_id = Some(version_id);
            root.versioning.location_id = Some(DEFAULT_LOCATION_ID);
        }

        if !is_registered {
            if let Some(working) = graph.get_mut(obj) {
                working.versioning.history_id = Some(history_id);
                working.versioning.version_id = Some(0);
                working.versioning.location_id = Some(DEFAULT_LOCATION_ID);
            }
        }

        debug!(
            target: "archivist::prepare",
            object = %obj,
            history_id = %history_id,
            version_id,
            is_registered,
            referenced = referenced_data.len(),
            "Object prepared"
        );

        Ok(PreparedObject::new(
            history_id,
            ObjectData::with_refs(
                obj,
                output.original_refs.inside_refs,
                output.original_refs.outside_refs,
            ),
            ObjectData::with_refs(clone, clone_refs.inside_refs, clone_refs.outside_refs),
            referenced_data,
            Metadata::build(sys_metadata, app_metadata, ctx),
            is_registered,
        ))
    }

    /// Write the first snapshot of a history
    ///
    /// Returns `None` without touching the store if the prepared object is
    /// already registered; later snapshots go through `save`.
    pub fn register(&self, prepared: &PreparedObject) -> ArchivistResult<Option<StoreReceipt>> {
        if !prepared.claim_registration() {
            return Ok(None);
        }
        match self
            .store
            .register(&prepared.history_id, &prepared.snapshot())
        {
            Ok(receipt) => {
                info!(
                    target: "archivist::save",
                    object = %prepared.object(),
                    history_id = %prepared.history_id,
                    "Object registered"
                );
                Ok(Some(receipt))
            }
            Err(e) => {
                prepared.release_registration();
                Err(ArchivistError::Register {
                    subject: Subject::Object(prepared.object()),
                    source: e,
                })
            }
        }
    }

    /// Append a snapshot
    ///
    /// An unregistered object is registered if `autoregister` is set.
    ///
    /// # Errors
    ///
    /// `ArchivistError::Save` for an unregistered object without
    /// `autoregister`; store failures otherwise.
    pub fn save(
        &self,
        prepared: &PreparedObject,
        autoregister: bool,
    ) -> ArchivistResult<StoreReceipt> {
        if !prepared.is_registered() {
            if !autoregister {
                return Err(ArchivistError::Save {
                    object: prepared.object(),
                });
            }
            // a concurrent register on the same prepared object won the claim
            return self.register(prepared)?.ok_or(ArchivistError::Register {
                subject: Subject::Object(prepared.object()),
                source: StorageError::AlreadyRegistered {
                    history_id: prepared.history_id,
                },
            });
        }
        let receipt = self
            .store
            .save(&prepared.history_id, &prepared.snapshot())?;
        info!(
            target: "archivist::save",
            object = %prepared.object(),
            history_id = %prepared.history_id,
            version_id = receipt.version_id,
            "Version saved"
        );
        Ok(receipt)
    }

    /// Check if the working copy is unchanged since the selected version
    ///
    /// A history without a working copy in `graph` is never up to date.
    pub fn is_up_to_date(
        &self,
        graph: &ObjectGraph,
        subject: impl Into<Subject>,
        selector: VersionSelector,
    ) -> ArchivistResult<bool> {
        let subject = subject.into();
        let (history_id, live) = self.resolve(graph, subject)?;
        let stored = self
            .store
            .modification_date(&history_id, selector)
            .map_err(|e| range_error(e, subject, selector))?;
        Ok(live
            .and_then(|id| graph.get(id))
            .map_or(false, |obj| obj.modified() == stored))
    }

    /// Reconstruct one version
    pub fn retrieve(
        &self,
        graph: &ObjectGraph,
        subject: impl Into<Subject>,
        selector: VersionSelector,
        preserve: &[String],
    ) -> ArchivistResult<VersionData> {
        let subject = subject.into();
        let version = self.get_history(graph, subject, preserve)?.at(selector)?;
        debug!(
            target: "archivist::retrieve",
            subject = %subject,
            selector = %selector,
            "Version retrieved"
        );
        Ok(version)
    }

    /// Lazy view over a history
    ///
    /// # Errors
    ///
    /// `ArchivistError::Unregistered` if the subject has no history.
    pub fn get_history<'g>(
        &self,
        graph: &'g ObjectGraph,
        subject: impl Into<Subject>,
        preserve: &[String],
    ) -> ArchivistResult<LazyHistory<'g>> {
        let subject = subject.into();
        let (history_id, live) = self.resolve(graph, subject)?;
        let stored = self.store.get_history(&history_id).map_err(|e| match e {
            StorageError::Unregistered { .. } => ArchivistError::Unregistered { subject },
            other => ArchivistError::Storage(other),
        })?;
        Ok(LazyHistory::new(
            graph,
            live,
            subject,
            preserve,
            stored,
            Arc::clone(&self.classifier),
        ))
    }

    /// Like `get_history`, but an unregistered subject yields an empty
    /// history
    pub fn query_history<'g>(
        &self,
        graph: &'g ObjectGraph,
        subject: impl Into<Subject>,
        preserve: &[String],
    ) -> ArchivistResult<LazyHistory<'g>> {
        let subject = subject.into();
        let empty = LazyHistory::empty(graph, subject, Arc::clone(&self.classifier));
        self.query_history_or(graph, subject, preserve, empty)
    }

    /// Like `get_history`, but an unregistered subject yields `default`
    pub fn query_history_or<'g>(
        &self,
        graph: &'g ObjectGraph,
        subject: impl Into<Subject>,
        preserve: &[String],
        default: LazyHistory<'g>,
    ) -> ArchivistResult<LazyHistory<'g>> {
        match self.get_history(graph, subject, preserve) {
            Err(e) if e.is_unregistered() => Ok(default),
            other => other,
        }
    }

    /// Cut edges of `obj` under the current policy, addressed in `graph`
    pub fn scan_cut_edges(
        &self,
        graph: &ObjectGraph,
        obj: ObjectId,
    ) -> ArchivistResult<ClassifiedRefs> {
        let exclude: BTreeSet<String> = self
            .classifier
            .referenced_attributes(graph, obj)
            .into_keys()
            .collect();
        let hooks = self.classifier.clone_hooks(graph, obj);
        self.cloner
            .scan_cut_edges(graph, obj, &exclude, hooks.as_deref())
    }

    /// History identity and working copy of a subject
    fn resolve(
        &self,
        graph: &ObjectGraph,
        subject: Subject,
    ) -> ArchivistResult<(HistoryId, Option<ObjectId>)> {
        let (history_id, live) = match subject {
            Subject::Object(id) => {
                let obj = graph.get(id).ok_or(ArchivistError::ObjectNotFound(id))?;
                let history_id = obj
                    .versioning
                    .history_id
                    .ok_or(ArchivistError::Unregistered { subject })?;
                (history_id, Some(id))
            }
            Subject::History(history_id) => (history_id, graph.find_by_history(&history_id)),
        };
        if !self.store.is_registered(&history_id) {
            return Err(ArchivistError::Unregistered { subject });
        }
        Ok((history_id, live))
    }
}

impl std::fmt::Debug for Archivist {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archivist")
            .field("cloner", &self.cloner)
            .field("locks", &self.locks)
            .finish()
    }
}

fn range_error(e: StorageError, subject: Subject, selector: VersionSelector) -> ArchivistError {
    match e {
        StorageError::Retrieve { .. } => ArchivistError::Retrieve { subject, selector },
        StorageError::Unregistered { .. } => ArchivistError::Unregistered { subject },
        other => ArchivistError::Storage(other),
    }
}

/// Reject overlapping classifications
///
/// An owner attribute may not be cut both as inside and as outside
/// reference, and referenced data may not also be cloned inline.
fn validate_classification(
    obj: ObjectId,
    clone: &DetachedObject,
    refs: &ClassifiedRefs,
    referenced_data: &ReferencedData,
) -> ArchivistResult<()> {
    for name in referenced_data.keys() {
        if clone.object().has(name) {
            return Err(ArchivistError::InconsistentClassification {
                object: obj,
                path: name.clone(),
                detail: "stored both inline and as referenced data".to_string(),
            });
        }
    }
    let inside: HashSet<(ObjectId, &str)> = refs
        .inside_refs
        .iter()
        .map(|a| (a.parent, a.attribute_name()))
        .collect();
    if let Some(overlap) = refs
        .outside_refs
        .iter()
        .find(|a| inside.contains(&(a.parent, a.attribute_name())))
    {
        return Err(ArchivistError::InconsistentClassification {
            object: obj,
            path: overlap.path.to_string(),
            detail: "attribute holds both inside and outside references".to_string(),
        });
    }
    Ok(())
}
