//! Repository: versioning of whole content trees
//!
//! `Archivist` versions one object at a time. The repository walks inside
//! references so that owned sub-objects are saved before the object that
//! owns them (the owner's markers then record their fresh version ids) and
//! reverted together with it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

use archivist_core::{
    ArchivistError, ArchivistResult, ContentObject, HistoryStore, ObjectGraph, ObjectId,
    RefMarker, SecurityContext, StoreReceipt, Subject, SysMetadataInput, Value, VersionSelector,
    DEFAULT_LOCATION_ID,
};
use archivist_storage::MemoryHistoryStore;

use crate::archivist::Archivist;
use crate::config::ArchivistConfig;
use crate::history::{LazyHistory, VersionData};
use crate::modifiers::ModifierRegistry;
use crate::uid::UuidIssuer;

/// Type given to a recreated object until its version is restored
const PLACEHOLDER_TYPE: &str = "Content";

/// Versioning front end for content trees
#[derive(Debug)]
pub struct Repository {
    archivist: Archivist,
    config: ArchivistConfig,
}

impl Repository {
    /// Build an in-memory repository from `config`
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the configuration does not validate.
    pub fn new(config: ArchivistConfig) -> ArchivistResult<Self> {
        config.validate()?;
        let store = MemoryHistoryStore::with_codec_id(&config.codec)
            .map_err(|e| ArchivistError::InvalidConfig(e.to_string()))?;
        let registry = ModifierRegistry::from_config(&config.modifiers)?;
        let archivist = Archivist::with_config(
            Arc::new(store),
            Arc::new(registry),
            Arc::new(UuidIssuer),
            &config,
        );
        info!(
            target: "archivist::repository",
            codec = %config.codec,
            autoregister = config.autoregister,
            "Repository created"
        );
        Ok(Self { archivist, config })
    }

    /// Repository over an existing archivist
    pub fn with_parts(archivist: Archivist, config: ArchivistConfig) -> Self {
        Self { archivist, config }
    }

    /// The underlying archivist
    pub fn archivist(&self) -> &Archivist {
        &self.archivist
    }

    /// Active configuration
    pub fn config(&self) -> &ArchivistConfig {
        &self.config
    }

    /// The history store
    pub fn store(&self) -> &Arc<dyn HistoryStore> {
        self.archivist.store()
    }

    /// Put `obj` under version control and write its first version
    ///
    /// Owned sub-objects that are not versioned yet are registered first.
    pub fn apply_version_control(
        &self,
        graph: &mut ObjectGraph,
        obj: ObjectId,
        sys_metadata: SysMetadataInput,
        app_metadata: Value,
        ctx: &SecurityContext,
    ) -> ArchivistResult<StoreReceipt> {
        let mut in_progress = HashSet::new();
        self.save_tree(graph, obj, &sys_metadata, &app_metadata, ctx, true, &mut in_progress)
    }

    /// Save a new version of `obj`
    ///
    /// Owned sub-objects changed since their last version are saved first.
    /// Unregistered objects are registered only if `autoregister` is set
    /// in the configuration.
    pub fn save(
        &self,
        graph: &mut ObjectGraph,
        obj: ObjectId,
        sys_metadata: SysMetadataInput,
        app_metadata: Value,
        ctx: &SecurityContext,
    ) -> ArchivistResult<StoreReceipt> {
        let mut in_progress = HashSet::new();
        self.save_tree(
            graph,
            obj,
            &sys_metadata,
            &app_metadata,
            ctx,
            self.config.autoregister,
            &mut in_progress,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn save_tree(
        &self,
        graph: &mut ObjectGraph,
        obj: ObjectId,
        sys_metadata: &SysMetadataInput,
        app_metadata: &Value,
        ctx: &SecurityContext,
        autoregister: bool,
        in_progress: &mut HashSet<ObjectId>,
    ) -> ArchivistResult<StoreReceipt> {
        in_progress.insert(obj);

        // fail before any inside reference is written to the store
        if !autoregister && !self.is_registered(graph, obj)? {
            return Err(ArchivistError::Save { object: obj });
        }

        let inside: Vec<ObjectId> = self
            .archivist
            .scan_cut_edges(graph, obj)?
            .inside_refs
            .iter()
            .filter_map(|adapter| adapter.get(graph).and_then(Value::as_object_ref))
            .collect();
        for child in inside {
            if in_progress.contains(&child) || !self.needs_save(graph, child)? {
                continue;
            }
            debug!(
                target: "archivist::repository",
                parent = %obj,
                child = %child,
                "Saving inside reference first"
            );
            self.save_tree(graph, child, sys_metadata, app_metadata, ctx, true, in_progress)?;
        }

        let history_id = graph
            .get(obj)
            .ok_or(ArchivistError::ObjectNotFound(obj))?
            .versioning
            .history_id;
        let _guard = history_id.map(|h| self.archivist.lock(&h)).transpose()?;

        let prepared = self.archivist.prepare(
            graph,
            obj,
            app_metadata.clone(),
            sys_metadata.clone(),
            ctx,
        )?;
        let receipt = self.archivist.save(&prepared, autoregister)?;
        prepared.copy_version_id_from_clone(graph)?;

        info!(
            target: "archivist::repository",
            object = %obj,
            history_id = %receipt.history_id,
            version_id = receipt.version_id,
            "Working copy saved"
        );
        Ok(receipt)
    }

    fn is_registered(&self, graph: &ObjectGraph, obj: ObjectId) -> ArchivistResult<bool> {
        let versioning = graph
            .get(obj)
            .ok_or(ArchivistError::ObjectNotFound(obj))?
            .versioning;
        Ok(versioning
            .history_id
            .map_or(false, |h| self.archivist.store().is_registered(&h)))
    }

    fn needs_save(&self, graph: &ObjectGraph, obj: ObjectId) -> ArchivistResult<bool> {
        if !self.is_registered(graph, obj)? {
            return Ok(true);
        }
        Ok(!self
            .archivist
            .is_up_to_date(graph, obj, VersionSelector::Latest)?)
    }

    /// Reconstruct one version without touching the working copy
    pub fn retrieve(
        &self,
        graph: &ObjectGraph,
        subject: impl Into<Subject>,
        selector: VersionSelector,
        preserve: &[String],
    ) -> ArchivistResult<VersionData> {
        self.archivist.retrieve(graph, subject, selector, preserve)
    }

    /// Overwrite the working copy with a stored version
    ///
    /// The working copy keeps its `ObjectId` and history. Attributes named
    /// in `revert_preserve` keep their live values. Owned sub-objects are
    /// reverted to the versions recorded in the selected version, and
    /// recreated if they were deleted; owned sub-objects added since are
    /// removed.
    pub fn revert(
        &self,
        graph: &mut ObjectGraph,
        obj: ObjectId,
        selector: VersionSelector,
    ) -> ArchivistResult<VersionData> {
        let mut in_progress = HashSet::new();
        self.revert_tree(graph, obj, selector, &mut in_progress)
    }

    fn revert_tree(
        &self,
        graph: &mut ObjectGraph,
        obj: ObjectId,
        selector: VersionSelector,
        in_progress: &mut HashSet<ObjectId>,
    ) -> ArchivistResult<VersionData> {
        in_progress.insert(obj);
        let history_id = graph
            .get(obj)
            .ok_or(ArchivistError::ObjectNotFound(obj))?
            .versioning
            .history_id
            .ok_or(ArchivistError::Unregistered {
                subject: Subject::Object(obj),
            })?;
        let _guard = self.archivist.lock(&history_id)?;

        let version =
            self.archivist
                .retrieve(graph, obj, selector, &self.config.revert_preserve)?;

        // adapters are in path order; removing from the back keeps list
        // indices of the remaining ones valid
        for adapter in version.refs_to_be_deleted.iter().rev() {
            if let Some(Value::Ref(target)) = adapter.remove(graph) {
                graph.remove(target);
                debug!(
                    target: "archivist::repository",
                    parent = %obj,
                    removed = %target,
                    "Removed reference added after the version"
                );
            }
        }

        let resolved = self.revert_inside_refs(graph, &version, in_progress)?;
        let mut resolver = |live: &ObjectGraph, marker: &RefMarker| {
            resolved
                .get(&marker.target)
                .copied()
                .or_else(|| resolve_marker(live, marker))
        };
        let report =
            self.archivist
                .cloner()
                .restore_into(graph, obj, version.object(), &mut resolver)?;

        if let Some(working) = graph.get_mut(obj) {
            for (name, value) in &version.preserved_data {
                working.set(name.clone(), value.clone());
            }
            working.versioning.version_id = version.version_id();
        }

        info!(
            target: "archivist::repository",
            object = %obj,
            history_id = %history_id,
            selector = %selector,
            grafted = report.grafted.len(),
            reused = report.reused.len(),
            reclaimed = report.reclaimed.len(),
            dropped = report.dropped.len(),
            "Working copy reverted"
        );
        Ok(version)
    }

    /// Revert or recreate every inside-referenced object of `version`
    ///
    /// Returns the live object standing in for each marker target.
    fn revert_inside_refs(
        &self,
        graph: &mut ObjectGraph,
        version: &VersionData,
        in_progress: &mut HashSet<ObjectId>,
    ) -> ArchivistResult<HashMap<ObjectId, ObjectId>> {
        let reconstruction = version.object().graph();
        let mut markers: Vec<RefMarker> = Vec::new();
        for id in reconstruction.ids() {
            let Some(object) = reconstruction.get(id) else {
                continue;
            };
            for (_, value) in object.attributes() {
                value.for_each_marker(&mut |_, marker| {
                    if marker.is_inside() {
                        markers.push(marker.clone());
                    }
                });
            }
        }
        let types: HashMap<ObjectId, String> = version
            .data
            .inside_refs
            .iter()
            .filter_map(|adapter| {
                let marker = adapter.get(reconstruction)?.as_marker()?;
                Some((marker.target, adapter.type_name.clone()?))
            })
            .collect();

        let mut resolved = HashMap::new();
        for marker in markers {
            let live = match resolve_marker(graph, &marker) {
                Some(live) => Some(live),
                None => match marker.history_id {
                    Some(h) if self.archivist.store().is_registered(&h) => {
                        let type_name = types
                            .get(&marker.target)
                            .map_or(PLACEHOLDER_TYPE, String::as_str);
                        let mut placeholder = ContentObject::new(type_name);
                        placeholder.versioning.history_id = Some(h);
                        placeholder.versioning.location_id = Some(DEFAULT_LOCATION_ID);
                        let id = graph.insert(placeholder);
                        debug!(
                            target: "archivist::repository",
                            history_id = %h,
                            object = %id,
                            "Recreating deleted inside reference"
                        );
                        Some(id)
                    }
                    _ => None,
                },
            };
            let Some(live) = live else {
                continue;
            };
            resolved.insert(marker.target, live);
            if in_progress.contains(&live) {
                continue;
            }
            if let (Some(_), Some(version_id)) = (marker.history_id, marker.version_id) {
                self.revert_tree(graph, live, VersionSelector::Index(version_id), in_progress)?;
            }
        }
        Ok(resolved)
    }

    /// Check if the working copy is unchanged since the selected version
    pub fn is_up_to_date(
        &self,
        graph: &ObjectGraph,
        subject: impl Into<Subject>,
        selector: VersionSelector,
    ) -> ArchivistResult<bool> {
        self.archivist.is_up_to_date(graph, subject, selector)
    }

    /// Lazy view over a history; fails for unregistered subjects
    pub fn get_history<'g>(
        &self,
        graph: &'g ObjectGraph,
        subject: impl Into<Subject>,
        preserve: &[String],
    ) -> ArchivistResult<LazyHistory<'g>> {
        self.archivist.get_history(graph, subject, preserve)
    }

    /// Lazy view over a history; empty for unregistered subjects
    pub fn query_history<'g>(
        &self,
        graph: &'g ObjectGraph,
        subject: impl Into<Subject>,
        preserve: &[String],
    ) -> ArchivistResult<LazyHistory<'g>> {
        self.archivist.query_history(graph, subject, preserve)
    }
}

/// Live object a marker points at
///
/// The original target wins if it still carries the recorded history;
/// otherwise the working copy of that history is looked up.
fn resolve_marker(graph: &ObjectGraph, marker: &RefMarker) -> Option<ObjectId> {
    let same_target = graph
        .get(marker.target)
        .filter(|obj| {
            marker.history_id.is_none() || obj.versioning.history_id == marker.history_id
        })
        .map(|_| marker.target);
    same_target.or_else(|| {
        marker
            .history_id
            .and_then(|h| graph.find_by_history(&h))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repository() -> Repository {
        Repository::new(ArchivistConfig::default()).unwrap()
    }

    fn ctx() -> SecurityContext {
        SecurityContext::new("editor")
    }

    #[test]
    fn test_apply_version_control_writes_one_entry() {
        let repo = repository();
        let mut graph = ObjectGraph::new();
        let doc = graph.insert(ContentObject::new("Document").with("title", "v1"));

        let receipt = repo
            .apply_version_control(&mut graph, doc, SysMetadataInput::new(), Value::Null, &ctx())
            .unwrap();
        assert_eq!(receipt.version_id, 0);
        let history = repo.get_history(&graph, doc, &[]).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(graph.get(doc).unwrap().versioning.version_id, Some(0));
    }

    #[test]
    fn test_save_requires_registration_by_default() {
        let repo = repository();
        let mut graph = ObjectGraph::new();
        let doc = graph.insert(ContentObject::new("Document"));
        let err = repo
            .save(&mut graph, doc, SysMetadataInput::new(), Value::Null, &ctx())
            .unwrap_err();
        assert!(err.is_save_ordering());
    }

    #[test]
    fn test_save_autoregisters_when_configured() {
        let config = ArchivistConfig {
            autoregister: true,
            ..ArchivistConfig::default()
        };
        let repo = Repository::new(config).unwrap();
        let mut graph = ObjectGraph::new();
        let doc = graph.insert(ContentObject::new("Document"));
        let receipt = repo
            .save(&mut graph, doc, SysMetadataInput::new(), Value::Null, &ctx())
            .unwrap();
        assert_eq!(receipt.version_id, 0);
    }

    #[test]
    fn test_revert_keeps_identity() {
        let repo = repository();
        let mut graph = ObjectGraph::new();
        let doc = graph.insert(ContentObject::new("Document").with("title", "v1"));
        repo.apply_version_control(&mut graph, doc, SysMetadataInput::new(), Value::Null, &ctx())
            .unwrap();
        let history_id = graph.get(doc).unwrap().versioning.history_id;

        graph.set_attr(doc, "title", "v2");
        repo.save(&mut graph, doc, SysMetadataInput::new(), Value::Null, &ctx())
            .unwrap();
        repo.revert(&mut graph, doc, VersionSelector::Index(0)).unwrap();

        let reverted = graph.get(doc).unwrap();
        assert_eq!(reverted.get_str("title"), Some("v1"));
        assert_eq!(reverted.versioning.history_id, history_id);
        assert_eq!(reverted.versioning.version_id, Some(0));
    }

    #[test]
    fn test_revert_unregistered_fails() {
        let repo = repository();
        let mut graph = ObjectGraph::new();
        let doc = graph.insert(ContentObject::new("Document"));
        let err = repo
            .revert(&mut graph, doc, VersionSelector::Latest)
            .unwrap_err();
        assert!(err.is_unregistered());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ArchivistConfig {
            codec: "zip".to_string(),
            ..ArchivistConfig::default()
        };
        assert!(matches!(
            Repository::new(config),
            Err(ArchivistError::InvalidConfig(_))
        ));
    }
}
