//! Deep-clone engine
//!
//! ## Clone
//!
//! `clone_object` copies every object reachable from a root into a fresh
//! graph. Before descending into the target of a `Ref`, the edge
//! classifier decides:
//!
//! - `Follow`: the target is copied (once; a seen-map keyed by object id
//!   maps every original to its copy, so cycles and shared targets keep
//!   their shape)
//! - `Inside` / `Outside`: the edge is cut. The clone gets a `RefMarker`
//!   carrying the target's identity and the edge is recorded on both the
//!   original and the clone side.
//!
//! Ids in the clone are allocated when a target is first seen and objects
//! are written once their attributes are rewritten, so references can be
//! wired before their targets exist.
//!
//! ## Restore
//!
//! `restore_into` and `materialize` graft a detached object into a live
//! graph. Markers are replaced by the live object the resolver names;
//! markers nobody resolves are dropped and reported.
//!
//! A detached non-root object that carries a history identity stands for
//! an object versioned on its own. If that history has a working copy in
//! the live graph, the edge is wired to it and the working copy is left
//! as it is; only objects without such a counterpart are grafted.
//! `restore_into` then removes the unversioned sub-objects that only the
//! previous state of the target reached.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{debug, warn};

use archivist_core::{
    ArchivistError, ArchivistResult, AttrPath, AttributeAdapter, ClassifiedRefs, ContentObject,
    DetachedObject, EdgeClassifier, EdgeDisposition, ObjectGraph, ObjectId, PathSegment,
    RefMarker, ReferenceKind, Value,
};

/// Default bound on objects copied by one clone
pub const DEFAULT_MAX_CLONE_NODES: usize = 100_000;

/// Result of a clone
#[derive(Debug, Clone)]
pub struct CloneOutput {
    /// The copy
    pub clone: DetachedObject,
    /// Cut edges, addressed in the original graph
    pub original_refs: ClassifiedRefs,
    /// Cut edges, addressed in the clone
    pub clone_refs: ClassifiedRefs,
}

/// Result of grafting a detached object into a live graph
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestoreReport {
    /// Live id of the detached root
    pub root: Option<ObjectId>,
    /// Fresh live objects created for the detached non-root objects
    pub grafted: Vec<ObjectId>,
    /// Existing working copies that detached objects were wired to
    pub reused: Vec<ObjectId>,
    /// Sub-objects of the previous state that nothing references any more
    pub reclaimed: Vec<ObjectId>,
    /// Markers that could not be resolved and were dropped
    pub dropped: Vec<RefMarker>,
}

/// One edge met while rewriting a value
enum Edge<'v> {
    Ref(ObjectId),
    Marker(&'v RefMarker),
}

/// Rewrite every edge inside `value`
///
/// `f` returns the replacement, or `None` to drop the edge (a dropped list
/// element or map entry disappears; a dropped top-level value is reported
/// as `None`).
fn rewrite(
    value: &Value,
    path: &mut Vec<PathSegment>,
    f: &mut dyn FnMut(&[PathSegment], Edge<'_>) -> ArchivistResult<Option<Value>>,
) -> ArchivistResult<Option<Value>> {
    match value {
        Value::Ref(id) => f(path.as_slice(), Edge::Ref(*id)),
        Value::Marker(marker) => f(path.as_slice(), Edge::Marker(marker)),
        Value::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                path.push(PathSegment::Index(i));
                let rewritten = rewrite(item, path, f)?;
                path.pop();
                out.extend(rewritten);
            }
            Ok(Some(Value::List(out)))
        }
        Value::Map(entries) => {
            let mut out = BTreeMap::new();
            for (key, item) in entries {
                path.push(PathSegment::Key(key.clone()));
                let rewritten = rewrite(item, path, f)?;
                path.pop();
                if let Some(v) = rewritten {
                    out.insert(key.clone(), v);
                }
            }
            Ok(Some(Value::Map(out)))
        }
        other => Ok(Some(other.clone())),
    }
}

/// Copy of `source` with the given attributes, keeping its type, stamp and
/// modification time
fn copy_with(source: &ContentObject, attributes: BTreeMap<String, Value>) -> ContentObject {
    let mut copy = ContentObject::new(source.type_name.clone());
    copy.versioning = source.versioning;
    copy.replace_attributes(attributes);
    copy.set_modified(source.modified());
    copy
}

/// Unversioned objects reachable from `root` through `Ref` edges
///
/// `root` itself is not included, and the walk does not descend into
/// objects that carry a history identity.
fn owned_subobjects(graph: &ObjectGraph, root: ObjectId) -> HashSet<ObjectId> {
    let mut owned = HashSet::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        let Some(obj) = graph.get(id) else {
            continue;
        };
        for (_, value) in obj.attributes() {
            value.for_each_ref(&mut |_, target| {
                let unversioned = graph
                    .get(target)
                    .map_or(false, |t| !t.versioning.is_versioned());
                if target != root && unversioned && owned.insert(target) {
                    stack.push(target);
                }
            });
        }
    }
    owned
}

/// Remove the objects of `candidates` that no other object references
///
/// Every live object outside `candidates` counts as referenced; candidates
/// only reached from removed candidates are removed too.
fn reclaim_unreferenced(graph: &mut ObjectGraph, candidates: &HashSet<ObjectId>) -> Vec<ObjectId> {
    let mut alive = HashSet::new();
    let mut stack: Vec<ObjectId> = graph.ids().filter(|id| !candidates.contains(id)).collect();
    while let Some(id) = stack.pop() {
        let Some(obj) = graph.get(id) else {
            continue;
        };
        for (_, value) in obj.attributes() {
            value.for_each_ref(&mut |_, target| {
                if candidates.contains(&target) && alive.insert(target) {
                    stack.push(target);
                }
            });
        }
    }
    let mut reclaimed: Vec<ObjectId> = candidates
        .iter()
        .copied()
        .filter(|id| !alive.contains(id))
        .collect();
    reclaimed.sort_unstable();
    for id in &reclaimed {
        graph.remove(*id);
    }
    reclaimed
}

/// Deep-clone engine
#[derive(Debug, Clone, Copy)]
pub struct CloneEngine {
    max_nodes: usize,
}

impl Default for CloneEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CLONE_NODES)
    }
}

impl CloneEngine {
    /// Create an engine copying at most `max_nodes` objects per clone
    pub fn new(max_nodes: usize) -> Self {
        Self { max_nodes }
    }

    /// Configured bound
    pub fn max_nodes(&self) -> usize {
        self.max_nodes
    }

    /// Clone the graph reachable from `root`
    ///
    /// Attributes of the root named in `exclude` are left out of the copy.
    /// Without a classifier every edge is followed.
    ///
    /// # Errors
    ///
    /// - `ObjectNotFound` if `root` does not exist
    /// - `DanglingReference` if a followed edge has no target
    /// - `CloneLimitExceeded` if more than `max_nodes` objects would be copied
    pub fn clone_object(
        &self,
        graph: &ObjectGraph,
        root: ObjectId,
        exclude: &BTreeSet<String>,
        classifier: Option<&dyn EdgeClassifier>,
    ) -> ArchivistResult<CloneOutput> {
        if !graph.contains(root) {
            return Err(ArchivistError::ObjectNotFound(root));
        }

        let mut clone_graph = ObjectGraph::new();
        let mut seen: HashMap<ObjectId, ObjectId> = HashMap::new();
        let mut stack = Vec::new();
        let clone_root = clone_graph.allocate();
        seen.insert(root, clone_root);
        stack.push(root);

        let mut original_refs = ClassifiedRefs::default();
        let mut clone_refs = ClassifiedRefs::default();

        while let Some(old_id) = stack.pop() {
            let source = graph
                .get(old_id)
                .ok_or(ArchivistError::ObjectNotFound(old_id))?;
            let new_id = seen[&old_id];
            let mut attributes = BTreeMap::new();

            for (name, value) in source.attributes() {
                if old_id == root && exclude.contains(name) {
                    continue;
                }
                let mut on_edge = |segments: &[PathSegment], edge: Edge<'_>| {
                    let target = match edge {
                        Edge::Ref(target) => target,
                        Edge::Marker(marker) => return Ok(Some(Value::Marker(marker.clone()))),
                    };
                    let path = AttrPath::with_segments(name.clone(), segments.to_vec());
                    let disposition = classifier
                        .map(|c| c.classify(graph, old_id, &path, target))
                        .unwrap_or(EdgeDisposition::Follow);
                    let kind = match disposition {
                        EdgeDisposition::Follow => {
                            if !graph.contains(target) {
                                return Err(ArchivistError::DanglingReference {
                                    parent: old_id,
                                    target,
                                });
                            }
                            let copied = match seen.get(&target) {
                                Some(copied) => *copied,
                                None => {
                                    if seen.len() >= self.max_nodes {
                                        return Err(ArchivistError::CloneLimitExceeded {
                                            root,
                                            limit: self.max_nodes,
                                        });
                                    }
                                    let copied = clone_graph.allocate();
                                    seen.insert(target, copied);
                                    stack.push(target);
                                    copied
                                }
                            };
                            return Ok(Some(Value::Ref(copied)));
                        }
                        EdgeDisposition::Inside => ReferenceKind::Inside,
                        EdgeDisposition::Outside => ReferenceKind::Outside,
                    };

                    let mut original = AttributeAdapter::new(old_id, path.clone());
                    let mut cloned = AttributeAdapter::new(new_id, path);
                    if let Some(target_obj) = graph.get(target) {
                        original = original.with_type(target_obj.type_name.clone());
                        cloned = cloned.with_type(target_obj.type_name.clone());
                    }
                    match kind {
                        ReferenceKind::Inside => {
                            original_refs.inside_refs.push(original);
                            clone_refs.inside_refs.push(cloned);
                        }
                        ReferenceKind::Outside => {
                            original_refs.outside_refs.push(original);
                            clone_refs.outside_refs.push(cloned);
                        }
                    }
                    Ok(Some(Value::Marker(RefMarker::for_target(graph, target, kind))))
                };
                if let Some(rewritten) = rewrite(value, &mut Vec::new(), &mut on_edge)? {
                    attributes.insert(name.clone(), rewritten);
                }
            }

            clone_graph.put(new_id, copy_with(source, attributes));
        }

        debug!(
            target: "archivist::clone",
            root = %root,
            objects = clone_graph.len(),
            inside = clone_refs.inside_refs.len(),
            outside = clone_refs.outside_refs.len(),
            "Object cloned"
        );

        Ok(CloneOutput {
            clone: DetachedObject::new(clone_graph, clone_root),
            original_refs,
            clone_refs,
        })
    }

    /// Cut edges of `root` without keeping the copy
    ///
    /// Adapters address the original graph.
    pub fn scan_cut_edges(
        &self,
        graph: &ObjectGraph,
        root: ObjectId,
        exclude: &BTreeSet<String>,
        classifier: Option<&dyn EdgeClassifier>,
    ) -> ArchivistResult<ClassifiedRefs> {
        Ok(self
            .clone_object(graph, root, exclude, classifier)?
            .original_refs)
    }

    /// Overwrite the live object `target` with a detached object
    ///
    /// `target` keeps its id and its versioning stamp; its type and
    /// attributes are replaced. Non-root objects of the detached graph are
    /// wired to the working copy of their history if one exists and are
    /// inserted as fresh live objects otherwise. Unversioned sub-objects of
    /// the previous state that are no longer referenced are removed.
    ///
    /// # Errors
    ///
    /// `ObjectNotFound` if `target` does not exist.
    pub fn restore_into(
        &self,
        graph: &mut ObjectGraph,
        target: ObjectId,
        detached: &DetachedObject,
        resolver: &mut dyn FnMut(&ObjectGraph, &RefMarker) -> Option<ObjectId>,
    ) -> ArchivistResult<RestoreReport> {
        if !graph.contains(target) {
            return Err(ArchivistError::ObjectNotFound(target));
        }
        let previous = owned_subobjects(graph, target);
        let mut report = self.graft(graph, Some(target), detached, resolver)?;
        report.reclaimed = reclaim_unreferenced(graph, &previous);
        if !report.reclaimed.is_empty() {
            debug!(
                target: "archivist::clone",
                root = %target,
                reclaimed = report.reclaimed.len(),
                "Reclaimed unreferenced sub-objects"
            );
        }
        Ok(report)
    }

    /// Insert a detached object as a brand-new live object
    ///
    /// The new root carries the detached root's versioning stamp.
    pub fn materialize(
        &self,
        graph: &mut ObjectGraph,
        detached: &DetachedObject,
        resolver: &mut dyn FnMut(&ObjectGraph, &RefMarker) -> Option<ObjectId>,
    ) -> ArchivistResult<RestoreReport> {
        self.graft(graph, None, detached, resolver)
    }

    fn graft(
        &self,
        graph: &mut ObjectGraph,
        target: Option<ObjectId>,
        detached: &DetachedObject,
        resolver: &mut dyn FnMut(&ObjectGraph, &RefMarker) -> Option<ObjectId>,
    ) -> ArchivistResult<RestoreReport> {
        let source = detached.graph();
        if source.len() > self.max_nodes {
            return Err(ArchivistError::CloneLimitExceeded {
                root: detached.root(),
                limit: self.max_nodes,
            });
        }

        let mut report = RestoreReport::default();
        let mut mapping: HashMap<ObjectId, ObjectId> = HashMap::new();
        let mut reused: HashSet<ObjectId> = HashSet::new();
        for id in source.ids() {
            let is_root = id == detached.root();
            let existing = source
                .get(id)
                .and_then(|obj| obj.versioning.history_id)
                .filter(|_| !is_root)
                .and_then(|h| graph.find_by_history(&h))
                .filter(|live| Some(*live) != target);
            let live = match (target, existing) {
                (Some(target), _) if is_root => target,
                (_, Some(existing)) => {
                    reused.insert(id);
                    report.reused.push(existing);
                    existing
                }
                _ => {
                    let fresh = graph.allocate();
                    if !is_root {
                        report.grafted.push(fresh);
                    }
                    fresh
                }
            };
            mapping.insert(id, live);
        }

        // rewrite against the graph as it is before anything is written
        let mut rewritten = Vec::with_capacity(source.len());
        {
            let live_graph: &ObjectGraph = graph;
            for id in source.ids().filter(|id| !reused.contains(id)) {
                let Some(object) = source.get(id) else {
                    continue;
                };
                let mut attributes = BTreeMap::new();
                for (name, value) in object.attributes() {
                    let mut on_edge = |_: &[PathSegment], edge: Edge<'_>| match edge {
                        Edge::Ref(inner) => match mapping.get(&inner) {
                            Some(live) => Ok(Some(Value::Ref(*live))),
                            None => Err(ArchivistError::DanglingReference {
                                parent: id,
                                target: inner,
                            }),
                        },
                        Edge::Marker(marker) => {
                            match resolver(live_graph, marker).filter(|t| live_graph.contains(*t)) {
                                Some(live) => Ok(Some(Value::Ref(live))),
                                None => {
                                    report.dropped.push(marker.clone());
                                    Ok(None)
                                }
                            }
                        }
                    };
                    if let Some(value) = rewrite(value, &mut Vec::new(), &mut on_edge)? {
                        attributes.insert(name.clone(), value);
                    }
                }
                rewritten.push((id, attributes));
            }
        }

        for (id, attributes) in rewritten {
            let Some(object) = source.get(id) else {
                continue;
            };
            let live_id = mapping[&id];
            if target == Some(live_id) {
                if let Some(live) = graph.get_mut(live_id) {
                    live.type_name = object.type_name.clone();
                    live.replace_attributes(attributes);
                }
            } else {
                graph.put(live_id, copy_with(object, attributes));
            }
        }

        for marker in &report.dropped {
            warn!(
                target: "archivist::clone",
                target_object = %marker.target,
                kind = %marker.kind,
                "Dropped unresolvable reference"
            );
        }

        report.root = Some(mapping[&detached.root()]);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archivist_core::HistoryId;

    struct CutAttribute {
        attribute: &'static str,
        disposition: EdgeDisposition,
    }

    impl EdgeClassifier for CutAttribute {
        fn classify(
            &self,
            _graph: &ObjectGraph,
            _parent: ObjectId,
            path: &AttrPath,
            _target: ObjectId,
        ) -> EdgeDisposition {
            if path.attribute == self.attribute {
                self.disposition
            } else {
                EdgeDisposition::Follow
            }
        }
    }

    fn no_exclude() -> BTreeSet<String> {
        BTreeSet::new()
    }

    #[test]
    fn test_clone_is_independent() {
        let mut graph = ObjectGraph::new();
        let doc = graph.insert(ContentObject::new("Document").with("title", "v1"));

        let engine = CloneEngine::default();
        let mut out = engine.clone_object(&graph, doc, &no_exclude(), None).unwrap();
        assert_eq!(out.clone.object().modified(), graph.get(doc).unwrap().modified());

        out.clone.object_mut().set("title", Value::from("changed"));
        assert_eq!(graph.attr(doc, "title"), Some(&Value::from("v1")));
    }

    #[test]
    fn test_cycle_keeps_identity() {
        let mut graph = ObjectGraph::new();
        let a = graph.insert(ContentObject::new("Node"));
        let b = graph.insert(ContentObject::new("Node").with("ref", a));
        graph.set_attr(a, "ref", b);

        let out = CloneEngine::default()
            .clone_object(&graph, a, &no_exclude(), None)
            .unwrap();
        let clone_graph = out.clone.graph();
        let a2 = out.clone.root();
        let b2 = clone_graph.attr(a2, "ref").and_then(Value::as_object_ref).unwrap();
        assert_eq!(clone_graph.attr(b2, "ref"), Some(&Value::Ref(a2)));
        assert_eq!(clone_graph.len(), 2);
    }

    #[test]
    fn test_shared_target_copied_once() {
        let mut graph = ObjectGraph::new();
        let shared = graph.insert(ContentObject::new("Image"));
        let doc = graph.insert(
            ContentObject::new("Document")
                .with("lead", shared)
                .with("gallery", Value::List(vec![Value::Ref(shared)])),
        );

        let out = CloneEngine::default()
            .clone_object(&graph, doc, &no_exclude(), None)
            .unwrap();
        let root = out.clone.object();
        let lead = root.get("lead").and_then(Value::as_object_ref).unwrap();
        let gallery = root.get("gallery").and_then(Value::as_list).unwrap();
        assert_eq!(gallery[0], Value::Ref(lead));
        assert_eq!(out.clone.graph().len(), 2);
    }

    #[test]
    fn test_cut_edges_become_markers() {
        let mut graph = ObjectGraph::new();
        let mut child = ContentObject::new("Document");
        child.versioning.history_id = Some(HistoryId::new());
        child.versioning.version_id = Some(2);
        let child = graph.insert(child);
        let mut children = BTreeMap::new();
        children.insert("doc".to_string(), Value::Ref(child));
        let folder =
            graph.insert(ContentObject::new("Folder").with("children", Value::Map(children)));

        let classifier = CutAttribute {
            attribute: "children",
            disposition: EdgeDisposition::Inside,
        };
        let out = CloneEngine::default()
            .clone_object(&graph, folder, &no_exclude(), Some(&classifier))
            .unwrap();

        assert_eq!(out.clone.graph().len(), 1);
        assert_eq!(out.original_refs.inside_refs.len(), 1);
        assert_eq!(out.clone_refs.inside_refs.len(), 1);
        assert!(out.clone_refs.outside_refs.is_empty());

        let adapter = &out.clone_refs.inside_refs[0];
        assert_eq!(adapter.type_name.as_deref(), Some("Document"));
        let marker = adapter.get(out.clone.graph()).and_then(Value::as_marker).unwrap();
        assert_eq!(marker.target, child);
        assert_eq!(marker.version_id, Some(2));
        assert!(marker.is_inside());

        let original = &out.original_refs.inside_refs[0];
        assert_eq!(original.get(&graph), Some(&Value::Ref(child)));
    }

    #[test]
    fn test_excluded_attribute_left_out() {
        let mut graph = ObjectGraph::new();
        let doc = graph.insert(
            ContentObject::new("File")
                .with("title", "report")
                .with("file", Value::Bytes(vec![1, 2, 3])),
        );
        let exclude: BTreeSet<String> = ["file".to_string()].into_iter().collect();
        let out = CloneEngine::default()
            .clone_object(&graph, doc, &exclude, None)
            .unwrap();
        assert!(out.clone.get("file").is_none());
        assert_eq!(out.clone.get("title"), Some(&Value::from("report")));
    }

    #[test]
    fn test_dangling_followed_edge_fails() {
        let mut graph = ObjectGraph::new();
        let doc = graph.insert(ContentObject::new("Document").with("ref", ObjectId::from_raw(77)));
        let err = CloneEngine::default()
            .clone_object(&graph, doc, &no_exclude(), None)
            .unwrap_err();
        assert!(matches!(err, ArchivistError::DanglingReference { .. }));
    }

    #[test]
    fn test_limit_fails_fast() {
        let mut graph = ObjectGraph::new();
        let mut previous = graph.insert(ContentObject::new("Node"));
        for _ in 0..10 {
            previous = graph.insert(ContentObject::new("Node").with("next", previous));
        }
        let err = CloneEngine::new(5)
            .clone_object(&graph, previous, &no_exclude(), None)
            .unwrap_err();
        assert!(matches!(err, ArchivistError::CloneLimitExceeded { limit: 5, .. }));
    }

    #[test]
    fn test_restore_into_keeps_id_and_resolves_markers() {
        let mut graph = ObjectGraph::new();
        let related = graph.insert(ContentObject::new("Document"));
        let doc = graph.insert(
            ContentObject::new("Document")
                .with("title", "v1")
                .with("related", related),
        );
        let classifier = CutAttribute {
            attribute: "related",
            disposition: EdgeDisposition::Outside,
        };
        let engine = CloneEngine::default();
        let out = engine
            .clone_object(&graph, doc, &no_exclude(), Some(&classifier))
            .unwrap();

        graph.set_attr(doc, "title", "v2");
        graph.get_mut(doc).unwrap().remove("related");

        let report = engine
            .restore_into(&mut graph, doc, &out.clone, &mut |g, m| {
                g.contains(m.target).then_some(m.target)
            })
            .unwrap();
        assert_eq!(report.root, Some(doc));
        assert!(report.dropped.is_empty());
        assert_eq!(graph.attr(doc, "title"), Some(&Value::from("v1")));
        assert_eq!(graph.attr(doc, "related"), Some(&Value::Ref(related)));
    }

    #[test]
    fn test_restore_drops_unresolved_marker() {
        let mut graph = ObjectGraph::new();
        let gone = graph.insert(ContentObject::new("Document"));
        let doc = graph.insert(
            ContentObject::new("Document")
                .with("links", Value::List(vec![Value::Ref(gone), Value::from("text")])),
        );
        let classifier = CutAttribute {
            attribute: "links",
            disposition: EdgeDisposition::Outside,
        };
        let engine = CloneEngine::default();
        let out = engine
            .clone_object(&graph, doc, &no_exclude(), Some(&classifier))
            .unwrap();
        graph.remove(gone);

        let report = engine
            .restore_into(&mut graph, doc, &out.clone, &mut |_, m| Some(m.target))
            .unwrap();
        assert_eq!(report.dropped.len(), 1);
        assert_eq!(
            graph.attr(doc, "links"),
            Some(&Value::List(vec![Value::from("text")]))
        );
    }

    #[test]
    fn test_restore_wires_versioned_subobject_to_working_copy() {
        let mut graph = ObjectGraph::new();
        let mut image = ContentObject::new("Image").with("title", "stored");
        image.versioning.history_id = Some(HistoryId::new());
        let image = graph.insert(image);
        let doc = graph.insert(ContentObject::new("Document").with("related", image));

        let engine = CloneEngine::default();
        let out = engine.clone_object(&graph, doc, &no_exclude(), None).unwrap();
        graph.set_attr(image, "title", "live");

        let report = engine
            .restore_into(&mut graph, doc, &out.clone, &mut |_, _| None)
            .unwrap();
        assert_eq!(report.reused, vec![image]);
        assert!(report.grafted.is_empty());
        assert!(report.reclaimed.is_empty());
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.attr(doc, "related"), Some(&Value::Ref(image)));
        assert_eq!(graph.attr(image, "title"), Some(&Value::from("live")));
    }

    #[test]
    fn test_restore_reclaims_replaced_subobjects() {
        let mut graph = ObjectGraph::new();
        let note = graph.insert(ContentObject::new("Note").with("title", "draft"));
        let doc = graph.insert(ContentObject::new("Document").with("note", note));

        let engine = CloneEngine::default();
        let out = engine.clone_object(&graph, doc, &no_exclude(), None).unwrap();
        graph.set_attr(note, "title", "final");

        let report = engine
            .restore_into(&mut graph, doc, &out.clone, &mut |_, _| None)
            .unwrap();
        assert_eq!(report.grafted.len(), 1);
        assert_eq!(report.reclaimed, vec![note]);
        assert_eq!(graph.len(), 2);
        let restored = report.grafted[0];
        assert_eq!(graph.attr(doc, "note"), Some(&Value::Ref(restored)));
        assert_eq!(graph.attr(restored, "title"), Some(&Value::from("draft")));
    }

    #[test]
    fn test_materialize_creates_fresh_objects() {
        let mut source = ObjectGraph::new();
        let a = source.insert(ContentObject::new("Node").with("title", "a"));
        let b = source.insert(ContentObject::new("Node").with("ref", a));
        source.set_attr(a, "ref", b);
        let detached = DetachedObject::new(source, a);

        let mut graph = ObjectGraph::new();
        graph.insert(ContentObject::new("Other"));
        let report = CloneEngine::default()
            .materialize(&mut graph, &detached, &mut |_, _| None)
            .unwrap();

        let root = report.root.unwrap();
        assert_eq!(report.grafted.len(), 1);
        assert_eq!(graph.len(), 3);
        let b2 = graph.attr(root, "ref").and_then(Value::as_object_ref).unwrap();
        assert_eq!(graph.attr(b2, "ref"), Some(&Value::Ref(root)));
    }
}
