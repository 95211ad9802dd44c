//! Object model
//!
//! Working copies live in an [`ObjectGraph`]: an arena of [`ContentObject`]s
//! addressed by [`ObjectId`]. Edges between objects are `Value::Ref`
//! attributes, so graphs may be cyclic; every traversal in the crate
//! keeps a seen-set keyed by object id.
//!
//! A [`DetachedObject`] is a self-contained graph with a designated root.
//! Clones produced for saving and objects reconstructed from history are
//! detached objects: their `Ref`s point into their own graph, and cut
//! edges are `Value::Marker`s.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::timestamp::Timestamp;
use crate::types::{HistoryId, ObjectId};
use crate::value::Value;

/// Versioning stamp of a working copy
///
/// All fields are `None` until the object is first registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Versioning {
    /// History identity, assigned once at first registration
    pub history_id: Option<HistoryId>,
    /// Ordinal of the snapshot this copy corresponds to
    pub version_id: Option<u64>,
    /// Location of the copy
    pub location_id: Option<u64>,
}

impl Versioning {
    /// Check if the object carries a history identity
    pub fn is_versioned(&self) -> bool {
        self.history_id.is_some()
    }
}

/// A content object: typed bag of attributes with a versioning stamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentObject {
    /// Content type, used by modifier conditions
    pub type_name: String,
    attributes: BTreeMap<String, Value>,
    /// Versioning stamp
    pub versioning: Versioning,
    modified: Timestamp,
}

impl ContentObject {
    /// Create an empty object of the given type
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            attributes: BTreeMap::new(),
            versioning: Versioning::default(),
            modified: Timestamp::now(),
        }
    }

    /// Builder-style attribute assignment
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value.into());
        self
    }

    /// Get an attribute
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Check if an attribute exists
    pub fn has(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Set an attribute, returning the previous value
    ///
    /// Bumps the modification stamp.
    pub fn set(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.touch();
        self.attributes.insert(name.into(), value)
    }

    /// Remove an attribute
    ///
    /// Bumps the modification stamp if the attribute existed.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let removed = self.attributes.remove(name);
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    /// Mutable access to an attribute
    ///
    /// Bumps the modification stamp if the attribute exists.
    pub fn attr_mut(&mut self, name: &str) -> Option<&mut Value> {
        if self.attributes.contains_key(name) {
            self.touch();
        }
        self.attributes.get_mut(name)
    }

    /// Iterate attributes in name order
    pub fn attributes(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.attributes.iter()
    }

    /// Replace all attributes at once
    pub fn replace_attributes(&mut self, attributes: BTreeMap<String, Value>) {
        self.touch();
        self.attributes = attributes;
    }

    /// Last modification stamp
    pub fn modified(&self) -> Timestamp {
        self.modified
    }

    /// Overwrite the modification stamp
    ///
    /// Used when a clone must carry the stamp of its original.
    pub fn set_modified(&mut self, modified: Timestamp) {
        self.modified = modified;
    }

    /// Mark the object as modified now
    pub fn touch(&mut self) {
        self.modified = self.modified.next_after();
    }

    /// Convenience accessor for a string attribute
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }
}

/// Arena of content objects
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectGraph {
    objects: BTreeMap<ObjectId, ContentObject>,
    next_id: u64,
}

impl ObjectGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object and return its fresh id
    pub fn insert(&mut self, object: ContentObject) -> ObjectId {
        let id = self.allocate();
        self.objects.insert(id, object);
        id
    }

    /// Reserve an id without inserting an object
    ///
    /// Used by two-pass constructions that wire references before all
    /// objects exist.
    pub fn allocate(&mut self) -> ObjectId {
        let id = ObjectId::from_raw(self.next_id);
        self.next_id += 1;
        id
    }

    /// Put an object under a previously allocated id
    ///
    /// Returns the object that was stored under the id before, if any.
    pub fn put(&mut self, id: ObjectId, object: ContentObject) -> Option<ContentObject> {
        if id.as_u64() >= self.next_id {
            self.next_id = id.as_u64() + 1;
        }
        self.objects.insert(id, object)
    }

    /// Get an object
    pub fn get(&self, id: ObjectId) -> Option<&ContentObject> {
        self.objects.get(&id)
    }

    /// Get an object mutably
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut ContentObject> {
        self.objects.get_mut(&id)
    }

    /// Remove an object
    ///
    /// Edges pointing at it are left dangling; callers decide whether to
    /// drop them.
    pub fn remove(&mut self, id: ObjectId) -> Option<ContentObject> {
        self.objects.remove(&id)
    }

    /// Check if an object exists
    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    /// Number of objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Check if the graph has no objects
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Ids of all objects in order
    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.objects.keys().copied()
    }

    /// Set an attribute on an object
    ///
    /// Returns `false` if the object does not exist.
    pub fn set_attr(
        &mut self,
        id: ObjectId,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> bool {
        match self.objects.get_mut(&id) {
            Some(obj) => {
                obj.set(name, value.into());
                true
            }
            None => false,
        }
    }

    /// Get an attribute of an object
    pub fn attr(&self, id: ObjectId, name: &str) -> Option<&Value> {
        self.objects.get(&id).and_then(|obj| obj.get(name))
    }

    /// Find the working copy carrying a history identity
    pub fn find_by_history(&self, history_id: &HistoryId) -> Option<ObjectId> {
        self.objects
            .iter()
            .find(|(_, obj)| obj.versioning.history_id.as_ref() == Some(history_id))
            .map(|(id, _)| *id)
    }

    /// All objects reachable from `root` through `Ref` edges, `root` first
    ///
    /// Terminates on cyclic graphs. Dangling edges are skipped.
    pub fn reachable(&self, root: ObjectId) -> Vec<ObjectId> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let Some(obj) = self.objects.get(&id) else {
                continue;
            };
            order.push(id);
            let mut targets = Vec::new();
            for (_, value) in obj.attributes() {
                value.for_each_ref(&mut |_, target| targets.push(target));
            }
            // reversed so the first edge is visited first
            stack.extend(targets.into_iter().rev());
        }
        order
    }

    /// Copy an object as a new, unversioned object
    ///
    /// The copy shares no history with the original. Attributes are copied
    /// as-is, so edges of the copy point at the same targets.
    pub fn copy_object(&mut self, id: ObjectId) -> Option<ObjectId> {
        let mut copy = self.objects.get(&id)?.clone();
        copy.versioning = Versioning::default();
        copy.touch();
        Some(self.insert(copy))
    }
}

/// Self-contained object graph with a designated root
///
/// The root is always present in the graph. Deserialization rejects
/// input that violates this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DetachedParts")]
pub struct DetachedObject {
    graph: ObjectGraph,
    root: ObjectId,
}

#[derive(Deserialize)]
struct DetachedParts {
    graph: ObjectGraph,
    root: ObjectId,
}

impl TryFrom<DetachedParts> for DetachedObject {
    type Error = String;

    fn try_from(parts: DetachedParts) -> Result<Self, Self::Error> {
        if !parts.graph.contains(parts.root) {
            return Err(format!("detached root {} missing from graph", parts.root));
        }
        Ok(Self {
            graph: parts.graph,
            root: parts.root,
        })
    }
}

impl DetachedObject {
    /// Wrap a graph and its root
    ///
    /// The caller guarantees `root` exists in `graph`.
    pub fn new(graph: ObjectGraph, root: ObjectId) -> Self {
        Self { graph, root }
    }

    /// Root id
    pub fn root(&self) -> ObjectId {
        self.root
    }

    /// Root object
    pub fn object(&self) -> &ContentObject {
        &self.graph.objects[&self.root]
    }

    /// Root object, mutably
    pub fn object_mut(&mut self) -> &mut ContentObject {
        self.graph
            .objects
            .get_mut(&self.root)
            .expect("detached root is always present")
    }

    /// The underlying graph
    pub fn graph(&self) -> &ObjectGraph {
        &self.graph
    }

    /// Shorthand for an attribute of the root
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.object().get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut graph = ObjectGraph::new();
        let id = graph.insert(ContentObject::new("Document").with("title", "v1"));
        assert_eq!(graph.get(id).unwrap().get_str("title"), Some("v1"));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_ids_never_reused() {
        let mut graph = ObjectGraph::new();
        let a = graph.insert(ContentObject::new("Document"));
        graph.remove(a);
        let b = graph.insert(ContentObject::new("Document"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_set_bumps_modified_strictly() {
        let mut obj = ContentObject::new("Document");
        let before = obj.modified();
        obj.set("title", Value::from("a"));
        let middle = obj.modified();
        obj.set("title", Value::from("b"));
        assert!(middle > before);
        assert!(obj.modified() > middle);
    }

    #[test]
    fn test_reachable_terminates_on_cycle() {
        let mut graph = ObjectGraph::new();
        let a = graph.insert(ContentObject::new("Node"));
        let b = graph.insert(ContentObject::new("Node").with("ref", a));
        graph.set_attr(a, "ref", b);

        let reached = graph.reachable(a);
        assert_eq!(reached, vec![a, b]);
    }

    #[test]
    fn test_reachable_skips_dangling() {
        let mut graph = ObjectGraph::new();
        let a = graph.insert(ContentObject::new("Node").with("ref", ObjectId::from_raw(42)));
        assert_eq!(graph.reachable(a), vec![a]);
    }

    #[test]
    fn test_copy_object_has_no_history() {
        let mut graph = ObjectGraph::new();
        let mut doc = ContentObject::new("Document").with("title", "doc");
        doc.versioning.history_id = Some(HistoryId::new());
        doc.versioning.version_id = Some(3);
        let id = graph.insert(doc);

        let copy = graph.copy_object(id).unwrap();
        assert_ne!(copy, id);
        assert!(!graph.get(copy).unwrap().versioning.is_versioned());
        assert_eq!(graph.get(copy).unwrap().get_str("title"), Some("doc"));
    }

    #[test]
    fn test_find_by_history() {
        let mut graph = ObjectGraph::new();
        let history_id = HistoryId::new();
        let mut doc = ContentObject::new("Document");
        doc.versioning.history_id = Some(history_id);
        let id = graph.insert(doc);
        graph.insert(ContentObject::new("Document"));

        assert_eq!(graph.find_by_history(&history_id), Some(id));
        assert_eq!(graph.find_by_history(&HistoryId::new()), None);
    }

    #[test]
    fn test_put_advances_allocator() {
        let mut graph = ObjectGraph::new();
        graph.put(ObjectId::from_raw(10), ContentObject::new("Node"));
        let next = graph.insert(ContentObject::new("Node"));
        assert_eq!(next, ObjectId::from_raw(11));
    }
}
