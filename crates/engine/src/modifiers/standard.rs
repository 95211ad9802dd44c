//! Standard modifiers
//!
//! - `RetainAttributes`: keeps live values (workflow state, permission
//!   settings) on retrieved versions
//! - `ChildrenReferences`: cuts the edges to a folder's children, either as
//!   inside or as outside references
//! - `SaveByReference`: stores selected attributes outside the clone

use std::collections::HashSet;

use archivist_core::{
    AttrPath, AttributeAdapter, DetachedObject, EdgeDisposition, ObjectGraph, ObjectId,
    ReferencedData, RetrieveOutcome, Value,
};

use super::{detach_value, Modifier};
use crate::config::ChildrenPolicy;

/// Suffix of permission setting attributes
pub const PERMISSION_SUFFIX: &str = "_Permission";

/// Keeps selected attributes of the live object on retrieved versions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetainAttributes {
    names: Vec<String>,
    suffixes: Vec<String>,
}

impl RetainAttributes {
    /// Retain the named attributes and all attributes ending in a suffix
    pub fn new(names: Vec<String>, suffixes: Vec<String>) -> Self {
        Self { names, suffixes }
    }

    /// Workflow state and workflow history
    pub fn workflow() -> Self {
        Self::new(
            vec!["review_state".to_string(), "workflow_history".to_string()],
            Vec::new(),
        )
    }

    /// Permission settings
    pub fn permissions() -> Self {
        Self::new(Vec::new(), vec![PERMISSION_SUFFIX.to_string()])
    }

    fn retains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
            || self.suffixes.iter().any(|s| name.ends_with(s.as_str()))
    }
}

impl Modifier for RetainAttributes {
    fn after_retrieve(
        &self,
        graph: &ObjectGraph,
        live: Option<ObjectId>,
        clone: &mut DetachedObject,
    ) -> RetrieveOutcome {
        let Some(live_obj) = live.and_then(|id| graph.get(id)) else {
            return RetrieveOutcome::default();
        };
        let retained: Vec<(String, Value)> = live_obj
            .attributes()
            .filter(|(name, _)| self.retains(name))
            .map(|(name, value)| (name.clone(), detach_value(graph, value)))
            .collect();
        let root = clone.object_mut();
        for (name, value) in retained {
            root.set(name, value);
        }
        RetrieveOutcome::default()
    }
}

/// Cuts the edges from a folder to its children
///
/// The children live under one attribute, usually a map from child id to
/// `Ref`. Only edges owned by the object being saved are cut; edges of
/// nested objects are left to other policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildrenReferences {
    attribute: String,
    policy: ChildrenPolicy,
}

impl ChildrenReferences {
    /// Cut edges under `attribute` according to `policy`
    pub fn new(attribute: impl Into<String>, policy: ChildrenPolicy) -> Self {
        Self {
            attribute: attribute.into(),
            policy,
        }
    }

    /// Attribute holding the children
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Policy in effect
    pub fn policy(&self) -> ChildrenPolicy {
        self.policy
    }

    fn retain_live_children(
        &self,
        graph: &ObjectGraph,
        live: ObjectId,
        clone: &mut DetachedObject,
    ) -> RetrieveOutcome {
        let mut outcome = RetrieveOutcome::default();
        let root = clone.root();
        match graph.attr(live, &self.attribute) {
            Some(children) => {
                let detached = detach_value(graph, children);
                clone.object_mut().set(self.attribute.clone(), detached);
            }
            None => {
                clone.object_mut().remove(&self.attribute);
            }
        }
        outcome
            .attr_handling_references
            .push(AttributeAdapter::new(root, AttrPath::new(self.attribute.clone())));
        outcome
    }

    fn children_removed_since(
        &self,
        graph: &ObjectGraph,
        live: ObjectId,
        clone: &DetachedObject,
    ) -> RetrieveOutcome {
        let mut outcome = RetrieveOutcome::default();
        let mut versioned_targets = HashSet::new();
        let mut versioned_histories = HashSet::new();
        if let Some(children) = clone.get(&self.attribute) {
            children.for_each_marker(&mut |_, marker| {
                versioned_targets.insert(marker.target);
                if let Some(history_id) = marker.history_id {
                    versioned_histories.insert(history_id);
                }
            });
        }
        let Some(children) = graph.attr(live, &self.attribute) else {
            return outcome;
        };
        children.for_each_ref(&mut |segments, target| {
            let history = graph.get(target).and_then(|o| o.versioning.history_id);
            let in_version = versioned_targets.contains(&target)
                || history.map_or(false, |h| versioned_histories.contains(&h));
            if !in_version {
                let mut adapter = AttributeAdapter::new(
                    live,
                    AttrPath::with_segments(self.attribute.clone(), segments.to_vec()),
                );
                if let Some(obj) = graph.get(target) {
                    adapter = adapter.with_type(obj.type_name.clone());
                }
                outcome.refs_to_be_deleted.push(adapter);
            }
        });
        outcome
    }
}

impl Modifier for ChildrenReferences {
    fn classify_edge(
        &self,
        _graph: &ObjectGraph,
        root: ObjectId,
        parent: ObjectId,
        path: &AttrPath,
        _target: ObjectId,
    ) -> Option<EdgeDisposition> {
        if parent != root || path.attribute != self.attribute {
            return None;
        }
        Some(match self.policy {
            ChildrenPolicy::Inside => EdgeDisposition::Inside,
            ChildrenPolicy::Outside => EdgeDisposition::Outside,
        })
    }

    fn after_retrieve(
        &self,
        graph: &ObjectGraph,
        live: Option<ObjectId>,
        clone: &mut DetachedObject,
    ) -> RetrieveOutcome {
        let Some(live) = live.filter(|id| graph.contains(*id)) else {
            return RetrieveOutcome::default();
        };
        match self.policy {
            ChildrenPolicy::Outside => self.retain_live_children(graph, live, clone),
            ChildrenPolicy::Inside => self.children_removed_since(graph, live, clone),
        }
    }
}

/// Stores selected attributes as referenced data instead of inline
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveByReference {
    attributes: Vec<String>,
}

impl SaveByReference {
    /// Store `attributes` by reference
    pub fn new(attributes: Vec<String>) -> Self {
        Self { attributes }
    }
}

impl Modifier for SaveByReference {
    fn referenced_attributes(&self, graph: &ObjectGraph, obj: ObjectId) -> ReferencedData {
        let Some(object) = graph.get(obj) else {
            return ReferencedData::new();
        };
        self.attributes
            .iter()
            .filter_map(|name| {
                object
                    .get(name)
                    .map(|value| (name.clone(), detach_value(graph, value)))
            })
            .collect()
    }

    fn reattach(&self, clone: &mut DetachedObject, referenced_data: &ReferencedData) {
        let root = clone.object_mut();
        for name in &self.attributes {
            if let Some(value) = referenced_data.get(name) {
                root.set(name.clone(), value.clone());
            }
        }
    }
}
