//! Edge descriptors
//!
//! - `RefMarker`: the placeholder left in a clone where an edge was cut
//! - `AttrPath`: locates a value inside an object's attributes
//! - `AttributeAdapter`: locates an edge (owning object + path) in a graph

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::object::ObjectGraph;
use crate::types::{HistoryId, ObjectId};
use crate::value::Value;

/// Which side of the versioning boundary a cut edge points to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceKind {
    /// Target is version controlled and saved together with the referrer
    Inside,
    /// Target is outside this snapshot's versioning boundary
    Outside,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceKind::Inside => write!(f, "inside"),
            ReferenceKind::Outside => write!(f, "outside"),
        }
    }
}

/// Version aware reference
///
/// Records as much identity of the target as is known when the edge is
/// cut. History, version and location ids are only present if the target
/// was under version control at that moment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RefMarker {
    /// Identity of the target object in the host graph
    pub target: ObjectId,
    /// Inside or outside reference
    pub kind: ReferenceKind,
    /// Target's history, if registered
    pub history_id: Option<HistoryId>,
    /// Target's version at the time the edge was cut
    pub version_id: Option<u64>,
    /// Target's location
    pub location_id: Option<u64>,
}

impl RefMarker {
    /// Create a marker that only knows the target's object identity
    pub fn new(target: ObjectId, kind: ReferenceKind) -> Self {
        Self {
            target,
            kind,
            history_id: None,
            version_id: None,
            location_id: None,
        }
    }

    /// Create a marker for `target`, capturing its versioning stamp from `graph`
    pub fn for_target(graph: &ObjectGraph, target: ObjectId, kind: ReferenceKind) -> Self {
        let mut marker = Self::new(target, kind);
        if let Some(obj) = graph.get(target) {
            if let Some(history_id) = obj.versioning.history_id {
                marker.history_id = Some(history_id);
                marker.version_id = obj.versioning.version_id;
                marker.location_id = obj.versioning.location_id;
            }
        }
        marker
    }

    /// Check if this is an inside reference
    pub fn is_inside(&self) -> bool {
        self.kind == ReferenceKind::Inside
    }
}

/// One step of an [`AttrPath`] below the attribute itself
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PathSegment {
    /// Map key
    Key(String),
    /// List index
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) => write!(f, "{}", k),
            PathSegment::Index(i) => write!(f, "[{}]", i),
        }
    }
}

/// Path to a value inside an object: attribute name plus nested segments
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttrPath {
    /// Top-level attribute name
    pub attribute: String,
    /// Segments below the attribute
    pub segments: Vec<PathSegment>,
}

impl AttrPath {
    /// Path addressing a whole attribute
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            segments: Vec::new(),
        }
    }

    /// Path from an attribute and nested segments
    pub fn with_segments(attribute: impl Into<String>, segments: Vec<PathSegment>) -> Self {
        Self {
            attribute: attribute.into(),
            segments,
        }
    }

    /// Extend with a map key
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.segments.push(PathSegment::Key(key.into()));
        self
    }

    /// Extend with a list index
    pub fn index(mut self, index: usize) -> Self {
        self.segments.push(PathSegment::Index(index));
        self
    }

    /// Check if the path addresses a whole attribute
    pub fn is_attribute(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for AttrPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.attribute)?;
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

/// Locates one edge of a graph: the owning object and the path to the value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeAdapter {
    /// Object owning the attribute
    pub parent: ObjectId,
    /// Path inside the owner
    pub path: AttrPath,
    /// Type name of the target, when known
    pub type_name: Option<String>,
}

impl AttributeAdapter {
    /// Create an adapter
    pub fn new(parent: ObjectId, path: AttrPath) -> Self {
        Self {
            parent,
            path,
            type_name: None,
        }
    }

    /// Attach the target's type name
    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// Name of the top-level attribute
    pub fn attribute_name(&self) -> &str {
        &self.path.attribute
    }

    /// Read the addressed value
    ///
    /// Returns `None` if the owner or any step of the path is gone (a
    /// modifier may have removed it).
    pub fn get<'g>(&self, graph: &'g ObjectGraph) -> Option<&'g Value> {
        let mut value = graph.get(self.parent)?.get(&self.path.attribute)?;
        for segment in &self.path.segments {
            value = value.child(segment)?;
        }
        Some(value)
    }

    /// Overwrite the addressed value
    ///
    /// A missing final map key is inserted. Returns `false` if the owner
    /// or an intermediate step is missing.
    pub fn set(&self, graph: &mut ObjectGraph, new_value: Value) -> bool {
        let Some(obj) = graph.get_mut(self.parent) else {
            return false;
        };
        let Some((last, init)) = self.path.segments.split_last() else {
            obj.set(self.path.attribute.clone(), new_value);
            return true;
        };
        let Some(mut value) = obj.attr_mut(&self.path.attribute) else {
            return false;
        };
        for segment in init {
            match value.child_mut(segment) {
                Some(next) => value = next,
                None => return false,
            }
        }
        match (value, last) {
            (Value::Map(m), PathSegment::Key(k)) => {
                m.insert(k.clone(), new_value);
                true
            }
            (Value::List(l), PathSegment::Index(i)) if *i < l.len() => {
                l[*i] = new_value;
                true
            }
            _ => false,
        }
    }

    /// Remove the addressed value and return it
    ///
    /// Removing a list element shifts the elements after it.
    pub fn remove(&self, graph: &mut ObjectGraph) -> Option<Value> {
        let obj = graph.get_mut(self.parent)?;
        let Some((last, init)) = self.path.segments.split_last() else {
            return obj.remove(&self.path.attribute);
        };
        let mut value = obj.attr_mut(&self.path.attribute)?;
        for segment in init {
            value = value.child_mut(segment)?;
        }
        match (value, last) {
            (Value::Map(m), PathSegment::Key(k)) => m.remove(k),
            (Value::List(l), PathSegment::Index(i)) if *i < l.len() => Some(l.remove(*i)),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.parent, self.path)
    }
}
