//! Attribute values of content objects
//!
//! ## Value Model
//!
//! Plain data variants (`Null`, `Bool`, `Int`, `Float`, `String`, `Bytes`,
//! `List`, `Map`) plus two edge variants:
//!
//! - `Ref(ObjectId)`: a structural edge to another object of the *same* graph
//! - `Marker(RefMarker)`: a cut edge; the target lives outside the graph and
//!   only its identity is recorded
//!
//! Float equality follows IEEE-754 (`NaN != NaN`). Different variants are
//! never equal (`Int(1) != Float(1.0)`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::reference::{PathSegment, RefMarker};
use crate::types::ObjectId;

/// Attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point (IEEE-754)
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Raw bytes
    Bytes(Vec<u8>),
    /// Ordered list of values
    List(Vec<Value>),
    /// String-keyed map, ordered by key
    Map(BTreeMap<String, Value>),
    /// Edge to another object of the same graph
    Ref(ObjectId),
    /// Cut edge carrying only the target's identity
    Marker(RefMarker),
}

impl Value {
    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::Bytes(_) => "Bytes",
            Value::List(_) => "List",
            Value::Map(_) => "Map",
            Value::Ref(_) => "Ref",
            Value::Marker(_) => "Marker",
        }
    }

    /// Check if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get as &str if this is a String value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as i64 if this is an Int value
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as a slice if this is a List value
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// Get as a map if this is a Map value
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Get the target if this is a Ref value
    pub fn as_object_ref(&self) -> Option<ObjectId> {
        match self {
            Value::Ref(id) => Some(*id),
            _ => None,
        }
    }

    /// Get the marker if this is a Marker value
    pub fn as_marker(&self) -> Option<&RefMarker> {
        match self {
            Value::Marker(m) => Some(m),
            _ => None,
        }
    }

    /// Get a nested value by one path segment
    pub fn child(&self, segment: &PathSegment) -> Option<&Value> {
        match (self, segment) {
            (Value::Map(m), PathSegment::Key(k)) => m.get(k),
            (Value::List(l), PathSegment::Index(i)) => l.get(*i),
            _ => None,
        }
    }

    /// Get a mutable nested value by one path segment
    pub fn child_mut(&mut self, segment: &PathSegment) -> Option<&mut Value> {
        match (self, segment) {
            (Value::Map(m), PathSegment::Key(k)) => m.get_mut(k),
            (Value::List(l), PathSegment::Index(i)) => l.get_mut(*i),
            _ => None,
        }
    }

    /// Visit every `Ref` edge reachable inside this value, with its
    /// segment path relative to the value.
    pub fn for_each_ref(&self, f: &mut impl FnMut(&[PathSegment], ObjectId)) {
        fn walk(
            value: &Value,
            path: &mut Vec<PathSegment>,
            f: &mut impl FnMut(&[PathSegment], ObjectId),
        ) {
            match value {
                Value::Ref(id) => f(path.as_slice(), *id),
                Value::List(items) => {
                    for (i, item) in items.iter().enumerate() {
                        path.push(PathSegment::Index(i));
                        walk(item, path, f);
                        path.pop();
                    }
                }
                Value::Map(entries) => {
                    for (k, item) in entries {
                        path.push(PathSegment::Key(k.clone()));
                        walk(item, path, f);
                        path.pop();
                    }
                }
                _ => {}
            }
        }
        walk(self, &mut Vec::new(), f)
    }

    /// Visit every `Marker` reachable inside this value, with its segment
    /// path relative to the value.
    pub fn for_each_marker(&self, f: &mut impl FnMut(&[PathSegment], &RefMarker)) {
        fn walk(
            value: &Value,
            path: &mut Vec<PathSegment>,
            f: &mut impl FnMut(&[PathSegment], &RefMarker),
        ) {
            match value {
                Value::Marker(m) => f(path.as_slice(), m),
                Value::List(items) => {
                    for (i, item) in items.iter().enumerate() {
                        path.push(PathSegment::Index(i));
                        walk(item, path, f);
                        path.pop();
                    }
                }
                Value::Map(entries) => {
                    for (k, item) in entries {
                        path.push(PathSegment::Key(k.clone()));
                        walk(item, path, f);
                        path.pop();
                    }
                }
                _ => {}
            }
        }
        walk(self, &mut Vec::new(), f)
    }

    /// Check if the value holds any edge (`Ref` or `Marker`)
    pub fn has_edges(&self) -> bool {
        match self {
            Value::Ref(_) | Value::Marker(_) => true,
            Value::List(items) => items.iter().any(Value::has_edges),
            Value::Map(entries) => entries.values().any(Value::has_edges),
            _ => false,
        }
    }
}

// ============================================================================
// From implementations for ergonomic API usage
// ============================================================================

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<ObjectId> for Value {
    fn from(id: ObjectId) -> Self {
        Value::Ref(id)
    }
}

impl From<RefMarker> for Value {
    fn from(m: RefMarker) -> Self {
        Value::Marker(m)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Value::Map(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::ReferenceKind;

    #[test]
    fn test_different_variants_never_equal() {
        assert_ne!(Value::Int(1), Value::Float(1.0));
        assert_ne!(Value::String("a".into()), Value::Bytes(b"a".to_vec()));
    }

    #[test]
    fn test_float_nan_not_equal() {
        assert_ne!(Value::Float(f64::NAN), Value::Float(f64::NAN));
    }

    #[test]
    fn test_for_each_ref_reports_paths() {
        let mut children = BTreeMap::new();
        children.insert("a".to_string(), Value::Ref(ObjectId::from_raw(1)));
        children.insert(
            "b".to_string(),
            Value::List(vec![Value::Null, Value::Ref(ObjectId::from_raw(2))]),
        );
        let value = Value::Map(children);

        let mut seen = Vec::new();
        value.for_each_ref(&mut |path, id| seen.push((path.to_vec(), id)));

        assert_eq!(
            seen,
            vec![
                (vec![PathSegment::Key("a".into())], ObjectId::from_raw(1)),
                (
                    vec![PathSegment::Key("b".into()), PathSegment::Index(1)],
                    ObjectId::from_raw(2)
                ),
            ]
        );
    }

    #[test]
    fn test_has_edges() {
        assert!(!Value::from("plain").has_edges());
        assert!(Value::List(vec![Value::Ref(ObjectId::from_raw(3))]).has_edges());
        let marker = RefMarker::new(ObjectId::from_raw(3), ReferenceKind::Outside);
        assert!(Value::Marker(marker).has_edges());
    }

    #[test]
    fn test_child_navigation() {
        let value = Value::List(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(value.child(&PathSegment::Index(1)), Some(&Value::Int(2)));
        assert_eq!(value.child(&PathSegment::Key("x".into())), None);
    }
}
