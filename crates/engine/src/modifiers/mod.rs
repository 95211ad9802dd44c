//! Modifier registry
//!
//! Modifiers are the pluggable policy that decides which attributes of an
//! object are references, which are stored outside the clone, and how a
//! reconstruction is merged with the live working copy.
//!
//! Registrations are kept in order, each with an `enabled` flag and a
//! `Condition` selecting the objects it applies to. The registry
//! implements `ReferenceClassifier` with this merge policy:
//!
//! - referenced attributes: union; the earlier registration wins a name
//! - edge classification: first modifier with an opinion wins
//! - before-save, reattach, after-retrieve: every applicable modifier runs
//!   in registration order and results are concatenated
//!
//! Preserved live values are captured before any modifier runs.

mod standard;

pub use standard::{ChildrenReferences, RetainAttributes, SaveByReference};

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use archivist_core::{
    ArchivistResult, AttrPath, ClassifiedRefs, ContentObject, DetachedObject, EdgeClassifier,
    EdgeDisposition, ObjectGraph, ObjectId, RefMarker, ReferenceClassifier, ReferenceKind,
    ReferencedData, RetrieveOutcome, Value,
};

use crate::config::{ChildrenPolicy, ModifierConfig};

/// Capability interface of a modifier
///
/// Every hook has a no-op default, so a modifier only implements the hooks
/// it cares about.
pub trait Modifier: Send + Sync {
    /// Whether the modifier has anything to do for `obj`
    ///
    /// Checked in addition to the registration's condition.
    fn applies_to(&self, _obj: &ContentObject) -> bool {
        true
    }

    /// Attributes of `obj` to store as referenced data
    fn referenced_attributes(&self, _graph: &ObjectGraph, _obj: ObjectId) -> ReferencedData {
        ReferencedData::new()
    }

    /// Opinion on one outgoing edge met while cloning `root`
    fn classify_edge(
        &self,
        _graph: &ObjectGraph,
        _root: ObjectId,
        _parent: ObjectId,
        _path: &AttrPath,
        _target: ObjectId,
    ) -> Option<EdgeDisposition> {
        None
    }

    /// Adjust the clone before it is stored
    fn before_save(
        &self,
        _graph: &ObjectGraph,
        _obj: ObjectId,
        _clone: &mut DetachedObject,
    ) -> ClassifiedRefs {
        ClassifiedRefs::default()
    }

    /// Put this modifier's referenced data back onto a reconstruction
    fn reattach(&self, _clone: &mut DetachedObject, _referenced_data: &ReferencedData) {}

    /// Merge a reconstruction with the live working copy
    fn after_retrieve(
        &self,
        _graph: &ObjectGraph,
        _live: Option<ObjectId>,
        _clone: &mut DetachedObject,
    ) -> RetrieveOutcome {
        RetrieveOutcome::default()
    }
}

/// Which objects a registration applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Every object
    Always,
    /// No object
    Never,
    /// Objects whose type is listed
    TypeIn(Vec<String>),
    /// Objects whose type is not listed
    TypeNotIn(Vec<String>),
}

impl Condition {
    /// Evaluate against an object
    pub fn matches(&self, obj: &ContentObject) -> bool {
        match self {
            Condition::Always => true,
            Condition::Never => false,
            Condition::TypeIn(types) => types.iter().any(|t| *t == obj.type_name),
            Condition::TypeNotIn(types) => !types.iter().any(|t| *t == obj.type_name),
        }
    }
}

struct Registration {
    id: String,
    modifier: Arc<dyn Modifier>,
    enabled: bool,
    condition: Condition,
}

/// Ordered set of modifiers
#[derive(Default)]
pub struct ModifierRegistry {
    registrations: RwLock<Vec<Registration>>,
}

impl ModifierRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the standard modifier set described by `config`
    ///
    /// Order: workflow retention, permission retention, children
    /// references, save-by-reference.
    pub fn from_config(config: &ModifierConfig) -> ArchivistResult<Self> {
        let registry = Self::new();
        registry.register(
            "retain_workflow",
            Arc::new(RetainAttributes::workflow()),
            config.retain_workflow,
            Condition::Always,
        );
        registry.register(
            "retain_permissions",
            Arc::new(RetainAttributes::permissions()),
            config.retain_permissions,
            Condition::Always,
        );
        let policy = config.children_policy()?;
        if !config.inside_children_types.is_empty() {
            registry.register(
                "inside_children",
                Arc::new(ChildrenReferences::new(
                    config.children_attribute.clone(),
                    ChildrenPolicy::Inside,
                )),
                true,
                Condition::TypeIn(config.inside_children_types.clone()),
            );
        }
        let children_condition = if config.inside_children_types.is_empty() {
            Condition::Always
        } else {
            Condition::TypeNotIn(config.inside_children_types.clone())
        };
        registry.register(
            "children",
            Arc::new(ChildrenReferences::new(
                config.children_attribute.clone(),
                policy,
            )),
            true,
            children_condition,
        );
        registry.register(
            "save_by_reference",
            Arc::new(SaveByReference::new(config.by_reference.clone())),
            !config.by_reference.is_empty(),
            Condition::Always,
        );
        Ok(registry)
    }

    /// Append a registration, replacing one with the same id in place
    pub fn register(
        &self,
        id: impl Into<String>,
        modifier: Arc<dyn Modifier>,
        enabled: bool,
        condition: Condition,
    ) {
        let id = id.into();
        let mut registrations = self.registrations.write();
        let registration = Registration {
            id: id.clone(),
            modifier,
            enabled,
            condition,
        };
        match registrations.iter_mut().find(|r| r.id == id) {
            Some(existing) => *existing = registration,
            None => registrations.push(registration),
        }
        debug!(target: "archivist::modifier", id = %id, "Modifier registered");
    }

    /// Change the flag and/or condition of a registration
    ///
    /// Returns `false` if no registration has the id.
    pub fn edit(&self, id: &str, enabled: Option<bool>, condition: Option<Condition>) -> bool {
        let mut registrations = self.registrations.write();
        let Some(registration) = registrations.iter_mut().find(|r| r.id == id) else {
            return false;
        };
        if let Some(enabled) = enabled {
            registration.enabled = enabled;
        }
        if let Some(condition) = condition {
            registration.condition = condition;
        }
        debug!(
            target: "archivist::modifier",
            id,
            enabled = registration.enabled,
            "Modifier edited"
        );
        true
    }

    /// Remove a registration
    pub fn unregister(&self, id: &str) -> bool {
        let mut registrations = self.registrations.write();
        let before = registrations.len();
        registrations.retain(|r| r.id != id);
        registrations.len() != before
    }

    /// Registration ids in order
    pub fn ids(&self) -> Vec<String> {
        self.registrations.read().iter().map(|r| r.id.clone()).collect()
    }

    /// Check if a registration is enabled
    pub fn is_enabled(&self, id: &str) -> Option<bool> {
        self.registrations
            .read()
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.enabled)
    }

    /// Modifiers applying to `obj`, in registration order
    pub fn applicable(&self, graph: &ObjectGraph, obj: ObjectId) -> Vec<Arc<dyn Modifier>> {
        let Some(object) = graph.get(obj) else {
            return Vec::new();
        };
        self.registrations
            .read()
            .iter()
            .filter(|r| r.enabled && r.condition.matches(object) && r.modifier.applies_to(object))
            .map(|r| Arc::clone(&r.modifier))
            .collect()
    }
}

impl fmt::Debug for ModifierRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModifierRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}

/// Edge classifier bound to the root of one clone
struct RegistryEdges {
    root: ObjectId,
    modifiers: Vec<Arc<dyn Modifier>>,
}

impl EdgeClassifier for RegistryEdges {
    fn classify(
        &self,
        graph: &ObjectGraph,
        parent: ObjectId,
        path: &AttrPath,
        target: ObjectId,
    ) -> EdgeDisposition {
        self.modifiers
            .iter()
            .find_map(|m| m.classify_edge(graph, self.root, parent, path, target))
            .unwrap_or(EdgeDisposition::Follow)
    }
}

impl ReferenceClassifier for ModifierRegistry {
    fn referenced_attributes(&self, graph: &ObjectGraph, obj: ObjectId) -> ReferencedData {
        let mut merged = ReferencedData::new();
        for modifier in self.applicable(graph, obj) {
            for (name, value) in modifier.referenced_attributes(graph, obj) {
                merged.entry(name).or_insert(value);
            }
        }
        merged
    }

    fn clone_hooks<'a>(
        &'a self,
        graph: &'a ObjectGraph,
        obj: ObjectId,
    ) -> Option<Box<dyn EdgeClassifier + 'a>> {
        let modifiers = self.applicable(graph, obj);
        if modifiers.is_empty() {
            return None;
        }
        Some(Box::new(RegistryEdges {
            root: obj,
            modifiers,
        }))
    }

    fn before_save(
        &self,
        graph: &ObjectGraph,
        obj: ObjectId,
        clone: &mut DetachedObject,
    ) -> ClassifiedRefs {
        let mut refs = ClassifiedRefs::default();
        for modifier in self.applicable(graph, obj) {
            refs.extend(modifier.before_save(graph, obj, clone));
        }
        refs
    }

    fn reattach_referenced_attributes(
        &self,
        clone: &mut DetachedObject,
        referenced_data: &ReferencedData,
    ) {
        if referenced_data.is_empty() {
            return;
        }
        let modified = clone.object().modified();
        let root = clone.root();
        for modifier in self.applicable(clone.graph(), root) {
            modifier.reattach(clone, referenced_data);
        }
        // the reconstruction keeps the stamp it was saved with
        clone.object_mut().set_modified(modified);
    }

    fn after_retrieve(
        &self,
        graph: &ObjectGraph,
        live: Option<ObjectId>,
        clone: &mut DetachedObject,
        preserve: &[String],
    ) -> RetrieveOutcome {
        let mut outcome = RetrieveOutcome::default();
        if let Some(live_obj) = live.and_then(|id| graph.get(id)) {
            for name in preserve {
                if let Some(value) = live_obj.get(name) {
                    outcome.preserved_data.insert(name.clone(), value.clone());
                }
            }
        }
        let root = clone.root();
        let modifiers = match live.filter(|id| graph.contains(*id)) {
            Some(id) => self.applicable(graph, id),
            None => self.applicable(clone.graph(), root),
        };
        for modifier in modifiers {
            outcome.extend(modifier.after_retrieve(graph, live, clone));
        }
        outcome
    }
}

/// Live value converted for use inside a detached object
///
/// `Ref`s into the live graph become outside markers so that restoring the
/// detached object resolves them back to the same live objects.
pub(crate) fn detach_value(graph: &ObjectGraph, value: &Value) -> Value {
    match value {
        Value::Ref(target) => {
            Value::Marker(RefMarker::for_target(graph, *target, ReferenceKind::Outside))
        }
        Value::List(items) => Value::List(items.iter().map(|v| detach_value(graph, v)).collect()),
        Value::Map(entries) => Value::Map(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), detach_value(graph, v)))
                .collect::<BTreeMap<_, _>>(),
        ),
        other => other.clone(),
    }
}
