//! History identity issuance

use tracing::debug;

use archivist_core::{HistoryId, HistoryIdIssuer, ObjectGraph, ObjectId};

/// Issues random UUID v4 history identities
///
/// An object that already carries an identity keeps it.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIssuer;

impl HistoryIdIssuer for UuidIssuer {
    fn register(&self, graph: &ObjectGraph, obj: ObjectId) -> HistoryId {
        if let Some(existing) = graph.get(obj).and_then(|o| o.versioning.history_id) {
            return existing;
        }
        let history_id = HistoryId::new();
        debug!(
            target: "archivist::prepare",
            object = %obj,
            history_id = %history_id,
            "History id issued"
        );
        history_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archivist_core::ContentObject;

    #[test]
    fn test_issues_fresh_ids() {
        let mut graph = ObjectGraph::new();
        let a = graph.insert(ContentObject::new("Document"));
        let b = graph.insert(ContentObject::new("Document"));
        assert_ne!(UuidIssuer.register(&graph, a), UuidIssuer.register(&graph, b));
    }

    #[test]
    fn test_keeps_existing_id() {
        let mut graph = ObjectGraph::new();
        let mut doc = ContentObject::new("Document");
        let history_id = HistoryId::new();
        doc.versioning.history_id = Some(history_id);
        let doc = graph.insert(doc);
        assert_eq!(UuidIssuer.register(&graph, doc), history_id);
    }
}
