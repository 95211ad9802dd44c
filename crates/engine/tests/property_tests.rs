//! Property tests for versioning invariants

use proptest::prelude::*;

use archivist_core::{
    ContentObject, ObjectGraph, SecurityContext, SysMetadataInput, Value, VersionSelector,
};
use archivist_engine::{ArchivistConfig, Repository};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Each save appends exactly one version with the next ordinal, and
    /// every version reconstructs the title it was saved with.
    #[test]
    fn prop_versions_are_dense_and_monotonic(titles in prop::collection::vec("[a-z]{1,8}", 1..8)) {
        let repo = Repository::new(ArchivistConfig::default()).unwrap();
        let mut graph = ObjectGraph::new();
        let doc = graph.insert(ContentObject::new("Document").with("title", titles[0].as_str()));
        let ctx = SecurityContext::anonymous();
        let first = repo
            .apply_version_control(&mut graph, doc, SysMetadataInput::new(), Value::Null, &ctx)
            .unwrap();
        prop_assert_eq!(first.version_id, 0);

        for (i, title) in titles.iter().enumerate().skip(1) {
            graph.set_attr(doc, "title", title.as_str());
            let receipt = repo
                .save(&mut graph, doc, SysMetadataInput::new(), Value::Null, &ctx)
                .unwrap();
            prop_assert_eq!(receipt.version_id, i as u64);
            prop_assert_eq!(graph.get(doc).unwrap().versioning.version_id, Some(i as u64));
        }

        let history = repo.get_history(&graph, doc, &[]).unwrap();
        prop_assert_eq!(history.len(), titles.len() as u64);
        for (i, title) in titles.iter().enumerate() {
            let version = history.at(VersionSelector::Index(i as u64)).unwrap();
            prop_assert_eq!(version.object().get("title"), Some(&Value::from(title.as_str())));
        }
    }

    /// Children are cut as outside references and never copied; every other
    /// edge is followed and copied exactly once.
    #[test]
    fn prop_edges_are_partitioned(
        children in 0usize..5,
        related in 0usize..5,
        shared in any::<bool>(),
    ) {
        let repo = Repository::new(ArchivistConfig::default()).unwrap();
        let mut graph = ObjectGraph::new();

        let child_refs: Vec<Value> = (0..children)
            .map(|i| {
                Value::Ref(graph.insert(ContentObject::new("Document").with("title", i as i64)))
            })
            .collect();
        let related_ids: Vec<_> = (0..related)
            .map(|i| graph.insert(ContentObject::new("Image").with("title", i as i64)))
            .collect();
        let mut related_refs: Vec<Value> = related_ids.iter().map(|id| Value::Ref(*id)).collect();
        if shared {
            // the same target twice is still copied once
            related_refs.extend(related_ids.first().map(|id| Value::Ref(*id)));
        }
        let folder = graph.insert(
            ContentObject::new("Folder")
                .with("children", child_refs)
                .with("related", related_refs),
        );

        repo.apply_version_control(
            &mut graph,
            folder,
            SysMetadataInput::new(),
            Value::Null,
            &SecurityContext::anonymous(),
        )
        .unwrap();
        let prepared = repo
            .archivist()
            .prepare(
                &mut graph,
                folder,
                Value::Null,
                SysMetadataInput::new(),
                &SecurityContext::anonymous(),
            )
            .unwrap();

        prop_assert_eq!(prepared.clone.outside_refs.len(), children);
        prop_assert_eq!(prepared.original.outside_refs.len(), children);
        prop_assert!(prepared.clone.inside_refs.is_empty());
        prop_assert_eq!(prepared.clone.object.graph().len(), 1 + related);
        for adapter in &prepared.clone.outside_refs {
            prop_assert_eq!(adapter.attribute_name(), "children");
        }
    }
}
