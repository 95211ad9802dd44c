//! End-to-end versioning of single documents
//!
//! Covers the save/retrieve/revert lifecycle, the error taxonomy, preserve
//! semantics and workflow retention.

use archivist_core::{
    ContentObject, ObjectGraph, ObjectId, SecurityContext, SysMetadataInput, Value,
    VersionSelector,
};
use archivist_engine::{ArchivistConfig, Repository};

fn repository() -> Repository {
    Repository::new(ArchivistConfig::default()).unwrap()
}

fn ctx() -> SecurityContext {
    SecurityContext::new("editor")
}

fn version_control(repo: &Repository, graph: &mut ObjectGraph, obj: ObjectId) {
    repo.apply_version_control(graph, obj, SysMetadataInput::new(), Value::Null, &ctx())
        .unwrap();
}

fn save(repo: &Repository, graph: &mut ObjectGraph, obj: ObjectId, comment: &str) -> u64 {
    repo.save(
        graph,
        obj,
        SysMetadataInput::new().comment(comment),
        Value::Null,
        &ctx(),
    )
    .unwrap()
    .version_id
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_save_retrieve_revert_scenario() {
    let repo = repository();
    let mut graph = ObjectGraph::new();
    let doc = graph.insert(ContentObject::new("Document").with("title", "v1"));

    version_control(&repo, &mut graph, doc);
    assert_eq!(repo.get_history(&graph, doc, &[]).unwrap().len(), 1);
    assert_eq!(graph.get(doc).unwrap().versioning.version_id, Some(0));

    graph.set_attr(doc, "title", "v2");
    assert_eq!(save(&repo, &mut graph, doc, "second"), 1);
    assert_eq!(repo.get_history(&graph, doc, &[]).unwrap().len(), 2);
    assert_eq!(graph.get(doc).unwrap().versioning.version_id, Some(1));

    graph.set_attr(doc, "title", "v3");
    let v0 = repo
        .retrieve(&graph, doc, VersionSelector::Index(0), &[])
        .unwrap();
    assert_eq!(v0.object().get("title"), Some(&Value::from("v1")));
    assert_eq!(graph.get(doc).unwrap().get_str("title"), Some("v3"));

    repo.revert(&mut graph, doc, VersionSelector::Index(0)).unwrap();
    assert_eq!(graph.get(doc).unwrap().get_str("title"), Some("v1"));
}

#[test]
fn test_metadata_is_recorded() {
    let repo = repository();
    let mut graph = ObjectGraph::new();
    let doc = graph.insert(ContentObject::new("Document"));
    repo.apply_version_control(
        &mut graph,
        doc,
        SysMetadataInput::new().comment("initial").originator("import"),
        Value::from("app data"),
        &ctx(),
    )
    .unwrap();

    let v0 = repo
        .retrieve(&graph, doc, VersionSelector::Latest, &[])
        .unwrap();
    assert_eq!(v0.sys_metadata.comment, "initial");
    assert_eq!(v0.sys_metadata.originator.as_deref(), Some("import"));
    assert_eq!(v0.sys_metadata.principal, "editor");
    assert_eq!(v0.app_metadata, Value::from("app data"));
}

#[test]
fn test_history_iteration_yields_len_versions() {
    let repo = repository();
    let mut graph = ObjectGraph::new();
    let doc = graph.insert(ContentObject::new("Document").with("title", "0"));
    version_control(&repo, &mut graph, doc);
    for i in 1..4 {
        graph.set_attr(doc, "title", i.to_string());
        save(&repo, &mut graph, doc, "edit");
    }

    let history = repo.get_history(&graph, doc, &[]).unwrap();
    assert_eq!(history.len(), 4);
    let titles: Vec<String> = history
        .iter()
        .map(|v| v.unwrap().object().get("title").unwrap().as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, vec!["0", "1", "2", "3"]);

    // a fresh iterator starts over
    assert_eq!((&history).into_iter().count(), 4);
}

#[test]
fn test_is_up_to_date() {
    let repo = repository();
    let mut graph = ObjectGraph::new();
    let doc = graph.insert(ContentObject::new("Document").with("title", "v1"));
    version_control(&repo, &mut graph, doc);
    assert!(repo.is_up_to_date(&graph, doc, VersionSelector::Latest).unwrap());

    graph.set_attr(doc, "title", "v2");
    assert!(!repo.is_up_to_date(&graph, doc, VersionSelector::Latest).unwrap());

    save(&repo, &mut graph, doc, "second");
    assert!(repo.is_up_to_date(&graph, doc, VersionSelector::Latest).unwrap());
    assert!(!repo.is_up_to_date(&graph, doc, VersionSelector::Index(0)).unwrap());
}

#[test]
fn test_copy_has_no_history() {
    let repo = repository();
    let mut graph = ObjectGraph::new();
    let doc = graph.insert(ContentObject::new("Document").with("title", "v1"));
    version_control(&repo, &mut graph, doc);

    let copy = graph.copy_object(doc).unwrap();
    assert_eq!(graph.get(copy).unwrap().versioning.history_id, None);
    assert!(repo.get_history(&graph, copy, &[]).unwrap_err().is_unregistered());
    assert!(repo.query_history(&graph, copy, &[]).unwrap().is_empty());
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_save_before_register_is_save_ordering() {
    let repo = repository();
    let mut graph = ObjectGraph::new();
    let doc = graph.insert(ContentObject::new("Document"));

    let err = repo
        .save(&mut graph, doc, SysMetadataInput::new(), Value::Null, &ctx())
        .unwrap_err();
    assert!(err.is_save_ordering());
    assert!(!err.is_unregistered());
}

#[test]
fn test_retrieve_out_of_range() {
    let repo = repository();
    let mut graph = ObjectGraph::new();
    let doc = graph.insert(ContentObject::new("Document"));
    version_control(&repo, &mut graph, doc);
    graph.set_attr(doc, "title", "v2");
    save(&repo, &mut graph, doc, "second");

    let err = repo
        .retrieve(&graph, doc, VersionSelector::Index(5), &[])
        .unwrap_err();
    assert!(err.is_retrieve_range());
    assert!(err.to_string().contains('5'));
}

#[test]
fn test_unregistered_identity() {
    let repo = repository();
    let mut graph = ObjectGraph::new();
    let doc = graph.insert(ContentObject::new("Document"));

    let err = repo
        .retrieve(&graph, doc, VersionSelector::Latest, &[])
        .unwrap_err();
    assert!(err.is_unregistered());
    assert!(repo.get_history(&graph, doc, &[]).unwrap_err().is_unregistered());

    let history = repo.query_history(&graph, doc, &[]).unwrap();
    assert_eq!(history.len(), 0);
    assert_eq!(history.iter().count(), 0);
}

// ============================================================================
// Preserve and retention
// ============================================================================

#[test]
fn test_preserved_data_captures_live_value() {
    let repo = repository();
    let mut graph = ObjectGraph::new();
    let doc = graph.insert(ContentObject::new("Document").with("title", "stored"));
    version_control(&repo, &mut graph, doc);
    graph.set_attr(doc, "title", "live");

    let version = repo
        .retrieve(&graph, doc, VersionSelector::Index(0), &["title".to_string()])
        .unwrap();
    assert_eq!(version.preserved_data["title"], Value::from("live"));
    assert_eq!(version.object().get("title"), Some(&Value::from("stored")));
}

#[test]
fn test_workflow_state_retained_on_retrieve_and_revert() {
    let repo = repository();
    let mut graph = ObjectGraph::new();
    let doc = graph.insert(
        ContentObject::new("Document")
            .with("title", "v1")
            .with("review_state", "private")
            .with("View_Permission", "Owner"),
    );
    version_control(&repo, &mut graph, doc);

    graph.set_attr(doc, "title", "v2");
    graph.set_attr(doc, "review_state", "published");
    graph.set_attr(doc, "View_Permission", "Anonymous");

    let v0 = repo
        .retrieve(&graph, doc, VersionSelector::Index(0), &[])
        .unwrap();
    assert_eq!(v0.object().get("review_state"), Some(&Value::from("published")));
    assert_eq!(v0.object().get("View_Permission"), Some(&Value::from("Anonymous")));

    repo.revert(&mut graph, doc, VersionSelector::Index(0)).unwrap();
    let reverted = graph.get(doc).unwrap();
    assert_eq!(reverted.get_str("title"), Some("v1"));
    assert_eq!(reverted.get_str("review_state"), Some("published"));
    assert_eq!(reverted.get_str("View_Permission"), Some("Anonymous"));
}

#[test]
fn test_retention_can_be_disabled() {
    let mut config = ArchivistConfig::default();
    config.modifiers.retain_workflow = false;
    config.revert_preserve.clear();
    let repo = Repository::new(config).unwrap();
    let mut graph = ObjectGraph::new();
    let doc = graph.insert(ContentObject::new("Document").with("review_state", "private"));
    version_control(&repo, &mut graph, doc);
    graph.set_attr(doc, "review_state", "published");

    repo.revert(&mut graph, doc, VersionSelector::Index(0)).unwrap();
    assert_eq!(graph.get(doc).unwrap().get_str("review_state"), Some("private"));
}

#[test]
fn test_by_reference_attribute_roundtrip() {
    let repo = repository();
    let mut graph = ObjectGraph::new();
    let doc = graph.insert(
        ContentObject::new("File")
            .with("title", "report")
            .with("file", Value::Bytes(vec![1, 2, 3])),
    );
    version_control(&repo, &mut graph, doc);
    graph.set_attr(doc, "file", Value::Bytes(vec![9]));

    let v0 = repo
        .retrieve(&graph, doc, VersionSelector::Index(0), &[])
        .unwrap();
    assert_eq!(v0.object().get("file"), Some(&Value::Bytes(vec![1, 2, 3])));
}
