//! Facade-level tests: configuration files, tracing and the public API

mod common;

use archivist::{
    ArchivistConfig, ContentObject, ObjectGraph, SecurityContext, SysMetadataInput, Value,
    VersionSelector, CONFIG_FILE_NAME,
};
use tempfile::TempDir;

#[test]
fn test_repository_from_config_file() {
    common::init_tracing();
    let dir = TempDir::new().unwrap();
    let repo = common::repository_in(dir.path());
    assert!(dir.path().join(CONFIG_FILE_NAME).exists());
    assert_eq!(repo.config(), &ArchivistConfig::default());
}

#[test]
fn test_inside_policy_from_config_file() {
    common::init_tracing();
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        "autoregister = true\n\n[modifiers]\nchildren_policy = \"inside\"\n",
    )
    .unwrap();
    let repo = common::repository_in(dir.path());

    let mut graph = ObjectGraph::new();
    let (folder, docs) = common::folder_with_documents(&mut graph, 3);
    repo.save(
        &mut graph,
        folder,
        SysMetadataInput::new().comment("autoregistered"),
        Value::Null,
        &SecurityContext::new("editor"),
    )
    .unwrap();

    for doc in &docs {
        assert_eq!(repo.get_history(&graph, *doc, &[]).unwrap().len(), 1);
    }

    graph.set_attr(docs[2], "title", "changed");
    repo.revert(&mut graph, folder, VersionSelector::Latest).unwrap();
    assert_eq!(graph.get(docs[2]).unwrap().get_str("title"), Some("doc 2"));
}

#[test]
fn test_history_walk_through_facade() {
    common::init_tracing();
    let repo = archivist::Repository::new(ArchivistConfig::default()).unwrap();
    let mut graph = ObjectGraph::new();
    let doc = graph.insert(ContentObject::new("Document").with("title", "first"));
    let ctx = SecurityContext::anonymous();
    repo.apply_version_control(
        &mut graph,
        doc,
        SysMetadataInput::new().comment("c0"),
        Value::Null,
        &ctx,
    )
    .unwrap();
    graph.set_attr(doc, "title", "second");
    repo.save(&mut graph, doc, SysMetadataInput::new().comment("c1"), Value::Null, &ctx)
        .unwrap();

    let history = repo.get_history(&graph, doc, &[]).unwrap();
    let comments: Vec<String> = history
        .iter()
        .map(|v| v.unwrap().sys_metadata.comment)
        .collect();
    assert_eq!(comments, vec!["c0", "c1"]);
}
