//! Shared helpers for the facade integration tests.
//! Import via `mod common;`.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Once;

use archivist::{
    ArchivistConfig, ContentObject, ObjectGraph, ObjectId, Repository, CONFIG_FILE_NAME,
};

static INIT_TRACING: Once = Once::new();

/// Route log events to the test writer.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

/// Repository configured from `archivist.toml` in `dir`, created with
/// defaults if missing.
pub fn repository_in(dir: &Path) -> Repository {
    let path = dir.join(CONFIG_FILE_NAME);
    ArchivistConfig::write_default_if_missing(&path).unwrap();
    Repository::new(ArchivistConfig::from_file(&path).unwrap()).unwrap()
}

/// A folder holding `n` documents titled `doc 0` ..
pub fn folder_with_documents(graph: &mut ObjectGraph, n: usize) -> (ObjectId, Vec<ObjectId>) {
    let docs: Vec<ObjectId> = (0..n)
        .map(|i| graph.insert(ContentObject::new("Document").with("title", format!("doc {i}"))))
        .collect();
    let children: Vec<archivist::Value> = docs.iter().map(|d| archivist::Value::Ref(*d)).collect();
    let folder = graph.insert(ContentObject::new("Folder").with("children", children));
    (folder, docs)
}
