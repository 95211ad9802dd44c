//! Archivist - versioning engine for mutable object graphs
//!
//! Working copies live in an [`ObjectGraph`]. The archivist snapshots an
//! object into an append-only history, splitting its references into
//! owned (inside) and independently versioned (outside) edges, and can
//! rebuild any stored version later.
//!
//! # Quick Start
//!
//! ```
//! use archivist::{
//!     ArchivistConfig, ContentObject, ObjectGraph, Repository, SecurityContext,
//!     SysMetadataInput, Value, VersionSelector,
//! };
//!
//! let repo = Repository::new(ArchivistConfig::default())?;
//! let mut graph = ObjectGraph::new();
//! let doc = graph.insert(ContentObject::new("Document").with("title", "v1"));
//!
//! let ctx = SecurityContext::new("editor");
//! repo.apply_version_control(&mut graph, doc, SysMetadataInput::new(), Value::Null, &ctx)?;
//!
//! graph.set_attr(doc, "title", "v2");
//! let v0 = repo.retrieve(&graph, doc, VersionSelector::Index(0), &[])?;
//! assert_eq!(v0.object().get("title"), Some(&Value::from("v1")));
//! # Ok::<(), archivist::ArchivistError>(())
//! ```
//!
//! # Architecture
//!
//! - `archivist-core`: object model, snapshot types, errors, collaborator traits
//! - `archivist-storage`: codecs and the in-memory history store
//! - `archivist-engine`: clone engine, modifiers, archivist, repository

pub use archivist_core::*;
pub use archivist_engine::*;
pub use archivist_storage::{
    get_codec, Crc32Codec, IdentityCodec, MemoryHistoryStore, StorageCodec,
};
