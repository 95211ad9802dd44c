//! Versioning engine for content objects
//!
//! This crate orchestrates the lower layers:
//! - Archivist: prepare, register, save and retrieve snapshots
//! - Deep-clone engine with reference splitting
//! - Modifier registry deciding how references are versioned
//! - Lazy history reconstruction
//! - Repository: versioning of whole content trees, revert
//!
//! Storage is reached only through the `HistoryStore` trait from
//! `archivist-core`; `Repository::new` wires in the in-memory store.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod archivist;
pub mod clone;
pub mod config;
pub mod history;
pub mod locks;
pub mod modifiers;
pub mod prepared;
pub mod repository;
pub mod uid;

pub use archivist::Archivist;
pub use clone::{CloneEngine, CloneOutput, RestoreReport, DEFAULT_MAX_CLONE_NODES};
pub use config::{ArchivistConfig, ChildrenPolicy, ModifierConfig, CONFIG_FILE_NAME};
pub use history::{HistoryIter, LazyHistory, VersionData};
pub use locks::{HistoryGuard, HistoryLocks};
pub use modifiers::{
    ChildrenReferences, Condition, Modifier, ModifierRegistry, RetainAttributes, SaveByReference,
};
pub use prepared::PreparedObject;
pub use repository::Repository;
pub use uid::UuidIssuer;
