//! Core types and traits for the archivist
//!
//! This crate defines the foundational types used throughout the system:
//! - HistoryId / ObjectId / VersionSelector: identities and selectors
//! - Value: attribute values, including structural and cut edges
//! - ObjectGraph / ContentObject / DetachedObject: the object model
//! - RefMarker / AttributeAdapter: descriptors of cut edges
//! - Metadata: the envelope stored with every snapshot
//! - Snapshot / ObjectData: what is stored and reconstructed
//! - Error: the error taxonomy
//! - Traits: collaborator seams (HistoryStore, ReferenceClassifier, ...)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod metadata;
pub mod object;
pub mod reference;
pub mod snapshot;
pub mod timestamp;
pub mod traits;
pub mod types;
pub mod value;

pub use error::{ArchivistError, ArchivistResult, StorageError, StorageResult};
pub use metadata::{Metadata, SecurityContext, SysMetadata, SysMetadataInput, ANONYMOUS_PRINCIPAL};
pub use object::{ContentObject, DetachedObject, ObjectGraph, Versioning};
pub use reference::{AttrPath, AttributeAdapter, PathSegment, RefMarker, ReferenceKind};
pub use snapshot::{ObjectData, ReferencedData, Snapshot, StoreReceipt};
pub use timestamp::Timestamp;
pub use traits::{
    ClassifiedRefs, EdgeClassifier, EdgeDisposition, HistoryIdIssuer, HistoryStore,
    ReferenceClassifier, RetrieveOutcome, StoredHistory,
};
pub use types::{HistoryId, ObjectId, Subject, VersionSelector, DEFAULT_LOCATION_ID};
pub use value::Value;
