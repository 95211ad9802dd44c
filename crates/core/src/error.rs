//! Error types for the archivist
//!
//! Two layers:
//! - `StorageError`: failures reported by a history store
//! - `ArchivistError`: the single root type surfaced by the archivist.
//!   Storage failures are wrapped, never swallowed.
//!
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//! Every message names the offending object or history and, where one is
//! involved, the selector.

use thiserror::Error;

use crate::types::{HistoryId, ObjectId, Subject, VersionSelector};

/// Result type alias for history store operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Result type alias for archivist operations
pub type ArchivistResult<T> = std::result::Result<T, ArchivistError>;

/// Errors reported by a history store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// No history exists for the identity
    #[error("History {history_id} is not registered")]
    Unregistered {
        /// Unknown history
        history_id: HistoryId,
    },

    /// The selector has no corresponding snapshot
    #[error("History {history_id} has no version '{selector}'")]
    Retrieve {
        /// History that was indexed
        history_id: HistoryId,
        /// Selector that fell outside the history
        selector: VersionSelector,
    },

    /// `register` was called for an identity that already has a history
    #[error("History {history_id} is already registered")]
    AlreadyRegistered {
        /// Existing history
        history_id: HistoryId,
    },

    /// The snapshot's ordinal does not extend the history densely
    #[error("History {history_id} expected version {expected}, got {actual:?}")]
    Conflict {
        /// History appended to
        history_id: HistoryId,
        /// Next free ordinal
        expected: u64,
        /// Ordinal stamped on the snapshot
        actual: Option<u64>,
    },

    /// Snapshot could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Stored bytes failed an integrity check
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// Opaque backend failure
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Root error type of the archivist
#[derive(Debug, Error)]
pub enum ArchivistError {
    /// First write of a history failed
    #[error("Registering '{subject}' failed: {source}")]
    Register {
        /// Object or history being registered
        subject: Subject,
        /// Failure reported by the store
        #[source]
        source: StorageError,
    },

    /// Save of an unregistered object without autoregistration
    #[error(
        "Saving an unregistered object is not possible. Register the object '{object}' first."
    )]
    Save {
        /// Working copy that was saved
        object: ObjectId,
    },

    /// The selector has no corresponding snapshot
    #[error("Retrieving of '{subject}' failed. Version '{selector}' does not exist.")]
    Retrieve {
        /// Object or history retrieved from
        subject: Subject,
        /// Selector that fell outside the history
        selector: VersionSelector,
    },

    /// The operation needs a history, but none exists
    #[error(
        "Retrieving a version of an unregistered object is not possible. Register the object '{subject}' first."
    )]
    Unregistered {
        /// Unknown object or history
        subject: Subject,
    },

    /// Failure reported by the history store
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The working copy does not exist in the graph
    #[error("Object {0} not found")]
    ObjectNotFound(ObjectId),

    /// The reference classifier produced overlapping sets
    #[error("Inconsistent classification of {object} at '{path}': {detail}")]
    InconsistentClassification {
        /// Object being cloned
        object: ObjectId,
        /// Attribute path in question
        path: String,
        /// What overlapped
        detail: String,
    },

    /// A followed edge points at an object that does not exist
    #[error("Dangling reference from {parent} to {target}")]
    DanglingReference {
        /// Owner of the edge
        parent: ObjectId,
        /// Missing target
        target: ObjectId,
    },

    /// The clone traversal visited more objects than allowed
    #[error("Cloning {root} exceeded the limit of {limit} objects")]
    CloneLimitExceeded {
        /// Root of the clone
        root: ObjectId,
        /// Configured limit
        limit: usize,
    },

    /// The per-history write section could not be entered in time
    #[error("Timed out after {timeout_ms}ms waiting for the write lock of history {history_id}")]
    LockTimeout {
        /// Contended history
        history_id: HistoryId,
        /// Configured timeout
        timeout_ms: u64,
    },

    /// Configuration could not be read or is invalid
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ArchivistError {
    /// Operation on an identity without history
    pub fn is_unregistered(&self) -> bool {
        matches!(
            self,
            ArchivistError::Unregistered { .. }
                | ArchivistError::Storage(StorageError::Unregistered { .. })
        )
    }

    /// Save before register, without autoregistration
    pub fn is_save_ordering(&self) -> bool {
        matches!(self, ArchivistError::Save { .. })
    }

    /// Selector without snapshot
    pub fn is_retrieve_range(&self) -> bool {
        matches!(
            self,
            ArchivistError::Retrieve { .. } | ArchivistError::Storage(StorageError::Retrieve { .. })
        )
    }

    /// Failure reported by the history store, including a failed
    /// registration
    pub fn is_storage(&self) -> bool {
        self.storage_error().is_some()
    }

    /// The store failure behind this error, if any
    pub fn storage_error(&self) -> Option<&StorageError> {
        match self {
            ArchivistError::Storage(e) | ArchivistError::Register { source: e, .. } => Some(e),
            _ => None,
        }
    }
}
