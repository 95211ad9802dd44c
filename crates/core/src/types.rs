//! Identity types for the archivist
//!
//! This module defines:
//! - HistoryId: Stable identifier for one object's version lineage
//! - ObjectId: Handle of an object inside an `ObjectGraph` arena
//! - VersionSelector: "latest" or a zero-based ordinal into a history
//! - Subject: a working copy or a bare history identity

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Location id used for every working copy.
///
/// Only a single location is supported; the id is recorded so that
/// snapshots stay forward compatible with multi-location histories.
pub const DEFAULT_LOCATION_ID: u64 = 0;

/// Unique identifier for a version history
///
/// A HistoryId is a wrapper around a UUID v4. It is issued exactly once,
/// when an object is first put under version control, and never changes
/// afterwards, regardless of where the object lives in the host system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HistoryId(Uuid);

impl HistoryId {
    /// Create a new random HistoryId using UUID v4
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a HistoryId from raw bytes
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Parse a HistoryId from a string representation
    ///
    /// Accepts standard UUID format (with or without hyphens).
    ///
    /// # Errors
    /// Returns None if the string is not a valid UUID.
    pub fn from_string(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }

    /// Get the raw bytes of this HistoryId
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for HistoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HistoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle of an object inside an [`ObjectGraph`](crate::object::ObjectGraph)
///
/// Object ids are identities, not values: two objects with equal
/// attributes are still different objects. Ids are never reused within
/// one graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Create an ObjectId from its raw value
    pub const fn from_raw(raw: u64) -> Self {
        ObjectId(raw)
    }

    /// Get the raw value
    #[inline]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "oid:{}", self.0)
    }
}

/// Selects one snapshot of a history
///
/// `Latest` addresses the most recently appended snapshot; `Index(n)`
/// addresses the n-th snapshot, counting from zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VersionSelector {
    /// The newest snapshot
    #[default]
    Latest,
    /// Zero-based ordinal
    Index(u64),
}

impl VersionSelector {
    /// Resolve the selector against a history of `len` snapshots
    ///
    /// Returns `None` if the selector has no corresponding snapshot
    /// (empty history, or index past the end).
    pub fn resolve(&self, len: u64) -> Option<u64> {
        match *self {
            VersionSelector::Latest => len.checked_sub(1),
            VersionSelector::Index(i) if i < len => Some(i),
            VersionSelector::Index(_) => None,
        }
    }

    /// Check if this selects the newest snapshot
    pub fn is_latest(&self) -> bool {
        matches!(self, VersionSelector::Latest)
    }
}

impl From<u64> for VersionSelector {
    fn from(index: u64) -> Self {
        VersionSelector::Index(index)
    }
}

impl From<Option<u64>> for VersionSelector {
    fn from(index: Option<u64>) -> Self {
        index.map_or(VersionSelector::Latest, VersionSelector::Index)
    }
}

impl fmt::Display for VersionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSelector::Latest => write!(f, "latest"),
            VersionSelector::Index(i) => write!(f, "{}", i),
        }
    }
}

/// What an operation addresses: a working copy or a bare history
///
/// Operations that accept either resolve the missing half through the
/// object graph (`ObjectGraph::find_by_history`) or the object's
/// versioning stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subject {
    /// A working copy
    Object(ObjectId),
    /// A history identity
    History(HistoryId),
}

impl From<ObjectId> for Subject {
    fn from(id: ObjectId) -> Self {
        Subject::Object(id)
    }
}

impl From<HistoryId> for Subject {
    fn from(id: HistoryId) -> Self {
        Subject::History(id)
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Object(id) => write!(f, "{}", id),
            Subject::History(id) => write!(f, "history {}", id),
        }
    }
}
