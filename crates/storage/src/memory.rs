//! In-memory append-only history store
//!
//! # Design
//!
//! - DashMap keyed by history identity: distinct histories never contend
//! - One `RwLock<Vec<_>>` per history: appends take the write lock,
//!   readers the read lock
//! - Snapshots are kept encoded. Encoding happens before the write lock
//!   is taken and the push is a single operation, so a reader never
//!   observes a partially written snapshot.
//!
//! The store enforces dense ordinals: a snapshot is accepted only if its
//! version id equals the current history length.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use archivist_core::error::{StorageError, StorageResult};
use archivist_core::snapshot::{Snapshot, StoreReceipt};
use archivist_core::timestamp::Timestamp;
use archivist_core::traits::{HistoryStore, StoredHistory};
use archivist_core::types::{HistoryId, VersionSelector};

use crate::codec::{get_codec, Crc32Codec, StorageCodec};
use crate::snapshot_codec::{codec_error, decode_snapshot, encode_snapshot};

/// One stored snapshot
#[derive(Debug, Clone)]
pub struct StoredEntry {
    bytes: Vec<u8>,
    modified: Timestamp,
    saved_at: Timestamp,
}

impl StoredEntry {
    /// Size of the encoded snapshot
    pub fn encoded_len(&self) -> usize {
        self.bytes.len()
    }

    /// Modification stamp of the object when it was saved
    pub fn modified(&self) -> Timestamp {
        self.modified
    }

    /// Time of the append
    pub fn saved_at(&self) -> Timestamp {
        self.saved_at
    }
}

/// Snapshot sequence of one history
pub struct HistoryLog {
    history_id: HistoryId,
    entries: RwLock<Vec<StoredEntry>>,
    codec: Arc<dyn StorageCodec>,
}

impl HistoryLog {
    fn new(history_id: HistoryId, codec: Arc<dyn StorageCodec>) -> Self {
        Self {
            history_id,
            entries: RwLock::new(Vec::new()),
            codec,
        }
    }

    /// Append under the write lock, enforcing the next ordinal
    fn append(&self, snapshot: &Snapshot, bytes: Vec<u8>) -> StorageResult<StoreReceipt> {
        let mut entries = self.entries.write();
        let expected = entries.len() as u64;
        if snapshot.version_id() != Some(expected) {
            warn!(
                target: "archivist::store",
                history_id = %self.history_id,
                expected,
                actual = ?snapshot.version_id(),
                "Rejected out-of-order snapshot"
            );
            return Err(StorageError::Conflict {
                history_id: self.history_id,
                expected,
                actual: snapshot.version_id(),
            });
        }
        let saved_at = Timestamp::now();
        entries.push(StoredEntry {
            bytes,
            modified: snapshot.modified(),
            saved_at,
        });
        Ok(StoreReceipt {
            history_id: self.history_id,
            version_id: expected,
            timestamp: saved_at,
        })
    }

    /// Stored entry for a selector, without decoding it
    pub fn entry(&self, selector: VersionSelector) -> StorageResult<StoredEntry> {
        let entries = self.entries.read();
        selector
            .resolve(entries.len() as u64)
            .map(|index| entries[index as usize].clone())
            .ok_or(StorageError::Retrieve {
                history_id: self.history_id,
                selector,
            })
    }
}

impl StoredHistory for HistoryLog {
    fn history_id(&self) -> HistoryId {
        self.history_id
    }

    fn len(&self) -> u64 {
        self.entries.read().len() as u64
    }

    fn get(&self, selector: VersionSelector) -> StorageResult<Snapshot> {
        let entry = self.entry(selector)?;
        decode_snapshot(&entry.bytes, self.codec.as_ref())
    }
}

impl fmt::Debug for HistoryLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryLog")
            .field("history_id", &self.history_id)
            .field("len", &self.entries.read().len())
            .field("codec", &self.codec.codec_id())
            .finish()
    }
}

/// In-memory `HistoryStore`
pub struct MemoryHistoryStore {
    histories: DashMap<HistoryId, Arc<HistoryLog>>,
    codec: Arc<dyn StorageCodec>,
}

impl MemoryHistoryStore {
    /// Create an empty store using the CRC32 codec
    pub fn new() -> Self {
        Self::with_codec(Box::new(Crc32Codec))
    }

    /// Create an empty store using the given codec
    pub fn with_codec(codec: Box<dyn StorageCodec>) -> Self {
        Self {
            histories: DashMap::new(),
            codec: Arc::from(codec),
        }
    }

    /// Create an empty store using the codec named `codec_id`
    pub fn with_codec_id(codec_id: &str) -> StorageResult<Self> {
        let codec = get_codec(codec_id).map_err(codec_error)?;
        Ok(Self::with_codec(codec))
    }

    /// Identifier of the codec in use
    pub fn codec_id(&self) -> &str {
        self.codec.codec_id()
    }

    /// Number of histories
    pub fn len(&self) -> usize {
        self.histories.len()
    }

    /// Check if no history is registered
    pub fn is_empty(&self) -> bool {
        self.histories.is_empty()
    }

    /// Identities of all histories
    pub fn history_ids(&self) -> Vec<HistoryId> {
        self.histories.iter().map(|e| *e.key()).collect()
    }

    /// Concrete log of a history
    pub fn log(&self, history_id: &HistoryId) -> StorageResult<Arc<HistoryLog>> {
        self.histories
            .get(history_id)
            .map(|log| Arc::clone(log.value()))
            .ok_or(StorageError::Unregistered {
                history_id: *history_id,
            })
    }
}

impl Default for MemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryHistoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryHistoryStore")
            .field("histories", &self.histories.len())
            .field("codec", &self.codec.codec_id())
            .finish()
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn is_registered(&self, history_id: &HistoryId) -> bool {
        self.histories.contains_key(history_id)
    }

    fn register(&self, history_id: &HistoryId, snapshot: &Snapshot) -> StorageResult<StoreReceipt> {
        let bytes = encode_snapshot(snapshot, self.codec.as_ref())?;
        match self.histories.entry(*history_id) {
            Entry::Occupied(_) => Err(StorageError::AlreadyRegistered {
                history_id: *history_id,
            }),
            Entry::Vacant(vacant) => {
                let log = HistoryLog::new(*history_id, Arc::clone(&self.codec));
                let receipt = log.append(snapshot, bytes)?;
                vacant.insert(Arc::new(log));
                debug!(
                    target: "archivist::store",
                    history_id = %history_id,
                    "History registered"
                );
                Ok(receipt)
            }
        }
    }

    fn save(&self, history_id: &HistoryId, snapshot: &Snapshot) -> StorageResult<StoreReceipt> {
        let log = self.log(history_id)?;
        let bytes = encode_snapshot(snapshot, self.codec.as_ref())?;
        let size = bytes.len();
        let receipt = log.append(snapshot, bytes)?;
        debug!(
            target: "archivist::store",
            history_id = %history_id,
            version_id = receipt.version_id,
            bytes = size,
            "Snapshot appended"
        );
        Ok(receipt)
    }

    fn get_history(&self, history_id: &HistoryId) -> StorageResult<Arc<dyn StoredHistory>> {
        let log: Arc<dyn StoredHistory> = self.log(history_id)?;
        Ok(log)
    }

    fn modification_date(
        &self,
        history_id: &HistoryId,
        selector: VersionSelector,
    ) -> StorageResult<Timestamp> {
        Ok(self.log(history_id)?.entry(selector)?.modified)
    }
}
