//! Storage layer for the archivist
//!
//! This crate implements the history store backend with:
//! - StorageCodec: codec seam for stored snapshot bytes (identity, CRC32)
//! - Snapshot serialization via MessagePack
//! - MemoryHistoryStore: DashMap of per-history append-only logs
//!
//! # Concurrency
//!
//! Distinct histories never contend. Appends to one history are
//! serialized by its log's write lock and checked against the next
//! free ordinal.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod memory;
pub mod snapshot_codec;

pub use codec::{get_codec, CodecError, Crc32Codec, IdentityCodec, StorageCodec};
pub use memory::{HistoryLog, MemoryHistoryStore, StoredEntry};
pub use snapshot_codec::{decode_snapshot, encode_snapshot};
