//! Snapshot serialization
//!
//! Snapshots are encoded as MessagePack with named fields and then passed
//! through the store's codec. Decoding always produces a fresh graph that
//! shares nothing with the stored bytes or with earlier decodes, which is
//! what makes every retrieval a structurally independent deep copy.

use archivist_core::error::{StorageError, StorageResult};
use archivist_core::snapshot::Snapshot;

use crate::codec::{CodecError, StorageCodec};

/// Encode a snapshot for storage
pub fn encode_snapshot(snapshot: &Snapshot, codec: &dyn StorageCodec) -> StorageResult<Vec<u8>> {
    let payload = rmp_serde::to_vec_named(snapshot)
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
    Ok(codec.encode(&payload))
}

/// Decode a stored snapshot
///
/// # Errors
///
/// `StorageError::Corruption` if the codec rejects the bytes,
/// `StorageError::Serialization` if the payload is not a snapshot.
pub fn decode_snapshot(bytes: &[u8], codec: &dyn StorageCodec) -> StorageResult<Snapshot> {
    let payload = codec.decode(bytes).map_err(codec_error)?;
    rmp_serde::from_slice(&payload).map_err(|e| StorageError::Serialization(e.to_string()))
}

pub(crate) fn codec_error(e: CodecError) -> StorageError {
    match e {
        CodecError::UnknownCodec(_) => StorageError::Backend(e.to_string()),
        _ => StorageError::Corruption(e.to_string()),
    }
}
