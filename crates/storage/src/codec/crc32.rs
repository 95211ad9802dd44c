//! CRC32-checked codec.
//!
//! Appends a little-endian CRC32 of the payload. Decoding verifies and
//! strips the trailer, so a flipped bit in a stored snapshot surfaces as
//! an error instead of a silently different object.

use super::traits::{CodecError, StorageCodec};

const TRAILER_LEN: usize = 4;

/// Codec that guards payloads with a CRC32 trailer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Crc32Codec;

impl StorageCodec for Crc32Codec {
    fn encode(&self, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(data.len() + TRAILER_LEN);
        out.extend_from_slice(data);
        out.extend_from_slice(&crc32fast::hash(data).to_le_bytes());
        out
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        if data.len() < TRAILER_LEN {
            return Err(CodecError::DecodeError(format!(
                "payload of {} bytes is shorter than the checksum trailer",
                data.len()
            )));
        }
        let (payload, trailer) = data.split_at(data.len() - TRAILER_LEN);
        let mut raw = [0u8; TRAILER_LEN];
        raw.copy_from_slice(trailer);
        let stored = u32::from_le_bytes(raw);
        let computed = crc32fast::hash(payload);
        if stored != computed {
            return Err(CodecError::ChecksumMismatch { stored, computed });
        }
        Ok(payload.to_vec())
    }

    fn codec_id(&self) -> &str {
        "crc32"
    }
}
