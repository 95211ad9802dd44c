//! Identity codec (no transformation).

use super::traits::{CodecError, StorageCodec};

/// Identity codec - no transformation.
///
/// Bytes pass through unchanged.
///
/// # Example
///
/// ```
/// use archivist_storage::codec::{StorageCodec, IdentityCodec};
///
/// let codec = IdentityCodec;
/// let data = b"snapshot bytes";
///
/// let encoded = codec.encode(data);
/// assert_eq!(data.as_slice(), encoded.as_slice());
///
/// let decoded = codec.decode(&encoded).unwrap();
/// assert_eq!(data.as_slice(), decoded.as_slice());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCodec;

impl StorageCodec for IdentityCodec {
    fn encode(&self, data: &[u8]) -> Vec<u8> {
        data.to_vec()
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(data.to_vec())
    }

    fn codec_id(&self) -> &str {
        "identity"
    }
}
