//! Storage codec abstraction.
//!
//! All snapshot bytes kept by a history store go through a codec for
//! encode/decode operations.
//!
//! - `IdentityCodec`: pass-through
//! - `Crc32Codec`: CRC32 trailer, detects corruption on read
//!
//! # Usage
//!
//! ```ignore
//! use archivist_storage::codec::{get_codec, StorageCodec};
//!
//! let codec = get_codec("crc32")?;
//! let encoded = codec.encode(b"snapshot");
//! let decoded = codec.decode(&encoded)?;
//! ```

mod crc32;
mod identity;
mod traits;

pub use crc32::Crc32Codec;
pub use identity::IdentityCodec;
pub use traits::{CodecError, StorageCodec};

/// Get a codec by its identifier.
///
/// # Known Codecs
///
/// - `"identity"`: No-op codec (pass-through)
/// - `"crc32"`: Payload plus CRC32 trailer
pub fn get_codec(codec_id: &str) -> Result<Box<dyn StorageCodec>, CodecError> {
    match codec_id {
        "identity" => Ok(Box::new(IdentityCodec)),
        "crc32" => Ok(Box::new(Crc32Codec)),
        _ => Err(CodecError::UnknownCodec(codec_id.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_known_codecs() {
        assert_eq!(get_codec("identity").unwrap().codec_id(), "identity");
        assert_eq!(get_codec("crc32").unwrap().codec_id(), "crc32");
    }

    #[test]
    fn test_get_unknown_codec() {
        let result = get_codec("unknown");
        assert!(matches!(result, Err(CodecError::UnknownCodec(_))));
    }
}
