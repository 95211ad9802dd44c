//! Storage codec trait definitions.

/// Storage codec trait.
///
/// Every encoded snapshot passes through the codec on its way into a
/// history log and back out.
///
/// # Thread Safety
///
/// Codecs must be `Send + Sync` so one codec can serve concurrent
/// appends and reads of different histories.
///
/// # Codec Identity
///
/// Each codec has a unique identifier. The configuration names the codec
/// by this id and `get_codec` resolves it.
pub trait StorageCodec: Send + Sync {
    /// Encode bytes for storage.
    fn encode(&self, data: &[u8]) -> Vec<u8>;

    /// Decode bytes from storage.
    ///
    /// Reverses the encode operation. Returns an error if the data
    /// cannot be decoded (e.g., truncation or a failed checksum).
    fn decode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;

    /// Unique codec identifier.
    fn codec_id(&self) -> &str;
}

/// Codec errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Decoding failed (invalid format, truncated input).
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// Stored checksum does not match the payload.
    #[error("Checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// Checksum found in the trailer
        stored: u32,
        /// Checksum of the payload as read
        computed: u32,
    },

    /// Unknown codec identifier.
    #[error("Unknown codec: {0}")]
    UnknownCodec(String),
}
