//! Codec trait and implementations for the persisted session record.
//!
//! Stores only ever see opaque bytes. The session manager picks a
//! [`Codec`] to turn a [`PersistedSession`](crate::PersistedSession) into
//! those bytes and back.
//!
//! We ship [`JsonCodec`]: a cached session is tiny, and being able to read
//! the record straight off a device is worth more than a few saved bytes.

use serde::{Serialize, de::DeserializeOwned};

use crate::StoreError;

/// Turns serde values into store bytes and back.
///
/// ## Trait bounds
///
/// - `Send + Sync + 'static` → the codec lives inside the session manager's
///   task for the whole process lifetime.
/// - `DeserializeOwned` (vs plain `Deserialize`) on `decode` → the result
///   owns its data, so the input buffer can be dropped right after.
pub trait Codec: Send + Sync + 'static {
    /// Encodes `value` for the store.
    ///
    /// # Errors
    /// `StoreError::Encode` when the value can't be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, StoreError>;

    /// Decodes bytes previously produced by [`encode`](Self::encode).
    ///
    /// # Errors
    /// `StoreError::Decode` when the bytes don't parse as `T`, e.g. a
    /// record truncated by a crash or written by another app version.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, StoreError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// JSON via `serde_json`. Needs the `json` feature (on by default).
///
/// ## Example
///
/// ```rust
/// use tranquil_identity::Identity;
/// use tranquil_store::{Codec, JsonCodec, PersistedSession};
///
/// let codec = JsonCodec;
/// let record = PersistedSession::new(Identity::new("u-1", "a@x.com"), 1_700_000_000_000);
///
/// let bytes = codec.encode(&record).unwrap();
/// let decoded: PersistedSession = codec.decode(&bytes).unwrap();
/// assert_eq!(record, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec(value).map_err(StoreError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, StoreError> {
        serde_json::from_slice(data).map_err(StoreError::Decode)
    }
}
