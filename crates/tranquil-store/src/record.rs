//! The persisted session record.
//!
//! This is the only thing Tranquil writes to the device. It is a cache of
//! the last session the client believed in, so the app can show the right
//! screen at launch before the identity provider has answered. The provider
//! always has the final say; nothing here is trusted beyond that first
//! frame.
//!
//! On the wire (JSON):
//!
//! ```text
//! { "identity": { "id": "...", "email": "..." },
//!   "issuedAt": 1700000000000,
//!   "schemaVersion": 1 }
//! ```

use serde::{Deserialize, Serialize};
use tranquil_identity::Identity;

use crate::{Codec, StoreError};

/// Version written into every record. Bump when the layout changes; older
/// or newer records are then treated as absent rather than misread.
pub const SCHEMA_VERSION: u32 = 1;

/// A serialized session as kept by a [`SessionStore`](crate::SessionStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    /// Who was signed in.
    pub identity: Identity,
    /// When that session became active, in milliseconds since the Unix epoch.
    pub issued_at: u64,
    /// Layout version; see [`SCHEMA_VERSION`].
    pub schema_version: u32,
}

impl PersistedSession {
    /// Creates a record under the current [`SCHEMA_VERSION`].
    pub fn new(identity: Identity, issued_at: u64) -> Self {
        Self {
            identity,
            issued_at,
            schema_version: SCHEMA_VERSION,
        }
    }

    /// Encodes the record with `codec`.
    pub fn to_bytes<C: Codec>(&self, codec: &C) -> Result<Vec<u8>, StoreError> {
        codec.encode(self)
    }

    /// Decodes a record and checks its schema version.
    ///
    /// # Errors
    /// - `StoreError::Decode` — the bytes aren't a record at all
    /// - `StoreError::UnsupportedSchema` — a record, but not one we can use
    pub fn from_bytes<C: Codec>(codec: &C, data: &[u8]) -> Result<Self, StoreError> {
        let record: Self = codec.decode(data)?;
        if record.schema_version != SCHEMA_VERSION {
            return Err(StoreError::UnsupportedSchema {
                found: record.schema_version,
                expected: SCHEMA_VERSION,
            });
        }
        Ok(record)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::JsonCodec;

    fn record() -> PersistedSession {
        PersistedSession::new(Identity::new("u-1", "a@x.com"), 1_700_000_000_000)
    }

    #[test]
    fn test_record_json_uses_camel_case_schema() {
        let bytes = record().to_bytes(&JsonCodec).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["identity"]["id"], "u-1");
        assert_eq!(value["identity"]["email"], "a@x.com");
        assert_eq!(value["issuedAt"], 1_700_000_000_000u64);
        assert_eq!(value["schemaVersion"], SCHEMA_VERSION);
    }

    #[test]
    fn test_from_bytes_reads_handwritten_record() {
        let json = br#"{
            "identity": { "id": "u-9", "email": "b@x.com" },
            "issuedAt": 42,
            "schemaVersion": 1
        }"#;

        let decoded = PersistedSession::from_bytes(&JsonCodec, json).unwrap();

        assert_eq!(decoded.identity, Identity::new("u-9", "b@x.com"));
        assert_eq!(decoded.issued_at, 42);
    }

    #[test]
    fn test_from_bytes_rejects_other_schema_versions() {
        let json = br#"{
            "identity": { "id": "u-9", "email": "b@x.com" },
            "issuedAt": 42,
            "schemaVersion": 7
        }"#;

        let err = PersistedSession::from_bytes(&JsonCodec, json).unwrap_err();

        assert!(
            matches!(err, StoreError::UnsupportedSchema { found: 7, expected: 1 }),
            "got {err:?}"
        );
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        let err = PersistedSession::from_bytes(&JsonCodec, b"{not json").unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)), "got {err:?}");
    }

    #[test]
    fn test_from_bytes_rejects_missing_fields() {
        let json = br#"{ "identity": { "id": "u-9" }, "schemaVersion": 1 }"#;
        let err = PersistedSession::from_bytes(&JsonCodec, json).unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)), "got {err:?}");
    }
}
