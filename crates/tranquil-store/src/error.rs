//! Error types for the store layer.
//!
//! Store errors never reach the UI. The session manager logs them and
//! carries on as if the cache were empty, so the variants here are about
//! giving that log line enough detail to debug a broken device.

/// Errors that can occur while reading, writing, or decoding the
/// persisted session record.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Serializing the record into bytes failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The stored bytes couldn't be parsed as a session record.
    ///
    /// Common causes: a truncated write, or a record written by an app
    /// version with an incompatible layout.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The record parsed, but was written under a schema this build
    /// doesn't understand.
    #[error("unsupported record schema version {found} (expected {expected})")]
    UnsupportedSchema { found: u32, expected: u32 },

    /// Filesystem I/O failed (file-backed stores).
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The backing store refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
