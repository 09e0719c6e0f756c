//! Persisted session cache for Tranquil.
//!
//! Provides the [`SessionStore`] trait that abstracts over wherever the
//! device keeps its one cached session record, the record's schema
//! ([`PersistedSession`]), and the [`Codec`] used to turn it into bytes.
//!
//! The session core treats every store as slow and best-effort: a store
//! error is logged and handled as "no cache", never surfaced to the user.
//!
//! # Feature Flags
//!
//! - `json` (default) — [`JsonCodec`] via `serde_json`
//! - `file` (default) — [`FileStore`], a single-file store via `tokio::fs`

#![allow(async_fn_in_trait)]

mod codec;
mod error;
#[cfg(feature = "file")]
mod file;
mod memory;
mod record;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::StoreError;
#[cfg(feature = "file")]
pub use file::FileStore;
pub use memory::MemoryStore;
pub use record::{PersistedSession, SCHEMA_VERSION};

use std::future::Future;

/// A persisted key-value slot holding at most one serialized session.
///
/// All three operations may be slow (disk, secure enclave, platform
/// storage bridge) and may fail. `set` returning `Ok` means the store has
/// accepted the write; it need not be flushed to stable storage yet.
pub trait SessionStore: Send + Sync + 'static {
    /// Reads the stored record. `Ok(None)` means nothing is stored.
    fn get(&self) -> impl Future<Output = Result<Option<Vec<u8>>, StoreError>> + Send;

    /// Replaces the stored record.
    fn set(&self, data: Vec<u8>) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Removes the stored record. Clearing an empty store is not an error.
    fn clear(&self) -> impl Future<Output = Result<(), StoreError>> + Send;
}
