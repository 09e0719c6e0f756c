//! In-memory session store.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::{SessionStore, StoreError};

#[derive(Debug, Default)]
struct Slot {
    data: Option<Vec<u8>>,
    fail_reads: bool,
    fail_writes: bool,
    read_delay: Duration,
    write_delay: Duration,
    writes: usize,
    clears: usize,
}

/// A [`SessionStore`] backed by a shared in-process slot.
///
/// Clones share the slot, which makes it easy to hand one clone to a
/// session manager and keep another to look at what was written, or to
/// "restart" the app by building a second manager over the same slot.
///
/// Failures and slow reads or writes can be injected to exercise the manager's
/// degraded paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Slot>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `data`, as if a previous run of
    /// the app had written it.
    pub fn with_data(data: Vec<u8>) -> Self {
        let store = Self::new();
        store.lock().data = Some(data);
        store
    }

    /// Delays every `get` by `delay` (measured on the Tokio clock).
    pub fn set_read_delay(&self, delay: Duration) {
        self.lock().read_delay = delay;
    }

    /// Delays every `set` and `clear` by `delay` (measured on the Tokio
    /// clock). The write lands when the delay is over.
    pub fn set_write_delay(&self, delay: Duration) {
        self.lock().write_delay = delay;
    }

    /// Makes `get` fail while `fail` is true.
    pub fn fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    /// Makes `set` and `clear` fail while `fail` is true.
    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// The bytes currently stored, if any.
    pub fn contents(&self) -> Option<Vec<u8>> {
        self.lock().data.clone()
    }

    /// Number of successful `set` calls.
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    /// Number of successful `clear` calls.
    pub fn clear_count(&self) -> usize {
        self.lock().clears
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn write_delay(&self) {
        let delay = self.lock().write_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

impl SessionStore for MemoryStore {
    async fn get(&self) -> Result<Option<Vec<u8>>, StoreError> {
        let delay = self.lock().read_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let slot = self.lock();
        if slot.fail_reads {
            return Err(StoreError::Unavailable("read refused".into()));
        }
        Ok(slot.data.clone())
    }

    async fn set(&self, data: Vec<u8>) -> Result<(), StoreError> {
        self.write_delay().await;
        let mut slot = self.lock();
        if slot.fail_writes {
            return Err(StoreError::Unavailable("write refused".into()));
        }
        slot.data = Some(data);
        slot.writes += 1;
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.write_delay().await;
        let mut slot = self.lock();
        if slot.fail_writes {
            return Err(StoreError::Unavailable("clear refused".into()));
        }
        slot.data = None;
        slot.clears += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_clear_cycle() {
        let store = MemoryStore::new();
        assert_eq!(store.get().await.unwrap(), None);

        store.set(b"record".to_vec()).await.unwrap();
        assert_eq!(store.get().await.unwrap(), Some(b"record".to_vec()));

        store.clear().await.unwrap();
        assert_eq!(store.get().await.unwrap(), None);
        assert_eq!(store.write_count(), 1);
        assert_eq!(store.clear_count(), 1);
    }

    #[tokio::test]
    async fn test_clones_share_the_slot() {
        let store = MemoryStore::new();
        let other = store.clone();

        store.set(b"shared".to_vec()).await.unwrap();

        assert_eq!(other.contents(), Some(b"shared".to_vec()));
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = MemoryStore::with_data(b"old".to_vec());
        store.fail_reads(true);
        store.fail_writes(true);

        assert!(matches!(store.get().await, Err(StoreError::Unavailable(_))));
        assert!(matches!(
            store.set(b"new".to_vec()).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(matches!(store.clear().await, Err(StoreError::Unavailable(_))));
        // Nothing changed underneath.
        assert_eq!(store.contents(), Some(b"old".to_vec()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_delay_uses_tokio_clock() {
        let store = MemoryStore::with_data(b"slow".to_vec());
        store.set_read_delay(Duration::from_secs(5));
        let start = tokio::time::Instant::now();

        let data = store.get().await.unwrap();

        assert_eq!(data, Some(b"slow".to_vec()));
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_delay_holds_back_the_write() {
        let store = MemoryStore::new();
        store.set_write_delay(Duration::from_secs(30));
        let writer = store.clone();
        let pending = tokio::spawn(async move { writer.set(b"late".to_vec()).await });

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(store.contents(), None);

        pending.await.unwrap().unwrap();
        assert_eq!(store.contents(), Some(b"late".to_vec()));
    }
}
