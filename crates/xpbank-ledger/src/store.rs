//! Storage backend contract.
//!
//! A backend is a checkpoint for the ledger, not a live cache: it is read in
//! bulk once at startup and written in bulk at save points. Saves are
//! upserts. A record missing from a save is left untouched in storage.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Mutex;

use xpbank_types::{AccountRecord, PlayerId};

/// Bulk load/save of account records.
pub trait AccountStore: Send + Sync + 'static {
    /// The backend's error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read every persisted record.
    fn load(&self) -> impl Future<Output = Result<Vec<AccountRecord>, Self::Error>> + Send;

    /// Insert or update every record in `records`.
    fn save(&self, records: &[AccountRecord]) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Error type of [`MemoryStore`].
#[derive(Debug, thiserror::Error)]
pub enum MemoryStoreError {
    /// The store was switched offline (simulates a lost connection).
    #[error("memory store is offline")]
    Offline,
}

/// A process-local backend, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<PlayerId, u64>>,
    offline: Mutex<bool>,
}

impl MemoryStore {
    /// Create a store pre-populated with `records`.
    pub fn with_records(records: &[AccountRecord]) -> Self {
        let store = Self::default();
        if let Ok(mut map) = store.records.lock() {
            map.extend(records.iter().map(|r| (r.id, r.balance_raw)));
        }
        store
    }

    /// Simulate losing (or regaining) the backend.
    pub fn set_offline(&self, offline: bool) {
        if let Ok(mut flag) = self.offline.lock() {
            *flag = offline;
        }
    }

    /// Everything currently persisted, ordered by player id.
    pub fn records(&self) -> Vec<AccountRecord> {
        self.records
            .lock()
            .map(|map| map.iter().map(|(id, raw)| AccountRecord::new(*id, *raw)).collect())
            .unwrap_or_default()
    }

    fn is_offline(&self) -> bool {
        self.offline.lock().map(|flag| *flag).unwrap_or(true)
    }
}

impl AccountStore for MemoryStore {
    type Error = MemoryStoreError;

    async fn load(&self) -> Result<Vec<AccountRecord>, Self::Error> {
        if self.is_offline() {
            return Err(MemoryStoreError::Offline);
        }
        Ok(self.records())
    }

    async fn save(&self, records: &[AccountRecord]) -> Result<(), Self::Error> {
        if self.is_offline() {
            return Err(MemoryStoreError::Offline);
        }
        if let Ok(mut map) = self.records.lock() {
            map.extend(records.iter().map(|r| (r.id, r.balance_raw)));
        }
        Ok(())
    }
}
