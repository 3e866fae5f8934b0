//! The authoritative in-memory ledger.
//!
//! [`AccountManager`] owns every [`Account`] for the lifetime of the process.
//! The storage backend is only a checkpoint: it is read once by
//! [`load`](AccountManager::load) and written by
//! [`save`](AccountManager::save).
//!
//! # Lifecycle
//!
//! ```text
//! Unloaded --load ok--> Loaded --save--> (checkpoint) --> Loaded
//!    ^                    |
//!    +----load failed-----+
//! ```
//!
//! The mapping is not synchronized. All mutations happen on the host's
//! single logical thread; saves copy a point-in-time snapshot before handing
//! the write to another task.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use xpbank_types::{AccountRecord, PlayerId};

use crate::account::Account;
use crate::resource::ExperienceSource;
use crate::scale::ScaleMethod;
use crate::store::AccountStore;
use crate::LedgerError;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Ledger settings read from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LedgerSettings {
    /// How raw points are shown to players.
    #[serde(default)]
    pub scale_method: ScaleMethod,

    /// Minimum balance for new accounts, as a display amount.
    #[serde(default)]
    pub starting_balance: Decimal,
}

/// Whether the ledger holds a successful load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerState {
    /// No successful load yet, or the last load failed.
    Unloaded,
    /// The mapping reflects a completed load plus in-process mutations.
    Loaded,
}

// ---------------------------------------------------------------------------
// AccountManager
// ---------------------------------------------------------------------------

/// Owner of every account, keyed by player.
pub struct AccountManager<S> {
    accounts: BTreeMap<PlayerId, Account>,
    store: Arc<S>,
    resource: Arc<dyn ExperienceSource>,
    settings: LedgerSettings,
    state: LedgerState,
}

impl<S> core::fmt::Debug for AccountManager<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AccountManager")
            .field("accounts", &self.accounts.len())
            .field("settings", &self.settings)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<S: AccountStore> AccountManager<S> {
    /// Create an empty, unloaded ledger.
    pub fn new(store: Arc<S>, resource: Arc<dyn ExperienceSource>, settings: LedgerSettings) -> Self {
        Self {
            accounts: BTreeMap::new(),
            store,
            resource,
            settings,
            state: LedgerState::Unloaded,
        }
    }

    /// Replace the in-memory mapping with everything the backend holds.
    ///
    /// On failure the mapping is left empty and the ledger stays
    /// [`LedgerState::Unloaded`], which makes [`save`](Self::save) refuse to
    /// overwrite persisted balances. An empty backend is a successful load.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Store`] if the backend cannot be read.
    pub async fn load(&mut self) -> Result<usize, LedgerError> {
        self.accounts.clear();
        self.state = LedgerState::Unloaded;

        let records = match self.store.load().await {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load accounts");
                return Err(LedgerError::store(e));
            }
        };

        let scale = self.settings.scale_method;
        for record in records {
            let account = Account::new(
                record.id,
                record.balance_raw,
                scale,
                Arc::clone(&self.resource),
            );
            if self.accounts.insert(record.id, account).is_some() {
                tracing::warn!(player = %record.id, "Duplicate account record; keeping the later one");
            }
        }

        self.state = LedgerState::Loaded;
        tracing::info!(count = self.accounts.len(), "Accounts loaded");
        Ok(self.accounts.len())
    }

    /// Start a save of the current ledger.
    ///
    /// The records are copied synchronously, so the returned future owns an
    /// immutable snapshot and may be awaited on another task while the
    /// ledger keeps changing. Saving twice without a mutation in between
    /// writes the same record set.
    ///
    /// # Errors
    ///
    /// The future resolves to [`LedgerError::NotLoaded`] if the ledger never
    /// loaded successfully, or [`LedgerError::Store`] if the backend write
    /// fails. A failed save is retried at the next checkpoint, not here.
    pub fn save(&self) -> impl Future<Output = Result<usize, LedgerError>> + Send + use<S> {
        let store = Arc::clone(&self.store);
        let records = self.snapshot();
        let loaded = self.state == LedgerState::Loaded;

        async move {
            if !loaded {
                tracing::warn!("Skipping save: ledger was never loaded");
                return Err(LedgerError::NotLoaded);
            }
            let count = records.len();
            match store.save(&records).await {
                Ok(()) => {
                    tracing::info!(count, "Accounts saved");
                    Ok(count)
                }
                Err(e) => {
                    tracing::error!(error = %e, count, "Failed to save accounts");
                    Err(LedgerError::store(e))
                }
            }
        }
    }
}

impl<S> AccountManager<S> {
    /// Current lifecycle state.
    pub const fn state(&self) -> LedgerState {
        self.state
    }

    /// Active settings.
    pub const fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    /// The collaborator holding players' live experience.
    pub fn resource(&self) -> &dyn ExperienceSource {
        self.resource.as_ref()
    }

    /// Apply new settings. Existing balances keep their raw value; only the
    /// display scale and the seed for future accounts change.
    pub fn reload(&mut self, settings: LedgerSettings) {
        let scale = settings.scale_method;
        for account in self.accounts.values_mut() {
            account.set_scale(scale);
        }
        tracing::info!(scale = ?scale, starting_balance = %settings.starting_balance, "Ledger settings reloaded");
        self.settings = settings;
    }

    /// Number of accounts.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Whether the ledger holds no accounts.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Sum of all raw balances (saturating).
    pub fn total_raw(&self) -> u64 {
        self.accounts
            .values()
            .fold(0_u64, |sum, a| sum.saturating_add(a.balance_raw()))
    }

    /// Point-in-time copy of every account, ordered by player id.
    pub fn snapshot(&self) -> Vec<AccountRecord> {
        self.accounts.values().map(Account::record).collect()
    }

    /// Whether `id` has an account.
    pub fn has_account(&self, id: PlayerId) -> bool {
        self.accounts.contains_key(&id)
    }

    /// Look up an account.
    pub fn account(&self, id: PlayerId) -> Option<&Account> {
        self.accounts.get(&id)
    }

    /// Look up an account for mutation.
    pub fn account_mut(&mut self, id: PlayerId) -> Option<&mut Account> {
        self.accounts.get_mut(&id)
    }

    /// The configured starting balance in raw points.
    fn starting_raw(&self) -> u64 {
        self.settings
            .scale_method
            .to_raw(self.settings.starting_balance)
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Starting balance not storable, opening accounts at zero");
                0
            })
    }

    /// Open an account for `id`, or return the one it already has.
    ///
    /// A reachable player is seeded with the larger of their current
    /// experience and the starting balance, and that value is written back
    /// to them. An unreachable player gets the starting balance with nothing
    /// propagated.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidPlayer`] for the nil id.
    pub fn create_account(&mut self, id: PlayerId) -> Result<&mut Account, LedgerError> {
        if id.is_nil() {
            return Err(LedgerError::InvalidPlayer);
        }

        let starting = self.starting_raw();
        let scale = self.settings.scale_method;
        let resource = Arc::clone(&self.resource);

        match self.accounts.entry(id) {
            Entry::Occupied(existing) => {
                tracing::debug!(player = %id, "Account already exists");
                Ok(existing.into_mut())
            }
            Entry::Vacant(slot) => {
                let current = resource.read_total(id);
                let mut account = Account::new(id, starting, scale, resource);
                if let Some(current) = current {
                    account.set_balance_raw(current.max(starting), true);
                }
                tracing::info!(
                    player = %id,
                    balance_raw = account.balance_raw(),
                    online = current.is_some(),
                    "Account created"
                );
                Ok(slot.insert(account))
            }
        }
    }

    /// Move `amount` from one account to another.
    ///
    /// Either both sides change or neither does.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::SelfTransfer`] if `from == to`
    /// - [`LedgerError::AccountNotFound`] if either account is missing
    /// - any error of [`Account::withdraw`] or [`Account::deposit`]
    pub fn transfer(&mut self, from: PlayerId, to: PlayerId, amount: Decimal) -> Result<(), LedgerError> {
        if from == to {
            return Err(LedgerError::SelfTransfer(from));
        }
        if !self.accounts.contains_key(&to) {
            return Err(LedgerError::AccountNotFound(to));
        }

        self.accounts
            .get_mut(&from)
            .ok_or(LedgerError::AccountNotFound(from))?
            .withdraw(amount)?;

        let deposited = self
            .accounts
            .get_mut(&to)
            .ok_or(LedgerError::AccountNotFound(to))
            .and_then(|dest| dest.deposit(amount));

        if let Err(e) = deposited {
            if let Some(source) = self.accounts.get_mut(&from) {
                if let Err(refund) = source.deposit(amount) {
                    tracing::error!(player = %from, error = %refund, "Transfer refund failed");
                }
            }
            return Err(e);
        }

        tracing::debug!(from = %from, to = %to, amount = %amount, "Transfer");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use rust_decimal_macros::dec;

    use super::*;
    use crate::resource::Detached;
    use crate::store::MemoryStore;

    #[derive(Default)]
    struct Online {
        totals: Mutex<BTreeMap<PlayerId, u64>>,
    }

    impl Online {
        fn with(player: PlayerId, total: u64) -> Self {
            let online = Self::default();
            online.totals.lock().unwrap().insert(player, total);
            online
        }

        fn total(&self, player: PlayerId) -> Option<u64> {
            self.totals.lock().unwrap().get(&player).copied()
        }
    }

    impl ExperienceSource for Online {
        fn read_total(&self, player: PlayerId) -> Option<u64> {
            self.total(player)
        }

        fn write_total(&self, player: PlayerId, total: u64) {
            if let Some(slot) = self.totals.lock().unwrap().get_mut(&player) {
                *slot = total;
            }
        }
    }

    fn settings(starting: Decimal) -> LedgerSettings {
        LedgerSettings {
            scale_method: ScaleMethod::Points,
            starting_balance: starting,
        }
    }

    fn detached(starting: Decimal) -> AccountManager<MemoryStore> {
        AccountManager::new(Arc::new(MemoryStore::default()), Arc::new(Detached), settings(starting))
    }

    #[test]
    fn new_player_gets_starting_balance_when_it_is_larger() {
        let player = PlayerId::new();
        let online = Arc::new(Online::with(player, 0));
        let mut manager = AccountManager::new(
            Arc::new(MemoryStore::default()),
            Arc::clone(&online) as Arc<dyn ExperienceSource>,
            settings(dec!(10)),
        );

        let account = manager.create_account(player).unwrap();
        assert_eq!(account.balance_raw(), 10);
        assert_eq!(online.total(player), Some(10));
    }

    #[test]
    fn new_player_keeps_existing_experience_when_it_is_larger() {
        let player = PlayerId::new();
        let online = Arc::new(Online::with(player, 250));
        let mut manager = AccountManager::new(
            Arc::new(MemoryStore::default()),
            Arc::clone(&online) as Arc<dyn ExperienceSource>,
            settings(dec!(10)),
        );

        assert_eq!(manager.create_account(player).unwrap().balance_raw(), 250);
        assert_eq!(online.total(player), Some(250));
    }

    #[test]
    fn offline_player_gets_starting_balance() {
        let mut manager = detached(dec!(10));
        let player = PlayerId::new();
        assert_eq!(manager.create_account(player).unwrap().balance_raw(), 10);
    }

    #[test]
    fn nil_player_is_rejected() {
        let mut manager = detached(dec!(0));
        let result = manager.create_account(PlayerId::from(uuid::Uuid::nil()));
        assert!(matches!(result, Err(LedgerError::InvalidPlayer)));
        assert!(manager.is_empty());
    }

    #[test]
    fn create_account_is_idempotent() {
        let mut manager = detached(dec!(10));
        let player = PlayerId::new();
        assert!(manager.create_account(player).unwrap().deposit(dec!(5)).is_ok());

        let again = manager.create_account(player).unwrap();
        assert_eq!(again.balance_raw(), 15);
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn missing_account_lookup_is_none() {
        let manager = detached(dec!(0));
        let player = PlayerId::new();
        assert!(!manager.has_account(player));
        assert!(manager.account(player).is_none());
    }

    #[test]
    fn transfer_moves_funds() {
        let mut manager = detached(dec!(20));
        let (a, b) = (PlayerId::new(), PlayerId::new());
        manager.create_account(a).unwrap();
        manager.create_account(b).unwrap();

        assert!(manager.transfer(a, b, dec!(8)).is_ok());
        assert_eq!(manager.account(a).unwrap().balance_raw(), 12);
        assert_eq!(manager.account(b).unwrap().balance_raw(), 28);
        assert_eq!(manager.total_raw(), 40);
    }

    #[test]
    fn failed_transfer_changes_nothing() {
        let mut manager = detached(dec!(5));
        let (a, b) = (PlayerId::new(), PlayerId::new());
        manager.create_account(a).unwrap();
        manager.create_account(b).unwrap();
        manager.account_mut(b).unwrap().set_balance_raw(u64::MAX, false);

        assert!(manager.transfer(a, b, dec!(50)).is_err());
        assert!(matches!(
            manager.transfer(a, b, dec!(3)),
            Err(LedgerError::AmountOutOfRange { .. })
        ));
        assert!(matches!(manager.transfer(a, a, dec!(1)), Err(LedgerError::SelfTransfer(_))));
        assert!(matches!(
            manager.transfer(a, PlayerId::new(), dec!(1)),
            Err(LedgerError::AccountNotFound(_))
        ));
        assert_eq!(manager.account(a).unwrap().balance_raw(), 5);
        assert_eq!(manager.account(b).unwrap().balance_raw(), u64::MAX);
    }

    #[test]
    fn reload_rescales_existing_accounts() {
        let mut manager = detached(dec!(0));
        let player = PlayerId::new();
        manager.create_account(player).unwrap().set_balance_raw(1234, false);

        manager.reload(LedgerSettings {
            scale_method: ScaleMethod::Levels,
            starting_balance: dec!(1),
        });

        assert_eq!(manager.account(player).unwrap().balance(), dec!(12.34));
        assert_eq!(manager.create_account(PlayerId::new()).unwrap().balance_raw(), 100);
    }

    #[tokio::test]
    async fn load_replaces_mapping_and_save_is_idempotent() {
        let existing = AccountRecord::new(PlayerId::new(), 77);
        let store = Arc::new(MemoryStore::with_records(&[existing]));
        let mut manager = AccountManager::new(Arc::clone(&store), Arc::new(Detached), settings(dec!(0)));
        manager.create_account(PlayerId::new()).unwrap();

        assert_eq!(manager.load().await.unwrap(), 1);
        assert_eq!(manager.state(), LedgerState::Loaded);
        assert_eq!(manager.account(existing.id).unwrap().balance_raw(), 77);

        manager.create_account(PlayerId::new()).unwrap();
        assert_eq!(manager.save().await.unwrap(), 2);
        let first = store.records();
        assert_eq!(manager.save().await.unwrap(), 2);
        assert_eq!(store.records(), first);
    }

    #[tokio::test]
    async fn failed_load_leaves_empty_ledger_and_blocks_save() {
        let store = Arc::new(MemoryStore::with_records(&[AccountRecord::new(PlayerId::new(), 9)]));
        store.set_offline(true);
        let mut manager = AccountManager::new(Arc::clone(&store), Arc::new(Detached), settings(dec!(0)));

        assert!(manager.load().await.is_err());
        assert!(manager.is_empty());
        assert_eq!(manager.state(), LedgerState::Unloaded);

        store.set_offline(false);
        manager.create_account(PlayerId::new()).unwrap();
        assert!(matches!(manager.save().await, Err(LedgerError::NotLoaded)));
        assert_eq!(store.records().len(), 1);
    }

    #[tokio::test]
    async fn failed_save_keeps_in_memory_state() {
        let store = Arc::new(MemoryStore::default());
        let mut manager = AccountManager::new(Arc::clone(&store), Arc::new(Detached), settings(dec!(4)));
        manager.load().await.unwrap();
        let player = PlayerId::new();
        manager.create_account(player).unwrap();

        store.set_offline(true);
        assert!(matches!(manager.save().await, Err(LedgerError::Store(_))));
        assert_eq!(manager.account(player).unwrap().balance_raw(), 4);

        store.set_offline(false);
        assert_eq!(manager.save().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn save_snapshot_ignores_later_mutation() {
        let store = Arc::new(MemoryStore::default());
        let mut manager = AccountManager::new(Arc::clone(&store), Arc::new(Detached), settings(dec!(0)));
        manager.load().await.unwrap();
        let player = PlayerId::new();
        manager.create_account(player).unwrap().set_balance_raw(10, false);

        let pending = manager.save();
        manager.account_mut(player).unwrap().set_balance_raw(99, false);
        pending.await.unwrap();

        assert_eq!(store.records(), vec![AccountRecord::new(player, 10)]);
    }
}
