//! Experience-backed account ledger for XPBank.
//!
//! The unit of value is the host game's experience point. Every account keeps
//! its balance as a raw point count, and a [`ScaleMethod`] decides how that
//! count is shown to (and typed by) players. Balances and the player's live
//! experience are kept in step through the [`ExperienceSource`] collaborator.
//!
//! # Architecture
//!
//! - [`conversion`] -- The fixed level curve: point totals to and from
//!   `(level, progress)` pairs.
//! - [`scale`] -- [`ScaleMethod`]: raw points to display amounts and back,
//!   plus display formatting.
//! - [`resource`] -- The [`ExperienceSource`] trait the host engine
//!   implements, and [`LevelledExperience`] for hosts that only speak levels.
//! - [`account`] -- [`Account`]: one player's balance and its mutations.
//! - [`manager`] -- [`AccountManager`]: the authoritative in-memory ledger.
//! - [`store`] -- [`AccountStore`]: bulk load/save contract for backends.
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//!
//! use rust_decimal::Decimal;
//! use xpbank_ledger::{AccountManager, Detached, LedgerSettings, MemoryStore};
//! use xpbank_types::PlayerId;
//!
//! let mut manager = AccountManager::new(
//!     Arc::new(MemoryStore::default()),
//!     Arc::new(Detached),
//!     LedgerSettings::default(),
//! );
//! let player = PlayerId::new();
//! let account = manager.create_account(player).ok();
//! assert!(account.is_some());
//!
//! if let Some(account) = manager.account_mut(player) {
//!     assert!(account.deposit(Decimal::new(25, 0)).is_ok());
//!     assert_eq!(account.balance_raw(), 25);
//! }
//! ```

pub mod account;
pub mod conversion;
pub mod manager;
pub mod resource;
pub mod scale;
pub mod store;

pub use account::Account;
pub use conversion::{
    level_progress_from_total, points_to_next_level, points_to_reach_level,
    total_from_level_progress, LevelProgress,
};
pub use manager::{AccountManager, LedgerSettings, LedgerState};
pub use resource::{Detached, ExperienceSource, LevelHost, LevelledExperience};
pub use scale::{CurrencyNames, ScaleMethod};
pub use store::{AccountStore, MemoryStore, MemoryStoreError};

use rust_decimal::Decimal;
use xpbank_types::PlayerId;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors returned by ledger operations.
///
/// Every failing operation leaves the ledger exactly as it was.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The player identifier is the nil UUID.
    #[error("player id must not be nil")]
    InvalidPlayer,

    /// Amounts handed to the ledger must not be negative.
    #[error("amount must not be negative, got {amount}")]
    NegativeAmount {
        /// The rejected amount.
        amount: Decimal,
    },

    /// The amount does not fit the raw point unit.
    #[error("amount {amount} is out of range for the ledger")]
    AmountOutOfRange {
        /// The rejected amount.
        amount: Decimal,
    },

    /// A withdrawal asked for more than the account holds.
    #[error("insufficient funds: requested {requested} raw, available {available} raw")]
    InsufficientFunds {
        /// Raw points requested.
        requested: u64,
        /// Raw points available.
        available: u64,
    },

    /// No account exists for the player.
    #[error("no account for player {0}")]
    AccountNotFound(PlayerId),

    /// Source and destination of a transfer are the same account.
    #[error("cannot transfer from an account to itself ({0})")]
    SelfTransfer(PlayerId),

    /// The ledger was not loaded successfully, so saving it could overwrite
    /// persisted balances.
    #[error("ledger is not loaded; refusing to save")]
    NotLoaded,

    /// The storage backend failed.
    #[error("storage backend error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl LedgerError {
    /// Wrap a backend error.
    pub fn store<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Store(Box::new(err))
    }
}
