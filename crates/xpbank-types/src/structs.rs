//! Persisted record shapes.

use serde::{Deserialize, Serialize};

use crate::ids::PlayerId;

/// One ledger entry as the storage backends see it.
///
/// The balance is the canonical raw point count; display formatting is a
/// ledger concern and never reaches storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountRecord {
    /// The owning player.
    pub id: PlayerId,
    /// Raw point balance.
    pub balance_raw: u64,
}

impl AccountRecord {
    /// Create a record.
    pub const fn new(id: PlayerId, balance_raw: u64) -> Self {
        Self { id, balance_raw }
    }
}
