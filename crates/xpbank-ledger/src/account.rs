//! A single player's ledger entry.
//!
//! The balance lives as a raw point count. Display amounts go through the
//! account's [`ScaleMethod`]; a mutation that should reach the player's live
//! experience is pushed through the [`ExperienceSource`].
//!
//! Mutations have no suspension point between their precondition check and
//! the write, so no partial state is ever observable.

use std::sync::Arc;

use rust_decimal::Decimal;
use xpbank_types::{AccountRecord, PlayerId};

use crate::resource::ExperienceSource;
use crate::scale::ScaleMethod;
use crate::LedgerError;

/// One player's balance.
#[derive(Clone)]
pub struct Account {
    id: PlayerId,
    balance_raw: u64,
    scale: ScaleMethod,
    resource: Arc<dyn ExperienceSource>,
}

impl core::fmt::Debug for Account {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("balance_raw", &self.balance_raw)
            .field("scale", &self.scale)
            .finish_non_exhaustive()
    }
}

impl Account {
    pub(crate) fn new(
        id: PlayerId,
        balance_raw: u64,
        scale: ScaleMethod,
        resource: Arc<dyn ExperienceSource>,
    ) -> Self {
        Self {
            id,
            balance_raw,
            scale,
            resource,
        }
    }

    /// The owning player.
    pub const fn id(&self) -> PlayerId {
        self.id
    }

    /// The scale method used for display amounts.
    pub const fn scale(&self) -> ScaleMethod {
        self.scale
    }

    pub(crate) const fn set_scale(&mut self, scale: ScaleMethod) {
        self.scale = scale;
    }

    /// Balance as a display amount.
    pub fn balance(&self) -> Decimal {
        self.scale.to_display(self.balance_raw)
    }

    /// Balance in raw points.
    pub const fn balance_raw(&self) -> u64 {
        self.balance_raw
    }

    /// Persistable form of this account.
    pub const fn record(&self) -> AccountRecord {
        AccountRecord::new(self.id, self.balance_raw)
    }

    /// Set the balance from a display amount. Negative amounts clamp to zero.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::AmountOutOfRange`] if `amount` does not fit the
    /// raw unit; the balance is left unchanged.
    pub fn set_balance(&mut self, amount: Decimal, propagate: bool) -> Result<(), LedgerError> {
        let raw = if amount.is_sign_negative() {
            0
        } else {
            self.scale.to_raw(amount)?
        };
        self.set_balance_raw(raw, propagate);
        Ok(())
    }

    /// Set the raw balance, optionally writing it to the player's experience.
    pub fn set_balance_raw(&mut self, raw: u64, propagate: bool) {
        self.balance_raw = raw;
        if propagate {
            self.resource.write_total(self.id, raw);
        }
    }

    /// Whether the balance covers `amount`. Non-positive amounts are always
    /// covered; amounts beyond the raw range never are.
    pub fn has(&self, amount: Decimal) -> bool {
        match self.scale.to_raw(amount) {
            Ok(raw) => self.balance_raw >= raw,
            Err(LedgerError::NegativeAmount { .. }) => true,
            Err(_) => false,
        }
    }

    /// Take `amount` out of the account and push the new total to the
    /// player's experience.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NegativeAmount`] if `amount < 0`
    /// - [`LedgerError::AmountOutOfRange`] if `amount` does not fit
    /// - [`LedgerError::InsufficientFunds`] if the balance does not cover it
    ///
    /// On error nothing is changed.
    pub fn withdraw(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        let raw = self.scale.to_raw(amount)?;
        if self.balance_raw < raw {
            return Err(LedgerError::InsufficientFunds {
                requested: raw,
                available: self.balance_raw,
            });
        }
        self.set_balance_raw(self.balance_raw.saturating_sub(raw), true);
        tracing::debug!(
            player = %self.id,
            withdrawn = raw,
            balance_raw = self.balance_raw,
            "Withdrawal"
        );
        Ok(())
    }

    /// Add `amount` to the account and push the new total to the player's
    /// experience.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NegativeAmount`] if `amount < 0`
    /// - [`LedgerError::AmountOutOfRange`] if `amount` or the resulting
    ///   balance does not fit
    ///
    /// On error nothing is changed.
    pub fn deposit(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        let raw = self.scale.to_raw(amount)?;
        let balance = self
            .balance_raw
            .checked_add(raw)
            .ok_or(LedgerError::AmountOutOfRange { amount })?;
        self.set_balance_raw(balance, true);
        tracing::debug!(player = %self.id, deposited = raw, balance_raw = balance, "Deposit");
        Ok(())
    }
}
