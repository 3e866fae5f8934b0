//! The ledger as a generic economy provider.
//!
//! Other plugins talk to "an economy" through a small, currency-agnostic
//! surface: look up balances, test affordability, withdraw and deposit, and
//! get a structured [`EconomyResponse`] back instead of an error type.
//! Shared bank accounts are not supported.

use rust_decimal::Decimal;
use xpbank_ledger::{AccountManager, CurrencyNames, LedgerError, LedgerSettings, LedgerState};
use xpbank_types::PlayerId;

/// Name this provider registers under.
pub const PROVIDER_NAME: &str = "XPBank";

/// Whether an economy call went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// The transaction was applied.
    Success,
    /// Nothing was changed.
    Failure,
}

/// Result of a withdraw or deposit through the economy API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EconomyResponse {
    /// Amount that was requested.
    pub amount: Decimal,
    /// Balance after the call (unchanged on failure).
    pub balance: Decimal,
    /// Outcome.
    pub kind: ResponseKind,
    /// Human-readable reason for a failure.
    pub error_message: Option<String>,
}

impl EconomyResponse {
    fn success(amount: Decimal, balance: Decimal) -> Self {
        Self {
            amount,
            balance,
            kind: ResponseKind::Success,
            error_message: None,
        }
    }

    fn failure(amount: Decimal, balance: Decimal, err: &LedgerError) -> Self {
        Self {
            amount,
            balance,
            kind: ResponseKind::Failure,
            error_message: Some(err.to_string()),
        }
    }

    /// Whether the transaction was applied.
    pub fn transaction_success(&self) -> bool {
        self.kind == ResponseKind::Success
    }
}

/// Economy provider backed by an [`AccountManager`].
#[derive(Debug)]
pub struct Economy<S> {
    manager: AccountManager<S>,
    names: CurrencyNames,
}

impl<S> Economy<S> {
    /// Wrap a ledger.
    pub const fn new(manager: AccountManager<S>, names: CurrencyNames) -> Self {
        Self { manager, names }
    }

    /// The underlying ledger.
    pub const fn manager(&self) -> &AccountManager<S> {
        &self.manager
    }

    /// The underlying ledger, for direct mutation.
    pub const fn manager_mut(&mut self) -> &mut AccountManager<S> {
        &mut self.manager
    }

    /// Give up the facade and return the ledger.
    pub fn into_manager(self) -> AccountManager<S> {
        self.manager
    }

    /// Apply reloaded ledger settings and unit names.
    pub fn reload(&mut self, settings: LedgerSettings, names: CurrencyNames) {
        self.manager.reload(settings);
        self.names = names;
    }

    /// Provider name.
    pub const fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    /// Whether the provider is serving requests: only once the ledger has
    /// loaded.
    pub fn is_enabled(&self) -> bool {
        self.manager.state() == LedgerState::Loaded
    }

    /// Shared bank accounts are not offered.
    pub const fn has_bank_support(&self) -> bool {
        false
    }

    /// Decimal places of display amounts.
    pub const fn fractional_digits(&self) -> u32 {
        self.manager.settings().scale_method.scale()
    }

    /// Render an amount with grouping and the unit name.
    pub fn format(&self, amount: Decimal) -> String {
        self.manager
            .settings()
            .scale_method
            .format(amount, Some(&self.names))
    }

    /// Unit name for exactly one.
    pub fn currency_name_singular(&self) -> &str {
        &self.names.singular
    }

    /// Unit name for any other amount.
    pub fn currency_name_plural(&self) -> &str {
        &self.names.plural
    }

    /// Whether the player has an account.
    pub fn has_account(&self, player: PlayerId) -> bool {
        self.manager.has_account(player)
    }

    /// Open an account. Returns `true` only if a new account was created.
    pub fn create_player_account(&mut self, player: PlayerId) -> bool {
        if self.manager.has_account(player) {
            return false;
        }
        match self.manager.create_account(player) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(player = %player, error = %e, "Economy account creation failed");
                false
            }
        }
    }

    /// The player's balance, or zero without an account.
    pub fn get_balance(&self, player: PlayerId) -> Decimal {
        self.manager
            .account(player)
            .map_or(Decimal::ZERO, xpbank_ledger::Account::balance)
    }

    /// Whether the player can afford `amount`.
    pub fn has(&self, player: PlayerId, amount: Decimal) -> bool {
        self.manager
            .account(player)
            .is_some_and(|account| account.has(amount))
    }

    /// Take `amount` from the player.
    pub fn withdraw_player(&mut self, player: PlayerId, amount: Decimal) -> EconomyResponse {
        let Some(account) = self.manager.account_mut(player) else {
            return EconomyResponse::failure(amount, Decimal::ZERO, &LedgerError::AccountNotFound(player));
        };
        match account.withdraw(amount) {
            Ok(()) => EconomyResponse::success(amount, account.balance()),
            Err(e) => EconomyResponse::failure(amount, account.balance(), &e),
        }
    }

    /// Give `amount` to the player.
    pub fn deposit_player(&mut self, player: PlayerId, amount: Decimal) -> EconomyResponse {
        let Some(account) = self.manager.account_mut(player) else {
            return EconomyResponse::failure(amount, Decimal::ZERO, &LedgerError::AccountNotFound(player));
        };
        match account.deposit(amount) {
            Ok(()) => EconomyResponse::success(amount, account.balance()),
            Err(e) => EconomyResponse::failure(amount, account.balance(), &e),
        }
    }
}
