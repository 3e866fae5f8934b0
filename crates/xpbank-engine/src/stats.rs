//! Periodic ledger statistics.

use std::sync::Arc;

use xpbank_core::{Economy, MemoryExperience, TickHook};

/// Logs ledger size and circulating points every `every` ticks.
pub struct StatsHook {
    every: u64,
    host: Arc<MemoryExperience>,
}

impl StatsHook {
    /// Report every `every` ticks; zero disables reporting.
    pub const fn new(every: u64, host: Arc<MemoryExperience>) -> Self {
        Self { every, host }
    }

    /// Whether `tick` is a reporting tick.
    pub const fn is_due(&self, tick: u64) -> bool {
        matches!(tick.checked_rem(self.every), Some(0))
    }
}

impl<S> TickHook<S> for StatsHook {
    fn on_tick(&mut self, tick: u64, economy: &mut Economy<S>) {
        if !self.is_due(tick) {
            return;
        }
        let manager = economy.manager();
        tracing::info!(
            tick,
            accounts = manager.len(),
            total_raw = manager.total_raw(),
            online = self.host.online_count(),
            enabled = economy.is_enabled(),
            "Ledger stats"
        );
    }
}
