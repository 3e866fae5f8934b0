//! Keeping balances and live experience in step.
//!
//! The host engine reports experience changes *before* it applies them, so
//! reading the player's value in the same instant would observe the old
//! number. Every event is therefore turned into a task that runs on the
//! **next** tick, once the host's own mutation has settled:
//!
//! ```text
//! tick N:   event --notify()--> DeferredQueue
//! tick N+1: run_tick() --> read resource -> ledger   (most events)
//!                      --> write ledger -> resource  (join with an account)
//! ```
//!
//! A task whose player is no longer reachable is dropped silently and
//! counted in the [`TickReport`].

use serde::Deserialize;
use xpbank_ledger::AccountManager;
use xpbank_types::PlayerId;

// ---------------------------------------------------------------------------
// Events and settings
// ---------------------------------------------------------------------------

/// A host notification that a player's experience is about to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceEvent {
    /// The player connected.
    Joined(PlayerId),
    /// Experience points were awarded or removed.
    ExperienceChanged(PlayerId),
    /// The player's level changed directly.
    LevelChanged(PlayerId),
    /// Experience was consumed by a game mechanic (enchanting, repairs).
    ExperienceSpent(PlayerId),
    /// The player died and is about to drop experience.
    Died(PlayerId),
    /// The player respawned.
    Respawned(PlayerId),
}

impl ResourceEvent {
    /// The player the event is about.
    pub const fn player(self) -> PlayerId {
        match self {
            Self::Joined(p)
            | Self::ExperienceChanged(p)
            | Self::LevelChanged(p)
            | Self::ExperienceSpent(p)
            | Self::Died(p)
            | Self::Respawned(p) => p,
        }
    }
}

const fn default_true() -> bool {
    true
}

/// The `reconcile` section of the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReconcileSettings {
    /// On join, overwrite the player's experience with their stored balance.
    #[serde(default = "default_true")]
    pub restore_on_join: bool,

    /// Re-read experience after a death.
    #[serde(default = "default_true")]
    pub track_deaths: bool,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            restore_on_join: true,
            track_deaths: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Deferred queue
// ---------------------------------------------------------------------------

/// Work scheduled for the next tick.
///
/// Items pushed while a batch is being processed are not part of that batch;
/// they become due on the following call to [`take_due`](Self::take_due).
#[derive(Debug)]
pub struct DeferredQueue<T> {
    pending: Vec<T>,
}

impl<T> Default for DeferredQueue<T> {
    fn default() -> Self {
        Self { pending: Vec::new() }
    }
}

impl<T> DeferredQueue<T> {
    /// Schedule `item` for the next tick.
    pub fn push(&mut self, item: T) {
        self.pending.push(item);
    }

    /// Remove and return everything scheduled so far, in arrival order.
    pub fn take_due(&mut self) -> Vec<T> {
        std::mem::take(&mut self.pending)
    }

    /// Number of scheduled items.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Task {
    /// Create the account, or restore the player's experience from it.
    Join(PlayerId),
    /// Copy the player's current experience into the ledger.
    Pull(PlayerId),
}

/// Outcome of one [`Reconciler::run_tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Tasks that changed the ledger or the player.
    pub executed: u64,
    /// Tasks dropped because the player was unreachable or had no account.
    pub skipped: u64,
    /// Accounts opened by join tasks.
    pub created: u64,
}

/// Turns host events into deferred ledger/resource synchronization.
#[derive(Debug, Default)]
pub struct Reconciler {
    settings: ReconcileSettings,
    queue: DeferredQueue<Task>,
}

impl Reconciler {
    /// Create a reconciler with an empty queue.
    pub fn new(settings: ReconcileSettings) -> Self {
        Self {
            settings,
            queue: DeferredQueue::default(),
        }
    }

    /// Active settings.
    pub const fn settings(&self) -> &ReconcileSettings {
        &self.settings
    }

    /// Apply new settings. Already queued tasks are kept.
    pub fn reload(&mut self, settings: ReconcileSettings) {
        tracing::info!(
            restore_on_join = settings.restore_on_join,
            track_deaths = settings.track_deaths,
            "Reconcile settings reloaded"
        );
        self.settings = settings;
    }

    /// Number of tasks waiting for the next tick.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Record a host event. Returns `false` if the event is ignored under
    /// the current settings.
    pub fn notify(&mut self, event: ResourceEvent) -> bool {
        let task = match event {
            ResourceEvent::Joined(p) => Task::Join(p),
            ResourceEvent::Died(p) if !self.settings.track_deaths => {
                tracing::trace!(player = %p, "Death tracking disabled, ignoring");
                return false;
            }
            ResourceEvent::ExperienceChanged(p)
            | ResourceEvent::LevelChanged(p)
            | ResourceEvent::ExperienceSpent(p)
            | ResourceEvent::Died(p)
            | ResourceEvent::Respawned(p) => Task::Pull(p),
        };
        self.queue.push(task);
        true
    }

    /// Run every task queued before this call.
    pub fn run_tick<S>(&mut self, manager: &mut AccountManager<S>) -> TickReport {
        let mut report = TickReport::default();
        for task in self.queue.take_due() {
            match task {
                Task::Join(player) => self.join(manager, player, &mut report),
                Task::Pull(player) => pull(manager, player, &mut report),
            }
        }
        if report != TickReport::default() {
            tracing::debug!(
                executed = report.executed,
                skipped = report.skipped,
                created = report.created,
                "Reconciled"
            );
        }
        report
    }

    fn join<S>(&self, manager: &mut AccountManager<S>, player: PlayerId, report: &mut TickReport) {
        // Left before the tick ran: opening an account now would seed it
        // without the player's real total.
        if manager.resource().read_total(player).is_none() {
            report.skipped = report.skipped.saturating_add(1);
            return;
        }

        if !manager.has_account(player) {
            match manager.create_account(player) {
                Ok(_) => {
                    report.created = report.created.saturating_add(1);
                    report.executed = report.executed.saturating_add(1);
                }
                Err(e) => {
                    tracing::warn!(player = %player, error = %e, "Could not open account on join");
                    report.skipped = report.skipped.saturating_add(1);
                }
            }
            return;
        }

        if !self.settings.restore_on_join {
            report.skipped = report.skipped.saturating_add(1);
            return;
        }

        if let Some(account) = manager.account_mut(player) {
            let balance = account.balance_raw();
            account.set_balance_raw(balance, true);
            tracing::debug!(player = %player, balance_raw = balance, "Restored experience from ledger");
            report.executed = report.executed.saturating_add(1);
        }
    }
}

fn pull<S>(manager: &mut AccountManager<S>, player: PlayerId, report: &mut TickReport) {
    let Some(total) = manager.resource().read_total(player) else {
        report.skipped = report.skipped.saturating_add(1);
        return;
    };
    let Some(account) = manager.account_mut(player) else {
        report.skipped = report.skipped.saturating_add(1);
        return;
    };
    if account.balance_raw() != total {
        tracing::debug!(
            player = %player,
            from = account.balance_raw(),
            to = total,
            "Ledger updated from experience"
        );
        account.set_balance_raw(total, false);
    }
    report.executed = report.executed.saturating_add(1);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn queue_separates_ticks() {
        let mut queue = DeferredQueue::default();
        queue.push(1);
        queue.push(2);
        let due = queue.take_due();
        queue.push(3);
        assert_eq!(due, vec![1, 2]);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.take_due(), vec![3]);
        assert!(queue.is_empty());
    }

    #[test]
    fn deaths_are_ignored_when_untracked() {
        let player = PlayerId::new();
        let mut reconciler = Reconciler::new(ReconcileSettings {
            restore_on_join: true,
            track_deaths: false,
        });
        assert!(!reconciler.notify(ResourceEvent::Died(player)));
        assert!(reconciler.notify(ResourceEvent::Respawned(player)));
        assert_eq!(reconciler.pending(), 1);

        reconciler.reload(ReconcileSettings::default());
        assert!(reconciler.notify(ResourceEvent::Died(player)));
        assert_eq!(reconciler.pending(), 2);
    }

    #[test]
    fn every_event_names_its_player() {
        let p = PlayerId::new();
        for event in [
            ResourceEvent::Joined(p),
            ResourceEvent::ExperienceChanged(p),
            ResourceEvent::LevelChanged(p),
            ResourceEvent::ExperienceSpent(p),
            ResourceEvent::Died(p),
            ResourceEvent::Respawned(p),
        ] {
            assert_eq!(event.player(), p);
        }
    }
}
