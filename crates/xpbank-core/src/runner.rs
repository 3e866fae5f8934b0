//! The economy's tick loop.
//!
//! [`run_economy`] is the single logical thread that owns the ledger. Each
//! tick, in order:
//!
//! 1. run reconciliation tasks queued on the previous tick
//! 2. move newly received [`ResourceEvent`]s into the queue for the next tick
//! 3. call the [`TickHook`] (where a command layer mutates the ledger)
//! 4. every `autosave_ticks`, start a background save of a snapshot
//!
//! When `shutdown` resolves, any running autosave is awaited and a final
//! save is performed before returning.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use xpbank_ledger::{AccountStore, LedgerError};

use crate::config::RuntimeConfig;
use crate::economy::Economy;
use crate::reconcile::{Reconciler, ResourceEvent};

/// Errors that end a run unsuccessfully.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The shutdown save did not complete.
    #[error("final save failed: {source}")]
    FinalSave {
        /// The underlying ledger error.
        #[from]
        source: LedgerError,
    },
}

/// Totals for a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Ticks executed.
    pub total_ticks: u64,
    /// Reconciliation tasks that took effect.
    pub tasks_executed: u64,
    /// Reconciliation tasks dropped for unreachable players.
    pub tasks_skipped: u64,
    /// Accounts opened by reconciliation.
    pub accounts_created: u64,
    /// Autosaves started.
    pub autosaves_started: u64,
    /// Autosaves skipped because the previous one was still running.
    pub autosaves_skipped: u64,
    /// Accounts written by the final save.
    pub final_save_count: usize,
}

/// Called once per tick after reconciliation.
pub trait TickHook<S>: Send {
    /// `tick` counts from 1.
    fn on_tick(&mut self, tick: u64, economy: &mut Economy<S>);
}

/// A hook that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHook;

impl<S> TickHook<S> for NoOpHook {
    fn on_tick(&mut self, _tick: u64, _economy: &mut Economy<S>) {}
}

type SaveHandle = JoinHandle<Result<usize, LedgerError>>;

/// Drive the economy until `shutdown` resolves.
///
/// # Errors
///
/// Returns [`RunnerError::FinalSave`] if the shutdown save fails. In-memory
/// state is still intact and the caller may retry.
pub async fn run_economy<S, F>(
    economy: &mut Economy<S>,
    reconciler: &mut Reconciler,
    events: &mut mpsc::Receiver<ResourceEvent>,
    hook: &mut dyn TickHook<S>,
    runtime: &RuntimeConfig,
    shutdown: F,
) -> Result<RunSummary, RunnerError>
where
    S: AccountStore,
    F: Future<Output = ()>,
{
    let mut summary = RunSummary::default();
    let mut in_flight: Option<SaveHandle> = None;

    let mut interval = tokio::time::interval(Duration::from_millis(runtime.tick_interval_ms.max(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    info!(
        tick_interval_ms = runtime.tick_interval_ms,
        autosave_ticks = runtime.autosave_ticks,
        accounts = economy.manager().len(),
        "Economy loop starting"
    );

    loop {
        tokio::select! {
            biased;
            () = &mut shutdown => break,
            _ = interval.tick() => {}
        }

        summary.total_ticks = summary.total_ticks.saturating_add(1);
        let tick = summary.total_ticks;

        let report = reconciler.run_tick(economy.manager_mut());
        summary.tasks_executed = summary.tasks_executed.saturating_add(report.executed);
        summary.tasks_skipped = summary.tasks_skipped.saturating_add(report.skipped);
        summary.accounts_created = summary.accounts_created.saturating_add(report.created);

        while let Ok(event) = events.try_recv() {
            reconciler.notify(event);
        }

        hook.on_tick(tick, economy);

        if tick.checked_rem(runtime.autosave_ticks) == Some(0) {
            if in_flight.as_ref().is_some_and(|h| !h.is_finished()) {
                warn!(tick, "Previous save still running, skipping autosave");
                summary.autosaves_skipped = summary.autosaves_skipped.saturating_add(1);
            } else {
                in_flight = Some(tokio::spawn(economy.manager().save()));
                summary.autosaves_started = summary.autosaves_started.saturating_add(1);
            }
        }
    }

    info!(total_ticks = summary.total_ticks, "Economy loop stopping");

    if let Some(handle) = in_flight.take() {
        if let Err(e) = handle.await {
            warn!(error = %e, "Autosave task did not complete");
        }
    }

    summary.final_save_count = economy.manager().save().await?;

    info!(
        total_ticks = summary.total_ticks,
        tasks_executed = summary.tasks_executed,
        tasks_skipped = summary.tasks_skipped,
        autosaves = summary.autosaves_started,
        saved = summary.final_save_count,
        "Economy loop stopped"
    );
    Ok(summary)
}
