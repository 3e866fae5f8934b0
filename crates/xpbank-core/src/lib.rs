//! Orchestration for the XPBank economy.
//!
//! This crate sits between the host game and the ledger:
//!
//! - [`config`] -- YAML configuration with typed sections and validation
//! - [`reconcile`] -- Host events become next-tick synchronization tasks
//! - [`economy`] -- The ledger behind a generic economy-provider surface
//! - [`runner`] -- The tick loop with autosave and shutdown save
//! - [`memory_host`] -- An in-process experience table for standalone runs
//!
//! # Tick Cycle
//!
//! ```text
//! host event --mpsc--> run_economy
//!                        |-- Reconciler::run_tick   (tasks from last tick)
//!                        |-- Reconciler::notify     (events for next tick)
//!                        |-- TickHook::on_tick      (commands)
//!                        +-- autosave every N ticks (spawned, snapshot)
//! ```

pub mod config;
pub mod economy;
pub mod memory_host;
pub mod reconcile;
pub mod runner;

pub use config::{ConfigError, EconomyConfig};
pub use economy::{Economy, EconomyResponse, ResponseKind};
pub use memory_host::MemoryExperience;
pub use reconcile::{DeferredQueue, ReconcileSettings, Reconciler, ResourceEvent, TickReport};
pub use runner::{run_economy, NoOpHook, RunSummary, RunnerError, TickHook};
