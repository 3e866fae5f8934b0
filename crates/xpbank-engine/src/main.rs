//! Standalone host for the XPBank economy.
//!
//! Wires configuration, storage, the ledger and the tick loop together and
//! runs until Ctrl-C, then writes a final save.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `xpbank-config.yaml` (or `XPBANK_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Build the configured storage backend
//! 4. Load the ledger (a failure is logged; saving stays disabled)
//! 5. Start the stdin console that feeds player events (see [`console`])
//! 6. Run the economy loop until Ctrl-C
//! 7. Final save, close the backend

mod console;
mod error;
mod stats;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use xpbank_core::config::LoggingConfig;
use xpbank_core::{run_economy, Economy, EconomyConfig, MemoryExperience, Reconciler};
use xpbank_db::StorageBackend;
use xpbank_ledger::{AccountManager, ExperienceSource};

use crate::error::EngineError;
use crate::stats::StatsHook;

/// Buffered host events between the game and the tick loop.
const EVENT_BUFFER: usize = 1024;

/// Ticks between statistics log lines (one minute at the default interval).
const STATS_EVERY_TICKS: u64 = 1200;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, the storage backend, or the final
/// save fails.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1. Load configuration.
    let config = EconomyConfig::load()?;

    // 2. Initialize structured logging.
    init_logging(&config.logging)?;
    info!(
        scale_method = ?config.ledger.scale_method,
        starting_balance = %config.ledger.starting_balance,
        backend = ?config.storage.backend,
        tick_interval_ms = config.runtime.tick_interval_ms,
        autosave_ticks = config.runtime.autosave_ticks,
        "xpbank-engine starting"
    );

    // 3. Build the storage backend.
    let backend = Arc::new(StorageBackend::from_settings(&config.storage)?);

    // 4. Load the ledger.
    let host = Arc::new(MemoryExperience::new());
    let resource: Arc<dyn ExperienceSource> = Arc::clone(&host) as _;
    let mut manager = AccountManager::new(Arc::clone(&backend), resource, config.ledger.clone());
    match manager.load().await {
        Ok(count) => info!(count, "Ledger ready"),
        Err(e) => warn!(error = %e, "Ledger not loaded; running without persistence until restart"),
    }

    let mut economy = Economy::new(manager, config.currency_names());
    let mut reconciler = Reconciler::new(config.reconcile.clone());
    let (events_tx, mut events_rx) = mpsc::channel(EVENT_BUFFER);
    let mut hook = StatsHook::new(STATS_EVERY_TICKS, Arc::clone(&host));

    // 5. Feed player events from stdin. The thread is detached so a pending
    // read never holds up shutdown.
    let console_host = Arc::clone(&host);
    std::thread::Builder::new()
        .name("xpbank-console".to_owned())
        .spawn(move || console::feed(std::io::stdin().lock(), &console_host, &events_tx))
        .map_err(|e| EngineError::Console { message: e.to_string() })?;

    // 6. Run until Ctrl-C.
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Ctrl-C handler failed; shutting down");
        }
        info!("Shutdown requested");
    };
    let result = run_economy(
        &mut economy,
        &mut reconciler,
        &mut events_rx,
        &mut hook,
        &config.runtime,
        shutdown,
    )
    .await;

    // 7. Close the backend.
    backend.close().await;

    let summary = result?;
    info!(
        total_ticks = summary.total_ticks,
        accounts_saved = summary.final_save_count,
        "xpbank-engine shutdown complete"
    );
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over `logging.level`.
fn init_logging(logging: &LoggingConfig) -> Result<(), EngineError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .map_err(|e| EngineError::Logging {
            message: format!("invalid log filter {:?}: {e}", logging.level),
        })?;

    let installed = if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
    };

    installed.map_err(|e| EngineError::Logging {
        message: e.to_string(),
    })
}
