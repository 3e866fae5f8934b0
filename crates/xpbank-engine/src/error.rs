//! Error types for the engine binary.

/// Top-level error for the engine binary.
///
/// Each variant wraps a subsystem error so `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: xpbank_core::ConfigError,
    },

    /// The storage backend could not be built.
    #[error("storage error: {source}")]
    Storage {
        /// The underlying storage error.
        #[from]
        source: xpbank_db::DbError,
    },

    /// The economy loop ended without a successful final save.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: xpbank_core::RunnerError,
    },

    /// The console thread could not be started.
    #[error("console error: {message}")]
    Console {
        /// Description of the failure.
        message: String,
    },

    /// The log subscriber could not be installed.
    #[error("logging error: {message}")]
    Logging {
        /// Description of the failure.
        message: String,
    },
}
