//! Storage backends for the XPBank ledger.
//!
//! A backend is the ledger's checkpoint. It is read in bulk when the process
//! starts and written in bulk at save points; the in-memory
//! `AccountManager` stays the source of truth in between.
//!
//! # Architecture
//!
//! ```text
//! AccountManager::save()  --snapshot-->  StorageBackend
//!                                          |-- FileAccountStore      (JSON file, temp + rename)
//!                                          +-- PostgresAccountStore  (batched UNNEST upsert)
//! ```
//!
//! # Modules
//!
//! - [`file_store`] -- Single JSON document holding every account
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`account_store`] -- The account table on `PostgreSQL`
//! - [`backend`] -- [`StorageSettings`] and the config-selected [`StorageBackend`]
//! - [`error`] -- Shared error types

pub mod account_store;
pub mod backend;
pub mod error;
pub mod file_store;
pub mod postgres;

// Re-export primary types for convenience.
pub use account_store::{validate_table_name, PostgresAccountStore};
pub use backend::{BackendKind, StorageBackend, StorageSettings};
pub use error::DbError;
pub use file_store::FileAccountStore;
pub use postgres::{PostgresConfig, PostgresPool};
