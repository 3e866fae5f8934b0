//! Shared type definitions for the XPBank experience ledger.
//!
//! # Modules
//!
//! - [`ids`] -- [`PlayerId`], the ledger key, with its binary encoding
//! - [`structs`] -- [`AccountRecord`], the unit exchanged with storage backends

pub mod ids;
pub mod structs;

pub use ids::{IdError, PlayerId};
pub use structs::AccountRecord;
