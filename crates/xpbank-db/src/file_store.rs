//! Ledger persistence in a single JSON file.
//!
//! ```json
//! { "accounts": [ { "id": "<uuid>", "balance_raw": 120 }, ... ] }
//! ```
//!
//! A missing file is an empty ledger. Records that fail to decode are
//! skipped with a warning; only a document that is not JSON at all fails the
//! load. Saves merge the snapshot into what is already on disk (undecodable
//! entries are carried over verbatim unless the snapshot now holds their
//! player), write
//! `<file>.tmp` and rename it over the original, so a crash mid-write never
//! leaves a truncated ledger behind.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use xpbank_ledger::AccountStore;
use xpbank_types::{AccountRecord, PlayerId};

use crate::error::DbError;

#[derive(Deserialize)]
struct RawDocument {
    #[serde(default)]
    accounts: Vec<serde_json::Value>,
}

#[derive(Serialize)]
struct Document<'a> {
    accounts: &'a [serde_json::Value],
}

/// A parsed ledger file: the records that decoded and the raw entries that
/// did not.
#[derive(Default)]
struct Contents {
    records: Vec<AccountRecord>,
    malformed: Vec<serde_json::Value>,
}

/// The player an undecodable entry still names, if any.
fn entry_player(value: &serde_json::Value) -> Option<PlayerId> {
    value.get("id")?.as_str()?.parse().ok()
}

/// Account persistence in one JSON document.
#[derive(Debug, Clone)]
pub struct FileAccountStore {
    path: PathBuf,
}

impl FileAccountStore {
    /// Store accounts at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The ledger file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Read every decodable record. A missing file yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Io`] if the file exists but cannot be read, and
    /// [`DbError::Serialization`] if it is not a JSON ledger document.
    pub async fn read_records(&self) -> Result<Vec<AccountRecord>, DbError> {
        let contents = self.read_contents().await?;
        for (index, value) in contents.malformed.iter().enumerate() {
            tracing::warn!(path = %self.path.display(), index, entry = %value, "Skipping malformed account record");
        }
        Ok(contents.records)
    }

    async fn read_contents(&self) -> Result<Contents, DbError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "Ledger file does not exist yet");
                return Ok(Contents::default());
            }
            Err(e) => return Err(DbError::io(&self.path, e)),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Contents::default());
        }

        let document: RawDocument = serde_json::from_slice(&bytes)?;
        let mut contents = Contents {
            records: Vec::with_capacity(document.accounts.len()),
            malformed: Vec::new(),
        };
        for value in document.accounts {
            match AccountRecord::deserialize(&value) {
                Ok(record) => contents.records.push(record),
                Err(_) => contents.malformed.push(value),
            }
        }
        Ok(contents)
    }

    /// Merge `records` into the file and replace it atomically.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Io`] on any file-system failure and
    /// [`DbError::Serialization`] if the existing file cannot be parsed.
    pub async fn write_records(&self, records: &[AccountRecord]) -> Result<(), DbError> {
        let existing = self.read_contents().await?;
        let mut merged: BTreeMap<PlayerId, u64> = existing
            .records
            .into_iter()
            .map(|r| (r.id, r.balance_raw))
            .collect();
        merged.extend(records.iter().map(|r| (r.id, r.balance_raw)));

        let mut all = merged
            .into_iter()
            .map(|(id, raw)| serde_json::to_value(AccountRecord::new(id, raw)))
            .collect::<Result<Vec<_>, _>>()?;
        let kept: Vec<serde_json::Value> = existing
            .malformed
            .into_iter()
            .filter(|value| !entry_player(value).is_some_and(|id| records.iter().any(|r| r.id == id)))
            .collect();
        if !kept.is_empty() {
            tracing::warn!(path = %self.path.display(), count = kept.len(), "Keeping malformed account records as they are");
        }
        all.extend(kept);
        let bytes = serde_json::to_vec_pretty(&Document { accounts: &all })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DbError::io(parent, e))?;
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, &bytes)
            .await
            .map_err(|e| DbError::io(&temp, e))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| DbError::io(&self.path, e))?;

        tracing::debug!(path = %self.path.display(), count = all.len(), "Wrote ledger file");
        Ok(())
    }
}

impl AccountStore for FileAccountStore {
    type Error = DbError;

    async fn load(&self) -> Result<Vec<AccountRecord>, DbError> {
        self.read_records().await
    }

    async fn save(&self, records: &[AccountRecord]) -> Result<(), DbError> {
        self.write_records(records).await
    }
}
