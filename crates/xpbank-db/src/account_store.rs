//! The account table on `PostgreSQL`.
//!
//! One row per player:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS <table> (
//!     id      BYTEA PRIMARY KEY,       -- 16-byte big-endian UUID
//!     balance NUMERIC(20, 0) NOT NULL  -- raw points, full u64 range
//! )
//! ```
//!
//! The table is created on first use and the check is repeated before every
//! load and save. Saves are upserts sent as multi-row UNNEST statements in
//! chunks of `batch_size`, one transaction per chunk.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use xpbank_ledger::AccountStore;
use xpbank_types::{AccountRecord, PlayerId};

use crate::error::DbError;
use crate::postgres::PostgresPool;

/// Default number of records per upsert transaction.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Longest identifier `PostgreSQL` accepts without truncation.
const MAX_IDENTIFIER_LEN: usize = 63;

/// Check that `name` is a plain, unquoted SQL identifier.
///
/// # Errors
///
/// Returns [`DbError::Config`] describing the problem.
pub fn validate_table_name(name: &str) -> Result<(), DbError> {
    let mut chars = name.chars();
    let first_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if !first_ok || !rest_ok || name.len() > MAX_IDENTIFIER_LEN {
        return Err(DbError::Config(format!(
            "table name {name:?} must match [A-Za-z_][A-Za-z0-9_]* and be at most {MAX_IDENTIFIER_LEN} characters"
        )));
    }
    Ok(())
}

/// Account persistence on a single `PostgreSQL` table.
#[derive(Debug, Clone)]
pub struct PostgresAccountStore {
    pool: PostgresPool,
    table: String,
    batch_size: usize,
}

impl PostgresAccountStore {
    /// Bind a store to `table` on `pool`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if `table` is not a plain identifier.
    pub fn new(pool: PostgresPool, table: &str) -> Result<Self, DbError> {
        validate_table_name(table)?;
        Ok(Self {
            pool,
            table: table.to_owned(),
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    /// Set the number of records per upsert transaction (minimum 1).
    #[must_use]
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// The table this store writes.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The connection pool.
    pub const fn pool(&self) -> &PostgresPool {
        &self.pool
    }

    /// Create the table if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the statement fails.
    pub async fn ensure_schema(&self) -> Result<(), DbError> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (id BYTEA PRIMARY KEY, balance NUMERIC(20, 0) NOT NULL)",
            self.table
        );
        sqlx::query(&sql).execute(self.pool.pool()).await?;
        Ok(())
    }

    /// Read every row. Rows whose id or balance cannot be decoded are
    /// skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn load_all(&self) -> Result<Vec<AccountRecord>, DbError> {
        self.ensure_schema().await?;

        let sql = format!("SELECT id, balance FROM {}", self.table);
        let rows = sqlx::query_as::<_, (Vec<u8>, Decimal)>(&sql)
            .fetch_all(self.pool.pool())
            .await?;

        let mut records = Vec::with_capacity(rows.len());
        for (id, balance) in rows {
            let Ok(player) = PlayerId::from_slice(&id) else {
                tracing::warn!(table = %self.table, len = id.len(), "Skipping row with malformed id");
                continue;
            };
            let Some(raw) = balance.to_u64() else {
                tracing::warn!(table = %self.table, player = %player, balance = %balance, "Skipping row with invalid balance");
                continue;
            };
            records.push(AccountRecord::new(player, raw));
        }

        tracing::debug!(table = %self.table, count = records.len(), "Loaded account rows");
        Ok(records)
    }

    /// The upsert transactions `records` is split into: consecutive runs of
    /// `batch_size`, the remainder last.
    fn batches<'a>(&self, records: &'a [AccountRecord]) -> std::slice::Chunks<'a, AccountRecord> {
        records.chunks(self.batch_size)
    }

    /// Insert or update every record.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if any chunk fails. Chunks committed
    /// before the failure stay committed.
    pub async fn upsert_all(&self, records: &[AccountRecord]) -> Result<(), DbError> {
        self.ensure_schema().await?;
        if records.is_empty() {
            return Ok(());
        }

        let sql = format!(
            "INSERT INTO {} (id, balance) \
             SELECT * FROM UNNEST($1::BYTEA[], $2::NUMERIC[]) \
             ON CONFLICT (id) DO UPDATE SET balance = EXCLUDED.balance",
            self.table
        );

        for chunk in self.batches(records) {
            let mut tx = self.pool.pool().begin().await?;

            let ids: Vec<Vec<u8>> = chunk.iter().map(|r| r.id.to_bytes().to_vec()).collect();
            let balances: Vec<Decimal> = chunk.iter().map(|r| Decimal::from(r.balance_raw)).collect();

            sqlx::query(&sql)
                .bind(&ids)
                .bind(&balances)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
        }

        tracing::debug!(
            table = %self.table,
            count = records.len(),
            batches = self.batches(records).len(),
            "Upserted account rows (batch UNNEST)"
        );
        Ok(())
    }
}

impl AccountStore for PostgresAccountStore {
    type Error = DbError;

    async fn load(&self) -> Result<Vec<AccountRecord>, DbError> {
        self.load_all().await
    }

    async fn save(&self, records: &[AccountRecord]) -> Result<(), DbError> {
        self.upsert_all(records).await
    }
}
