use crate::metrics_defs::{UPSERT_CHUNKS, UPSERT_DURATION};
use crate::record::{CanonicalRecord, Field};
use crate::store::{SqlValue, Statement, Store, StoreError, Transaction};
use shared::{counter, histogram};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// The import was rolled back; `cause` is the store failure that triggered it.
#[derive(Error, Debug)]
#[error("{cause}")]
pub struct UpsertError {
    #[from]
    pub cause: StoreError,
}

/// Writes record batches as chunked upserts inside a single transaction.
#[derive(Clone)]
pub struct UpsertEngine {
    store: Arc<dyn Store>,
    table: String,
    timeout: Duration,
}

impl UpsertEngine {
    pub fn new(store: Arc<dyn Store>, table: impl Into<String>, timeout: Duration) -> Self {
        Self {
            store,
            table: table.into(),
            timeout,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Upserts `records` in chunks of at most `chunk_size`, all or nothing.
    ///
    /// Chunks execute in input order. The first failing chunk aborts the rest
    /// and rolls back everything written so far. Returns the number of rows
    /// processed, which may include rows whose values did not change.
    pub async fn upsert(
        &self,
        records: &[CanonicalRecord],
        chunk_size: usize,
    ) -> Result<usize, UpsertError> {
        if records.is_empty() {
            return Ok(0);
        }

        let started = Instant::now();
        let result = self.upsert_in_transaction(records, chunk_size.max(1)).await;
        let status = if result.is_ok() { "committed" } else { "rolled_back" };
        histogram!(UPSERT_DURATION, "status" => status).record(started.elapsed().as_secs_f64());

        result
    }

    async fn upsert_in_transaction(
        &self,
        records: &[CanonicalRecord],
        chunk_size: usize,
    ) -> Result<usize, UpsertError> {
        let mut tx = self.bounded(self.store.begin()).await?;

        for (index, chunk) in records.chunks(chunk_size).enumerate() {
            let statement = upsert_statement(&self.table, chunk);
            counter!(UPSERT_CHUNKS).increment(1);

            if let Err(cause) = self.bounded(tx.execute(&statement)).await {
                tracing::warn!(
                    table = %self.table,
                    chunk = index,
                    rows = chunk.len(),
                    error = %cause,
                    "Chunk upsert failed, rolling back"
                );
                self.rollback(tx).await;
                return Err(cause.into());
            }
        }

        // A transaction whose commit fails or times out is dropped, which the
        // store treats as a rollback.
        self.bounded(tx.commit()).await?;

        Ok(records.len())
    }

    async fn rollback(&self, tx: Box<dyn Transaction>) {
        if let Err(e) = self.bounded(tx.rollback()).await {
            tracing::error!(table = %self.table, error = %e, "Rollback failed");
        }
    }

    async fn bounded<T>(
        &self,
        operation: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.timeout, operation)
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))?
    }
}

/// Builds one multi-row upsert keyed on `call_id` with every value bound.
pub fn upsert_statement(table: &str, chunk: &[CanonicalRecord]) -> Statement {
    let columns = Field::ALL.map(|f| f.as_str()).join(", ");
    let row_placeholders = format!("({})", ["?"; Field::ALL.len()].join(", "));
    let values = vec![row_placeholders.as_str(); chunk.len()].join(", ");
    let updates = Field::ALL
        .iter()
        .filter(|f| **f != Field::KEY)
        .map(|f| format!("{0} = VALUES({0})", f.as_str()))
        .collect::<Vec<_>>()
        .join(", ");

    let params = chunk
        .iter()
        .flat_map(|record| record.values().map(|v| SqlValue::Text(v.to_string())))
        .collect();

    Statement {
        sql: format!(
            "INSERT INTO {table} ({columns}) VALUES {values} ON DUPLICATE KEY UPDATE {updates}"
        ),
        params,
    }
}
