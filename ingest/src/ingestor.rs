//! Drives one import attempt from raw rows to an audited outcome.
//!
//! `Received → Validating → Rejected` when normalization fails: nothing is
//! opened or logged. Otherwise `Upserting → Committed | RolledBack → Logged`.
//! The deduplicated push path enters at [`Ingestor::persist`] from its worker.

use crate::audit::{AuditLogger, ImportOutcome};
use crate::config::{ImportConfig, StoreConfig};
use crate::metrics_defs::{IMPORT_FAILURES, IMPORT_ROWS};
use crate::normalizer::{RawInput, ValidationError, normalize};
use crate::record::CanonicalRecord;
use crate::store::Store;
use crate::upsert::{UpsertEngine, UpsertError};
use shared::counter;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Import failed: {0}")]
    Upsert(#[from] UpsertError),

    #[error("Import task did not finish: {0}")]
    Interrupted(String),
}

#[derive(Clone)]
pub struct Ingestor {
    engine: UpsertEngine,
    audit: AuditLogger,
    chunk_size: usize,
}

impl Ingestor {
    pub fn new(store: Arc<dyn Store>, import: &ImportConfig, store_config: &StoreConfig) -> Self {
        let timeout = store_config.operation_timeout();
        Self {
            engine: UpsertEngine::new(store.clone(), import.table.clone(), timeout),
            audit: AuditLogger::new(store, import.audit_table.clone(), timeout),
            chunk_size: import.chunk_size,
        }
    }

    /// Normalizes and persists a batch, returning the number of rows imported.
    ///
    /// Persistence runs on its own task: if the caller goes away mid-import
    /// the transaction still commits or rolls back, and is still audited.
    pub async fn import(&self, input: RawInput) -> Result<usize, ImportError> {
        let records = normalize(input).inspect_err(|e| {
            tracing::warn!(error = %e, "Rejected import batch");
        })?;

        let ingestor = self.clone();
        let rows = tokio::spawn(async move { ingestor.persist(&records).await })
            .await
            .map_err(|e| ImportError::Interrupted(e.to_string()))??;

        Ok(rows)
    }

    /// Upserts already normalized records and audits the outcome.
    pub async fn persist(&self, records: &[CanonicalRecord]) -> Result<usize, UpsertError> {
        let table = self.engine.table();
        let result = self.engine.upsert(records, self.chunk_size).await;

        let outcome = match &result {
            Ok(rows) => {
                counter!(IMPORT_ROWS).increment(*rows as u64);
                tracing::info!(table, rows, "Import committed");
                ImportOutcome::success(table, *rows)
            }
            Err(e) => {
                counter!(IMPORT_FAILURES).increment(1);
                tracing::warn!(table, error = %e, "Import rolled back");
                ImportOutcome::failed(table, e)
            }
        };
        self.audit.record(&outcome).await;

        result
    }
}
