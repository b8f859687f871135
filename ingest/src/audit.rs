use crate::metrics_defs::AUDIT_WRITE_FAILURES;
use crate::store::{SqlValue, Statement, Store, StoreError};
use shared::counter;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImportStatus {
    Success,
    Failed,
}

impl ImportStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ImportStatus::Success => "success",
            ImportStatus::Failed => "failed",
        }
    }
}

/// The result of one import attempt, as written to the audit log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportOutcome {
    pub table_name: String,
    pub rows_imported: usize,
    pub status: ImportStatus,
    pub error_message: Option<String>,
}

impl ImportOutcome {
    pub fn success(table_name: &str, rows_imported: usize) -> Self {
        Self {
            table_name: table_name.to_string(),
            rows_imported,
            status: ImportStatus::Success,
            error_message: None,
        }
    }

    pub fn failed(table_name: &str, error: &impl Display) -> Self {
        Self {
            table_name: table_name.to_string(),
            rows_imported: 0,
            status: ImportStatus::Failed,
            error_message: Some(error.to_string()),
        }
    }
}

/// Appends import outcomes to the audit table.
///
/// Writing is best-effort: a failed write is logged and counted, never
/// returned, so it cannot change the response of the import it describes.
#[derive(Clone)]
pub struct AuditLogger {
    store: Arc<dyn Store>,
    audit_table: String,
    timeout: Duration,
}

impl AuditLogger {
    pub fn new(store: Arc<dyn Store>, audit_table: impl Into<String>, timeout: Duration) -> Self {
        Self {
            store,
            audit_table: audit_table.into(),
            timeout,
        }
    }

    pub async fn record(&self, outcome: &ImportOutcome) {
        let statement = self.insert_statement(outcome);

        let result = tokio::time::timeout(self.timeout, self.store.execute(&statement))
            .await
            .unwrap_or(Err(StoreError::Timeout(self.timeout)));

        if let Err(e) = result {
            counter!(AUDIT_WRITE_FAILURES).increment(1);
            tracing::error!(
                audit_table = %self.audit_table,
                table = %outcome.table_name,
                status = outcome.status.as_str(),
                rows = outcome.rows_imported,
                error = %e,
                "Failed to write import audit entry"
            );
        }
    }

    fn insert_statement(&self, outcome: &ImportOutcome) -> Statement {
        Statement {
            sql: format!(
                "INSERT INTO {} (table_name, rows_imported, status, error_message) VALUES (?, ?, ?, ?)",
                self.audit_table
            ),
            params: vec![
                SqlValue::Text(outcome.table_name.clone()),
                SqlValue::Int(i64::try_from(outcome.rows_imported).unwrap_or(i64::MAX)),
                SqlValue::Text(outcome.status.as_str().to_string()),
                outcome
                    .error_message
                    .clone()
                    .map_or(SqlValue::Null, SqlValue::Text),
            ],
        }
    }
}
