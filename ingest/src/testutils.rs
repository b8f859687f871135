use crate::config::{ImportConfig, StoreConfig};
use crate::ingestor::Ingestor;
use crate::normalizer::{HEADER_MAPPING, JsonRow};
use crate::record::{CanonicalRecord, Field};
use crate::store::{SqlValue, Statement, Store, StoreError, Transaction};
use crate::tabular::{TabularError, TabularReader, TabularSheet};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One row written to the audit table, decoded from the bound parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditEntry {
    pub table_name: String,
    pub rows_imported: i64,
    pub status: String,
    pub error_message: Option<String>,
}

#[derive(Default)]
struct State {
    rows: BTreeMap<String, CanonicalRecord>,
    audit: Vec<AuditEntry>,
    begins: usize,
    commits: usize,
    rollbacks: usize,
    chunk_statements: usize,
    fail_begin: bool,
    fail_chunk: Option<usize>,
    fail_audit: bool,
    fail_commit: bool,
    delay: Option<Duration>,
    commit_delay: Option<Duration>,
}

/// Store double that keeps call records keyed by `call_id`.
///
/// Upserts are staged per transaction and only become visible on commit.
/// Any statement executed outside a transaction is treated as an audit insert.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_begin(&self) {
        self.state.lock().fail_begin = true;
    }

    /// Fails the n-th statement (1-based) of every transaction.
    pub fn fail_chunk(&self, n: usize) {
        self.state.lock().fail_chunk = Some(n);
    }

    pub fn fail_audit(&self) {
        self.state.lock().fail_audit = true;
    }

    pub fn fail_commit(&self) {
        self.state.lock().fail_commit = true;
    }

    pub fn delay_statements(&self, delay: Duration) {
        self.state.lock().delay = Some(delay);
    }

    pub fn delay_commit(&self, delay: Duration) {
        self.state.lock().commit_delay = Some(delay);
    }

    pub fn rows(&self) -> BTreeMap<String, CanonicalRecord> {
        self.state.lock().rows.clone()
    }

    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.state.lock().audit.clone()
    }

    pub fn chunk_statements(&self) -> usize {
        self.state.lock().chunk_statements
    }

    pub fn begins(&self) -> usize {
        self.state.lock().begins
    }

    pub fn commits(&self) -> usize {
        self.state.lock().commits
    }

    pub fn rollbacks(&self) -> usize {
        self.state.lock().rollbacks
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError> {
        let mut state = self.state.lock();
        if state.fail_begin {
            return Err(StoreError::Connection("connection refused".into()));
        }
        state.begins += 1;
        Ok(Box::new(InMemoryTransaction {
            state: self.state.clone(),
            staged: Vec::new(),
            executed: 0,
        }))
    }

    async fn execute(&self, statement: &Statement) -> Result<u64, StoreError> {
        let mut state = self.state.lock();
        if state.fail_audit {
            return Err(StoreError::Query("audit table is read-only".into()));
        }
        state.audit.push(audit_entry(&statement.params));
        Ok(1)
    }
}

struct InMemoryTransaction {
    state: Arc<Mutex<State>>,
    staged: Vec<CanonicalRecord>,
    executed: usize,
}

#[async_trait]
impl Transaction for InMemoryTransaction {
    async fn execute(&mut self, statement: &Statement) -> Result<u64, StoreError> {
        let (delay, fail_chunk) = {
            let mut state = self.state.lock();
            state.chunk_statements += 1;
            (state.delay, state.fail_chunk)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.executed += 1;
        if fail_chunk == Some(self.executed) {
            return Err(StoreError::Query("injected failure".into()));
        }

        assert!(statement.sql.contains("ON DUPLICATE KEY UPDATE"));
        let before = self.staged.len();
        self.staged.extend(statement.params.chunks(Field::ALL.len()).map(decode_record));
        Ok((self.staged.len() - before) as u64)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let delay = self.state.lock().commit_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        if state.fail_commit {
            return Err(StoreError::Query("injected commit failure".into()));
        }
        for record in self.staged {
            state.rows.insert(record.call_id.clone(), record);
        }
        state.commits += 1;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.state.lock().rollbacks += 1;
        Ok(())
    }
}

fn text(value: &SqlValue) -> String {
    match value {
        SqlValue::Text(s) => s.clone(),
        SqlValue::Int(i) => i.to_string(),
        SqlValue::Null => String::new(),
    }
}

fn decode_record(params: &[SqlValue]) -> CanonicalRecord {
    let mut record = CanonicalRecord::default();
    for (field, value) in Field::ALL.into_iter().zip(params) {
        record.set(field, text(value));
    }
    record
}

fn audit_entry(params: &[SqlValue]) -> AuditEntry {
    AuditEntry {
        table_name: text(&params[0]),
        rows_imported: match params[1] {
            SqlValue::Int(i) => i,
            _ => panic!("rows_imported must be bound as an integer"),
        },
        status: text(&params[2]),
        error_message: match &params[3] {
            SqlValue::Null => None,
            other => Some(text(other)),
        },
    }
}

/// A record whose `call_id` is `id` and whose other fields are `<field>-<id>`.
pub fn record(id: &str) -> CanonicalRecord {
    let mut record = CanonicalRecord::default();
    for field in Field::ALL {
        record.set(field, format!("{}-{id}", field.as_str()));
    }
    record.set(Field::KEY, id.to_string());
    record
}

pub fn records(n: usize) -> Vec<CanonicalRecord> {
    (1..=n).map(|i| record(&i.to_string())).collect()
}

/// The JSON counterpart of [`record`].
pub fn full_json_row(id: &str) -> JsonRow {
    let record = record(id);
    Field::ALL
        .into_iter()
        .map(|f| (f.as_str().to_string(), Value::String(record.get(f).to_string())))
        .collect()
}

pub fn sheet_headers() -> Vec<String> {
    HEADER_MAPPING.iter().map(|m| m.header.to_string()).collect()
}

pub fn test_ingestor(store: &InMemoryStore, chunk_size: usize) -> Ingestor {
    let import = ImportConfig {
        chunk_size,
        ..ImportConfig::default()
    };
    let store_config = StoreConfig {
        url: "mysql://localhost/test".into(),
        max_connections: 1,
        acquire_timeout_secs: 1,
        operation_timeout_secs: 5,
    };
    Ingestor::new(Arc::new(store.clone()), &import, &store_config)
}

/// Polls `condition` until it holds, failing the test after five seconds.
pub async fn wait_for(condition: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not met in time");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Reads comma separated text instead of a real workbook.
pub struct CsvReader;

impl TabularReader for CsvReader {
    fn read_first_sheet(&self, bytes: &[u8]) -> Result<TabularSheet, TabularError> {
        let text = std::str::from_utf8(bytes).map_err(|e| TabularError::Workbook(e.to_string()))?;
        Ok(TabularSheet::from_rows(text.lines().map(|line| {
            line.split(',').map(str::to_string).collect()
        })))
    }
}

pub fn multipart_body(boundary: &str, name: &str, filename: Option<&str>, content: &str) -> String {
    let disposition = match filename {
        Some(filename) => format!("form-data; name=\"{name}\"; filename=\"{filename}\""),
        None => format!("form-data; name=\"{name}\""),
    };
    format!(
        "--{boundary}\r\n\
         Content-Disposition: {disposition}\r\n\
         Content-Type: application/octet-stream\r\n\
         \r\n\
         {content}\r\n\
         --{boundary}--\r\n"
    )
}
