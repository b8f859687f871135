//! The relational store as seen by the ingestion pipeline: parameterized
//! statements executed either inside an explicit transaction or on their own.

pub mod mysql;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("could not acquire a store connection: {0}")]
    Connection(String),

    #[error("store query failed: {0}")]
    Query(String),

    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),
}

/// A value bound to a statement placeholder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SqlValue {
    Text(String),
    Int(i64),
    Null,
}

/// SQL text with `?` placeholders and the values bound to them, in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

#[async_trait]
pub trait Transaction: Send {
    /// Returns the number of affected rows.
    async fn execute(&mut self, statement: &Statement) -> Result<u64, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Acquires a connection and opens a transaction on it.
    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError>;

    /// Executes a single statement outside of any explicit transaction.
    async fn execute(&self, statement: &Statement) -> Result<u64, StoreError>;
}
