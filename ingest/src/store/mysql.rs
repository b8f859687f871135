use super::{SqlValue, Statement, Store, StoreError, Transaction};
use crate::config::StoreConfig;
use async_trait::async_trait;
use sqlx::mysql::{MySqlArguments, MySqlPool, MySqlPoolOptions};
use sqlx::query::Query;
use sqlx::MySql;
use std::time::Duration;

/// MySQL-backed store using a lazily connecting pool.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    /// Builds the pool without opening a connection; the first query connects.
    pub fn connect_lazy(config: &StoreConfig) -> Result<Self, StoreError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_lazy(&config.url)
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Self { pool })
    }
}

fn bind_all(statement: &Statement) -> Query<'_, MySql, MySqlArguments> {
    statement
        .params
        .iter()
        .fold(sqlx::query(&statement.sql), |query, param| match param {
            SqlValue::Text(value) => query.bind(value.as_str()),
            SqlValue::Int(value) => query.bind(*value),
            SqlValue::Null => query.bind(None::<&str>),
        })
}

fn query_error(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Connection(e.to_string())
        }
        other => StoreError::Query(other.to_string()),
    }
}

#[async_trait]
impl Store for MySqlStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Box::new(MySqlTransaction { tx }))
    }

    async fn execute(&self, statement: &Statement) -> Result<u64, StoreError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let result = bind_all(statement)
            .execute(&mut *conn)
            .await
            .map_err(query_error)?;

        Ok(result.rows_affected())
    }
}

struct MySqlTransaction {
    tx: sqlx::Transaction<'static, MySql>,
}

#[async_trait]
impl Transaction for MySqlTransaction {
    async fn execute(&mut self, statement: &Statement) -> Result<u64, StoreError> {
        let result = bind_all(statement)
            .execute(&mut *self.tx)
            .await
            .map_err(query_error)?;

        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(query_error)
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await.map_err(query_error)
    }
}
