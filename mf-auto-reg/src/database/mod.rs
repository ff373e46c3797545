pub mod migrations;
pub mod sqlite;
pub mod transactions;

use crate::config::DatabaseConfig;
use crate::error::StatementError;
use async_trait::async_trait;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub use sqlite::SqliteExecutor;
pub use transactions::TransactionStore;

/// Parameter or column value exchanged with the statement collaborator
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<Uuid> for SqlValue {
    fn from(value: Uuid) -> Self {
        SqlValue::Text(value.to_string())
    }
}

/// One result row, columns in SELECT order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, SqlValue)>,
}

impl Row {
    pub fn new(columns: Vec<(String, SqlValue)>) -> Self {
        Self { columns }
    }

    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    pub fn text(&self, name: &str) -> Result<&str, StatementError> {
        self.get(name)
            .and_then(SqlValue::as_text)
            .ok_or_else(|| StatementError::Decode(format!("column '{name}' is missing or not text")))
    }
}

/// Prepared-statement interface to the backing store.
///
/// Every call is a single round trip: a parameterized SELECT returning at
/// most one row (or all rows), or a write returning the affected-row count.
#[async_trait]
pub trait StatementExecutor: Send + Sync {
    async fn query_first(&self, sql: &str, params: &[SqlValue]) -> Result<Option<Row>, StatementError>;

    async fn query_all(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, StatementError>;

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64, StatementError>;
}

#[derive(Clone)]
pub struct AsyncDbConnection {
    pool: Arc<Pool<SqliteConnectionManager>>,
}

impl AsyncDbConnection {
    pub fn new(pool: Pool<SqliteConnectionManager>) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn get(&self) -> Result<PooledConnection<SqliteConnectionManager>, StatementError> {
        self.pool
            .get()
            .map_err(|e| StatementError::Connection(e.to_string()))
    }
}

pub struct Database {
    pub async_connection: AsyncDbConnection,
}

impl Database {
    /// Open (or create) the database file and run migrations
    pub fn new(db_path: &Path, config: &DatabaseConfig) -> anyhow::Result<Self> {
        // Ensure directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Migrate on a plain connection before the pool opens
        {
            let conn = Connection::open(db_path)?;
            migrations::run_migrations(&conn)?;
        }

        let busy_timeout = Duration::from_secs(config.busy_timeout_secs);
        let manager = SqliteConnectionManager::file(db_path).with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            Ok(())
        });

        let pool = Pool::builder().max_size(config.pool_size).build(manager)?;

        Ok(Database {
            async_connection: AsyncDbConnection::new(pool),
        })
    }

    /// Statement executor backed by this database's pool
    pub fn executor(&self) -> SqliteExecutor {
        SqliteExecutor::new(self.async_connection.clone())
    }

    pub fn transaction_store(&self) -> TransactionStore {
        TransactionStore::new(Arc::new(self.executor()))
    }
}
