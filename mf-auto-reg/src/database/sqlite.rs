use super::{AsyncDbConnection, Row, SqlValue, StatementExecutor};
use crate::error::StatementError;
use async_trait::async_trait;
use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use rusqlite::{ffi, params_from_iter, Connection, ToSql};

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Integer(i) => ToSqlOutput::from(*i),
            SqlValue::Real(f) => ToSqlOutput::from(*f),
            SqlValue::Text(s) => ToSqlOutput::from(s.as_str()),
        })
    }
}

/// [`StatementExecutor`] running statements on the SQLite pool.
///
/// rusqlite is blocking, so each call borrows a pooled connection on the
/// blocking thread pool.
#[derive(Clone)]
pub struct SqliteExecutor {
    conn: AsyncDbConnection,
}

impl SqliteExecutor {
    pub fn new(conn: AsyncDbConnection) -> Self {
        Self { conn }
    }

    async fn run<T, F>(&self, f: F) -> Result<T, StatementError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StatementError> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let pooled = conn.get()?;
            f(&pooled)
        })
        .await
        .map_err(|e| StatementError::Connection(e.to_string()))?
    }
}

#[async_trait]
impl StatementExecutor for SqliteExecutor {
    async fn query_first(&self, sql: &str, params: &[SqlValue]) -> Result<Option<Row>, StatementError> {
        let sql = sql.to_string();
        let params = params.to_vec();
        self.run(move |conn| {
            let rows = collect_rows(conn, &sql, &params, Some(1))?;
            Ok(rows.into_iter().next())
        })
        .await
    }

    async fn query_all(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, StatementError> {
        let sql = sql.to_string();
        let params = params.to_vec();
        self.run(move |conn| collect_rows(conn, &sql, &params, None))
            .await
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64, StatementError> {
        let sql = sql.to_string();
        let params = params.to_vec();
        self.run(move |conn| {
            conn.execute(&sql, params_from_iter(params.iter()))
                .map(|changes| changes as u64)
                .map_err(translate)
        })
        .await
    }
}

fn collect_rows(
    conn: &Connection,
    sql: &str,
    params: &[SqlValue],
    limit: Option<usize>,
) -> Result<Vec<Row>, StatementError> {
    let mut stmt = conn.prepare(sql).map_err(translate)?;
    let names: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();

    let mut rows = stmt.query(params_from_iter(params.iter())).map_err(translate)?;
    let mut result = Vec::new();

    while let Some(row) = rows.next().map_err(translate)? {
        let mut columns = Vec::with_capacity(names.len());
        for (idx, name) in names.iter().enumerate() {
            let value = match row.get_ref(idx).map_err(translate)? {
                ValueRef::Null => SqlValue::Null,
                ValueRef::Integer(i) => SqlValue::Integer(i),
                ValueRef::Real(f) => SqlValue::Real(f),
                ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
                    SqlValue::Text(String::from_utf8_lossy(bytes).into_owned())
                }
            };
            columns.push((name.clone(), value));
        }
        result.push(Row::new(columns));

        if limit.is_some_and(|max| result.len() >= max) {
            break;
        }
    }

    Ok(result)
}

/// Map a driver error onto the collaborator's error vocabulary.
///
/// Only `SQLITE_CONSTRAINT_UNIQUE` counts as a unique violation. Primary-key
/// collisions carry `SQLITE_CONSTRAINT_PRIMARYKEY` and stay generic.
fn translate(err: rusqlite::Error) -> StatementError {
    match err {
        rusqlite::Error::SqliteFailure(code, message)
            if code.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            let message = message.unwrap_or_else(|| code.to_string());
            let target = message
                .strip_prefix("UNIQUE constraint failed: ")
                .unwrap_or(&message)
                .to_string();
            StatementError::UniqueViolation(target)
        }
        other => StatementError::Query(other.to_string()),
    }
}
