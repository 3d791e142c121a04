//! `SQLite` adapters for the connection-provider boundary: a blocking
//! adapter over rusqlite, and a suspendable adapter that hops statements to
//! the blocking pool through a shared connection handle.

use std::path::Path;

use crate::dialect::SQLITE;
use crate::error::InsertError;
use crate::executor::ExecutionResult;
use crate::model::SqlValue;

mod params;
mod worker;

pub use params::{Params, sql_value_to_sqlite};
pub use worker::{SharedSqliteConnection, SqliteAsyncConnection};

/// Map a rusqlite error into the insert taxonomy: constraint failures become
/// `ConstraintViolation`, everything else passes through transparently.
pub(crate) fn classify(err: rusqlite::Error) -> InsertError {
    match &err {
        rusqlite::Error::SqliteFailure(e, msg)
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            InsertError::ConstraintViolation(
                msg.clone().unwrap_or_else(|| e.to_string()),
            )
        }
        _ => InsertError::SqliteError(err),
    }
}

pub(crate) fn exec_on(
    conn: &rusqlite::Connection,
    sql: &str,
    params: &[SqlValue],
) -> Result<u64, InsertError> {
    let converted = Params::convert(params)?;
    let mut stmt = conn.prepare(sql).map_err(classify)?;
    let refs = converted.as_refs();
    let rows = stmt.execute(&refs[..]).map_err(classify)?;
    Ok(rows as u64)
}

pub(crate) fn insert_returning_on(
    conn: &rusqlite::Connection,
    sql: &str,
    params: &[SqlValue],
) -> Result<ExecutionResult, InsertError> {
    let converted = Params::convert(params)?;
    let mut stmt = conn.prepare(sql).map_err(classify)?;
    let refs = converted.as_refs();
    let mut rows = stmt.query(&refs[..]).map_err(classify)?;
    let mut rows_affected = 0u64;
    let mut generated_key = None;
    while let Some(row) = rows.next().map_err(classify)? {
        if rows_affected == 0 {
            generated_key = Some(value_ref_to_sql(row.get_ref(0).map_err(classify)?)?);
        }
        rows_affected += 1;
    }
    Ok(ExecutionResult {
        rows_affected,
        generated_key,
    })
}

fn value_ref_to_sql(value: rusqlite::types::ValueRef<'_>) -> Result<SqlValue, InsertError> {
    Ok(match value {
        rusqlite::types::ValueRef::Integer(i) => SqlValue::Int(i),
        rusqlite::types::ValueRef::Real(f) => SqlValue::Float(f),
        // Non-UTF-8 text is an error, not a lossy round-trip; a mangled key
        // would silently misidentify the row.
        rusqlite::types::ValueRef::Text(t) => SqlValue::Text(
            std::str::from_utf8(t)
                .map_err(|e| classify(rusqlite::Error::Utf8Error(e)))?
                .to_owned(),
        ),
        rusqlite::types::ValueRef::Blob(b) => SqlValue::Blob(b.to_vec()),
        rusqlite::types::ValueRef::Null => SqlValue::Null,
    })
}

/// Blocking rusqlite connection.
#[derive(Debug)]
pub struct SqliteConnection {
    conn: rusqlite::Connection,
}

impl SqliteConnection {
    /// Open (or create) a database file.
    ///
    /// # Errors
    /// Returns the driver's error if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, InsertError> {
        let conn = rusqlite::Connection::open(path).map_err(classify)?;
        Ok(Self { conn })
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    /// Returns the driver's error if the database cannot be created.
    pub fn open_in_memory() -> Result<Self, InsertError> {
        let conn = rusqlite::Connection::open_in_memory().map_err(classify)?;
        Ok(Self { conn })
    }

    /// Run a raw batch of statements, for DDL setup outside this core's
    /// scope (schema definition is an external concern).
    ///
    /// # Errors
    /// Returns the driver's error if any statement fails.
    pub fn execute_batch(&self, sql: &str) -> Result<(), InsertError> {
        self.conn.execute_batch(sql).map_err(classify)
    }

    /// Borrow the underlying rusqlite connection.
    #[must_use]
    pub fn raw(&self) -> &rusqlite::Connection {
        &self.conn
    }
}

impl crate::connection::StoreConnection for SqliteConnection {
    fn dialect(&self) -> &'static str {
        SQLITE
    }

    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64, InsertError> {
        exec_on(&self.conn, sql, params)
    }

    fn insert_returning(
        &mut self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<ExecutionResult, InsertError> {
        insert_returning_on(&self.conn, sql, params)
    }

    fn last_insert_id(&mut self) -> Result<Option<i64>, InsertError> {
        Ok(Some(self.conn.last_insert_rowid()))
    }

    fn begin(&mut self) -> Result<(), InsertError> {
        self.conn.execute_batch("BEGIN").map_err(classify)
    }

    fn commit(&mut self) -> Result<(), InsertError> {
        self.conn.execute_batch("COMMIT").map_err(classify)
    }

    fn rollback(&mut self) -> Result<(), InsertError> {
        self.conn.execute_batch("ROLLBACK").map_err(classify)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_utf8_generated_key_is_an_error() -> Result<(), Box<dyn std::error::Error>> {
        let conn = rusqlite::Connection::open_in_memory()?;
        conn.execute_batch("CREATE TABLE t (x TEXT);")?;
        // 0xC3 alone is an invalid UTF-8 sequence; sqlite stores it anyway.
        let err = insert_returning_on(
            &conn,
            "INSERT INTO t (x) VALUES (CAST(x'C3' AS TEXT)) RETURNING x",
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, InsertError::SqliteError(_)), "got {err:?}");
        Ok(())
    }

    #[test]
    fn returning_key_round_trips_text_and_int() -> Result<(), Box<dyn std::error::Error>> {
        let conn = rusqlite::Connection::open_in_memory()?;
        conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT, x TEXT);")?;
        let result = insert_returning_on(
            &conn,
            "INSERT INTO t (x) VALUES (?) RETURNING id",
            &[SqlValue::Text("a".into())],
        )?;
        assert_eq!(result.rows_affected, 1);
        assert_eq!(result.generated_key, Some(SqlValue::Int(1)));
        Ok(())
    }
}
