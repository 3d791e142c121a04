//! Suspendable `SQLite` adapter.
//!
//! rusqlite is a blocking driver, so the async adapter keeps the connection
//! behind a shared handle and hops each statement to the blocking pool,
//! returning the result over a oneshot channel. The handle is cloned per
//! statement but the enclosing transaction context still owns the connection
//! exclusively; nothing else holds a clone.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::connection::AsyncStoreConnection;
use crate::dialect::SQLITE;
use crate::error::InsertError;
use crate::executor::ExecutionResult;
use crate::model::SqlValue;

use super::{classify, exec_on, insert_returning_on};

/// Shared handle to one rusqlite connection.
pub type SharedSqliteConnection = Arc<Mutex<rusqlite::Connection>>;

fn lock(handle: &SharedSqliteConnection) -> MutexGuard<'_, rusqlite::Connection> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn run_blocking<F, R>(handle: SharedSqliteConnection, func: F) -> Result<R, InsertError>
where
    F: FnOnce(&rusqlite::Connection) -> Result<R, InsertError> + Send + 'static,
    R: Send + 'static,
{
    let (tx, rx) = tokio::sync::oneshot::channel();
    tokio::task::spawn_blocking(move || {
        let guard = lock(&handle);
        let _ = tx.send(func(&guard));
    });
    rx.await.map_err(|e| {
        InsertError::Connectivity(format!("sqlite worker receive error: {e}"))
    })?
}

/// `SQLite` connection driven through the suspendable discipline.
#[derive(Debug)]
pub struct SqliteAsyncConnection {
    handle: SharedSqliteConnection,
}

impl SqliteAsyncConnection {
    /// Open (or create) a database file.
    ///
    /// # Errors
    /// Returns the driver's error if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, InsertError> {
        let conn = rusqlite::Connection::open(path).map_err(classify)?;
        Ok(Self {
            handle: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    /// Returns the driver's error if the database cannot be created.
    pub fn open_in_memory() -> Result<Self, InsertError> {
        let conn = rusqlite::Connection::open_in_memory().map_err(classify)?;
        Ok(Self {
            handle: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a raw batch of statements, for DDL setup outside this core's
    /// scope.
    ///
    /// # Errors
    /// Returns the driver's error if any statement fails.
    pub async fn execute_batch(&self, sql: &str) -> Result<(), InsertError> {
        let sql = sql.to_owned();
        run_blocking(Arc::clone(&self.handle), move |conn| {
            conn.execute_batch(&sql).map_err(classify)
        })
        .await
    }

    /// Clone the shared handle, e.g. for out-of-band verification in tests.
    #[must_use]
    pub fn handle(&self) -> SharedSqliteConnection {
        Arc::clone(&self.handle)
    }
}

#[async_trait]
impl AsyncStoreConnection for SqliteAsyncConnection {
    fn dialect(&self) -> &'static str {
        SQLITE
    }

    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64, InsertError> {
        let sql = sql.to_owned();
        let params = params.to_vec();
        run_blocking(Arc::clone(&self.handle), move |conn| {
            exec_on(conn, &sql, &params)
        })
        .await
    }

    async fn insert_returning(
        &mut self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<ExecutionResult, InsertError> {
        let sql = sql.to_owned();
        let params = params.to_vec();
        run_blocking(Arc::clone(&self.handle), move |conn| {
            insert_returning_on(conn, &sql, &params)
        })
        .await
    }

    async fn last_insert_id(&mut self) -> Result<Option<i64>, InsertError> {
        run_blocking(Arc::clone(&self.handle), |conn| {
            Ok(Some(conn.last_insert_rowid()))
        })
        .await
    }

    async fn begin(&mut self) -> Result<(), InsertError> {
        run_blocking(Arc::clone(&self.handle), |conn| {
            conn.execute_batch("BEGIN").map_err(classify)
        })
        .await
    }

    async fn commit(&mut self) -> Result<(), InsertError> {
        run_blocking(Arc::clone(&self.handle), |conn| {
            conn.execute_batch("COMMIT").map_err(classify)
        })
        .await
    }

    async fn rollback(&mut self) -> Result<(), InsertError> {
        run_blocking(Arc::clone(&self.handle), |conn| {
            conn.execute_batch("ROLLBACK").map_err(classify)
        })
        .await
    }

    fn abort(&mut self) {
        // Runs on the drop path of a cancelled transaction; must stay
        // synchronous and swallow failures.
        let guard = lock(&self.handle);
        let _ = guard.execute_batch("ROLLBACK");
    }
}
