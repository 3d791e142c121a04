//! Connection-provider boundary.
//!
//! This core never opens sockets or files itself; it drives whatever
//! connection the caller binds to a transaction context through one of these
//! two traits. Adapters for rusqlite and tokio-postgres ship behind the
//! `sqlite`/`postgres` features; anything else can plug in from outside.

use async_trait::async_trait;

use crate::error::InsertError;
use crate::executor::ExecutionResult;
use crate::model::SqlValue;

/// A live connection driven by the blocking discipline: every call runs to
/// completion on the invoking worker, suspending only for I/O inside the
/// store driver.
pub trait StoreConnection {
    /// Registered dialect name, used to look up capabilities.
    fn dialect(&self) -> &'static str;

    /// Execute a parameterized statement and return rows affected.
    ///
    /// # Errors
    /// Constraint failures must map to `InsertError::ConstraintViolation`;
    /// transport failures to `Connectivity` or a backend passthrough.
    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64, InsertError>;

    /// Execute an insert carrying a `RETURNING` clause; the result's
    /// `generated_key` holds the first returned column of the first row.
    ///
    /// # Errors
    /// Same classification contract as [`StoreConnection::execute`].
    fn insert_returning(
        &mut self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<ExecutionResult, InsertError>;

    /// The store's most recent auto-assigned key on this connection, for
    /// dialects without `RETURNING`.
    ///
    /// # Errors
    /// Returns an error if the store cannot report the value.
    fn last_insert_id(&mut self) -> Result<Option<i64>, InsertError>;

    /// Open a store-level transaction.
    ///
    /// # Errors
    /// Returns an error if the store rejects the BEGIN.
    fn begin(&mut self) -> Result<(), InsertError>;

    /// Durably persist every statement executed since `begin`.
    ///
    /// # Errors
    /// Returns an error if the store rejects the COMMIT.
    fn commit(&mut self) -> Result<(), InsertError>;

    /// Discard every statement executed since `begin`.
    ///
    /// # Errors
    /// Returns an error if the store rejects the ROLLBACK.
    fn rollback(&mut self) -> Result<(), InsertError>;
}

/// A live connection driven by the suspendable discipline: calls may yield
/// between statements and resume on a different worker, but the connection
/// stays exclusively owned by one logical transaction for its lifetime.
#[async_trait]
pub trait AsyncStoreConnection: Send {
    /// Registered dialect name, used to look up capabilities.
    fn dialect(&self) -> &'static str;

    /// Execute a parameterized statement and return rows affected.
    ///
    /// # Errors
    /// Same classification contract as [`StoreConnection::execute`].
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64, InsertError>;

    /// Execute an insert carrying a `RETURNING` clause.
    ///
    /// # Errors
    /// Same classification contract as [`StoreConnection::execute`].
    async fn insert_returning(
        &mut self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<ExecutionResult, InsertError>;

    /// The store's most recent auto-assigned key on this connection.
    ///
    /// # Errors
    /// Returns an error if the store cannot report the value.
    async fn last_insert_id(&mut self) -> Result<Option<i64>, InsertError>;

    /// Open a store-level transaction.
    ///
    /// # Errors
    /// Returns an error if the store rejects the BEGIN.
    async fn begin(&mut self) -> Result<(), InsertError>;

    /// Durably persist every statement executed since `begin`.
    ///
    /// # Errors
    /// Returns an error if the store rejects the COMMIT.
    async fn commit(&mut self) -> Result<(), InsertError>;

    /// Discard every statement executed since `begin`.
    ///
    /// # Errors
    /// Returns an error if the store rejects the ROLLBACK.
    async fn rollback(&mut self) -> Result<(), InsertError>;

    /// Best-effort synchronous rollback, used when a suspended transaction is
    /// cancelled (its future dropped while open). Must not panic; failures
    /// are swallowed because drop has nowhere to report them.
    fn abort(&mut self);
}
