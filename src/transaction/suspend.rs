use std::future::Future;
use std::pin::Pin;

use crate::connection::AsyncStoreConnection;
use crate::dialect::{DialectCapabilities, capabilities_for};
use crate::error::InsertError;
use crate::executor::{ExecutionResult, dispatch_async, execute_batch_async, prepare_single};
use crate::keys::resolve_key;
use crate::model::{Condition, RowId, Table};
use crate::statement::{AssignmentSetBuilder, ConflictPolicy, render_delete};

use super::{StatementLog, TxGuard, TxState};

/// Boxed future returned by a suspendable transaction body.
pub type TxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, InsertError>> + Send + 'a>>;

/// A transaction context under the suspendable discipline: the body may
/// yield between statements and resume on a different worker, but the
/// connection stays exclusively bound to this one logical transaction.
///
/// Cancellation is a failure: dropping the context while still open runs the
/// connection's best-effort synchronous `abort()` before release, so a
/// half-finished transaction never commits.
pub struct AsyncTransaction<C: AsyncStoreConnection> {
    conn: Option<C>,
    caps: &'static DialectCapabilities,
    guard: TxGuard,
    log: StatementLog,
}

impl<C: AsyncStoreConnection> AsyncTransaction<C> {
    /// Acquire the connection and open a store-level transaction.
    ///
    /// # Errors
    /// Returns `UnknownDialect` for an unregistered dialect, or the store's
    /// error if the BEGIN fails.
    pub async fn begin(mut conn: C) -> Result<Self, InsertError> {
        let caps = capabilities_for(conn.dialect())?;
        conn.begin().await?;
        Ok(Self {
            conn: Some(conn),
            caps,
            guard: TxGuard::new(),
            log: StatementLog::default(),
        })
    }

    #[must_use]
    pub fn state(&self) -> TxState {
        self.guard.state()
    }

    #[must_use]
    pub fn log(&self) -> &StatementLog {
        &self.log
    }

    #[must_use]
    pub fn capabilities(&self) -> &'static DialectCapabilities {
        self.caps
    }

    fn conn_mut(&mut self) -> &mut C {
        self.conn.as_mut().expect("connection already released")
    }

    /// Insert one row under the fail policy.
    ///
    /// # Errors
    /// `Validation` before dispatch, `ConstraintViolation`/`Connectivity`
    /// from the store, `ContextClosed` after a terminal state.
    pub async fn insert(
        &mut self,
        table: &Table,
        build_row: impl FnOnce(&mut AssignmentSetBuilder),
    ) -> Result<ExecutionResult, InsertError> {
        self.guard.ensure_open()?;
        let (_, plan) = prepare_single(table, build_row, ConflictPolicy::Fail, self.caps, false)?;
        let conn = self.conn.as_mut().expect("connection already released");
        dispatch_async(conn, &plan, &mut self.log).await
    }

    /// Insert one row and resolve its identifier.
    ///
    /// # Errors
    /// `NotFound` when neither the store nor the caller produced a key, plus
    /// everything [`AsyncTransaction::insert`] can raise.
    pub async fn insert_and_get_id(
        &mut self,
        table: &Table,
        build_row: impl FnOnce(&mut AssignmentSetBuilder),
    ) -> Result<RowId, InsertError> {
        self.guard.ensure_open()?;
        let id_column = table.id_column().ok_or_else(|| {
            InsertError::NotFound(format!("table {} has no identity column", table.name()))
        })?;
        let (set, plan) = prepare_single(table, build_row, ConflictPolicy::Fail, self.caps, true)?;
        let conn = self.conn.as_mut().expect("connection already released");
        let result = dispatch_async(conn, &plan, &mut self.log).await?;
        resolve_key(table, id_column, &set, &result).ok_or_else(|| {
            InsertError::NotFound(format!(
                "insert into {} produced no generated key",
                table.name()
            ))
        })
    }

    /// Insert one row, absorbing a per-row conflict into a zero-effect
    /// result. Fails fast when the dialect has no ignore form.
    ///
    /// # Errors
    /// Same contract as [`Transaction::insert_ignore`](super::Transaction::insert_ignore).
    pub async fn insert_ignore(
        &mut self,
        table: &Table,
        build_row: impl FnOnce(&mut AssignmentSetBuilder),
    ) -> Result<ExecutionResult, InsertError> {
        self.guard.ensure_open()?;
        let (_, plan) =
            prepare_single(table, build_row, ConflictPolicy::Ignore, self.caps, false)?;
        let conn = self.conn.as_mut().expect("connection already released");
        dispatch_async(conn, &plan, &mut self.log).await
    }

    /// Insert one row under the ignore policy and resolve its identifier;
    /// a conflict-skipped row resolves to `None`.
    ///
    /// # Errors
    /// Same as [`AsyncTransaction::insert_ignore`].
    pub async fn insert_ignore_and_get_id(
        &mut self,
        table: &Table,
        build_row: impl FnOnce(&mut AssignmentSetBuilder),
    ) -> Result<Option<RowId>, InsertError> {
        self.guard.ensure_open()?;
        let Some(id_column) = table.id_column() else {
            return Ok(None);
        };
        let (set, plan) =
            prepare_single(table, build_row, ConflictPolicy::Ignore, self.caps, true)?;
        let conn = self.conn.as_mut().expect("connection already released");
        let result = dispatch_async(conn, &plan, &mut self.log).await?;
        Ok(resolve_key(table, id_column, &set, &result))
    }

    /// Insert many rows pulled lazily from `source`, sub-batched per the
    /// dialect's `max_batch_size`. One result per item, in input order.
    ///
    /// # Errors
    /// `Validation` for any item before its sub-batch is dispatched, store
    /// errors, `ContextClosed`.
    pub async fn batch_insert<I, F>(
        &mut self,
        table: &Table,
        source: I,
        build_item: F,
    ) -> Result<Vec<ExecutionResult>, InsertError>
    where
        I: IntoIterator,
        F: FnMut(&mut AssignmentSetBuilder, I::Item),
    {
        self.guard.ensure_open()?;
        let caps = self.caps;
        let conn = self.conn.as_mut().expect("connection already released");
        execute_batch_async(conn, table, caps, source, build_item, &mut self.log).await
    }

    /// Delete rows matching an opaque condition produced by an external
    /// expression DSL.
    ///
    /// # Errors
    /// Store errors, `ContextClosed`.
    pub async fn delete_where(
        &mut self,
        table: &Table,
        condition: &Condition,
    ) -> Result<u64, InsertError> {
        self.guard.ensure_open()?;
        let rendered = render_delete(table.name(), condition);
        let conn = self.conn.as_mut().expect("connection already released");
        let rows_affected = conn.execute(&rendered.sql, &rendered.params).await?;
        self.log.record(&rendered.sql, rows_affected);
        Ok(rows_affected)
    }

    /// Durably persist every statement executed in this context.
    ///
    /// # Errors
    /// `ContextClosed` after a terminal state, or the store's commit error.
    pub async fn commit(&mut self) -> Result<(), InsertError> {
        self.guard.ensure_open()?;
        self.conn_mut().commit().await?;
        self.guard.transition_committed();
        Ok(())
    }

    /// Discard every statement executed in this context.
    ///
    /// # Errors
    /// `ContextClosed` after a terminal state, or the store's rollback error
    /// (the state still transitions to `RolledBack`).
    pub async fn rollback(&mut self) -> Result<(), InsertError> {
        self.guard.ensure_open()?;
        let result = self.conn_mut().rollback().await;
        self.guard.transition_rolled_back();
        result
    }

    /// Release the bound connection. Only meaningful once terminal.
    #[must_use]
    pub fn into_inner(mut self) -> Option<C> {
        self.conn.take()
    }
}

impl<C: AsyncStoreConnection> Drop for AsyncTransaction<C> {
    fn drop(&mut self) {
        if !self.guard.is_open() {
            return;
        }
        if let Some(conn) = self.conn.as_mut() {
            tracing::warn!("suspendable transaction dropped while open; aborting");
            conn.abort();
            self.guard.transition_rolled_back();
        }
    }
}

/// Execute `body` in a suspendable transaction context bound to `conn`.
///
/// The body may await between statements. On normal completion the context
/// commits and the connection is handed back; on any error — or on
/// cancellation, via the drop path — the context rolls back and the original
/// error is re-raised unchanged.
///
/// # Errors
/// The body's error, or a begin/commit failure.
pub async fn run_async<C, T, F>(conn: C, body: F) -> Result<(T, C), InsertError>
where
    C: AsyncStoreConnection,
    F: for<'a> FnOnce(&'a mut AsyncTransaction<C>) -> TxFuture<'a, T>,
{
    let mut tx = AsyncTransaction::begin(conn).await?;
    match body(&mut tx).await {
        Ok(value) => {
            tx.commit().await?;
            let conn = tx
                .into_inner()
                .ok_or_else(|| InsertError::Connectivity("connection already released".into()))?;
            Ok((value, conn))
        }
        Err(e) => {
            if tx.guard.is_open() {
                if let Err(rb) = tx.rollback().await {
                    tracing::warn!(error = %rb, "rollback after failed transaction body failed");
                }
            }
            Err(e)
        }
    }
}
