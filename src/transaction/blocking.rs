use crate::connection::StoreConnection;
use crate::dialect::{DialectCapabilities, capabilities_for};
use crate::error::InsertError;
use crate::executor::{
    ExecutionResult, dispatch_blocking, execute_batch_blocking, prepare_single,
};
use crate::keys::resolve_key;
use crate::model::{Condition, RowId, Table};
use crate::statement::{AssignmentSetBuilder, ConflictPolicy, render_delete};

use super::{StatementLog, TxGuard, TxState};

/// A transaction context under the blocking discipline: the body runs to
/// completion on the invoking worker; only I/O wait inside the store driver
/// suspends.
///
/// Bound exclusively to one connection from `Open` until a terminal state.
/// Dropping an open context triggers a best-effort rollback so an abandoned
/// transaction never leaks partial rows.
pub struct Transaction<C: StoreConnection> {
    conn: Option<C>,
    caps: &'static DialectCapabilities,
    guard: TxGuard,
    log: StatementLog,
}

impl<C: StoreConnection> Transaction<C> {
    /// Acquire the connection and open a store-level transaction.
    ///
    /// # Errors
    /// Returns `UnknownDialect` for an unregistered dialect, or the store's
    /// error if the BEGIN fails.
    pub fn begin(mut conn: C) -> Result<Self, InsertError> {
        let caps = capabilities_for(conn.dialect())?;
        conn.begin()?;
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
    pub fn insert(
        &mut self,
        table: &Table,
        build_row: impl FnOnce(&mut AssignmentSetBuilder),
    ) -> Result<ExecutionResult, InsertError> {
        self.guard.ensure_open()?;
        let (_, plan) = prepare_single(table, build_row, ConflictPolicy::Fail, self.caps, false)?;
        let conn = self.conn.as_mut().expect("connection already released");
        dispatch_blocking(conn, &plan, &mut self.log)
    }

    /// Insert one row and resolve its identifier.
    ///
    /// # Errors
    /// `NotFound` when neither the store nor the caller produced a key, plus
    /// everything [`Transaction::insert`] can raise.
    pub fn insert_and_get_id(
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
        let result = dispatch_blocking(conn, &plan, &mut self.log)?;
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
    /// `Validation` before dispatch (including unsupported ignore),
    /// store errors other than the absorbed conflict, `ContextClosed`.
    pub fn insert_ignore(
        &mut self,
        table: &Table,
        build_row: impl FnOnce(&mut AssignmentSetBuilder),
    ) -> Result<ExecutionResult, InsertError> {
        self.guard.ensure_open()?;
        let (_, plan) =
            prepare_single(table, build_row, ConflictPolicy::Ignore, self.caps, false)?;
        let conn = self.conn.as_mut().expect("connection already released");
        dispatch_blocking(conn, &plan, &mut self.log)
    }

    /// Insert one row under the ignore policy and resolve its identifier;
    /// a conflict-skipped row resolves to `None`.
    ///
    /// # Errors
    /// Same as [`Transaction::insert_ignore`].
    pub fn insert_ignore_and_get_id(
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
        let result = dispatch_blocking(conn, &plan, &mut self.log)?;
        Ok(resolve_key(table, id_column, &set, &result))
    }

    /// Insert many rows pulled lazily from `source`, sub-batched per the
    /// dialect's `max_batch_size`. Returns one result per item in input
    /// order; an empty source issues zero statements.
    ///
    /// # Errors
    /// `Validation` for any item before its sub-batch is dispatched, store
    /// errors, `ContextClosed`.
    pub fn batch_insert<I, F>(
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
        execute_batch_blocking(conn, table, caps, source, build_item, &mut self.log)
    }

    /// Delete rows matching an opaque condition produced by an external
    /// expression DSL; the fragment is not interpreted here.
    ///
    /// # Errors
    /// Store errors, `ContextClosed`.
    pub fn delete_where(&mut self, table: &Table, condition: &Condition) -> Result<u64, InsertError> {
        self.guard.ensure_open()?;
        let rendered = render_delete(table.name(), condition);
        let conn = self.conn.as_mut().expect("connection already released");
        let rows_affected = conn.execute(&rendered.sql, &rendered.params)?;
        self.log.record(&rendered.sql, rows_affected);
        Ok(rows_affected)
    }

    /// Durably persist every statement executed in this context.
    ///
    /// # Errors
    /// `ContextClosed` after a terminal state, or the store's commit error.
    pub fn commit(&mut self) -> Result<(), InsertError> {
        self.guard.ensure_open()?;
        self.conn_mut().commit()?;
        self.guard.transition_committed();
        Ok(())
    }

    /// Discard every statement executed in this context.
    ///
    /// # Errors
    /// `ContextClosed` after a terminal state, or the store's rollback error
    /// (the state still transitions to `RolledBack`).
    pub fn rollback(&mut self) -> Result<(), InsertError> {
        self.guard.ensure_open()?;
        let result = self.conn_mut().rollback();
        self.guard.transition_rolled_back();
        result
    }

    /// Release the bound connection. Only meaningful once terminal.
    #[must_use]
    pub fn into_inner(mut self) -> Option<C> {
        self.conn.take()
    }
}

impl<C: StoreConnection> Drop for Transaction<C> {
    fn drop(&mut self) {
        if !self.guard.is_open() {
            return;
        }
        if let Some(conn) = self.conn.as_mut() {
            if let Err(e) = conn.rollback() {
                tracing::warn!(error = %e, "rollback of abandoned transaction failed");
            }
            self.guard.transition_rolled_back();
        }
    }
}

/// Execute `body` in a transaction context bound to `conn`.
///
/// On normal completion the context commits and the connection is handed
/// back. On any error raised inside `body` the context rolls back —
/// discarding every statement executed so far — and the original error is
/// re-raised unchanged.
///
/// # Errors
/// The body's error, or a begin/commit failure.
pub fn run<C, T, F>(conn: C, body: F) -> Result<(T, C), InsertError>
where
    C: StoreConnection,
    F: FnOnce(&mut Transaction<C>) -> Result<T, InsertError>,
{
    let mut tx = Transaction::begin(conn)?;
    match body(&mut tx) {
        Ok(value) => {
            tx.commit()?;
            let conn = tx
                .into_inner()
                .ok_or_else(|| InsertError::Connectivity("connection already released".into()))?;
            Ok((value, conn))
        }
        Err(e) => {
            if tx.guard.is_open() {
                if let Err(rb) = tx.rollback() {
                    tracing::warn!(error = %rb, "rollback after failed transaction body failed");
                }
            }
            Err(e)
        }
    }
}
