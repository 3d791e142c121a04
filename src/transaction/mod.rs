//! Transaction boundary management.
//!
//! One commit/rollback state machine, shared verbatim by the blocking and
//! suspendable disciplines; the disciplines differ only in how they await
//! the connection. State transitions are monotone: `Open` moves to
//! `Committed` or `RolledBack` exactly once and never back.

use crate::error::InsertError;

mod blocking;
mod suspend;

pub use blocking::{Transaction, run};
pub use suspend::{AsyncTransaction, TxFuture, run_async};

/// Lifecycle tag of a transaction context. Both terminal states reject
/// further submissions with `InsertError::ContextClosed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Open,
    Committed,
    RolledBack,
}

/// The shared state machine. Every submission path calls `ensure_open`
/// first; the two transition methods are called exactly once, from the
/// discipline that owns the context.
#[derive(Debug)]
pub(crate) struct TxGuard {
    state: TxState,
}

impl TxGuard {
    pub(crate) fn new() -> Self {
        Self {
            state: TxState::Open,
        }
    }

    pub(crate) fn state(&self) -> TxState {
        self.state
    }

    pub(crate) fn is_open(&self) -> bool {
        self.state == TxState::Open
    }

    pub(crate) fn ensure_open(&self) -> Result<(), InsertError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(InsertError::ContextClosed)
        }
    }

    pub(crate) fn transition_committed(&mut self) {
        debug_assert!(self.is_open());
        self.state = TxState::Committed;
    }

    pub(crate) fn transition_rolled_back(&mut self) {
        debug_assert!(self.is_open());
        self.state = TxState::RolledBack;
    }
}

/// One executed statement, recorded for diagnostics.
#[derive(Debug, Clone)]
pub struct StatementRecord {
    pub sql: String,
    pub rows_affected: u64,
}

/// Append-only log of every statement executed in a transaction context.
/// Diagnostics and rollback bookkeeping only; never re-read for correctness.
#[derive(Debug, Default)]
pub struct StatementLog {
    entries: Vec<StatementRecord>,
}

impl StatementLog {
    pub(crate) fn record(&mut self, sql: &str, rows_affected: u64) {
        tracing::debug!(sql, rows_affected, "executed statement");
        self.entries.push(StatementRecord {
            sql: sql.to_owned(),
            rows_affected,
        });
    }

    #[must_use]
    pub fn entries(&self) -> &[StatementRecord] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_transitions_are_monotone() {
        let mut guard = TxGuard::new();
        assert!(guard.ensure_open().is_ok());
        guard.transition_committed();
        assert_eq!(guard.state(), TxState::Committed);
        assert!(matches!(
            guard.ensure_open().unwrap_err(),
            InsertError::ContextClosed
        ));
    }
}
