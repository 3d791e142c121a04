//! Statement building: mutable assignment accumulation, frozen assignment
//! sets, and the immutable insert statement description handed to the
//! executor.

use crate::model::{ColumnDefault, SqlValue, Table};

mod render;
mod validate;

pub(crate) use render::{RenderedSql, render_delete, render_insert};
pub use validate::validate;

/// Whether a constraint violation during insert aborts or is absorbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// A violating row raises `ConstraintViolation`.
    Fail,
    /// A violating row is skipped with zero effect and no error.
    Ignore,
}

/// Mutable accumulator for one row's column/value assignments.
///
/// Freeze it with [`AssignmentSetBuilder::freeze`] before handing the row to
/// the executor.
#[derive(Debug, Default)]
pub struct AssignmentSetBuilder {
    entries: Vec<(String, SqlValue)>,
}

impl AssignmentSetBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a value to a column.
    ///
    /// Setting the same column twice within one builder is last-write-wins:
    /// the later value silently replaces the earlier one. Legal, but an easy
    /// source of caller error; prefer computing the final value up front.
    pub fn set(&mut self, column: &str, value: impl Into<SqlValue>) -> &mut Self {
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(name, _)| name == column) {
            entry.1 = value;
        } else {
            self.entries.push((column.to_owned(), value));
        }
        self
    }

    /// Freeze into an immutable [`AssignmentSet`], materializing client-side
    /// defaults for declared columns the caller left unset.
    #[must_use]
    pub fn freeze(self, table: &Table) -> AssignmentSet {
        let mut entries = self.entries;
        let mut client_defaulted = Vec::new();
        for column in table.columns() {
            if entries.iter().any(|(name, _)| name == column.name()) {
                continue;
            }
            if let ColumnDefault::Client(provider) = column.default() {
                entries.push((column.name().to_owned(), provider()));
                client_defaulted.push(column.name().to_owned());
            }
        }
        AssignmentSet {
            entries,
            client_defaulted,
        }
    }
}

/// Immutable mapping from column name to value for one row.
#[derive(Debug, Clone)]
pub struct AssignmentSet {
    entries: Vec<(String, SqlValue)>,
    /// Columns whose value came from a client-side default provider rather
    /// than the caller; the key resolver treats these as token-shaped.
    client_defaulted: Vec<String>,
}

impl AssignmentSet {
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    #[must_use]
    pub fn entries(&self) -> &[(String, SqlValue)] {
        &self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn was_client_defaulted(&self, column: &str) -> bool {
        self.client_defaulted.iter().any(|name| name == column)
    }

    /// Column names in assignment order, used to group batch rows that share
    /// a statement shape.
    #[must_use]
    pub fn column_signature(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }
}

/// Immutable statement description: table, one or more rows, conflict policy.
#[derive(Debug, Clone)]
pub struct InsertStatement {
    table: String,
    rows: Vec<AssignmentSet>,
    policy: ConflictPolicy,
}

impl InsertStatement {
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub fn rows(&self) -> &[AssignmentSet] {
        &self.rows
    }

    #[must_use]
    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }
}

/// Assemble an [`InsertStatement`]. Pure; performs no I/O.
///
/// # Errors
/// Returns `InsertError::Validation` when `rows` is empty or any row carries
/// no assignments.
pub fn build(
    table: &Table,
    rows: Vec<AssignmentSet>,
    policy: ConflictPolicy,
) -> Result<InsertStatement, crate::error::InsertError> {
    if rows.is_empty() {
        return Err(crate::error::InsertError::Validation(format!(
            "insert into {} carries no rows",
            table.name()
        )));
    }
    if let Some(empty_at) = rows.iter().position(AssignmentSet::is_empty) {
        return Err(crate::error::InsertError::Validation(format!(
            "insert into {} row {empty_at} has no column assignments",
            table.name()
        )));
    }
    Ok(InsertStatement {
        table: table.name().to_owned(),
        rows,
        policy,
    })
}
