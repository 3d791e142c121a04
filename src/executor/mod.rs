//! Insert execution: capability-driven planning plus one dispatch loop per
//! execution discipline.
//!
//! Planning is pure (render + key-strategy selection); the blocking and
//! suspendable dispatchers in the sibling modules differ only in how they
//! await the connection.

use crate::dialect::DialectCapabilities;
use crate::error::InsertError;
use crate::model::{ColumnDefault, SqlValue, Table};
use crate::statement::{
    AssignmentSet, AssignmentSetBuilder, ConflictPolicy, RenderedSql, build, render_insert,
    validate,
};

mod blocking;
mod suspend;

pub(crate) use blocking::{dispatch_blocking, execute_batch_blocking};
pub(crate) use suspend::{dispatch_async, execute_batch_async};

/// Outcome of one dispatched statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    /// Rows the store reports as written; 0 for a conflict absorbed under the
    /// ignore policy.
    pub rows_affected: u64,
    /// Store-assigned key, when one was requested and produced.
    pub generated_key: Option<SqlValue>,
}

/// A rendered statement plus the key-retrieval strategy chosen for it.
#[derive(Debug)]
pub(crate) struct InsertPlan {
    pub rendered: RenderedSql,
    /// Fetch the key via the connection's last-insert-id after executing,
    /// for dialects without `RETURNING`.
    pub key_via_last_insert_id: bool,
}

/// Choose a key strategy and render the statement. `store_key_column` names
/// the auto-increment column whose value the store must report back, or
/// `None` when the caller supplied (or does not want) the key.
pub(crate) fn plan_insert(
    statement: &crate::statement::InsertStatement,
    caps: &DialectCapabilities,
    store_key_column: Option<&str>,
) -> Result<InsertPlan, InsertError> {
    let rendered = render_insert(statement, caps, store_key_column)?;
    let key_via_last_insert_id = store_key_column.is_some() && !rendered.expects_returning;
    Ok(InsertPlan {
        rendered,
        key_via_last_insert_id,
    })
}

/// Build, freeze, validate, and plan one row. Shared by both disciplines so
/// every pre-dispatch check runs exactly once, before any store interaction.
///
/// Returns the frozen set alongside the plan; the key resolver needs it.
pub(crate) fn prepare_single(
    table: &Table,
    build_row: impl FnOnce(&mut AssignmentSetBuilder),
    policy: ConflictPolicy,
    caps: &DialectCapabilities,
    want_id: bool,
) -> Result<(AssignmentSet, InsertPlan), InsertError> {
    let mut builder = AssignmentSetBuilder::new();
    build_row(&mut builder);
    let set = builder.freeze(table);
    validate(&set, table, caps)?;

    let store_key_column = if want_id {
        table
            .id_column()
            .filter(|col| {
                set.get(col.name()).is_none()
                    && matches!(col.default(), ColumnDefault::AutoIncrement)
            })
            .map(|col| col.name().to_owned())
    } else {
        None
    };

    let statement = build(table, vec![set.clone()], policy)?;
    let plan = plan_insert(&statement, caps, store_key_column.as_deref())?;
    Ok((set, plan))
}

/// Group a sub-batch into runs of consecutive rows sharing one column
/// signature, so each run renders as a single multi-row VALUES statement.
pub(crate) fn signature_runs(chunk: Vec<AssignmentSet>) -> Vec<Vec<AssignmentSet>> {
    let mut runs: Vec<Vec<AssignmentSet>> = Vec::new();
    for set in chunk {
        match runs.last_mut() {
            Some(run) if run[0].column_signature() == set.column_signature() => run.push(set),
            _ => runs.push(vec![set]),
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{SQLITE, capabilities_for};
    use crate::model::{ColumnDef, ColumnType};

    fn table() -> Table {
        Table::new(
            "t",
            vec![
                ColumnDef::new("id", ColumnType::Integer).auto_increment(),
                ColumnDef::new("name", ColumnType::Text).nullable(),
            ],
        )
    }

    #[test]
    fn supplied_key_suppresses_store_key_request() {
        let caps = capabilities_for(SQLITE).unwrap();
        let (_, plan) = prepare_single(
            &table(),
            |row| {
                row.set("id", 9).set("name", "x");
            },
            ConflictPolicy::Fail,
            caps,
            true,
        )
        .unwrap();
        assert!(!plan.rendered.expects_returning);
        assert!(!plan.key_via_last_insert_id);
    }

    #[test]
    fn auto_increment_key_uses_returning_on_supporting_dialects() {
        let caps = capabilities_for(SQLITE).unwrap();
        let (_, plan) = prepare_single(
            &table(),
            |row| {
                row.set("name", "x");
            },
            ConflictPolicy::Fail,
            caps,
            true,
        )
        .unwrap();
        assert!(plan.rendered.expects_returning);
    }

    #[test]
    fn signature_runs_split_on_shape_change() {
        let t = table();
        let make = |with_name: bool| {
            let mut b = AssignmentSetBuilder::new();
            b.set("id", 1);
            if with_name {
                b.set("name", "x");
            }
            b.freeze(&t)
        };
        let runs = signature_runs(vec![make(true), make(true), make(false), make(true)]);
        let lens: Vec<usize> = runs.iter().map(Vec::len).collect();
        assert_eq!(lens, vec![2, 1, 1]);
    }
}
