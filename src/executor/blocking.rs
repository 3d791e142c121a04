use crate::connection::StoreConnection;
use crate::dialect::DialectCapabilities;
use crate::error::InsertError;
use crate::model::{SqlValue, Table};
use crate::statement::{AssignmentSetBuilder, ConflictPolicy, build, validate};
use crate::transaction::StatementLog;

use super::{ExecutionResult, InsertPlan, plan_insert, signature_runs};

/// Run one planned statement against a blocking connection, recording it in
/// the transaction's statement log.
pub(crate) fn dispatch_blocking<C: StoreConnection>(
    conn: &mut C,
    plan: &InsertPlan,
    log: &mut StatementLog,
) -> Result<ExecutionResult, InsertError> {
    let result = if plan.rendered.expects_returning {
        conn.insert_returning(&plan.rendered.sql, &plan.rendered.params)?
    } else {
        let rows_affected = conn.execute(&plan.rendered.sql, &plan.rendered.params)?;
        let generated_key = if plan.key_via_last_insert_id && rows_affected > 0 {
            conn.last_insert_id()?.map(SqlValue::Int)
        } else {
            None
        };
        ExecutionResult {
            rows_affected,
            generated_key,
        }
    };
    log.record(&plan.rendered.sql, result.rows_affected);
    Ok(result)
}

/// Pull items from `source` on demand, freezing and validating each, and
/// dispatch them in sub-batches of at most `max_batch_size` rows. Memory held
/// never exceeds one sub-batch. Returns one result per input item, in input
/// order; an empty source issues zero statements.
pub(crate) fn execute_batch_blocking<C, I, F>(
    conn: &mut C,
    table: &Table,
    caps: &'static DialectCapabilities,
    source: I,
    mut build_item: F,
    log: &mut StatementLog,
) -> Result<Vec<ExecutionResult>, InsertError>
where
    C: StoreConnection,
    I: IntoIterator,
    F: FnMut(&mut AssignmentSetBuilder, I::Item),
{
    let mut results = Vec::new();
    let mut items = source.into_iter();
    loop {
        let mut chunk = Vec::new();
        while chunk.len() < caps.max_batch_size {
            let Some(item) = items.next() else { break };
            let mut builder = AssignmentSetBuilder::new();
            build_item(&mut builder, item);
            let set = builder.freeze(table);
            validate(&set, table, caps)?;
            chunk.push(set);
        }
        if chunk.is_empty() {
            break;
        }
        let source_drained = chunk.len() < caps.max_batch_size;

        for run in signature_runs(chunk) {
            let run_len = run.len();
            let statement = build(table, run, ConflictPolicy::Fail)?;
            let plan = plan_insert(&statement, caps, None)?;
            let rows_affected = conn.execute(&plan.rendered.sql, &plan.rendered.params)?;
            log.record(&plan.rendered.sql, rows_affected);
            // Fail policy: the statement must write every row or error. A
            // short count (e.g. a trigger absorbed a row) unwinds the
            // transaction rather than misreporting per-item results.
            if rows_affected != run_len as u64 {
                return Err(InsertError::RowCountMismatch {
                    expected: run_len as u64,
                    reported: rows_affected,
                });
            }
            results.extend((0..run_len).map(|_| ExecutionResult {
                rows_affected: 1,
                generated_key: None,
            }));
        }

        if source_drained {
            break;
        }
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{SQLITE, capabilities_for};
    use crate::model::{ColumnDef, ColumnType};

    /// Store that reports a fixed affected-row count for every statement.
    struct FixedCountStore {
        report: u64,
    }

    impl StoreConnection for FixedCountStore {
        fn dialect(&self) -> &'static str {
            SQLITE
        }

        fn execute(&mut self, _sql: &str, _params: &[SqlValue]) -> Result<u64, InsertError> {
            Ok(self.report)
        }

        fn insert_returning(
            &mut self,
            _sql: &str,
            _params: &[SqlValue],
        ) -> Result<ExecutionResult, InsertError> {
            unreachable!("batch dispatch never requests RETURNING");
        }

        fn last_insert_id(&mut self) -> Result<Option<i64>, InsertError> {
            Ok(None)
        }

        fn begin(&mut self) -> Result<(), InsertError> {
            Ok(())
        }

        fn commit(&mut self) -> Result<(), InsertError> {
            Ok(())
        }

        fn rollback(&mut self) -> Result<(), InsertError> {
            Ok(())
        }
    }

    fn table() -> Table {
        Table::new("t", vec![ColumnDef::new("seq", ColumnType::Integer)])
    }

    #[test]
    fn short_write_surfaces_instead_of_fabricating_results() {
        let caps = capabilities_for(SQLITE).unwrap();
        let mut conn = FixedCountStore { report: 2 };
        let mut log = StatementLog::default();
        let err = execute_batch_blocking(
            &mut conn,
            &table(),
            caps,
            0..3_i64,
            |row, seq| {
                row.set("seq", seq);
            },
            &mut log,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            InsertError::RowCountMismatch {
                expected: 3,
                reported: 2
            }
        ));
    }

    #[test]
    fn full_write_reports_one_row_per_item() {
        let caps = capabilities_for(SQLITE).unwrap();
        let mut conn = FixedCountStore { report: 3 };
        let mut log = StatementLog::default();
        let results = execute_batch_blocking(
            &mut conn,
            &table(),
            caps,
            0..3_i64,
            |row, seq| {
                row.set("seq", seq);
            },
            &mut log,
        )
        .unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.rows_affected == 1));
    }
}
