use crate::connection::AsyncStoreConnection;
use crate::dialect::DialectCapabilities;
use crate::error::InsertError;
use crate::model::{SqlValue, Table};
use crate::statement::{AssignmentSetBuilder, ConflictPolicy, build, validate};
use crate::transaction::StatementLog;

use super::{ExecutionResult, InsertPlan, plan_insert, signature_runs};

/// Suspendable mirror of [`super::dispatch_blocking`]; the plan and the log
/// side effect are identical, only the awaiting differs.
pub(crate) async fn dispatch_async<C: AsyncStoreConnection>(
    conn: &mut C,
    plan: &InsertPlan,
    log: &mut StatementLog,
) -> Result<ExecutionResult, InsertError> {
    let result = if plan.rendered.expects_returning {
        conn.insert_returning(&plan.rendered.sql, &plan.rendered.params)
            .await?
    } else {
        let rows_affected = conn.execute(&plan.rendered.sql, &plan.rendered.params).await?;
        let generated_key = if plan.key_via_last_insert_id && rows_affected > 0 {
            conn.last_insert_id().await?.map(SqlValue::Int)
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

/// Suspendable mirror of [`super::execute_batch_blocking`]: lazy pulls,
/// sub-batches capped at `max_batch_size`, one result per input item in
/// input order.
pub(crate) async fn execute_batch_async<C, I, F>(
    conn: &mut C,
    table: &Table,
    caps: &'static DialectCapabilities,
    source: I,
    mut build_item: F,
    log: &mut StatementLog,
) -> Result<Vec<ExecutionResult>, InsertError>
where
    C: AsyncStoreConnection,
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
            let rows_affected = conn
                .execute(&plan.rendered.sql, &plan.rendered.params)
                .await?;
            log.record(&plan.rendered.sql, rows_affected);
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
