//! Generated-key resolution: mapping post-execution state back into typed
//! row identifiers.

use crate::executor::ExecutionResult;
use crate::model::{ColumnDef, ColumnDefault, RawKey, RowId, SqlValue, Table};
use crate::statement::AssignmentSet;

/// Resolve the row identifier for one executed insert.
///
/// Resolution is driven by the id column's value-provider kind, uniformly
/// across integer, textual, and token-shaped identifiers:
/// - a row skipped under the ignore policy (`rows_affected == 0`) resolves to
///   `None` unconditionally, even when the caller supplied an id — a no-op
///   insert must not echo the identity of a pre-existing row;
/// - a caller-supplied or client-defaulted value present in the frozen set
///   wins; a store-assigned sequence value is never substituted for it;
/// - otherwise an auto-increment column reads the store-reported key.
#[must_use]
pub fn resolve_key(
    table: &Table,
    id_column: &ColumnDef,
    set: &AssignmentSet,
    result: &ExecutionResult,
) -> Option<RowId> {
    if result.rows_affected == 0 {
        return None;
    }

    if let Some(value) = set.get(id_column.name()) {
        let raw = raw_from_value(value, set.was_client_defaulted(id_column.name()))?;
        return Some(RowId::new(table.name(), raw));
    }

    match id_column.default() {
        ColumnDefault::AutoIncrement => result
            .generated_key
            .as_ref()
            .and_then(|value| raw_from_value(value, false))
            .map(|raw| RowId::new(table.name(), raw)),
        _ => None,
    }
}

fn raw_from_value(value: &SqlValue, client_defaulted: bool) -> Option<RawKey> {
    match value {
        SqlValue::Int(v) => Some(RawKey::Int(*v)),
        SqlValue::Text(v) if client_defaulted => Some(RawKey::Token(v.clone())),
        SqlValue::Text(v) => Some(RawKey::Text(v.clone())),
        _ => None,
    }
}
