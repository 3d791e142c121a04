use crate::dialect::{DialectCapabilities, LengthUnit};
use crate::error::InsertError;
use crate::model::{ColumnDef, ColumnType, SqlValue, Table};

use super::AssignmentSet;

/// Validate one frozen assignment set against the table's column definitions
/// before dispatch. All failures here are raised without touching the store.
///
/// Checks, in order: unknown columns, required columns present, value kind
/// matches the declared type, text length within the declared max (counted
/// per the dialect's convention). `SqlValue::Expr` bypasses the kind and
/// length checks; its result is unknown until execution.
///
/// # Errors
/// Returns `InsertError::Validation` describing the first violation found.
pub fn validate(
    set: &AssignmentSet,
    table: &Table,
    caps: &DialectCapabilities,
) -> Result<(), InsertError> {
    for (name, value) in set.entries() {
        let Some(column) = table.column(name) else {
            return Err(InsertError::Validation(format!(
                "table {} has no column {name}",
                table.name()
            )));
        };
        check_value(column, value, table.name(), caps)?;
    }

    for column in table.columns() {
        if column.is_nullable() || column.has_default() {
            continue;
        }
        match set.get(column.name()) {
            None => {
                return Err(InsertError::Validation(format!(
                    "column {}.{} is non-nullable with no default and was not set",
                    table.name(),
                    column.name()
                )));
            }
            Some(SqlValue::Null) => {
                return Err(InsertError::Validation(format!(
                    "column {}.{} is non-nullable but was set to NULL",
                    table.name(),
                    column.name()
                )));
            }
            Some(_) => {}
        }
    }

    Ok(())
}

fn check_value(
    column: &ColumnDef,
    value: &SqlValue,
    table_name: &str,
    caps: &DialectCapabilities,
) -> Result<(), InsertError> {
    match value {
        // Expressions are opaque until the store evaluates them.
        SqlValue::Expr(_) => return Ok(()),
        SqlValue::Null => return Ok(()), // nullability is checked per-column
        _ => {}
    }

    let matches_type = matches!(
        (column.column_type(), value),
        (ColumnType::Integer, SqlValue::Int(_))
            | (ColumnType::Float, SqlValue::Float(_))
            | (ColumnType::Text, SqlValue::Text(_))
            | (ColumnType::Boolean, SqlValue::Bool(_))
            | (ColumnType::Timestamp, SqlValue::Timestamp(_))
            | (ColumnType::Json, SqlValue::Json(_))
            | (ColumnType::Blob, SqlValue::Blob(_))
    );
    if !matches_type {
        return Err(InsertError::Validation(format!(
            "column {table_name}.{} declared {:?} but value is {}",
            column.name(),
            column.column_type(),
            value.kind_name()
        )));
    }

    if let (Some(max), SqlValue::Text(text)) = (column.declared_max_length(), value) {
        let counted = match caps.length_unit {
            LengthUnit::Chars => text.chars().count(),
            LengthUnit::Bytes => text.len(),
        };
        if counted > max {
            return Err(InsertError::Validation(format!(
                "column {table_name}.{} max length {max} exceeded: value counts {counted} {}",
                column.name(),
                match caps.length_unit {
                    LengthUnit::Chars => "chars",
                    LengthUnit::Bytes => "bytes",
                },
            )));
        }
    }

    Ok(())
}
