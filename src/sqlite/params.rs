use std::fmt::Write;

use crate::error::InsertError;
use crate::model::SqlValue;

/// Convert a single [`SqlValue`] to a rusqlite `Value`.
///
/// # Errors
/// Returns `InsertError::Validation` for `Expr`, which is spliced into SQL
/// text during rendering and must never reach parameter binding.
pub fn sql_value_to_sqlite(value: &SqlValue) -> Result<rusqlite::types::Value, InsertError> {
    Ok(match value {
        SqlValue::Int(i) => rusqlite::types::Value::Integer(*i),
        SqlValue::Float(f) => rusqlite::types::Value::Real(*f),
        SqlValue::Text(s) => rusqlite::types::Value::Text(s.clone()),
        SqlValue::Bool(b) => rusqlite::types::Value::Integer(i64::from(*b)),
        SqlValue::Timestamp(dt) => {
            let mut buf = String::with_capacity(32);
            write!(buf, "{}", dt.format("%F %T%.f")).ok();
            rusqlite::types::Value::Text(buf)
        }
        SqlValue::Null => rusqlite::types::Value::Null,
        SqlValue::Json(jval) => rusqlite::types::Value::Text(jval.to_string()),
        SqlValue::Blob(bytes) => rusqlite::types::Value::Blob(bytes.clone()),
        SqlValue::Expr(_) => {
            return Err(InsertError::Validation(
                "expression values are spliced into SQL, never bound as parameters".into(),
            ));
        }
    })
}

/// Unified `SQLite` parameter container.
pub struct Params(pub Vec<rusqlite::types::Value>);

impl Params {
    /// Convert unified values into `SQLite` values.
    ///
    /// # Errors
    /// Returns `InsertError::Validation` if any value cannot be bound.
    pub fn convert(params: &[SqlValue]) -> Result<Self, InsertError> {
        let mut values = Vec::with_capacity(params.len());
        for p in params {
            values.push(sql_value_to_sqlite(p)?);
        }
        Ok(Params(values))
    }

    /// Build a borrowed params slice suitable for rusqlite execution.
    #[must_use]
    pub fn as_refs(&self) -> Vec<&dyn rusqlite::ToSql> {
        self.0.iter().map(|v| v as &dyn rusqlite::ToSql).collect()
    }
}
