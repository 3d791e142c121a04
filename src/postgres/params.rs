use std::error::Error;

use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use tokio_util::bytes;

use crate::error::InsertError;
use crate::model::SqlValue;

/// Container for Postgres parameters with lifetime tracking.
pub struct Params<'a> {
    references: Vec<&'a (dyn ToSql + Sync)>,
}

impl<'a> Params<'a> {
    /// Convert from a slice of unified values to Postgres parameters.
    ///
    /// # Errors
    /// Returns `InsertError::Validation` if an `Expr` value appears; those
    /// are spliced into SQL text, never bound.
    pub fn convert(params: &'a [SqlValue]) -> Result<Params<'a>, InsertError> {
        if let Some(expr) = params.iter().find(|p| matches!(p, SqlValue::Expr(_))) {
            return Err(InsertError::Validation(format!(
                "expression value {expr:?} cannot be bound as a parameter"
            )));
        }
        let references: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
        Ok(Params { references })
    }

    /// Get a reference to the underlying parameter array.
    #[must_use]
    pub fn as_refs(&self) -> &[&(dyn ToSql + Sync)] {
        &self.references
    }
}

impl ToSql for SqlValue {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut bytes::BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            SqlValue::Int(i) => (*i).to_sql(ty, out),
            SqlValue::Float(f) => (*f).to_sql(ty, out),
            SqlValue::Text(s) => s.to_sql(ty, out),
            SqlValue::Bool(b) => (*b).to_sql(ty, out),
            SqlValue::Timestamp(dt) => dt.to_sql(ty, out),
            SqlValue::Null => Ok(IsNull::Yes),
            SqlValue::Json(jval) => jval.to_sql(ty, out),
            SqlValue::Blob(bytes) => bytes.to_sql(ty, out),
            SqlValue::Expr(_) => Err("expression values are never bound as parameters".into()),
        }
    }

    fn accepts(ty: &Type) -> bool {
        match *ty {
            Type::INT2 | Type::INT4 | Type::INT8 => true,
            Type::FLOAT4 | Type::FLOAT8 => true,
            Type::TEXT | Type::VARCHAR | Type::CHAR | Type::NAME => true,
            Type::BOOL => true,
            Type::TIMESTAMP | Type::TIMESTAMPTZ | Type::DATE => true,
            Type::JSON | Type::JSONB => true,
            Type::BYTEA => true,
            _ => false,
        }
    }

    to_sql_checked!();
}
