use std::fmt;
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;

/// Values that can be written to a database column or bound as parameters.
///
/// One enum shared across backends so the builder, validator, and adapters do
/// not branch on driver types:
/// ```rust
/// use typed_insert::SqlValue;
///
/// let values = vec![
///     SqlValue::Int(1),
///     SqlValue::Text("alice".into()),
///     SqlValue::Bool(true),
/// ];
/// # let _ = values;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    Json(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
    /// Raw SQL expression spliced verbatim into the VALUES list.
    ///
    /// Length validation is skipped for expressions; their result is unknown
    /// until the store evaluates them.
    Expr(String),
}

impl SqlValue {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let SqlValue::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let SqlValue::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let SqlValue::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let SqlValue::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let SqlValue::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// Human-readable name of the value's kind, for validation messages.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            SqlValue::Int(_) => "integer",
            SqlValue::Float(_) => "float",
            SqlValue::Text(_) => "text",
            SqlValue::Bool(_) => "boolean",
            SqlValue::Timestamp(_) => "timestamp",
            SqlValue::Null => "null",
            SqlValue::Json(_) => "json",
            SqlValue::Blob(_) => "blob",
            SqlValue::Expr(_) => "expression",
        }
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(i64::from(v))
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_owned())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::Timestamp(v)
    }
}

/// Declared type of a column, used for value-kind validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Float,
    Text,
    Boolean,
    Timestamp,
    Json,
    Blob,
}

/// How a column obtains a value when the caller does not supply one.
#[derive(Clone)]
pub enum ColumnDefault {
    /// No default; non-nullable columns with this default must be set.
    None,
    /// The store assigns the value (sequence / rowid).
    AutoIncrement,
    /// A client-side provider computes the value at freeze time, e.g. a
    /// random token generator.
    Client(Arc<dyn Fn() -> SqlValue + Send + Sync>),
}

impl fmt::Debug for ColumnDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnDefault::None => f.write_str("None"),
            ColumnDefault::AutoIncrement => f.write_str("AutoIncrement"),
            ColumnDefault::Client(_) => f.write_str("Client(..)"),
        }
    }
}

/// Immutable description of one table column, created at schema-declaration
/// time and never mutated afterward.
#[derive(Debug, Clone)]
pub struct ColumnDef {
    name: String,
    column_type: ColumnType,
    max_length: Option<usize>,
    nullable: bool,
    unique: bool,
    default: ColumnDefault,
}

impl ColumnDef {
    /// Declare a non-nullable, default-less column.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            max_length: None,
            nullable: false,
            unique: false,
            default: ColumnDefault::None,
        }
    }

    /// Declared max length/precision, counted per the dialect's convention.
    #[must_use]
    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Mark the value as store-assigned.
    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.default = ColumnDefault::AutoIncrement;
        self
    }

    /// Attach a client-side default provider, run at freeze time for unset
    /// columns.
    #[must_use]
    pub fn client_default(
        mut self,
        provider: impl Fn() -> SqlValue + Send + Sync + 'static,
    ) -> Self {
        self.default = ColumnDefault::Client(Arc::new(provider));
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    #[must_use]
    pub fn declared_max_length(&self) -> Option<usize> {
        self.max_length
    }

    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    #[must_use]
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    #[must_use]
    pub fn default(&self) -> &ColumnDefault {
        &self.default
    }

    /// True when the column has any default source at all.
    #[must_use]
    pub fn has_default(&self) -> bool {
        !matches!(self.default, ColumnDefault::None)
    }
}

/// A table reference plus its declared columns.
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    columns: Vec<ColumnDef>,
    id_column: Option<usize>,
}

impl Table {
    #[must_use]
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDef>) -> Self {
        Self {
            name: name.into(),
            columns,
            id_column: None,
        }
    }

    /// Designate the identity column by name. The identity column's name may
    /// differ from whatever wrapper the caller uses for it.
    #[must_use]
    pub fn with_id_column(mut self, name: &str) -> Self {
        self.id_column = self.columns.iter().position(|c| c.name() == name);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// The designated identity column, if any. Falls back to the first
    /// auto-increment column when none was designated explicitly.
    #[must_use]
    pub fn id_column(&self) -> Option<&ColumnDef> {
        if let Some(idx) = self.id_column {
            return self.columns.get(idx);
        }
        self.columns
            .iter()
            .find(|c| matches!(c.default(), ColumnDefault::AutoIncrement))
    }
}

/// Raw value carried by a [`RowId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RawKey {
    /// Store- or caller-supplied integer key.
    Int(i64),
    /// Caller-supplied textual key.
    Text(String),
    /// Client-generated token (from a client-side default provider).
    Token(String),
}

impl fmt::Display for RawKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawKey::Int(v) => write!(f, "{v}"),
            RawKey::Text(v) | RawKey::Token(v) => f.write_str(v),
        }
    }
}

/// Typed pairing of a raw primary-key value with its owning table.
///
/// Equality covers both halves, so ids from different tables never compare
/// equal even when the raw values collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowId {
    table: String,
    raw: RawKey,
}

impl RowId {
    #[must_use]
    pub fn new(table: impl Into<String>, raw: RawKey) -> Self {
        Self {
            table: table.into(),
            raw,
        }
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub fn raw(&self) -> &RawKey {
        &self.raw
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self.raw {
            RawKey::Int(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match &self.raw {
            RawKey::Text(v) | RawKey::Token(v) => Some(v),
            RawKey::Int(_) => None,
        }
    }
}

/// Opaque boolean condition produced by an external expression DSL.
///
/// This core splices the fragment into WHERE clauses without interpreting it;
/// placeholder style is whatever the producing DSL emitted for the target
/// dialect.
#[derive(Debug, Clone)]
pub struct Condition {
    sql: String,
    params: Vec<SqlValue>,
}

impl Condition {
    #[must_use]
    pub fn raw(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_ids_from_different_tables_never_compare_equal() {
        let a = RowId::new("users", RawKey::Int(7));
        let b = RowId::new("orders", RawKey::Int(7));
        assert_ne!(a, b);
        assert_eq!(a, RowId::new("users", RawKey::Int(7)));
    }

    #[test]
    fn id_column_falls_back_to_auto_increment() {
        let table = Table::new(
            "t",
            vec![
                ColumnDef::new("name", ColumnType::Text),
                ColumnDef::new("recid", ColumnType::Integer).auto_increment(),
            ],
        );
        assert_eq!(table.id_column().map(ColumnDef::name), Some("recid"));
    }
}
